use std::collections::HashSet;

use crate::agenda::{AgendaItem, AgendaReconciler};
use crate::error::KhalOrgResult;
use crate::format::TemplateFormatter;

/// The agenda items of one listing, in listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgendaFile {
    pub items: Vec<AgendaItem>,
}

impl AgendaFile {
    pub fn new(items: Vec<AgendaItem>) -> Self {
        AgendaFile { items }
    }

    /// Collapse per-occurrence items into one item per UID.
    ///
    /// The first item of each UID is kept. Its timestamps become the
    /// reconciled list and its `RRULE` property every rule seen for the UID.
    pub fn apply_rrules(&mut self) -> KhalOrgResult<()> {
        let mut reconciler = AgendaReconciler::new();
        for item in &self.items {
            let timestamp = item.first_timestamp()?.clone();
            reconciler.add(item.uid(), timestamp, item.property_or_empty("RRULE"));
        }

        let mut seen = HashSet::new();
        let items = std::mem::take(&mut self.items);
        for mut item in items {
            let uid = item.uid().to_string();
            if !seen.insert(uid.clone()) {
                continue;
            }
            item.set_timestamps(reconciler.instances(&uid).to_vec());
            item.set_property("RRULE", reconciler.get_rrulestr(&uid));
            self.items.push(item);
        }

        Ok(())
    }

    pub fn format(&self, formatter: &TemplateFormatter) -> KhalOrgResult<String> {
        Ok(formatter.format_all(&self.items)?)
    }
}
