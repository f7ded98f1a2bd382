//! Grouping of per-occurrence listing results into one agenda per UID.
//!
//! A backend listing yields one result per occurrence: a weekly series shows
//! up once per week, a multi-day event once per day it touches. The
//! reconciler keeps one timestamp per distinct supported rule (annotated with
//! its repeater) and one per distinct non-recurring timestamp.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::recurrence::{backend_rule_to_descriptor, rule_is_supported};
use crate::timestamp::Timestamp;

/// One occurrence as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampInstance {
    pub identity_key: String,
    pub timestamp: Timestamp,
    pub rule_text: String,
}

#[derive(Debug, Default)]
struct KeyAgenda {
    seen_rules: BTreeSet<String>,
    unsupported_rules: BTreeSet<String>,
    instances: Vec<Timestamp>,
}

impl KeyAgenda {
    fn has_occurrence(&self, timestamp: &Timestamp) -> bool {
        self.instances
            .iter()
            .any(|t| t.start == timestamp.start && t.end == timestamp.end)
    }
}

#[derive(Debug, Default)]
pub struct AgendaReconciler {
    agendas: IndexMap<String, KeyAgenda>,
}

impl AgendaReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instance(&mut self, instance: TimestampInstance) {
        self.add(&instance.identity_key, instance.timestamp, &instance.rule_text);
    }

    pub fn add(&mut self, key: &str, timestamp: Timestamp, rule_text: &str) {
        let agenda = self.agendas.entry(key.to_string()).or_default();

        let supported = rule_is_supported(rule_text);
        let empty_rule = rule_text.is_empty();
        let new_rule = !agenda.seen_rules.contains(rule_text);
        let new_timestamp = !agenda.has_occurrence(&timestamp);

        if (empty_rule && new_timestamp) || (new_rule && supported) {
            let repeater = backend_rule_to_descriptor(rule_text);
            agenda.seen_rules.insert(rule_text.to_string());
            agenda.instances.push(timestamp.with_repeater(repeater));
        } else if new_rule && !supported && new_timestamp {
            // Every occurrence of an unsupported series is kept as a plain timestamp.
            agenda.unsupported_rules.insert(rule_text.to_string());
            agenda.instances.push(timestamp);
        }
    }

    /// Keys in order of first arrival.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.agendas.keys().map(String::as_str)
    }

    pub fn instances(&self, key: &str) -> &[Timestamp] {
        self.agendas
            .get(key)
            .map(|agenda| agenda.instances.as_slice())
            .unwrap_or_default()
    }

    /// Every non-empty rule text seen for `key`, supported or not, joined by `;`.
    pub fn get_rrulestr(&self, key: &str) -> String {
        let Some(agenda) = self.agendas.get(key) else {
            return String::new();
        };

        agenda
            .seen_rules
            .union(&agenda.unsupported_rules)
            .filter(|rule| !rule.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }
}
