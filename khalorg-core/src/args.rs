//! Mapping agenda items to backend arguments.
//!
//! `khal new` takes an argument list; edits go through a property record
//! that [`crate::vdir::Calendar::edit`] applies to the event file.

use tracing::{debug, warn};

use crate::agenda::AgendaItem;
use crate::config::BackendConfig;
use crate::error::KhalOrgResult;
use crate::recurrence::{BackendRule, descriptor_to_backend_rule, rule_is_supported};
use crate::time::{EventTime, OrgTime};

/// One command line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Positional(String),
    Optional { flag: String, value: String },
}

impl Arg {
    fn is_empty(&self) -> bool {
        match self {
            Arg::Positional(value) | Arg::Optional { value, .. } => value.is_empty(),
        }
    }
}

/// Ordered arguments. Empty values are dropped when serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KhalArgs {
    args: Vec<Arg>,
}

impl KhalArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(&mut self, value: impl Into<String>) -> &mut Self {
        self.args.push(Arg::Positional(value.into()));
        self
    }

    pub fn optional(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.args.push(Arg::Optional {
            flag: flag.to_string(),
            value: value.into(),
        });
        self
    }

    /// Options as `flag value` pairs, then positionals.
    pub fn as_list(&self) -> Vec<String> {
        let optional = self.args.iter().filter(|arg| !arg.is_empty()).filter_map(|arg| match arg {
            Arg::Optional { flag, value } => Some([flag.clone(), value.clone()]),
            Arg::Positional(_) => None,
        });
        let positional = self.args.iter().filter(|arg| !arg.is_empty()).filter_map(|arg| match arg {
            Arg::Positional(value) => Some(value.clone()),
            Arg::Optional { .. } => None,
        });

        optional.flatten().chain(positional).collect()
    }
}

/// Arguments for `khal new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArgs(KhalArgs);

impl NewArgs {
    pub fn load_from_item(item: &AgendaItem, config: &BackendConfig) -> KhalOrgResult<Self> {
        let timestamp = item.first_timestamp()?;
        let format = if timestamp.has_time() {
            &config.datetime_format
        } else {
            &config.date_format
        };

        let start = timestamp.start.format(format);
        let end = timestamp
            .end
            .map(|end| end.format(format))
            .unwrap_or_else(|| start.clone());
        let description = if item.description.is_empty() {
            String::new()
        } else {
            format!(":: {}", item.description)
        };
        let repeat = timestamp
            .repeater
            .and_then(|r| r.khal_keyword())
            .unwrap_or_default();
        let until = item
            .until()?
            .map(|until| until.format(format))
            .unwrap_or_default();

        let mut args = KhalArgs::new();
        args.positional(start)
            .positional(end)
            .positional(item.title.as_str())
            .positional(description)
            .optional("--location", item.property_or_empty("LOCATION"))
            .optional("--url", item.property_or_empty("URL"))
            .optional("--repeat", repeat)
            .optional("--until", until);

        debug!(args = ?args.as_list(), "Loaded khal new arguments");
        Ok(NewArgs(args))
    }

    pub fn as_list(&self) -> Vec<String> {
        self.0.as_list()
    }
}

/// Properties written to an existing event.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarProperties {
    pub start: EventTime,
    pub end: EventTime,
    pub rrule: Option<BackendRule>,
    /// Leave the event's rule alone when dates are edited.
    pub keep_rrule: bool,
    pub uid: String,
    pub url: String,
    pub summary: String,
    pub location: String,
    pub attendees: Vec<String>,
    pub categories: Vec<String>,
    pub description: String,
}

pub struct EditArgs;

impl EditArgs {
    pub fn load_from_item(
        item: &AgendaItem,
        config: &BackendConfig,
    ) -> KhalOrgResult<CalendarProperties> {
        let timestamp = item.first_timestamp()?;
        let zoned = |time: &OrgTime| EventTime::with_timezone(time, config.timezone);

        let start = zoned(&timestamp.start);
        let end = timestamp.end.as_ref().map(zoned).unwrap_or_else(|| start.clone());
        let until = item.until()?.map(|until| zoned(&until));
        let rrule = timestamp
            .repeater
            .map(|repeater| descriptor_to_backend_rule(&repeater, &start, until.as_ref()));

        // A rule without a repeater equivalent has no repeater on the
        // timestamp, but the series must keep recurring.
        let rule_text = item.property_or_empty("RRULE").trim();
        let keep_rrule = rrule.is_none() && !rule_is_supported(rule_text);
        if keep_rrule {
            warn!(
                rrule = rule_text,
                "Recurrence rule has no org repeater equivalent; the event keeps its rule"
            );
        }

        Ok(CalendarProperties {
            start,
            end,
            rrule,
            keep_rrule,
            uid: item.uid().to_string(),
            url: item.property_or_empty("URL").to_string(),
            summary: item.title.clone(),
            location: item.property_or_empty("LOCATION").to_string(),
            attendees: item.split_property("ATTENDEES"),
            categories: item.split_property("CATEGORIES"),
            description: item.description.clone(),
        })
    }
}
