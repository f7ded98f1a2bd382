use indexmap::IndexMap;

use crate::error::{KhalOrgError, KhalOrgResult};
use crate::time::OrgTime;
use crate::timestamp::Timestamp;

/// One org agenda entry: heading, property drawer, timestamps and body.
///
/// Property keys are stored upper-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgendaItem {
    pub title: String,
    timestamps: Vec<Timestamp>,
    properties: IndexMap<String, String>,
    pub description: String,
}

impl AgendaItem {
    pub fn new(title: impl Into<String>) -> Self {
        AgendaItem {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Timestamps, sorted ascending by start.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn set_timestamps(&mut self, mut timestamps: Vec<Timestamp>) {
        timestamps.sort_by_key(|ts| ts.start.naive());
        self.timestamps = timestamps;
    }

    pub fn push_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamps.push(timestamp);
        self.timestamps.sort_by_key(|ts| ts.start.naive());
    }

    /// The authoritative timestamp for recurrence, edit and delete.
    pub fn first_timestamp(&self) -> KhalOrgResult<&Timestamp> {
        self.timestamps.first().ok_or(KhalOrgError::MissingTimestamp)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(&key.to_uppercase())
            .map(String::as_str)
    }

    /// The property value, or "" when absent.
    pub fn property_or_empty(&self, key: &str) -> &str {
        self.property(key).unwrap_or_default()
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_uppercase(), value.into());
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn uid(&self) -> &str {
        self.property_or_empty("UID")
    }

    /// A list-valued property such as `ATTENDEES`, split on `", "`.
    pub fn split_property(&self, key: &str) -> Vec<String> {
        match self.property(key) {
            Some(value) if !value.is_empty() => {
                value.split(", ").map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// The `UNTIL` property, given the same kind (date or datetime) as the
    /// first timestamp. An all-day until on a timed item becomes midnight.
    pub fn until(&self) -> KhalOrgResult<Option<OrgTime>> {
        let Some(raw) = self.property("UNTIL").filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let until: Timestamp = raw.parse()?;
        let first = self.first_timestamp()?;
        Ok(Some(until.start.aligned_to(&first.start)))
    }
}
