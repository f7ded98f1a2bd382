//! Reading and writing the iCalendar files khal keeps in a vdir.
//!
//! A file holds one event series: the master VEVENT and any number of
//! overrides carrying a RECURRENCE-ID.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::{parse_events, parse_prodid};

use chrono::{DateTime, Utc};

use crate::time::EventTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub email: String,
    pub name: Option<String>,
    /// PARTSTAT, kept verbatim.
    pub partstat: Option<String>,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Attendee {
            email: email.into(),
            name: None,
            partstat: None,
        }
    }
}

/// Reminder, in minutes before the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminder {
    pub minutes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VEvent {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub rrule: Option<String>,
    pub exdates: Vec<EventTime>,
    pub recurrence_id: Option<EventTime>,
    pub organizer: Option<Attendee>,
    pub attendees: Vec<Attendee>,
    pub categories: Vec<String>,
    pub status: Option<String>,
    pub sequence: u32,
    pub updated: Option<DateTime<Utc>>,
    pub reminders: Vec<Reminder>,
    /// Properties without a field of their own, in file order.
    pub extra_properties: Vec<(String, String)>,
}

impl VEvent {
    pub fn new(uid: impl Into<String>, summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        VEvent {
            uid: uid.into(),
            summary: summary.into(),
            description: None,
            location: None,
            url: None,
            start,
            end,
            rrule: None,
            exdates: Vec::new(),
            recurrence_id: None,
            organizer: None,
            attendees: Vec::new(),
            categories: Vec::new(),
            status: None,
            sequence: 0,
            updated: None,
            reminders: Vec::new(),
            extra_properties: Vec::new(),
        }
    }
}

/// Unescape an RFC 5545 TEXT value.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Escape a TEXT value for writing.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}
