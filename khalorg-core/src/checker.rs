//! Checks run before a calendar command touches the backend.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::agenda::AgendaItem;
use crate::error::{KhalOrgError, KhalOrgResult};
use crate::recurrence::{descriptor_to_backend_rule, rule_is_supported};
use crate::time::EventTime;
use crate::vdir::Calendar;

const MESSAGE_RRULE: &str = "Org repeater not supported.";
const MESSAGE_FUTURE: &str = "Agenda item date not in the future.";
const MESSAGE_DUPLICATE: &str = "Agenda item already exists.";
const MESSAGE_UID: &str = "Agenda item its UID property is empty.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCheck {
    Uid,
    Rrule,
    Future,
    Duplicate,
}

impl EventCheck {
    pub const ALL: [EventCheck; 4] = [
        EventCheck::Uid,
        EventCheck::Rrule,
        EventCheck::Future,
        EventCheck::Duplicate,
    ];
}

#[derive(Debug, Clone)]
pub struct EventChecker {
    checks: Vec<EventCheck>,
}

impl Default for EventChecker {
    fn default() -> Self {
        EventChecker::new(&EventCheck::ALL)
    }
}

impl EventChecker {
    pub fn new(checks: &[EventCheck]) -> Self {
        EventChecker {
            checks: checks.to_vec(),
        }
    }

    pub fn remove(&mut self, check: EventCheck) {
        let before = self.checks.len();
        self.checks.retain(|c| *c != check);
        if self.checks.len() == before {
            info!(?check, "Check was not enabled");
        }
    }

    /// Failure messages joined by newlines; empty when every check passes.
    pub fn is_valid(&self, calendar: &Calendar, item: &AgendaItem) -> KhalOrgResult<String> {
        self.is_valid_at(calendar, item, Utc::now())
    }

    pub fn is_valid_at(
        &self,
        calendar: &Calendar,
        item: &AgendaItem,
        now: DateTime<Utc>,
    ) -> KhalOrgResult<String> {
        let mut messages = Vec::new();

        for check in &self.checks {
            let failed = match check {
                EventCheck::Uid => item.uid().is_empty(),
                EventCheck::Rrule => !valid_rrule(calendar, item)?,
                EventCheck::Future => !is_future(calendar, item, now)?,
                EventCheck::Duplicate => is_duplicate(calendar, item)?,
            };
            if failed {
                messages.push(match check {
                    EventCheck::Uid => MESSAGE_UID,
                    EventCheck::Rrule => MESSAGE_RRULE,
                    EventCheck::Future => MESSAGE_FUTURE,
                    EventCheck::Duplicate => MESSAGE_DUPLICATE,
                });
            }
        }

        Ok(messages.join("\n"))
    }

    /// Like [`EventChecker::is_valid`], failing with the joined messages.
    pub fn check(&self, calendar: &Calendar, item: &AgendaItem) -> KhalOrgResult<()> {
        let messages = self.is_valid(calendar, item)?;
        if messages.is_empty() {
            Ok(())
        } else {
            Err(KhalOrgError::CheckFailed(messages))
        }
    }
}

fn valid_rrule(calendar: &Calendar, item: &AgendaItem) -> KhalOrgResult<bool> {
    let timestamp = item.first_timestamp()?;
    let Some(repeater) = timestamp.repeater else {
        return Ok(true);
    };
    let tz = calendar.config().timezone;
    let start = EventTime::with_timezone(&timestamp.start, tz);
    let until = item.until()?.map(|until| EventTime::with_timezone(&until, tz));

    let rule = descriptor_to_backend_rule(&repeater, &start, until.as_ref());
    Ok(rule_is_supported(rule.as_str()))
}

/// Whether the first timestamp starts now or later.
fn is_future(calendar: &Calendar, item: &AgendaItem, now: DateTime<Utc>) -> KhalOrgResult<bool> {
    let tz = calendar.config().timezone;
    let start = &item.first_timestamp()?.start;

    if start.has_time() {
        Ok(EventTime::with_timezone(start, tz)
            .to_utc(tz)
            .is_some_and(|start| start >= now))
    } else {
        Ok(start.date() >= now.with_timezone(&tz).date_naive())
    }
}

fn is_duplicate(calendar: &Calendar, item: &AgendaItem) -> KhalOrgResult<bool> {
    let timestamp = item.first_timestamp()?;
    let tz = calendar.config().timezone;
    let start = EventTime::with_timezone(&timestamp.start, tz);
    let end = timestamp
        .end
        .as_ref()
        .map(|end| EventTime::with_timezone(end, tz))
        .unwrap_or_else(|| start.clone());

    calendar.exists(&item.title, &start, &end)
}
