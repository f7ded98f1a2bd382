//! A khal calendar on disk: a vdir directory with one `.ics` file per series.
//!
//! khal has no non-interactive edit or delete command, so both operate on the
//! files directly. khal picks up the changes on its next run.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::args::CalendarProperties;
use crate::config::BackendConfig;
use crate::error::{KhalOrgError, KhalOrgResult};
use crate::ics::{Attendee, VEvent, generate_ics, parse_events, parse_prodid};
use crate::recurrence::rule_until;
use crate::time::{EventTime, OrgTime};

/// One `.ics` file and the events it holds.
#[derive(Debug, Clone)]
pub struct EventFile {
    pub path: PathBuf,
    pub events: Vec<VEvent>,
    prodid: Option<String>,
}

impl EventFile {
    pub fn from_file(path: PathBuf) -> KhalOrgResult<Self> {
        let content = std::fs::read_to_string(&path)?;
        let events = parse_events(&content)?;
        if events.is_empty() {
            return Err(KhalOrgError::IcsParse(format!(
                "No VEVENT in {}",
                path.display()
            )));
        }
        let prodid = parse_prodid(&content);
        Ok(EventFile { path, events, prodid })
    }

    /// The series master, or the first event when the file only has overrides.
    pub fn master(&self) -> Option<&VEvent> {
        self.events
            .iter()
            .find(|e| e.recurrence_id.is_none())
            .or_else(|| self.events.first())
    }

    fn master_mut(&mut self) -> Option<&mut VEvent> {
        let index = self
            .events
            .iter()
            .position(|e| e.recurrence_id.is_none())
            .unwrap_or(0);
        self.events.get_mut(index)
    }

    pub fn save(&self) -> KhalOrgResult<()> {
        std::fs::write(&self.path, generate_ics(&self.events, self.prodid.as_deref()))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Calendar {
    pub name: String,
    pub path: PathBuf,
    config: BackendConfig,
}

impl Calendar {
    pub fn new(name: &str, path: impl Into<PathBuf>, config: BackendConfig) -> Self {
        Calendar {
            name: name.to_string(),
            path: path.into(),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Every readable event file. Files that fail to parse are skipped.
    pub fn files(&self) -> KhalOrgResult<Vec<EventFile>> {
        let entries = std::fs::read_dir(&self.path)?;

        let files = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "ics"))
            .filter_map(|path| match EventFile::from_file(path.clone()) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable event file");
                    None
                }
            })
            .collect();

        Ok(files)
    }

    /// Files holding events with `uid`. An empty UID matches nothing.
    pub fn get_events(&self, uid: &str) -> KhalOrgResult<Vec<EventFile>> {
        if uid.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .files()?
            .into_iter()
            .filter(|file| file.events.iter().any(|e| e.uid == uid))
            .collect())
    }

    /// Files holding an event with this summary, start and end.
    ///
    /// Times are compared as wall-clock values; zones are ignored.
    pub fn get_events_no_uid(
        &self,
        summary: &str,
        start: &EventTime,
        end: &EventTime,
    ) -> KhalOrgResult<Vec<EventFile>> {
        let tz = self.config.timezone;
        let wanted_start = start.to_org_time(tz);
        let wanted_end = end.to_org_time(tz);

        let matches = |event: &VEvent| {
            event.summary == summary
                && same_wall_time(&event.start.to_org_time(tz), &wanted_start)
                && same_wall_time(&inclusive_end(event).to_org_time(tz), &wanted_end)
        };

        Ok(self
            .files()?
            .into_iter()
            .filter(|file| file.events.iter().any(matches))
            .collect())
    }

    pub fn exists(&self, summary: &str, start: &EventTime, end: &EventTime) -> KhalOrgResult<bool> {
        Ok(!self.get_events_no_uid(summary, start, end)?.is_empty())
    }

    /// Apply `props` to the matching event series.
    ///
    /// Matching is by UID, or by summary, start and end when the UID is empty.
    /// Only series with an end after now are edited. Returns the masters of
    /// the matching series as they were before the edit.
    pub fn edit(&self, props: &CalendarProperties, edit_dates: bool) -> KhalOrgResult<Vec<VEvent>> {
        self.edit_at(props, edit_dates, Utc::now())
    }

    pub fn edit_at(
        &self,
        props: &CalendarProperties,
        edit_dates: bool,
        now: DateTime<Utc>,
    ) -> KhalOrgResult<Vec<VEvent>> {
        let files = if props.uid.is_empty() {
            self.get_events_no_uid(&props.summary, &props.start, &props.end)?
        } else {
            self.get_events(&props.uid)?
        };
        info!(count = files.len(), "Found events to edit");

        let mut files: Vec<EventFile> = files
            .into_iter()
            .filter(|file| self.is_future(file, now))
            .collect();

        if files.is_empty() {
            error!(
                "When trying to edit an event, the number of events found in the khal \
                 calendar was not 1 but: 0. The command was aborted."
            );
            return Ok(Vec::new());
        }

        let matched: Vec<VEvent> = files.iter().filter_map(|f| f.master().cloned()).collect();

        // The series master carries the properties of every occurrence.
        let file = &mut files[0];
        if let Some(event) = file.master_mut() {
            update_event(event, props, edit_dates, now);
        }
        file.save()?;
        info!(path = %file.path.display(), "Updated event");

        Ok(matched)
    }

    /// Remove the whole series with the UID in `props`.
    pub fn delete(&self, props: &CalendarProperties) -> KhalOrgResult<()> {
        let files = self.get_events(&props.uid)?;
        let Some(file) = files.first() else {
            error!(
                "When trying to delete an event, the number of events found in the khal \
                 calendar was not 1 but: 0. The command was aborted."
            );
            return Ok(());
        };

        std::fs::remove_file(&file.path)?;
        info!(uid = %props.uid, path = %file.path.display(), "Deleted event");
        Ok(())
    }

    /// Whether any event in `file` ends after `now`, counting recurring
    /// series whose UNTIL has not passed.
    fn is_future(&self, file: &EventFile, now: DateTime<Utc>) -> bool {
        let tz = self.config.timezone;
        file.events.iter().any(|event| {
            if event.end.is_after(now, tz) {
                return true;
            }
            match event.rrule.as_deref() {
                Some(rule) => match rule_until(rule) {
                    Some(until) => until.is_after(now, tz),
                    None => true,
                },
                None => false,
            }
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn same_wall_time(a: &OrgTime, b: &OrgTime) -> bool {
    a.has_time() == b.has_time() && a.naive() == b.naive()
}

/// DTEND of an all-day event is exclusive, org ranges include their last day.
fn inclusive_end(event: &VEvent) -> EventTime {
    match (&event.start, &event.end) {
        (EventTime::Date(start), EventTime::Date(end)) if end > start => {
            EventTime::Date(end.pred_opt().unwrap_or(*end))
        }
        (_, end) => end.clone(),
    }
}

fn exclusive_end(end: &EventTime) -> EventTime {
    match end {
        EventTime::Date(d) => EventTime::Date(d.succ_opt().unwrap_or(*d)),
        other => other.clone(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn update_event(event: &mut VEvent, props: &CalendarProperties, edit_dates: bool, now: DateTime<Utc>) {
    event.url = non_empty(&props.url);
    event.summary = props.summary.clone();
    event.location = non_empty(&props.location);
    event.description = non_empty(&props.description);
    event.categories = props
        .categories
        .iter()
        .filter(|c| !c.is_empty())
        .cloned()
        .collect();

    // Keep CN and PARTSTAT of attendees that stay.
    let existing = std::mem::take(&mut event.attendees);
    event.attendees = props
        .attendees
        .iter()
        .filter(|email| !email.is_empty())
        .map(|email| {
            existing
                .iter()
                .find(|a| a.email.eq_ignore_ascii_case(email))
                .cloned()
                .unwrap_or_else(|| Attendee::new(email.as_str()))
        })
        .collect();

    if edit_dates {
        debug!(start = %props.start, end = %props.end, rrule = ?props.rrule, "Updating dates");
        event.start = props.start.clone();
        event.end = exclusive_end(&props.end);
        if !props.keep_rrule {
            event.rrule = props.rrule.as_ref().map(|r| r.as_str().to_string());
        }
    }

    event.sequence += 1;
    event.updated = Some(now);
}
