//! ICS file generation.

use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};

use super::{VEvent, escape_text};
use crate::time::EventTime;

/// PRODID for files khalorg writes from scratch.
const PRODID: &str = "-//khalorg//EN";

/// Generate .ics content for an event series. `prodid` is kept when given,
/// so files khal created still name khal as their writer.
pub fn generate_ics(events: &[VEvent], prodid: Option<&str>) -> String {
    let mut cal = Calendar::new();
    for event in events {
        cal.push(generate_vevent(event));
    }
    let cal = cal.done();

    strip_ics_bloat(&cal.to_string(), prodid.unwrap_or(PRODID))
}

fn generate_vevent(event: &VEvent) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&event.uid);
    ics_event.add_property("SUMMARY", escape_text(&event.summary));

    let now = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    ics_event.add_property("DTSTAMP", &now);
    if let Some(updated) = event.updated {
        ics_event.add_property("LAST-MODIFIED", updated.format("%Y%m%dT%H%M%SZ").to_string());
    }
    if event.sequence > 0 {
        ics_event.add_property("SEQUENCE", event.sequence.to_string());
    }

    add_datetime_property(&mut ics_event, "DTSTART", &event.start);
    add_datetime_property(&mut ics_event, "DTEND", &event.end);

    if let Some(ref desc) = event.description {
        ics_event.add_property("DESCRIPTION", escape_text(desc));
    }
    if let Some(ref loc) = event.location {
        ics_event.add_property("LOCATION", escape_text(loc));
    }
    if let Some(ref url) = event.url {
        ics_event.add_property("URL", url);
    }
    if let Some(ref status) = event.status {
        ics_event.add_property("STATUS", status);
    }

    if let Some(ref rrule) = event.rrule {
        ics_event.add_property("RRULE", rrule);
    }
    for exdate in &event.exdates {
        let mut prop = Property::new("EXDATE", exdate.to_ics_string());
        add_time_parameters(&mut prop, exdate);
        ics_event.append_multi_property(prop);
    }
    if let Some(ref recurrence_id) = event.recurrence_id {
        add_datetime_property(&mut ics_event, "RECURRENCE-ID", recurrence_id);
    }

    if !event.categories.is_empty() {
        let categories: Vec<String> = event.categories.iter().map(|c| escape_text(c)).collect();
        ics_event.add_property("CATEGORIES", categories.join(","));
    }

    if let Some(ref org) = event.organizer {
        let mut prop = Property::new("ORGANIZER", format!("mailto:{}", org.email));
        if let Some(ref name) = org.name {
            prop.add_parameter("CN", name);
        }
        ics_event.append_property(prop);
    }
    for attendee in &event.attendees {
        let mut prop = Property::new("ATTENDEE", format!("mailto:{}", attendee.email));
        if let Some(ref name) = attendee.name {
            prop.add_parameter("CN", name);
        }
        if let Some(ref partstat) = attendee.partstat {
            prop.add_parameter("PARTSTAT", partstat);
        }
        ics_event.append_multi_property(prop);
    }

    for reminder in &event.reminders {
        let trigger = Trigger::before_start(chrono::Duration::minutes(reminder.minutes));
        ics_event.alarm(Alarm::display(&event.summary, trigger));
    }

    for (key, value) in &event.extra_properties {
        ics_event.append_multi_property(Property::new(key, value));
    }

    ics_event.done()
}

/// Clean up icalendar's output: the given PRODID, no default CALSCALE, no
/// DTSTAMP or UID inside VALARM.
fn strip_ics_bloat(ics: &str, prodid: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(prodid);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }
        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

fn add_datetime_property(ics_event: &mut icalendar::Event, name: &str, time: &EventTime) {
    let mut prop = Property::new(name, time.to_ics_string());
    add_time_parameters(&mut prop, time);
    ics_event.append_property(prop);
}

fn add_time_parameters(prop: &mut Property, time: &EventTime) {
    match time {
        EventTime::Date(_) => {
            prop.append_parameter(ValueType::Date);
        }
        EventTime::DateTimeZoned { tzid, .. } => {
            prop.add_parameter("TZID", tzid);
        }
        EventTime::DateTimeUtc(_) | EventTime::DateTimeFloating(_) => {}
    }
}
