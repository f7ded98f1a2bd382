//! ICS parsing using the icalendar crate's parser.

use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use super::{Attendee, Reminder, VEvent, unescape_text};
use crate::error::{KhalOrgError, KhalOrgResult};
use crate::time::EventTime;

/// Properties that are regenerated on write rather than carried over.
const REGENERATED: [&str; 2] = ["DTSTAMP", "LAST-MODIFIED"];

const KNOWN: [&str; 17] = [
    "UID",
    "SUMMARY",
    "DESCRIPTION",
    "LOCATION",
    "URL",
    "DTSTART",
    "DTEND",
    "DURATION",
    "RRULE",
    "EXDATE",
    "RECURRENCE-ID",
    "ORGANIZER",
    "ATTENDEE",
    "CATEGORIES",
    "STATUS",
    "SEQUENCE",
    "LAST-MODIFIED",
];

/// Every VEVENT in `content`.
pub fn parse_events(content: &str) -> KhalOrgResult<Vec<VEvent>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| KhalOrgError::IcsParse(e.to_string()))?;

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .map(parse_vevent)
        .collect()
}

/// PRODID of the calendar in `content`, so a rewrite keeps the writer khal recorded.
pub fn parse_prodid(content: &str) -> Option<String> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;
    calendar
        .properties
        .iter()
        .find(|p| p.name == "PRODID")
        .map(|p| p.val.to_string())
}

fn parse_vevent(vevent: &Component) -> KhalOrgResult<VEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .ok_or_else(|| KhalOrgError::IcsParse("VEVENT without UID".to_string()))?;

    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .ok_or_else(|| KhalOrgError::IcsParse(format!("Event {} has no valid DTSTART", uid)))?;

    // DURATION is folded into DTEND. Without either the event is zero-length.
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .or_else(|| {
            let duration = parse_duration(vevent.find_prop("DURATION")?.val.as_ref())?;
            Some(start.shifted(duration))
        })
        .unwrap_or_else(|| start.clone());

    let text = |name: &str| vevent.find_prop(name).map(|p| unescape_text(p.val.as_ref()));

    let mut event = VEvent::new(uid, text("SUMMARY").unwrap_or_default(), start, end);
    event.description = text("DESCRIPTION");
    event.location = text("LOCATION");
    event.url = vevent.find_prop("URL").map(|p| p.val.to_string());
    event.status = vevent.find_prop("STATUS").map(|p| p.val.to_string());
    event.sequence = vevent
        .find_prop("SEQUENCE")
        .and_then(|p| p.val.as_ref().parse().ok())
        .unwrap_or(0);
    event.updated = vevent
        .find_prop("LAST-MODIFIED")
        .and_then(|p| EventTime::from_ics_value(p.val.as_ref()))
        .and_then(|t| match t {
            EventTime::DateTimeUtc(dt) => Some(dt),
            _ => None,
        });

    event.rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    event.exdates = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    event.recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    event.organizer = vevent.find_prop("ORGANIZER").map(parse_attendee);
    event.attendees = vevent
        .properties
        .iter()
        .filter(|p| p.name == "ATTENDEE")
        .map(parse_attendee)
        .collect();
    event.categories = vevent
        .properties
        .iter()
        .filter(|p| p.name == "CATEGORIES")
        .flat_map(|p| split_list(p.val.as_ref()))
        .collect();

    event.reminders = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(|alarm| {
            let trigger = alarm.find_prop("TRIGGER")?.val.as_ref();
            let minutes = parse_trigger_minutes(trigger)?;
            Some(Reminder { minutes })
        })
        .collect();

    event.extra_properties = vevent
        .properties
        .iter()
        .filter(|p| {
            let name = p.name.as_ref();
            !KNOWN.contains(&name) && !REGENERATED.contains(&name)
        })
        .map(|p| (p.name.to_string(), p.val.to_string()))
        .collect();

    Ok(event)
}

fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// EXDATE values, comma-separated, with optional TZID or VALUE=DATE.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match (&tzid, EventTime::from_ics_value(s)?) {
            (Some(tz), EventTime::DateTimeFloating(datetime)) => Some(EventTime::DateTimeZoned {
                datetime,
                tzid: tz.clone(),
            }),
            (_, time) => Some(time),
        })
        .collect()
}

fn parse_attendee(prop: &Property) -> Attendee {
    let value = prop.val.as_ref();
    let email = value
        .strip_prefix("mailto:")
        .or_else(|| value.strip_prefix("MAILTO:"))
        .unwrap_or(value)
        .to_string();

    let param = |key: &str| {
        prop.params
            .iter()
            .find(|p| p.key == key)
            .and_then(|p| p.val.as_ref().map(|v| v.to_string()))
    };

    Attendee {
        email,
        name: param("CN"),
        partstat: param("PARTSTAT"),
    }
}

/// Split a comma-separated TEXT list, honouring `\,` escapes.
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in value.chars() {
        match c {
            ',' if !escaped => items.push(std::mem::take(&mut current)),
            '\\' if !escaped => {
                escaped = true;
                current.push(c);
                continue;
            }
            _ => current.push(c),
        }
        escaped = false;
    }
    items.push(current);

    items
        .iter()
        .map(|item| unescape_text(item.trim()))
        .filter(|item| !item.is_empty())
        .collect()
}

/// An unsigned iCalendar DURATION (PT1H, P1D, P1W, ...).
fn parse_duration(value: &str) -> Option<chrono::Duration> {
    let duration = iso8601::duration(value.trim().trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    chrono::Duration::from_std(std_duration).ok()
}

/// TRIGGER value to minutes before the event (-PT30M, -P1D, ...).
fn parse_trigger_minutes(value: &str) -> Option<i64> {
    let is_before = value.starts_with('-');
    let minutes = parse_duration(value.trim_start_matches('-'))?.num_minutes();

    Some(if is_before { minutes } else { -minutes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    const KHAL_EVENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//PIMUTILS.ORG//NONSGML khal / icalendar //EN\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Standup\r\n\
DTSTART;TZID=Europe/Amsterdam:20230102T093000\r\n\
DTEND;TZID=Europe/Amsterdam:20230102T094500\r\n\
DTSTAMP:20230101T120000Z\r\n\
UID:abc-123\r\n\
RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO\r\n\
EXDATE;TZID=Europe/Amsterdam:20230109T093000,20230116T093000\r\n\
SEQUENCE:2\r\n\
LOCATION:Room 1\\, first floor\r\n\
DESCRIPTION:Daily sync\\nBring notes\r\n\
CATEGORIES:work,team\r\n\
ATTENDEE;CN=Alice;PARTSTAT=ACCEPTED:mailto:alice@example.com\r\n\
ATTENDEE:mailto:bob@example.com\r\n\
X-KHALORG-TEST:kept\r\n\
CLASS:PUBLIC\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
DESCRIPTION:Standup\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Standup (moved)\r\n\
DTSTART;TZID=Europe/Amsterdam:20230124T100000\r\n\
DTEND;TZID=Europe/Amsterdam:20230124T101500\r\n\
RECURRENCE-ID;TZID=Europe/Amsterdam:20230123T093000\r\n\
UID:abc-123\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parse_master_and_override() {
        let events = parse_events(KHAL_EVENT).unwrap();
        assert_eq!(events.len(), 2);

        let master = &events[0];
        assert_eq!(master.uid, "abc-123");
        assert_eq!(master.summary, "Standup");
        assert_eq!(master.rrule.as_deref(), Some("FREQ=WEEKLY;INTERVAL=1;BYDAY=MO"));
        assert_eq!(master.sequence, 2);
        assert_eq!(master.location.as_deref(), Some("Room 1, first floor"));
        assert_eq!(master.description.as_deref(), Some("Daily sync\nBring notes"));
        assert_eq!(master.categories, vec!["work", "team"]);
        assert_eq!(master.reminders, vec![Reminder { minutes: 15 }]);
        assert_eq!(master.exdates.len(), 2);
        assert_eq!(
            master.start,
            EventTime::DateTimeZoned {
                datetime: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap().and_hms_opt(9, 30, 0).unwrap(),
                tzid: "Europe/Amsterdam".to_string(),
            }
        );

        assert_eq!(master.attendees.len(), 2);
        assert_eq!(master.attendees[0].name.as_deref(), Some("Alice"));
        assert_eq!(master.attendees[0].partstat.as_deref(), Some("ACCEPTED"));
        assert_eq!(master.attendees[1].email, "bob@example.com");

        assert!(master
            .extra_properties
            .contains(&("X-KHALORG-TEST".to_string(), "kept".to_string())));
        assert!(!master.extra_properties.iter().any(|(name, _)| name == "DTSTAMP"));

        assert!(events[1].recurrence_id.is_some());
    }

    #[test]
    fn test_parse_all_day_without_dtend() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:day\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20230105\r\n\
LAST-MODIFIED:20230101T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_events(ics).unwrap();
        let day = EventTime::Date(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
        assert_eq!(events[0].start, day);
        assert_eq!(events[0].end, day);
        assert_eq!(
            events[0].updated,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_duration_becomes_end() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:call-1\r\n\
SUMMARY:Call\r\n\
DTSTART:20230105T100000Z\r\n\
DURATION:PT1H30M\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:trip-1\r\n\
SUMMARY:Trip\r\n\
DTSTART;VALUE=DATE:20230105\r\n\
DURATION:P3D\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_events(ics).unwrap();
        assert_eq!(
            events[0].end,
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2023, 1, 5, 11, 30, 0).unwrap())
        );
        assert_eq!(
            events[1].end,
            EventTime::Date(NaiveDate::from_ymd_opt(2023, 1, 8).unwrap())
        );
        assert!(events[0].extra_properties.is_empty());
    }

    #[test]
    fn test_event_without_uid_is_an_error() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Anonymous\r\n\
DTSTART:20230105T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        assert!(matches!(parse_events(ics), Err(KhalOrgError::IcsParse(_))));
    }

    #[test]
    fn test_split_list_honours_escapes() {
        assert_eq!(split_list("a,b\\,c, d"), vec!["a", "b,c", "d"]);
        assert!(split_list("").is_empty());
    }
}
