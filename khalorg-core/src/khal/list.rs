//! Reading `khal list` output.
//!
//! khal prints one record per occurrence. Fields are separated by U+001F and
//! records terminated by U+001E, so descriptions may span lines.

use tracing::debug;

use crate::agenda::AgendaItem;
use crate::config::BackendConfig;
use crate::error::{KhalOrgError, KhalOrgResult};
use crate::recurrence::rule_until;
use crate::time::OrgTime;
use crate::timestamp::Timestamp;

const FIELD_SEPARATOR: char = '\u{1f}';
const RECORD_SEPARATOR: char = '\u{1e}';

/// The `--format` passed to `khal list`.
pub const LIST_FORMAT: &str = "{uid}\u{1f}{title}\u{1f}{start-long}\u{1f}{end-long}\u{1f}\
{all-day}\u{1f}{repeat-pattern}\u{1f}{location}\u{1f}{url}\u{1f}{calendar}\u{1f}\
{categories}\u{1f}{organizer}\u{1f}{attendees}\u{1f}{status}\u{1f}{description}\u{1e}";

const FIELD_COUNT: usize = 14;

/// Properties copied verbatim, in field order after `all-day`.
const PROPERTY_FIELDS: [&str; 8] = [
    "RRULE",
    "LOCATION",
    "URL",
    "CALENDAR",
    "CATEGORIES",
    "ORGANIZER",
    "ATTENDEES",
    "STATUS",
];

/// One agenda item per record, in listing order.
pub fn parse_list_output(output: &str, config: &BackendConfig) -> KhalOrgResult<Vec<AgendaItem>> {
    let items = output
        .split(RECORD_SEPARATOR)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(|record| parse_record(record, config))
        .collect::<KhalOrgResult<Vec<_>>>()?;

    debug!(count = items.len(), "Parsed khal list output");
    Ok(items)
}

fn parse_record(record: &str, config: &BackendConfig) -> KhalOrgResult<AgendaItem> {
    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    let [uid, title, start, end, all_day, rest @ ..] = fields.as_slice() else {
        return Err(KhalOrgError::KhalOutput(record.to_string()));
    };
    if fields.len() != FIELD_COUNT {
        return Err(KhalOrgError::KhalOutput(format!(
            "expected {} fields, got {}: {}",
            FIELD_COUNT,
            fields.len(),
            record
        )));
    }

    let all_day = all_day.trim() == "True";
    let start = parse_time(start, all_day, config)?;
    let end = parse_time(end, all_day, config)?;

    let mut item = AgendaItem::new(title.trim()).with_property("UID", uid.trim());
    item.push_timestamp(Timestamp::new(start, (end != start).then_some(end)));

    let (properties, description) = rest.split_at(PROPERTY_FIELDS.len());
    for (key, value) in PROPERTY_FIELDS.iter().zip(properties) {
        item.set_property(key, value.trim());
    }

    let until = rule_until(item.property_or_empty("RRULE")).map(|until| {
        let until = until.to_org_time(config.timezone).aligned_to(&start);
        let mut timestamp = Timestamp::new(until, None);
        timestamp.active = false;
        timestamp.to_string()
    });
    item.set_property("UNTIL", until.unwrap_or_default());
    item.description = description.concat().trim().to_string();

    Ok(item)
}

fn parse_time(value: &str, all_day: bool, config: &BackendConfig) -> KhalOrgResult<OrgTime> {
    let time = OrgTime::parse_with(value, &config.date_format, &config.datetime_format)
        .ok_or_else(|| KhalOrgError::TimestampParse(value.to_string()))?;
    Ok(if all_day { OrgTime::Date(time.date()) } else { time })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agenda::AgendaFile;
    use crate::recurrence::{RepeatUnit, Repeater};
    use chrono::NaiveDate;
    use chrono_tz::Tz;

    fn config() -> BackendConfig {
        BackendConfig::new("%Y-%m-%d", "%Y-%m-%d %H:%M", Tz::Europe__Amsterdam)
    }

    fn record(fields: [&str; FIELD_COUNT]) -> String {
        format!("{}{}\n", fields.join("\u{1f}"), RECORD_SEPARATOR)
    }

    fn standup(day: &str) -> String {
        record([
            "standup-1",
            "Standup",
            &format!("{} 09:00", day),
            &format!("{} 09:15", day),
            "False",
            "FREQ=WEEKLY;UNTIL=20230904T113000Z;INTERVAL=1;BYDAY=MO",
            "Room 1",
            "",
            "work",
            "team, daily",
            "boss@example.com",
            "alice@example.com, bob@example.com",
            "CONFIRMED",
            "Agenda:\nupdates",
        ])
    }

    #[test]
    fn test_list_format_has_one_separator_per_field() {
        assert_eq!(LIST_FORMAT.matches(FIELD_SEPARATOR).count(), FIELD_COUNT - 1);
        assert!(LIST_FORMAT.ends_with(RECORD_SEPARATOR));
    }

    #[test]
    fn test_record_becomes_agenda_item() {
        let items = parse_list_output(&standup("2023-07-03"), &config()).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.title, "Standup");
        assert_eq!(item.uid(), "standup-1");
        assert_eq!(item.property("LOCATION"), Some("Room 1"));
        assert_eq!(item.property("URL"), Some(""));
        assert_eq!(item.split_property("CATEGORIES"), vec!["team", "daily"]);
        assert_eq!(item.property("STATUS"), Some("CONFIRMED"));
        assert_eq!(item.description, "Agenda:\nupdates");
        assert_eq!(
            item.timestamps()[0].to_string(),
            "<2023-07-03 Mon 09:00>--<2023-07-03 Mon 09:15>"
        );
        // 11:30 UTC is 13:30 in Amsterdam.
        assert_eq!(item.property("UNTIL"), Some("[2023-09-04 Mon 13:30]"));
    }

    #[test]
    fn test_all_day_record_uses_dates() {
        let output = record([
            "trip", "Trip", "2023-07-03", "2023-07-05", "True", "", "", "", "work", "", "", "",
            "", "",
        ]);
        let items = parse_list_output(&output, &config()).unwrap();

        let timestamp = &items[0].timestamps()[0];
        assert_eq!(timestamp.start, OrgTime::Date(NaiveDate::from_ymd_opt(2023, 7, 3).unwrap()));
        assert_eq!(timestamp.end, Some(OrgTime::Date(NaiveDate::from_ymd_opt(2023, 7, 5).unwrap())));
        assert_eq!(items[0].property("UNTIL"), Some(""));
    }

    #[test]
    fn test_single_day_record_has_no_end() {
        let output = record([
            "x", "Holiday", "2023-07-03", "2023-07-03", "True", "", "", "", "work", "", "", "",
            "", "",
        ]);
        let items = parse_list_output(&output, &config()).unwrap();
        assert_eq!(items[0].timestamps()[0].end, None);
    }

    #[test]
    fn test_occurrences_reconcile_into_one_item() {
        let output = ["2023-07-03", "2023-07-10", "2023-07-17"]
            .iter()
            .map(|day| standup(day))
            .collect::<String>();
        let mut file = AgendaFile::new(parse_list_output(&output, &config()).unwrap());

        file.apply_rrules().unwrap();

        assert_eq!(file.items.len(), 1);
        assert_eq!(file.items[0].timestamps().len(), 1);
        assert_eq!(
            file.items[0].timestamps()[0].repeater,
            Some(Repeater::new(1, RepeatUnit::Week))
        );
    }

    #[test]
    fn test_empty_output_has_no_items() {
        assert!(parse_list_output("\n\n", &config()).unwrap().is_empty());
    }

    #[test]
    fn test_short_record_is_an_error() {
        let output = format!("uid\u{1f}title{}", RECORD_SEPARATOR);
        assert!(matches!(
            parse_list_output(&output, &config()),
            Err(KhalOrgError::KhalOutput(_))
        ));
    }

    #[test]
    fn test_unparseable_start_is_an_error() {
        let output = record([
            "x", "Bad", "tomorrow", "2023-07-03", "True", "", "", "", "", "", "", "", "", "",
        ]);
        assert!(matches!(
            parse_list_output(&output, &config()),
            Err(KhalOrgError::TimestampParse(_))
        ));
    }
}
