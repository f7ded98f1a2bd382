use anyhow::Result;

use khalorg_core::args::EditArgs;
use khalorg_core::checker::{EventCheck, EventChecker};

use crate::commands::parse_item;
use crate::config::Config;

/// Write the agenda item in `input` over its event in the calendar's vdir.
///
/// Dates and the recurrence are only touched with `edit_dates`.
pub fn run(cfg: &Config, calendar_name: &str, edit_dates: bool, input: &str) -> Result<String> {
    let item = parse_item(input)?;
    let calendar = cfg.calendar(calendar_name)?;

    EventChecker::new(&[EventCheck::Rrule]).check(&calendar, &item)?;

    let props = EditArgs::load_from_item(&item, calendar.config())?;
    calendar.edit(&props, edit_dates)?;

    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::config;
    use tempfile::TempDir;

    const EVENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Review\r\n\
DTSTART;TZID=UTC:29990105T100000\r\n\
DTEND;TZID=UTC:29990105T110000\r\n\
UID:review-1\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    const ITEM: &str = "* Code review
  :PROPERTIES:
  :UID: review-1
  :LOCATION: Room 2
  :END:
  <2999-01-05 Sat 14:00-15:00>
";

    #[test]
    fn test_edit_updates_properties_but_not_dates() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("review.ics");
        std::fs::write(&path, EVENT).unwrap();

        run(&cfg, "personal", false, ITEM).unwrap();

        let ics = std::fs::read_to_string(&path).unwrap();
        assert!(ics.contains("SUMMARY:Code review"), "ICS:\n{}", ics);
        assert!(ics.contains("LOCATION:Room 2"), "ICS:\n{}", ics);
        assert!(ics.contains("T100000"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_edit_dates_moves_the_event() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("review.ics");
        std::fs::write(&path, EVENT).unwrap();

        run(&cfg, "personal", true, ITEM).unwrap();

        let ics = std::fs::read_to_string(&path).unwrap();
        assert!(ics.contains("DTSTART;TZID=UTC:29990105T140000"), "ICS:\n{}", ics);
        assert!(ics.contains("DTEND;TZID=UTC:29990105T150000"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_edit_dates_keeps_rule_without_repeater_equivalent() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("gym.ics");
        std::fs::write(
            &path,
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nSUMMARY:Gym\r\n\
             DTSTART;TZID=UTC:20230102T180000\r\nDTEND;TZID=UTC:20230102T190000\r\n\
             RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,TH\r\nUID:gym-1\r\n\
             END:VEVENT\r\nEND:VCALENDAR\r\n",
        )
        .unwrap();
        let listed = "* Gym
  :PROPERTIES:
  :UID: gym-1
  :RRULE: FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,TH
  :END:
  <2023-01-02 Mon 18:30-19:30>
";

        run(&cfg, "personal", true, listed).unwrap();

        let ics = std::fs::read_to_string(&path).unwrap();
        assert!(ics.contains("RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,TH"), "ICS:\n{}", ics);
        assert!(ics.contains("DTSTART;TZID=UTC:20230102T183000"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_item_without_timestamp_is_refused() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("review.ics");
        std::fs::write(&path, EVENT).unwrap();

        let item = "* Code review\n  :PROPERTIES:\n  :UID: review-1\n  :END:\n";
        assert!(run(&cfg, "personal", false, item).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EVENT);
    }
}
