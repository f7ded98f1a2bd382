use anyhow::Result;

use khalorg_core::args::EditArgs;
use khalorg_core::checker::{EventCheck, EventChecker};

use crate::commands::parse_item;
use crate::config::Config;

/// Delete the series with the UID of the agenda item in `input`.
pub fn run(cfg: &Config, calendar_name: &str, input: &str) -> Result<String> {
    let item = parse_item(input)?;
    let calendar = cfg.calendar(calendar_name)?;

    EventChecker::new(&[EventCheck::Uid]).check(&calendar, &item)?;

    let props = EditArgs::load_from_item(&item, calendar.config())?;
    calendar.delete(&props)?;

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
DTSTART:20230105T100000Z\r\n\
DTEND:20230105T110000Z\r\n\
UID:review-1\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_delete_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("review.ics");
        std::fs::write(&path, EVENT).unwrap();

        let item = "* Review\n  :PROPERTIES:\n  :UID: review-1\n  :END:\n  <2023-01-05 Thu 10:00-11:00>\n";
        run(&cfg, "personal", item).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_delete_requires_uid() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("review.ics");
        std::fs::write(&path, EVENT).unwrap();

        let err = run(&cfg, "personal", "* Review\n  <2023-01-05 Thu 10:00-11:00>\n").unwrap_err();

        assert_eq!(err.to_string(), "Agenda item its UID property is empty.");
        assert!(path.exists());
    }

    #[test]
    fn test_unknown_uid_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let (cfg, vdir) = config(&dir, &dir.path().join("no-khal-here"));
        let path = vdir.join("review.ics");
        std::fs::write(&path, EVENT).unwrap();

        let item = "* Review\n  :PROPERTIES:\n  :UID: other\n  :END:\n  <2023-01-05 Thu 10:00>\n";
        run(&cfg, "personal", item).unwrap();

        assert!(path.exists());
    }
}
