//! Translation between iCalendar RRULEs and org repeaters.
//!
//! Only a small part of RRULE maps onto org's `+{n}{unit}` notation: a
//! frequency from hourly up to yearly with an interval, optionally restricted
//! to a single weekday. Anything richer is "unsupported": it is kept verbatim
//! by the caller but never converted.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use rrule::{Frequency, NWeekday, RRule, Unvalidated};

use crate::time::EventTime;

/// RRULEs with this many distinct weekdays or more have no repeater form.
const MAX_WEEKDAYS: usize = 2;

/// Unit of an org repeater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatUnit {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl RepeatUnit {
    pub fn as_char(&self) -> char {
        match self {
            RepeatUnit::Hour => 'h',
            RepeatUnit::Day => 'd',
            RepeatUnit::Week => 'w',
            RepeatUnit::Month => 'm',
            RepeatUnit::Year => 'y',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'h' => Some(RepeatUnit::Hour),
            'd' => Some(RepeatUnit::Day),
            'w' => Some(RepeatUnit::Week),
            'm' => Some(RepeatUnit::Month),
            'y' => Some(RepeatUnit::Year),
            _ => None,
        }
    }

    fn from_frequency(freq: Frequency) -> Option<Self> {
        match freq {
            Frequency::Yearly => Some(RepeatUnit::Year),
            Frequency::Monthly => Some(RepeatUnit::Month),
            Frequency::Weekly => Some(RepeatUnit::Week),
            Frequency::Daily => Some(RepeatUnit::Day),
            Frequency::Hourly => Some(RepeatUnit::Hour),
            Frequency::Minutely | Frequency::Secondly => None,
        }
    }

    fn frequency(&self) -> &'static str {
        match self {
            RepeatUnit::Hour => "HOURLY",
            RepeatUnit::Day => "DAILY",
            RepeatUnit::Week => "WEEKLY",
            RepeatUnit::Month => "MONTHLY",
            RepeatUnit::Year => "YEARLY",
        }
    }
}

/// An org repeater such as `+1w`. The sign is always `+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repeater {
    pub interval: u32,
    pub unit: RepeatUnit,
}

impl Repeater {
    pub fn new(interval: u32, unit: RepeatUnit) -> Self {
        Repeater { interval, unit }
    }

    /// The `khal new --repeat` keyword. khal has no interval option, so only
    /// single-step repeaters (other than hourly) have one.
    pub fn khal_keyword(&self) -> Option<&'static str> {
        match (self.interval, self.unit) {
            (1, RepeatUnit::Day) => Some("daily"),
            (1, RepeatUnit::Week) => Some("weekly"),
            (1, RepeatUnit::Month) => Some("monthly"),
            (1, RepeatUnit::Year) => Some("yearly"),
            _ => None,
        }
    }
}

impl fmt::Display for Repeater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}{}", self.interval, self.unit.as_char())
    }
}

impl FromStr for Repeater {
    type Err = String;

    /// Accepts `+1w`, `++1w` and `.+1w`; all normalise to `+1w`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(".+")
            .or_else(|| s.strip_prefix("++"))
            .or_else(|| s.strip_prefix('+'))
            .ok_or_else(|| format!("Repeater '{}' must start with '+'", s))?;

        let unit = rest
            .chars()
            .last()
            .and_then(RepeatUnit::from_char)
            .ok_or_else(|| format!("Unknown repeater unit in '{}'", s))?;

        let interval: u32 = rest[..rest.len() - 1]
            .parse()
            .map_err(|_| format!("Invalid repeater interval in '{}'", s))?;

        if interval == 0 {
            return Err(format!("Repeater interval must be positive in '{}'", s));
        }

        Ok(Repeater { interval, unit })
    }
}

/// An RRULE value in the backend's grammar, e.g. `FREQ=WEEKLY;INTERVAL=1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendRule(String);

impl BackendRule {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BackendRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BackendRule {
    fn from(s: String) -> Self {
        BackendRule(s)
    }
}

/// Parse a single RRULE. A text holding several rules (a rule set) is rejected.
fn parse_rule(rule_text: &str) -> Option<RRule<Unvalidated>> {
    let rule_text = rule_text.trim();
    if rule_text.contains('\n') {
        return None;
    }
    rule_text.parse::<RRule<Unvalidated>>().ok()
}

/// Whether a parsed rule can be expressed as a repeater.
///
/// COUNT and BYMONTH have no repeater form and would be lost when the rule is
/// rebuilt, so they count as unsupported.
fn rrule_is_supported(rule: &RRule<Unvalidated>) -> bool {
    let has_unsupported_part = rule.get_count().is_some()
        || !rule.get_by_month().is_empty()
        || !rule.get_by_month_day().is_empty()
        || !rule.get_by_year_day().is_empty()
        || !rule.get_by_week_no().is_empty()
        || !rule.get_by_set_pos().is_empty()
        || rule
            .get_by_weekday()
            .iter()
            .any(|day| matches!(day, NWeekday::Nth(..)));

    let weekdays: HashSet<_> = rule
        .get_by_weekday()
        .iter()
        .filter_map(|day| match day {
            NWeekday::Every(weekday) => Some(*weekday),
            NWeekday::Nth(..) => None,
        })
        .collect();

    !has_unsupported_part && weekdays.len() < MAX_WEEKDAYS
}

/// Whether `rule_text` can round-trip through a [`Repeater`].
///
/// An empty rule is supported (the item does not recur). Text that does not
/// parse is unsupported.
pub fn rule_is_supported(rule_text: &str) -> bool {
    if rule_text.trim().is_empty() {
        return true;
    }
    parse_rule(rule_text).is_some_and(|rule| rrule_is_supported(&rule))
}

/// The repeater for `rule_text`, or None when it is empty, malformed, or
/// unsupported.
pub fn backend_rule_to_descriptor(rule_text: &str) -> Option<Repeater> {
    let rule = parse_rule(rule_text)?;
    if !rrule_is_supported(&rule) {
        return None;
    }
    let unit = RepeatUnit::from_frequency(rule.get_freq())?;
    Some(Repeater::new(u32::from(rule.get_interval()), unit))
}

/// Expand a repeater into an RRULE anchored at `start`, bounded by `until`.
///
/// The UNTIL value takes the shape RFC 5545 requires for the anchor: a date
/// for all-day events, a floating time for floating events, and UTC
/// otherwise.
pub fn descriptor_to_backend_rule(
    repeater: &Repeater,
    start: &EventTime,
    until: Option<&EventTime>,
) -> BackendRule {
    let mut rule = format!(
        "FREQ={};INTERVAL={}",
        repeater.unit.frequency(),
        repeater.interval
    );

    if let Some(until) = until {
        rule.push_str(";UNTIL=");
        rule.push_str(&until_for(start, until).to_ics_string());
    }

    BackendRule(rule)
}

fn until_for(start: &EventTime, until: &EventTime) -> EventTime {
    let start_tz = match start {
        EventTime::DateTimeZoned { tzid, .. } => tzid.parse::<Tz>().unwrap_or(Tz::UTC),
        _ => Tz::UTC,
    };

    match start {
        EventTime::Date(_) => EventTime::Date(until.to_org_time(start_tz).date()),
        EventTime::DateTimeFloating(_) => {
            EventTime::DateTimeFloating(until.to_org_time(start_tz).naive())
        }
        EventTime::DateTimeUtc(_) | EventTime::DateTimeZoned { .. } => match until.to_utc(start_tz) {
            Some(utc) => EventTime::DateTimeUtc(utc),
            None => EventTime::DateTimeFloating(until.to_org_time(start_tz).naive()),
        },
    }
}

/// The UNTIL part of `rule_text`, if any.
pub fn rule_until(rule_text: &str) -> Option<EventTime> {
    rule_text
        .trim()
        .trim_start_matches("RRULE:")
        .split(';')
        .find_map(|part| part.strip_prefix("UNTIL="))
        .and_then(EventTime::from_ics_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn parsed(rule: &str) -> RRule<Unvalidated> {
        parse_rule(rule).expect("rule should parse")
    }

    #[test]
    fn test_single_weekday_is_supported() {
        assert!(rule_is_supported(
            "FREQ=WEEKLY;UNTIL=20230904T113000Z;INTERVAL=1;BYDAY=MO;WKST=MO"
        ));
    }

    #[test]
    fn test_empty_rule_is_supported() {
        assert!(rule_is_supported(""));
        assert!(rule_is_supported("   "));
    }

    #[test]
    fn test_unsupported_rules() {
        let rules = [
            "FREQ=WEEKLY;UNTIL=20230904T113000Z;INTERVAL=1;BYDAY=MO,TH;WKST=MO",
            "FREQ=WEEKLY;UNTIL=20230904T113000Z;INTERVAL=1;BYWEEKNO=1;WKST=MO",
            "FREQ=MONTHLY;BYMONTHDAY=15",
            "FREQ=YEARLY;BYYEARDAY=100",
            "FREQ=MONTHLY;BYDAY=MO;BYSETPOS=1",
            "FREQ=MONTHLY;BYDAY=2TU",
            "FREQ=WEEKLY;INTERVAL=1;COUNT=3",
            "FREQ=YEARLY;BYMONTH=3",
        ];
        for rule in rules {
            assert!(!rule_is_supported(rule), "{} should be unsupported", rule);
        }
    }

    #[test]
    fn test_malformed_rules_are_unsupported_not_errors() {
        for rule in ["not a rule", "FREQ=SOMETIMES", "FREQ=DAILY\nFREQ=WEEKLY", ";;;"] {
            assert!(!rule_is_supported(rule), "{:?} should be unsupported", rule);
            assert_eq!(backend_rule_to_descriptor(rule), None);
        }
    }

    #[test]
    fn test_weekly_rule_to_repeater() {
        let repeater =
            backend_rule_to_descriptor("FREQ=WEEKLY;UNTIL=20230904T113000Z;INTERVAL=1;BYDAY=MO;WKST=MO");
        assert_eq!(repeater, Some(Repeater::new(1, RepeatUnit::Week)));
    }

    #[test]
    fn test_daily_rule_maps_to_day_unit() {
        assert_eq!(
            backend_rule_to_descriptor("FREQ=DAILY;INTERVAL=2"),
            Some(Repeater::new(2, RepeatUnit::Day))
        );
        assert_eq!(
            backend_rule_to_descriptor("FREQ=HOURLY;INTERVAL=3"),
            Some(Repeater::new(3, RepeatUnit::Hour))
        );
        assert_eq!(backend_rule_to_descriptor("FREQ=MINUTELY"), None);
    }

    #[test]
    fn test_multi_weekday_rule_has_no_repeater() {
        assert_eq!(
            backend_rule_to_descriptor("FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,TH"),
            None
        );
    }

    #[test]
    fn test_repeater_to_rule() {
        let start = EventTime::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());

        let weekly = descriptor_to_backend_rule(&Repeater::new(2, RepeatUnit::Week), &start, None);
        assert_eq!(weekly.as_str(), "FREQ=WEEKLY;INTERVAL=2");

        let monthly = descriptor_to_backend_rule(&Repeater::new(3, RepeatUnit::Month), &start, None);
        assert_eq!(monthly.as_str(), "FREQ=MONTHLY;INTERVAL=3");
    }

    #[test]
    fn test_weekly_scenario_reexpands_to_equivalent_rule() {
        let repeater =
            backend_rule_to_descriptor("FREQ=WEEKLY;INTERVAL=1;BYDAY=MO;WKST=MO").unwrap();
        assert_eq!(repeater.to_string(), "+1w");

        let start = EventTime::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        let rule = descriptor_to_backend_rule(&repeater, &start, None);

        let expected = parsed("FREQ=WEEKLY;INTERVAL=1");
        let actual = parsed(rule.as_str());
        assert_eq!(actual.get_freq(), expected.get_freq());
        assert_eq!(actual.get_interval(), expected.get_interval());
        assert_eq!(actual.get_until(), None);
    }

    #[test]
    fn test_supported_rules_round_trip() {
        let start = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2023, 1, 2, 11, 30, 0).unwrap());
        let rules = [
            "FREQ=WEEKLY;UNTIL=20230904T113000Z;INTERVAL=1;BYDAY=MO;WKST=MO",
            "FREQ=DAILY;INTERVAL=2",
            "FREQ=MONTHLY;INTERVAL=3;UNTIL=20240101T000000Z",
            "FREQ=YEARLY",
            "FREQ=HOURLY;INTERVAL=6",
        ];

        for original in rules {
            let repeater = backend_rule_to_descriptor(original).expect("supported");
            let until = rule_until(original);
            let rule = descriptor_to_backend_rule(&repeater, &start, until.as_ref());

            let a = parsed(original);
            let b = parsed(rule.as_str());
            assert_eq!(a.get_freq(), b.get_freq(), "{}", original);
            assert_eq!(a.get_interval(), b.get_interval(), "{}", original);
            assert_eq!(
                a.get_until().map(|u| u.naive_utc()),
                b.get_until().map(|u| u.naive_utc()),
                "{}",
                original
            );
        }
    }

    #[test]
    fn test_until_follows_anchor_kind() {
        let repeater = Repeater::new(1, RepeatUnit::Day);
        let until = EventTime::Date(NaiveDate::from_ymd_opt(2023, 1, 10).unwrap());

        let all_day = EventTime::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(
            descriptor_to_backend_rule(&repeater, &all_day, Some(&until)).as_str(),
            "FREQ=DAILY;INTERVAL=1;UNTIL=20230110"
        );

        let zoned = EventTime::DateTimeZoned {
            datetime: NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            tzid: "Europe/Amsterdam".to_string(),
        };
        let until = EventTime::DateTimeZoned {
            datetime: NaiveDate::from_ymd_opt(2023, 1, 10)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            tzid: "Europe/Amsterdam".to_string(),
        };
        assert_eq!(
            descriptor_to_backend_rule(&repeater, &zoned, Some(&until)).as_str(),
            "FREQ=DAILY;INTERVAL=1;UNTIL=20230109T230000Z"
        );
    }

    #[test]
    fn test_repeater_parsing() {
        assert_eq!("+1w".parse::<Repeater>(), Ok(Repeater::new(1, RepeatUnit::Week)));
        assert_eq!("++2d".parse::<Repeater>(), Ok(Repeater::new(2, RepeatUnit::Day)));
        assert_eq!(".+3m".parse::<Repeater>(), Ok(Repeater::new(3, RepeatUnit::Month)));
        assert!("+0w".parse::<Repeater>().is_err());
        assert!("+1x".parse::<Repeater>().is_err());
        assert!("-1w".parse::<Repeater>().is_err());
    }

    #[test]
    fn test_khal_keywords() {
        assert_eq!(Repeater::new(1, RepeatUnit::Day).khal_keyword(), Some("daily"));
        assert_eq!(Repeater::new(1, RepeatUnit::Year).khal_keyword(), Some("yearly"));
        assert_eq!(Repeater::new(2, RepeatUnit::Week).khal_keyword(), None);
        assert_eq!(Repeater::new(1, RepeatUnit::Hour).khal_keyword(), None);
    }
}
