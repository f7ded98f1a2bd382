//! Wall-clock times on the org side and iCalendar times on the backend side.
//!
//! Org timestamps carry no zone. The backend stores UTC, floating, or zoned
//! values. Converting between the two only attaches or removes a zone label;
//! UTC values are shifted into the configured zone before the label is
//! dropped.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// A date or a date with a time of day, without zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrgTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl OrgTime {
    pub fn has_time(&self) -> bool {
        matches!(self, OrgTime::DateTime(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            OrgTime::Date(d) => *d,
            OrgTime::DateTime(dt) => dt.date(),
        }
    }

    /// Sort key: all-day values sort at midnight.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            OrgTime::Date(d) => d.and_time(NaiveTime::MIN),
            OrgTime::DateTime(dt) => *dt,
        }
    }

    /// Give `self` the same kind (date or datetime) as `other`.
    ///
    /// A date becomes midnight, a datetime loses its time of day.
    pub fn aligned_to(&self, other: &OrgTime) -> OrgTime {
        match (self.has_time(), other.has_time()) {
            (true, false) => OrgTime::Date(self.date()),
            (false, true) => OrgTime::DateTime(self.naive()),
            _ => *self,
        }
    }

    /// Format with a strftime pattern.
    pub fn format(&self, pattern: &str) -> String {
        match self {
            OrgTime::Date(d) => d.format(pattern).to_string(),
            OrgTime::DateTime(dt) => dt.format(pattern).to_string(),
        }
    }

    /// Parse `value` with the datetime pattern, falling back to the date pattern.
    pub fn parse_with(value: &str, date_format: &str, datetime_format: &str) -> Option<OrgTime> {
        let value = value.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, datetime_format) {
            return Some(OrgTime::DateTime(dt));
        }
        NaiveDate::parse_from_str(value, date_format)
            .ok()
            .map(OrgTime::Date)
    }
}

impl From<NaiveDate> for OrgTime {
    fn from(d: NaiveDate) -> Self {
        OrgTime::Date(d)
    }
}

impl From<NaiveDateTime> for OrgTime {
    fn from(dt: NaiveDateTime) -> Self {
        OrgTime::DateTime(dt)
    }
}

/// An iCalendar DTSTART/DTEND/UNTIL value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// Attach `tz` to a wall-clock time. Dates pass through.
    pub fn with_timezone(time: &OrgTime, tz: Tz) -> Self {
        match time {
            OrgTime::Date(d) => EventTime::Date(*d),
            OrgTime::DateTime(dt) => EventTime::DateTimeZoned {
                datetime: *dt,
                tzid: tz.name().to_string(),
            },
        }
    }

    /// Remove the zone label, shifting UTC values into `tz` first.
    pub fn to_org_time(&self, tz: Tz) -> OrgTime {
        match self {
            EventTime::Date(d) => OrgTime::Date(*d),
            EventTime::DateTimeUtc(dt) => OrgTime::DateTime(dt.with_timezone(&tz).naive_local()),
            EventTime::DateTimeFloating(dt) => OrgTime::DateTime(*dt),
            EventTime::DateTimeZoned { datetime, .. } => OrgTime::DateTime(*datetime),
        }
    }

    pub fn has_time(&self) -> bool {
        !matches!(self, EventTime::Date(_))
    }

    /// Resolve to an instant. Floating values and unknown zones use `default_tz`.
    pub fn to_utc(&self, default_tz: Tz) -> Option<DateTime<Utc>> {
        let resolve = |tz: Tz, naive: &NaiveDateTime| {
            tz.from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        };
        match self {
            EventTime::Date(d) => resolve(default_tz, &d.and_time(NaiveTime::MIN)),
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::DateTimeFloating(dt) => resolve(default_tz, dt),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let tz = tzid.parse::<Tz>().unwrap_or(default_tz);
                resolve(tz, datetime)
            }
        }
    }

    /// Whether this time lies strictly after `now`.
    ///
    /// All-day values compare by date against today in `default_tz`.
    pub fn is_after(&self, now: DateTime<Utc>, default_tz: Tz) -> bool {
        match self {
            EventTime::Date(d) => *d > now.with_timezone(&default_tz).date_naive(),
            _ => self.to_utc(default_tz).is_some_and(|t| t > now),
        }
    }

    /// `self` moved by `by`. Dates move by whole days.
    pub fn shifted(&self, by: Duration) -> EventTime {
        match self {
            EventTime::Date(d) => EventTime::Date(*d + Duration::days(by.num_days())),
            EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(*dt + by),
            EventTime::DateTimeFloating(dt) => EventTime::DateTimeFloating(*dt + by),
            EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
                datetime: *datetime + by,
                tzid: tzid.clone(),
            },
        }
    }

    /// Parse a bare iCalendar value such as an RRULE's UNTIL part.
    pub fn from_ics_value(value: &str) -> Option<EventTime> {
        let value = value.trim();
        if let Some(utc) = value.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .ok()
                .map(|dt| EventTime::DateTimeUtc(dt.and_utc()));
        }
        if value.contains('T') {
            return NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
                .ok()
                .map(EventTime::DateTimeFloating);
        }
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(EventTime::Date)
    }

    /// Value part of an iCalendar property (`20250320T150000Z`, `20250320`, ...).
    pub fn to_ics_string(&self) -> String {
        match self {
            EventTime::Date(d) => d.format("%Y%m%d").to_string(),
            EventTime::DateTimeUtc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            EventTime::DateTimeFloating(dt) => dt.format("%Y%m%dT%H%M%S").to_string(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.format("%Y%m%dT%H%M%S").to_string(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} {}", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}
