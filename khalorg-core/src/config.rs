//! Backend settings threaded through the core.
//!
//! The core never reads configuration files. Callers build a
//! [`BackendConfig`] from wherever khal's locale settings live and pass it to
//! each component that formats or interprets backend timestamps.

use chrono_tz::Tz;

/// khal's default `longdateformat`.
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

/// khal's default `longdatetimeformat`.
pub const DEFAULT_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Format of all-day timestamps as khal reads and prints them.
    pub date_format: String,
    /// Format of timed timestamps as khal reads and prints them.
    pub datetime_format: String,
    /// Zone attached to wall-clock times sent to the backend.
    pub timezone: Tz,
}

impl BackendConfig {
    pub fn new(date_format: &str, datetime_format: &str, timezone: Tz) -> Self {
        BackendConfig {
            date_format: date_format.to_string(),
            datetime_format: datetime_format.to_string(),
            timezone,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::new(DEFAULT_DATE_FORMAT, DEFAULT_DATETIME_FORMAT, Tz::UTC)
    }
}
