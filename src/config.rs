use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use khalorg_core::config::{BackendConfig, DEFAULT_DATE_FORMAT, DEFAULT_DATETIME_FORMAT};
use khalorg_core::khal::Khal;
use khalorg_core::vdir::Calendar;

/// Template used by `khalorg list` when neither `--format` nor a template
/// file is given.
pub const DEFAULT_TEMPLATE: &str = "\
* {title}
  :PROPERTIES:
  :ATTENDEES: {attendees}
  :CALENDAR: {calendar}
  :CATEGORIES: {categories}
  :LOCATION: {location}
  :ORGANIZER: {organizer}
  :RRULE: {rrule}
  :STATUS: {status}
  :UID: {uid}
  :UNTIL: {until}
  :URL: {url}
  :END:
  {timestamps}
  {description}
";

#[derive(Debug, Deserialize)]
pub struct Config {
    /// khal binary, looked up in PATH
    #[serde(default = "default_khal")]
    pub khal: String,

    /// khal's `longdateformat`
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// khal's `longdatetimeformat`
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,

    /// khal's `default_timezone`; the system zone when unset
    #[serde(default)]
    pub timezone: Option<String>,

    /// Upper bound for a whole command, e.g. "30s"
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Template file for `khalorg list`
    #[serde(default)]
    pub format: Option<String>,

    /// vdir locations by khal calendar name
    #[serde(default)]
    pub calendars: HashMap<String, CalendarConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    pub path: String,
}

fn default_khal() -> String {
    "khal".to_string()
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_datetime_format() -> String {
    DEFAULT_DATETIME_FORMAT.to_string()
}

fn default_timeout() -> String {
    "30s".to_string()
}

/// Get the config directory path (~/.config/khalorg)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("khalorg");
    Ok(config_dir)
}

/// Load config from ~/.config/khalorg/config.toml and `KHALORG_*` variables.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_dir()?.join("config.toml"))
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    config::Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(Environment::with_prefix("KHALORG"))
        .build()
        .and_then(|config| config.try_deserialize())
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        match &self.timezone {
            Some(name) => name
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", name, e)),
            None => Ok(system_timezone()),
        }
    }

    pub fn backend_config(&self) -> Result<BackendConfig> {
        Ok(BackendConfig::new(
            &self.date_format,
            &self.datetime_format,
            self.timezone()?,
        ))
    }

    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.timeout)
            .with_context(|| format!("Invalid timeout '{}'", self.timeout))
    }

    pub fn khal(&self) -> Khal {
        Khal::new(&self.khal)
    }

    /// The vdir of the khal calendar `name`.
    pub fn calendar(&self, name: &str) -> Result<Calendar> {
        let Some(calendar) = self.calendars.get(name) else {
            let mut available: Vec<_> = self.calendars.keys().cloned().collect();
            available.sort();
            anyhow::bail!(
                "Calendar '{}' not found in config.\n\
                Add its vdir to config.toml:\n\n\
                [calendars.{}]\n\
                path = \"~/.local/share/calendars/{}\"\n\n\
                Available calendars: {}",
                name,
                name,
                name,
                available.join(", ")
            );
        };

        Ok(Calendar::new(
            name,
            expand(&calendar.path),
            self.backend_config()?,
        ))
    }

    /// The template file's content, or [`DEFAULT_TEMPLATE`] when the file
    /// does not exist.
    pub fn template(&self) -> Result<String> {
        let path = match &self.format {
            Some(path) => expand(path),
            None => config_dir()?.join("khalorg_format.txt"),
        };

        if !path.exists() {
            return Ok(DEFAULT_TEMPLATE.to_string());
        }
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template at {}", path.display()))
    }
}

fn system_timezone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse().ok())
        .unwrap_or(Tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.khal, "khal");
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.datetime_format, DEFAULT_DATETIME_FORMAT);
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(30));
        assert!(config.calendars.is_empty());
    }

    #[test]
    fn test_file_values_are_read() {
        let (_dir, path) = write_config(
            r#"
khal = "/usr/bin/khal"
date_format = "%Y-%m-%d"
datetime_format = "%Y-%m-%d %H:%M"
timezone = "Europe/Amsterdam"
timeout = "1m 30s"

[calendars.personal]
path = "/tmp/calendars/personal"
"#,
        );
        let config = load_config_from(&path).unwrap();

        assert_eq!(config.khal, "/usr/bin/khal");
        assert_eq!(config.timezone().unwrap(), Tz::Europe__Amsterdam);
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(90));

        let calendar = config.calendar("personal").unwrap();
        assert_eq!(calendar.path(), Path::new("/tmp/calendars/personal"));
        assert_eq!(calendar.config().date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_unknown_calendar_lists_available() {
        let (_dir, path) = write_config("[calendars.work]\npath = \"/tmp/work\"\n");
        let config = load_config_from(&path).unwrap();

        let err = config.calendar("personal").unwrap_err().to_string();
        assert!(err.contains("Calendar 'personal' not found"));
        assert!(err.contains("Available calendars: work"));
    }

    #[test]
    fn test_invalid_timezone_is_an_error() {
        let (_dir, path) = write_config("timezone = \"Mars/Olympus\"\n");
        let config = load_config_from(&path).unwrap();
        assert!(config.backend_config().is_err());
    }

    #[test]
    fn test_template_falls_back_to_default() {
        let (dir, path) = write_config("");
        let mut config = load_config_from(&path).unwrap();

        config.format = Some(dir.path().join("missing.txt").display().to_string());
        assert_eq!(config.template().unwrap(), DEFAULT_TEMPLATE);

        let template_path = dir.path().join("format.txt");
        std::fs::write(&template_path, "* {title}\n").unwrap();
        config.format = Some(template_path.display().to_string());
        assert_eq!(config.template().unwrap(), "* {title}\n");
    }
}
