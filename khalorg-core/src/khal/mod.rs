//! The khal command line program as a backend.
//!
//! `khal new` creates events and `khal list` lists them. Both run as
//! subprocesses; their stdout is returned, and a failing exit status becomes
//! [`KhalOrgError::Khal`] carrying the arguments and khal's output.

mod list;

pub use list::{LIST_FORMAT, parse_list_output};

use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

use crate::args::NewArgs;
use crate::error::{KhalOrgError, KhalOrgResult};

#[derive(Debug, Clone)]
pub struct Khal {
    binary: String,
}

impl Default for Khal {
    fn default() -> Self {
        Khal::new("khal")
    }
}

impl Khal {
    pub fn new(binary: &str) -> Self {
        Khal {
            binary: binary.to_string(),
        }
    }

    fn binary_path(&self) -> KhalOrgResult<PathBuf> {
        which::which(&self.binary).map_err(|_| {
            KhalOrgError::KhalNotInstalled(format!(
                "'{}' not found. Install khal or set `khal` in the khalorg config.",
                self.binary
            ))
        })
    }

    /// Run khal with `args` and return its stdout.
    pub async fn run(&self, args: &[String]) -> KhalOrgResult<String> {
        let binary_path = self.binary_path()?;
        debug!(binary = %binary_path.display(), ?args, "Running khal");

        let output = Command::new(&binary_path)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KhalOrgError::Khal {
                args: std::iter::once(self.binary.as_str())
                    .chain(args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" "),
                output: format!("{}{}", stdout, stderr),
            });
        }

        Ok(stdout)
    }

    /// `khal new -a CALENDAR ...`
    pub async fn new_event(&self, calendar: &str, args: &NewArgs) -> KhalOrgResult<String> {
        let mut command = vec!["new".to_string(), "-a".to_string(), calendar.to_string()];
        command.extend(args.as_list());
        self.run(&command).await
    }

    /// `khal list` in the format [`parse_list_output`] reads.
    pub async fn list(&self, calendar: &str, start: &str, stop: &str) -> KhalOrgResult<String> {
        self.run(&list_args(calendar, start, stop)).await
    }
}

fn list_args(calendar: &str, start: &str, stop: &str) -> Vec<String> {
    [
        "list",
        "-a",
        calendar,
        "-df",
        "",
        "--format",
        LIST_FORMAT,
        start,
        stop,
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
