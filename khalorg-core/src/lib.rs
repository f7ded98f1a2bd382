//! Core of khalorg: moving agenda items between org-mode and khal.
//!
//! - `timestamp`, `org`: reading org agenda items and their timestamps
//! - `recurrence`: translating org repeaters to and from RRULEs
//! - `agenda`: reconciling per-occurrence listings into one item per UID
//! - `format`: rendering items with a user template
//! - `args`, `khal`: the `khal new` / `khal list` subprocesses
//! - `vdir`, `ics`, `checker`: editing and deleting events in a vdir

pub mod agenda;
pub mod args;
pub mod checker;
pub mod config;
pub mod error;
pub mod format;
pub mod ics;
pub mod khal;
pub mod org;
pub mod recurrence;
pub mod time;
pub mod timestamp;
pub mod vdir;

pub use error::{KhalOrgError, KhalOrgResult};
