//! Agenda items and the reconciliation of backend listings into them.

mod file;
mod item;
mod reconcile;

pub use file::AgendaFile;
pub use item::AgendaItem;
pub use reconcile::{AgendaReconciler, TimestampInstance};
