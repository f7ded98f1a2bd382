use anyhow::Result;
use tracing::{debug, info};

use khalorg_core::agenda::AgendaItem;
use khalorg_core::args::{EditArgs, NewArgs};
use khalorg_core::checker::{EventCheck, EventChecker};

use crate::commands::parse_item;
use crate::config::Config;

/// Create the agenda item in `input` with `khal new`.
///
/// khal new cannot set attendees or categories, and only knows plain
/// daily/weekly/monthly/yearly repeats. When the item needs any of those the
/// created event is edited in its vdir afterwards.
pub async fn run(cfg: &Config, calendar_name: &str, input: &str) -> Result<String> {
    let item = parse_item(input)?;
    let calendar = cfg.calendar(calendar_name)?;

    EventChecker::new(&[EventCheck::Duplicate, EventCheck::Rrule]).check(&calendar, &item)?;

    let args = NewArgs::load_from_item(&item, calendar.config())?;
    let stdout = cfg.khal().new_event(calendar_name, &args).await?;
    info!(title = %item.title, calendar = %calendar, "Created event");

    if needs_edit(&item)? {
        let mut props = EditArgs::load_from_item(&item, calendar.config())?;
        // khal generated its own UID, so match on summary and dates.
        props.uid.clear();
        let edit_dates = props.rrule.is_some();
        debug!(edit_dates, "Editing the new event for properties khal new cannot set");
        calendar.edit(&props, edit_dates)?;
    }

    Ok(stdout)
}

fn needs_edit(item: &AgendaItem) -> Result<bool> {
    let inexpressible_repeat = item
        .first_timestamp()?
        .repeater
        .is_some_and(|repeater| repeater.khal_keyword().is_none());

    Ok(inexpressible_repeat
        || !item.split_property("ATTENDEES").is_empty()
        || !item.split_property("CATEGORIES").is_empty())
}
