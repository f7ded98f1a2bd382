pub mod delete;
pub mod edit;
pub mod list;
pub mod new;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use khalorg_core::agenda::AgendaItem;
use khalorg_core::org;

/// Read the org agenda item piped into khalorg.
pub async fn read_stdin() -> Result<String> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read the agenda item from stdin")?;
    Ok(input)
}

/// The first agenda item in `input`.
pub fn parse_item(input: &str) -> Result<AgendaItem> {
    org::parse_item(input).context("Could not read an org agenda item from stdin")
}
