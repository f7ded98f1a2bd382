use anyhow::Result;
use tracing::info;

use khalorg_core::agenda::AgendaFile;
use khalorg_core::format::TemplateFormatter;
use khalorg_core::khal::parse_list_output;

use crate::config::Config;

/// List a khal calendar as org agenda items, one per event series.
pub async fn run(
    cfg: &Config,
    calendar: &str,
    start: &str,
    stop: &str,
    format: Option<&str>,
) -> Result<String> {
    let template = match format {
        Some(template) => template.to_string(),
        None => cfg.template()?,
    };
    let formatter = TemplateFormatter::new(&template)?;
    let backend = cfg.backend_config()?;

    let output = cfg.khal().list(calendar, start, stop).await?;
    let mut agenda = AgendaFile::new(parse_list_output(&output, &backend)?);
    let occurrences = agenda.items.len();
    agenda.apply_rrules()?;
    info!(occurrences, items = agenda.items.len(), "Listed {}", calendar);

    Ok(agenda.format(&formatter)?)
}
