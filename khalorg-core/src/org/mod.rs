//! Reading agenda items from org text.
//!
//! Only what an agenda item needs is understood: headings, the first
//! `:PROPERTIES:` drawer, active timestamps and the remaining body.

mod helpers;

pub use helpers::{is_timestamp_line, remove_timestamps};

use crate::agenda::AgendaItem;
use crate::error::{KhalOrgError, KhalOrgResult};
use crate::timestamp::Timestamp;

const TODO_KEYWORDS: [&str; 2] = ["TODO", "DONE"];

/// Every heading in `text` as an agenda item.
pub fn parse_items(text: &str) -> Vec<AgendaItem> {
    let mut items = Vec::new();
    let mut current: Option<(&str, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(title) = heading_title(line) {
            if let Some((title, body)) = current.take() {
                items.push(build_item(title, &body));
            }
            current = Some((title, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((title, body)) = current {
        items.push(build_item(title, &body));
    }
    items
}

/// The first agenda item in `text`.
pub fn parse_item(text: &str) -> KhalOrgResult<AgendaItem> {
    parse_items(text)
        .into_iter()
        .next()
        .ok_or(KhalOrgError::EmptyItem)
}

fn heading_title(line: &str) -> Option<&str> {
    let stars = line.len() - line.trim_start_matches('*').len();
    if stars == 0 {
        return None;
    }
    let rest = &line[stars..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }

    let mut title = rest.trim();
    for keyword in TODO_KEYWORDS {
        if let Some(stripped) = title.strip_prefix(keyword) {
            if stripped.is_empty() || stripped.starts_with(' ') {
                title = stripped.trim_start();
            }
        }
    }
    Some(strip_tags(title))
}

/// Remove trailing `:tag:other:` from a heading.
fn strip_tags(title: &str) -> &str {
    let Some((head, last)) = title.rsplit_once(char::is_whitespace) else {
        return title;
    };
    let is_tags = last.len() > 2
        && last.starts_with(':')
        && last.ends_with(':')
        && last[1..last.len() - 1]
            .split(':')
            .all(|tag| !tag.is_empty() && !tag.contains(char::is_whitespace));
    if is_tags { head.trim_end() } else { title }
}

fn build_item(title: &str, body: &[&str]) -> AgendaItem {
    let mut item = AgendaItem::new(title);
    let mut text_lines = Vec::new();
    let mut in_drawer = false;
    let mut drawer_done = false;

    for line in body {
        let trimmed = line.trim();
        if !drawer_done && !in_drawer && trimmed.eq_ignore_ascii_case(":PROPERTIES:") {
            in_drawer = true;
            continue;
        }
        if in_drawer {
            if trimmed.eq_ignore_ascii_case(":END:") {
                in_drawer = false;
                drawer_done = true;
            } else if let Some((key, value)) = property_line(trimmed) {
                item.set_property(key, value);
            }
            continue;
        }
        text_lines.push(*line);
    }

    let text = text_lines.join("\n");
    let timestamps = Timestamp::scan(&text)
        .into_iter()
        .map(|(_, ts)| ts)
        .filter(|ts| ts.active)
        .collect();
    item.set_timestamps(timestamps);
    item.description = remove_timestamps(&text);
    item
}

fn property_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(':')?;
    let (key, value) = rest.split_once(':')?;
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}
