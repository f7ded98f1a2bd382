//! Rendering agenda items through a user template.
//!
//! Templates use `{name}` placeholders and `{{`/`}}` for literal braces:
//!
//! ```text
//! * {title}
//!   :PROPERTIES:
//!   :UID: {uid}
//!   :END:
//!   {timestamps}
//!   {description}
//! ```
//!
//! Multiple timestamps are joined by a newline plus the whitespace that
//! precedes `{timestamps}` in the template.

use thiserror::Error;
use tracing::warn;

use crate::agenda::AgendaItem;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported key encountered in template: '{0}'")]
    UnknownPlaceholder(String),

    #[error("Unbalanced brace in template at byte {0}")]
    UnbalancedBrace(usize),

    #[error("Property '{0}' is required by the template but missing")]
    MissingProperty(String),
}

/// Placeholder vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Timestamps,
    Description,
    Attendees,
    Calendar,
    Categories,
    Uid,
    Location,
    Organizer,
    Rrule,
    Status,
    Url,
    Until,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Field::Title,
            "timestamps" => Field::Timestamps,
            "description" => Field::Description,
            "attendees" => Field::Attendees,
            "calendar" => Field::Calendar,
            "categories" => Field::Categories,
            "uid" => Field::Uid,
            "location" => Field::Location,
            "organizer" => Field::Organizer,
            "rrule" => Field::Rrule,
            "status" => Field::Status,
            "url" => Field::Url,
            "until" => Field::Until,
            _ => return None,
        })
    }

    /// Property key backing this field, if it is a property.
    fn property_key(&self) -> Option<&'static str> {
        match self {
            Field::Title | Field::Timestamps | Field::Description => None,
            Field::Attendees => Some("ATTENDEES"),
            Field::Calendar => Some("CALENDAR"),
            Field::Categories => Some("CATEGORIES"),
            Field::Uid => Some("UID"),
            Field::Location => Some("LOCATION"),
            Field::Organizer => Some("ORGANIZER"),
            Field::Rrule => Some("RRULE"),
            Field::Status => Some("STATUS"),
            Field::Url => Some("URL"),
            Field::Until => Some("UNTIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone)]
pub struct TemplateFormatter {
    segments: Vec<Segment>,
    timestamp_indent: Option<String>,
    strict: bool,
}

impl TemplateFormatter {
    /// Compile `template`. Absent properties render as empty strings.
    pub fn new(template: &str) -> Result<Self, FormatError> {
        let segments = parse_template(template)?;
        let indents = timestamp_indents(template);
        if indents.len() > 1 {
            warn!("Only 1 timestamp indent is supported. First indent found is used.");
        }

        Ok(TemplateFormatter {
            segments,
            timestamp_indent: indents.into_iter().next(),
            strict: false,
        })
    }

    /// Like [`TemplateFormatter::new`], but rendering fails when a property
    /// the template references is absent from the item.
    pub fn strict(template: &str) -> Result<Self, FormatError> {
        let mut formatter = Self::new(template)?;
        formatter.strict = true;
        Ok(formatter)
    }

    pub fn format(&self, item: &AgendaItem) -> Result<String, FormatError> {
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::Title) => out.push_str(&item.title),
                Segment::Field(Field::Description) => out.push_str(&item.description),
                Segment::Field(Field::Timestamps) => out.push_str(&self.timestamps(item)),
                Segment::Field(field) => {
                    let Some(key) = field.property_key() else {
                        continue;
                    };
                    match item.property(key) {
                        Some(value) => out.push_str(value),
                        None if self.strict => {
                            return Err(FormatError::MissingProperty(key.to_string()));
                        }
                        None => {}
                    }
                }
            }
        }

        Ok(out)
    }

    /// Format several items, separated by newlines.
    pub fn format_all<'a>(
        &self,
        items: impl IntoIterator<Item = &'a AgendaItem>,
    ) -> Result<String, FormatError> {
        let rendered = items
            .into_iter()
            .map(|item| self.format(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join("\n"))
    }

    fn timestamps(&self, item: &AgendaItem) -> String {
        let separator = match &self.timestamp_indent {
            Some(indent) => format!("\n{}", indent),
            None => "\n".to_string(),
        };
        item.timestamps()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>, FormatError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(FormatError::UnbalancedBrace(pos)),
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => return Err(FormatError::UnbalancedBrace(pos)),
                        Some((_, ch)) => name.push(ch),
                    }
                }
                let field = Field::from_name(&name)
                    .ok_or_else(|| FormatError::UnknownPlaceholder(name.clone()))?;

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(field));
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Whitespace preceding `{timestamps}` on each line where nothing else does.
fn timestamp_indents(template: &str) -> Vec<String> {
    template
        .lines()
        .filter_map(|line| {
            let (indent, rest) = line.split_at(line.len() - line.trim_start().len());
            (!indent.is_empty() && rest.starts_with("{timestamps}")).then(|| indent.to_string())
        })
        .collect()
}
