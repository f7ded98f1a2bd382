//! Org timestamps: `<2023-01-01 Sun 10:00>`, `<2023-01-01 Sun 10:00-11:00 +1w>`,
//! `<2023-01-01 Sun>--<2023-01-03 Tue>` and their inactive `[...]` forms.
//!
//! Rendering always uses the long range form with the repeater repeated in
//! both brackets. Warning delays (`-2d`) are accepted and dropped.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1, take_while_m_n},
    character::complete::{char, digit1, one_of, space0, space1},
    combinator::{map, map_res, opt, recognize},
    multi::many0,
    sequence::{pair, preceded, tuple},
};

use crate::error::KhalOrgError;
use crate::recurrence::Repeater;
use crate::time::OrgTime;

const DATE_FORMAT: &str = "%Y-%m-%d %a";
const DATETIME_FORMAT: &str = "%Y-%m-%d %a %H:%M";

type PResult<'a, T> = IResult<&'a str, T>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub start: OrgTime,
    pub end: Option<OrgTime>,
    pub active: bool,
    pub repeater: Option<Repeater>,
}

impl Timestamp {
    pub fn new(start: OrgTime, end: Option<OrgTime>) -> Self {
        Timestamp {
            start,
            end,
            active: true,
            repeater: None,
        }
    }

    pub fn with_repeater(mut self, repeater: Option<Repeater>) -> Self {
        self.repeater = repeater;
        self
    }

    pub fn has_time(&self) -> bool {
        self.start.has_time()
    }

    /// Every timestamp in `text` with its byte range.
    pub fn scan(text: &str) -> Vec<(Range<usize>, Timestamp)> {
        let mut found = Vec::new();
        let mut offset = 0;

        while offset < text.len() {
            let rest = &text[offset..];
            let Some(pos) = rest.find(['<', '[']) else {
                break;
            };
            let start = offset + pos;

            match parse_timestamp(&text[start..]) {
                Ok((remaining, timestamp)) => {
                    let end = text.len() - remaining.len();
                    found.push((start..end, timestamp));
                    offset = end;
                }
                Err(_) => offset = start + 1,
            }
        }

        found
    }

    fn write_bracket(&self, f: &mut fmt::Formatter<'_>, time: &OrgTime) -> fmt::Result {
        let (open, close) = if self.active { ('<', '>') } else { ('[', ']') };
        let pattern = if time.has_time() { DATETIME_FORMAT } else { DATE_FORMAT };

        write!(f, "{}{}", open, time.format(pattern))?;
        if let Some(repeater) = &self.repeater {
            write!(f, " {}", repeater)?;
        }
        write!(f, "{}", close)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_bracket(f, &self.start)?;
        if let Some(end) = &self.end {
            f.write_str("--")?;
            self.write_bracket(f, end)?;
        }
        Ok(())
    }
}

impl FromStr for Timestamp {
    type Err = KhalOrgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_timestamp(s.trim()) {
            Ok(("", timestamp)) => Ok(timestamp),
            _ => Err(KhalOrgError::TimestampParse(s.to_string())),
        }
    }
}

/// One bracket's content.
#[derive(Debug)]
struct Bracket {
    date: NaiveDate,
    time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    repeater: Option<Repeater>,
}

enum Token {
    TimeRange(NaiveTime, Option<NaiveTime>),
    Repeater(Repeater),
    Ignored,
}

fn parse_timestamp(i: &str) -> PResult<'_, Timestamp> {
    let active = i.starts_with('<');
    let (i, first) = parse_bracket(i)?;
    let (i, second) = opt(preceded(tag("--"), parse_bracket))(i)?;

    let date = first.date;
    let start = match first.time {
        Some(time) => OrgTime::DateTime(date.and_time(time)),
        None => OrgTime::Date(date),
    };

    let end = match (&second, first.end_time) {
        (Some(second), _) => Some(match second.time {
            Some(time) => OrgTime::DateTime(second.date.and_time(time)),
            None => OrgTime::Date(second.date),
        }),
        (None, Some(end_time)) => Some(OrgTime::DateTime(date.and_time(end_time))),
        (None, None) => None,
    };

    Ok((
        i,
        Timestamp {
            start,
            end,
            active,
            repeater: first.repeater,
        },
    ))
}

fn parse_bracket(i: &str) -> PResult<'_, Bracket> {
    let (i, open) = one_of("<[")(i)?;
    let close = if open == '<' { '>' } else { ']' };

    let (i, date) = parse_date(i)?;
    let (i, tokens) = many0(preceded(space1, parse_token))(i)?;
    let (i, _) = space0(i)?;
    let (i, _) = char(close)(i)?;

    let mut bracket = Bracket {
        date,
        time: None,
        end_time: None,
        repeater: None,
    };
    for token in tokens {
        match token {
            Token::TimeRange(start, end) => {
                bracket.time = Some(start);
                bracket.end_time = end;
            }
            Token::Repeater(repeater) => bracket.repeater = Some(repeater),
            Token::Ignored => {}
        }
    }

    Ok((i, bracket))
}

fn parse_token(i: &str) -> PResult<'_, Token> {
    alt((
        map(
            pair(parse_time, opt(preceded(char('-'), parse_time))),
            |(start, end)| Token::TimeRange(start, end),
        ),
        map(parse_repeater, Token::Repeater),
        // Warning delay, e.g. -2d or --2d.
        map(
            recognize(tuple((alt((tag("--"), tag("-"))), digit1, one_of("hdwmy")))),
            |_| Token::Ignored,
        ),
        // Day name, in any locale.
        map(take_while1(|c: char| c.is_alphabetic() || c == '.'), |_| {
            Token::Ignored
        }),
    ))(i)
}

fn parse_repeater(i: &str) -> PResult<'_, Repeater> {
    map_res(
        recognize(tuple((
            alt((tag("++"), tag(".+"), tag("+"))),
            digit1,
            one_of("hdwmy"),
        ))),
        |s: &str| s.parse::<Repeater>(),
    )(i)
}

fn parse_date(i: &str) -> PResult<'_, NaiveDate> {
    map_res(
        recognize(tuple((
            take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
            char('-'),
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
            char('-'),
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        ))),
        |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d"),
    )(i)
}

fn parse_time(i: &str) -> PResult<'_, NaiveTime> {
    map_res(
        recognize(tuple((
            take_while_m_n(1, 2, |c: char| c.is_ascii_digit()),
            char(':'),
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        ))),
        |s: &str| NaiveTime::parse_from_str(s, "%H:%M"),
    )(i)
}
