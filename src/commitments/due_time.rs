//! Relative due-time resolution
//!
//! Rules are checked in table order and the first rule that matches anywhere
//! in the text decides the offset. Numeric rules come first, so
//! "tomorrow, in 2 hours" resolves to two hours. That precedence is kept
//! as-is; whether "tomorrow" should win there is still an open question.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::error::{CommitmentError, Result};

pub const DEFAULT_FOLLOWUP_HOURS: i64 = 24;

/// How a matched rule turns into an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueOffset {
    /// Capture group 1 is a count of minutes.
    Minutes,
    /// Capture group 1 is a count of hours.
    Hours,
    Fixed(Duration),
}

#[derive(Debug, Clone)]
pub struct DueRule {
    pub pattern: Regex,
    pub offset: DueOffset,
}

impl DueRule {
    pub fn new(pattern: &str, offset: DueOffset) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| CommitmentError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern, offset })
    }

    fn offset_for(&self, text: &str) -> Option<Duration> {
        let caps = self.pattern.captures(text)?;
        match self.offset {
            DueOffset::Fixed(d) => Some(d),
            DueOffset::Minutes => {
                let n: i64 = caps.get(1)?.as_str().parse().ok()?;
                Duration::try_minutes(n)
            }
            DueOffset::Hours => {
                let n: i64 = caps.get(1)?.as_str().parse().ok()?;
                Duration::try_hours(n)
            }
        }
    }
}

pub fn default_rules() -> Vec<DueRule> {
    let table: [(&str, DueOffset); 8] = [
        (r"(?i)in\s+(\d+)\s*min(ute)?s?", DueOffset::Minutes),
        (r"(?i)in\s+(\d+)\s*hours?", DueOffset::Hours),
        (r"(?i)in\s+an?\s*hour", DueOffset::Fixed(Duration::hours(1))),
        (r"(?i)in\s+30\s*min", DueOffset::Fixed(Duration::minutes(30))),
        (r"(?i)tomorrow", DueOffset::Fixed(Duration::hours(24))),
        (r"(?i)later\s+(today|tonight)", DueOffset::Fixed(Duration::hours(4))),
        (r"(?i)this\s+(afternoon|evening)", DueOffset::Fixed(Duration::hours(4))),
        (r"(?i)next\s+week", DueOffset::Fixed(Duration::days(7))),
    ];
    table
        .into_iter()
        .filter_map(|(pattern, offset)| DueRule::new(pattern, offset).ok())
        .collect()
}

#[derive(Debug, Clone)]
pub struct DueTimeResolver {
    rules: Vec<DueRule>,
    default_offset: Duration,
}

impl DueTimeResolver {
    pub fn new(rules: Vec<DueRule>, default_offset: Duration) -> Self {
        Self {
            rules,
            default_offset,
        }
    }

    pub fn with_default_hours(hours: i64) -> Self {
        let default_offset =
            Duration::try_hours(hours).unwrap_or_else(|| Duration::hours(DEFAULT_FOLLOWUP_HOURS));
        Self::new(default_rules(), default_offset)
    }

    pub fn default_offset(&self) -> Duration {
        self.default_offset
    }

    /// Offset chosen for `text`; a rule whose number overflows is skipped.
    pub fn offset_for(&self, text: &str) -> Duration {
        self.rules
            .iter()
            .find_map(|rule| rule.offset_for(text))
            .unwrap_or(self.default_offset)
    }

    /// A rule whose deadline would overflow the calendar is skipped too.
    pub fn resolve(&self, text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        self.rules
            .iter()
            .filter_map(|rule| rule.offset_for(text))
            .find_map(|offset| now.checked_add_signed(offset))
            .or_else(|| now.checked_add_signed(self.default_offset))
            .unwrap_or(now)
    }
}

impl Default for DueTimeResolver {
    fn default() -> Self {
        Self::with_default_hours(DEFAULT_FOLLOWUP_HOURS)
    }
}
