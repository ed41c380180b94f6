use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// A per-row parse result. Malformed values keep the raw text so they can be
/// reported, and are skipped only by the stage that needs them.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Valid(T),
    Malformed(String),
}

impl<T> Field<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Field::Valid(v) => Some(v),
            Field::Malformed(_) => None,
        }
    }

    pub fn malformed(&self) -> Option<&str> {
        match self {
            Field::Valid(_) => None,
            Field::Malformed(raw) => Some(raw),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Field::Valid(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Season {
    Fall,
    Spring,
    Summer,
    Winter,
}

impl Season {
    /// Display order used by the seasonal chart.
    pub const ALL: [Season; 4] = [Season::Fall, Season::Spring, Season::Summer, Season::Winter];

    pub fn parse(raw: &str) -> Option<Season> {
        let raw = raw.trim();
        Season::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(raw))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Fall => "Fall",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Winter => "Winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub product: String,
    pub customer_category: String,
    /// Raw season label. Filtering matches on this text; the seasonal rollup
    /// only groups the four known seasons.
    pub season: String,
    pub total_items: u32,
    pub total_cost: Field<f64>,
    pub date: Field<NaiveDate>,
}

impl Transaction {
    pub fn season_kind(&self) -> Option<Season> {
        Season::parse(&self.season)
    }
}

/// A row dropped at load time because its basket size could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_parse_is_case_insensitive() {
        assert_eq!(Season::parse("winter"), Some(Season::Winter));
        assert_eq!(Season::parse(" Fall "), Some(Season::Fall));
        assert_eq!(Season::parse("Autumn"), None);
    }

    #[test]
    fn test_field_valid() {
        let ok: Field<f64> = Field::Valid(1.5);
        let bad: Field<f64> = Field::Malformed("n/a".into());
        assert_eq!(ok.valid(), Some(&1.5));
        assert!(bad.valid().is_none());
        assert!(!bad.is_valid());
    }
}
