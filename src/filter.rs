use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::BasketError;
use crate::models::Transaction;

pub const WILDCARD: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Exact(String),
}

impl CategoryFilter {
    fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Exact(c) => c == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = BasketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BasketError::InvalidFilter("category must not be empty".into()));
        }
        if s.eq_ignore_ascii_case(WILDCARD) {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Exact(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("All"),
            CategoryFilter::Exact(c) => f.write_str(c),
        }
    }
}

/// Inclusive bounds on Total_Items. `lower > upper` is allowed and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRange {
    pub lower: u32,
    pub upper: u32,
}

impl ItemRange {
    pub fn new(lower: u32, upper: u32) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, items: u32) -> bool {
        self.lower <= items && items <= self.upper
    }
}

/// Filter parameters. `None` means the default: every season present, or the
/// full observed item range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub category: CategoryFilter,
    pub seasons: Option<BTreeSet<String>>,
    pub items: Option<ItemRange>,
}

impl Filter {
    pub fn matches(&self, t: &Transaction) -> bool {
        let season_ok = match &self.seasons {
            // Case-insensitive, matching how the seasonal rollup groups labels.
            Some(set) => set.iter().any(|s| s.trim().eq_ignore_ascii_case(t.season.trim())),
            None => true,
        };
        let items_ok = match self.items {
            Some(range) => range.contains(t.total_items),
            None => true,
        };
        season_ok && items_ok && self.category.matches(&t.customer_category)
    }

    pub fn apply<'a>(&self, source: &'a [Transaction]) -> FilteredView<'a> {
        let indices = source
            .iter()
            .enumerate()
            .filter(|(_, t)| self.matches(t))
            .map(|(i, _)| i)
            .collect();
        FilteredView { source, indices }
    }

    /// Apply the same predicate to an already filtered view.
    #[cfg(test)]
    pub fn refine<'a>(&self, view: &FilteredView<'a>) -> FilteredView<'a> {
        let indices = view
            .indices
            .iter()
            .copied()
            .filter(|&i| self.matches(&view.source[i]))
            .collect();
        FilteredView {
            source: view.source,
            indices,
        }
    }

    pub fn describe(&self) -> String {
        let seasons = match &self.seasons {
            None => "all".to_string(),
            Some(s) if s.is_empty() => "none".to_string(),
            Some(s) => s.iter().cloned().collect::<Vec<_>>().join(", "),
        };
        let items = match self.items {
            None => "any".to_string(),
            Some(r) => format!("{}-{}", r.lower, r.upper),
        };
        format!("category: {}  seasons: {seasons}  items: {items}", self.category)
    }
}

/// Rows of the source table that passed a filter. Holds indices into the
/// borrowed source so row identity is preserved.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    source: &'a [Transaction],
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub fn all(source: &'a [Transaction]) -> Self {
        Self {
            source,
            indices: (0..source.len()).collect(),
        }
    }

    #[cfg(test)]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Transaction> + '_ {
        let source = self.source;
        self.indices.iter().map(move |&i| &source[i])
    }
}
