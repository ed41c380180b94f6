pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod report;
pub mod status;

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::dataset::LoadMode;
use crate::error::{BasketError, Result};
use crate::filter::{CategoryFilter, Filter, ItemRange};

#[derive(Parser)]
#[command(
    name = "basket",
    version,
    about = "Market basket analysis over a retail transactions dataset."
)]
pub struct Cli {
    /// Read this CSV instead of the cached download.
    #[arg(long, global = true, env = "BASKET_CSV")]
    pub csv: Option<PathBuf>,

    /// Never download; fail if no cached copy exists.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Logging verbosity: off, error, warn, info, debug, trace. RUST_LOG overrides it.
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn load_mode(&self) -> LoadMode {
        if let Some(path) = &self.csv {
            LoadMode::Local(path.clone())
        } else if self.offline {
            LoadMode::Offline
        } else {
            LoadMode::Auto
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the dataset, or confirm the cached copy is fresh.
    Fetch {
        /// Download even if the cached copy is fresh
        #[arg(long)]
        force: bool,
    },
    /// Show settings, cache state and dataset statistics.
    Status,
    /// Print a report for the filtered dataset.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Show or change settings.
    Config {
        /// Directory holding the downloaded dataset
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Dataset download URL
        #[arg(long)]
        url: Option<String>,
        /// Hours before the cached copy is refetched (0 = never)
        #[arg(long = "ttl-hours")]
        ttl_hours: Option<u64>,
        /// Pin the dataset sha256 ("" to clear)
        #[arg(long)]
        sha256: Option<String>,
        /// Number of products in the ranking
        #[arg(long = "top-n")]
        top_n: Option<usize>,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    /// Customer category, or "all"
    #[arg(long, default_value = "all")]
    pub category: String,
    /// Season to include (repeatable; default: every season present)
    #[arg(long = "season")]
    pub seasons: Vec<String>,
    /// Smallest basket size to include
    #[arg(long = "min-items")]
    pub min_items: Option<u32>,
    /// Largest basket size to include
    #[arg(long = "max-items")]
    pub max_items: Option<u32>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<Filter> {
        let category: CategoryFilter = self.category.parse()?;
        let seasons = if self.seasons.is_empty() {
            None
        } else {
            let set: BTreeSet<String> = self.seasons.iter().map(|s| s.trim().to_string()).collect();
            if set.iter().any(|s| s.is_empty()) {
                return Err(BasketError::InvalidFilter("season must not be empty".into()));
            }
            Some(set)
        };
        let items = match (self.min_items, self.max_items) {
            (None, None) => None,
            (lower, upper) => Some(ItemRange::new(lower.unwrap_or(0), upper.unwrap_or(u32::MAX))),
        };
        Ok(Filter {
            category,
            seasons,
            items,
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ReportCommands {
    /// Most sold products by total items.
    Top(ReportArgs),
    /// Total items sold by basket size range.
    Histogram(ReportArgs),
    /// Total sales cost by season and year.
    Seasonal(ReportArgs),
    /// Headline numbers for the filtered data.
    Summary(ReportArgs),
    /// Every report above.
    All(ReportArgs),
}

impl ReportCommands {
    pub fn args(&self) -> &ReportArgs {
        match self {
            ReportCommands::Top(a)
            | ReportCommands::Histogram(a)
            | ReportCommands::Seasonal(a)
            | ReportCommands::Summary(a)
            | ReportCommands::All(a) => a,
        }
    }
}
