use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::{self, CacheManifest, Freshness};
use crate::error::{BasketError, Result};
use crate::fetch;
use crate::models::{Field, RejectedRow, Transaction};
use crate::settings::Settings;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Product",
    "Customer_Category",
    "Season",
    "Total_Items",
    "Total_Cost",
    "Date",
];

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Product")]
    product: String,
    #[serde(rename = "Customer_Category")]
    customer_category: String,
    #[serde(rename = "Season")]
    season: String,
    #[serde(rename = "Total_Items")]
    total_items: String,
    #[serde(rename = "Total_Cost")]
    total_cost: String,
    #[serde(rename = "Date")]
    date: String,
}

pub fn parse_items(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    // Exported spreadsheets sometimes write integer columns as "5.0".
    let f: f64 = s.parse().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

pub fn parse_cost(raw: &str) -> Field<f64> {
    let s = raw.trim().trim_start_matches('$').replace(',', "");
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Field::Valid(v),
        _ => Field::Malformed(raw.to_string()),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

pub fn parse_date(raw: &str) -> Field<NaiveDate> {
    let s = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Field::Valid(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Field::Valid(d);
        }
    }
    Field::Malformed(raw.to_string())
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// The loaded table. Built once and only ever borrowed afterwards.
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<Transaction>,
    rejected: Vec<RejectedRow>,
}

/// Control defaults derived from the full table.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    /// Distinct season labels in first-seen order.
    pub seasons: Vec<String>,
    pub item_bounds: Option<(u32, u32)>,
}

impl Dataset {
    #[cfg(test)]
    pub fn from_records(records: Vec<Transaction>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
        }
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filter_options(&self) -> FilterOptions {
        let categories: BTreeSet<&str> = self
            .records
            .iter()
            .map(|r| r.customer_category.as_str())
            .filter(|c| !c.is_empty())
            .collect();

        let mut seasons: Vec<String> = Vec::new();
        for r in &self.records {
            if !seasons.iter().any(|s| s == &r.season) {
                seasons.push(r.season.clone());
            }
        }

        let min = self.records.iter().map(|r| r.total_items).min();
        let max = self.records.iter().map(|r| r.total_items).max();

        FilterOptions {
            categories: categories.into_iter().map(str::to_string).collect(),
            seasons,
            item_bounds: min.zip(max),
        }
    }
}

/// Largest Total_Items accepted. Larger values are rejected so histogram
/// buckets stay bounded.
pub const MAX_BASKET_ITEMS: u32 = 100_000;

fn reject(rejected: &mut Vec<RejectedRow>, line: u64, reason: String) {
    warn!(line, %reason, "rejecting row");
    rejected.push(RejectedRow { line, reason });
}

pub fn parse_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(BasketError::MissingColumn(col.to_string()));
        }
    }

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != headers.len() {
            let reason = format!("expected {} fields, found {}", headers.len(), record.len());
            reject(&mut rejected, line, reason);
            continue;
        }
        let record = match csv::StringRecord::from_byte_record(record) {
            Ok(r) => r,
            Err(e) => {
                reject(&mut rejected, line, format!("not valid UTF-8: {}", e.utf8_error()));
                continue;
            }
        };
        let raw: RawRecord = match record.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                reject(&mut rejected, line, e.to_string());
                continue;
            }
        };

        let total_items = match parse_items(&raw.total_items) {
            Some(n) if n <= MAX_BASKET_ITEMS => n,
            Some(n) => {
                let reason = format!("Total_Items {n} is above the limit of {MAX_BASKET_ITEMS}");
                reject(&mut rejected, line, reason);
                continue;
            }
            None => {
                let reason =
                    format!("Total_Items is not a non-negative integer: {:?}", raw.total_items);
                reject(&mut rejected, line, reason);
                continue;
            }
        };

        records.push(Transaction {
            product: raw.product,
            customer_category: raw.customer_category,
            season: raw.season,
            total_items,
            total_cost: parse_cost(&raw.total_cost),
            date: parse_date(&raw.date),
        });
    }

    debug!(rows = records.len(), rejected = rejected.len(), "parsed dataset");
    Ok(Dataset { records, rejected })
}

pub fn load_path(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    parse_csv(std::io::BufReader::new(file))
}

// ---------------------------------------------------------------------------
// Source resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum LoadMode {
    /// Reuse the cache when the policy accepts it, otherwise download.
    Auto,
    /// Always download.
    Refresh,
    /// Never download.
    Offline,
    /// Read this file and ignore the cache.
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub enum LoadSource {
    Local(PathBuf),
    Cache { path: PathBuf, freshness: Freshness },
    Download(CacheManifest),
}

pub struct Loaded {
    pub dataset: Dataset,
    pub source: LoadSource,
}

pub fn load(settings: &Settings, mode: LoadMode) -> Result<Loaded> {
    let path = settings.cache_path();
    let policy = settings.cache_policy();

    let source = match mode {
        LoadMode::Local(local) => {
            info!(path = %local.display(), "loading local dataset");
            let dataset = load_path(&local)?;
            return Ok(Loaded {
                dataset,
                source: LoadSource::Local(local),
            });
        }
        LoadMode::Refresh => LoadSource::Download(download_pinned(settings, &path)?),
        LoadMode::Offline => {
            let freshness = cache::evaluate(&path, &policy, chrono::Utc::now())?;
            match freshness {
                Freshness::Missing => {
                    return Err(BasketError::NoCachedData(path.display().to_string()))
                }
                Freshness::Corrupt { expected, actual } => {
                    return Err(BasketError::ChecksumMismatch {
                        path: path.display().to_string(),
                        expected,
                        actual,
                    })
                }
                Freshness::Expired { .. } => {
                    warn!("offline: using expired cached dataset");
                    LoadSource::Cache { path: path.clone(), freshness }
                }
                Freshness::Fresh | Freshness::Unverified => {
                    LoadSource::Cache { path: path.clone(), freshness }
                }
            }
        }
        LoadMode::Auto => {
            let freshness = cache::evaluate(&path, &policy, chrono::Utc::now())?;
            if policy.accepts(&freshness) {
                info!(state = %freshness.label(), "using cached dataset");
                LoadSource::Cache { path: path.clone(), freshness }
            } else {
                info!(state = %freshness.label(), "cached dataset not usable, downloading");
                LoadSource::Download(download_pinned(settings, &path)?)
            }
        }
    };

    let dataset = load_path(&path)?;
    Ok(Loaded { dataset, source })
}

fn download_pinned(settings: &Settings, path: &Path) -> Result<CacheManifest> {
    let pin = settings.cache_policy().expected_sha256;
    fetch::download(&settings.dataset_url, path, pin.as_deref())
}
