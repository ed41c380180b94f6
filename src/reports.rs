use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::Serialize;
use tracing::debug;

use crate::dataset::Dataset;
use crate::filter::{Filter, FilteredView};
use crate::models::Season;

/// Number of products in the ranking.
pub const TOP_N: usize = 10;

/// Histogram bucket width, in Total_Items.
pub const BIN_WIDTH: u32 = 2;

// ---------------------------------------------------------------------------
// Top products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductTotal {
    pub product: String,
    pub total_items: u64,
}

/// Products ranked by summed Total_Items, highest first. Equal sums keep the
/// order in which the products were first seen in the view.
pub fn top_products(view: &FilteredView, n: usize) -> Vec<ProductTotal> {
    let mut order: Vec<ProductTotal> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for t in view.iter() {
        match index.get(t.product.as_str()) {
            Some(&i) => order[i].total_items += u64::from(t.total_items),
            None => {
                index.insert(t.product.as_str(), order.len());
                order.push(ProductTotal {
                    product: t.product.clone(),
                    total_items: u64::from(t.total_items),
                });
            }
        }
    }

    // sort_by is stable, which gives the first-seen tie break.
    order.sort_by(|a, b| b.total_items.cmp(&a.total_items));
    order.truncate(n);
    order
}

// ---------------------------------------------------------------------------
// Basket-size histogram
// ---------------------------------------------------------------------------

/// Half-open bucket `[lower, upper)` and the Total_Items summed over the
/// baskets that fall in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub lower: u32,
    pub upper: u32,
    pub total_items: u64,
}

impl Bucket {
    pub fn label(&self) -> String {
        format!("[{}, {})", self.lower, self.upper)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub width: u32,
    pub buckets: Vec<Bucket>,
    /// Unweighted mean of the bucket sums. `None` when there are no buckets.
    pub mean: Option<f64>,
}

impl Histogram {
    pub fn busiest(&self) -> Option<&Bucket> {
        self.buckets
            .iter()
            .fold(None, |best: Option<&Bucket>, b| match best {
                Some(cur) if cur.total_items >= b.total_items => Some(cur),
                _ => Some(b),
            })
    }
}

/// Sum Total_Items into `width`-wide buckets aligned at zero. Buckets run from
/// the one holding the smallest basket to the one holding the largest; empty
/// buckets in between are kept with a zero sum.
pub fn basket_histogram(view: &FilteredView, width: u32) -> Histogram {
    let width = width.max(1);
    let (Some(min), Some(max)) = (
        view.iter().map(|t| t.total_items).min(),
        view.iter().map(|t| t.total_items).max(),
    ) else {
        return Histogram {
            width,
            buckets: Vec::new(),
            mean: None,
        };
    };

    let first = min / width;
    let last = max / width;
    let mut sums = vec![0u64; (last - first + 1) as usize];
    for t in view.iter() {
        sums[(t.total_items / width - first) as usize] += u64::from(t.total_items);
    }

    let buckets: Vec<Bucket> = sums
        .into_iter()
        .enumerate()
        .map(|(i, total_items)| {
            let lower = (first + i as u32) * width;
            Bucket {
                lower,
                upper: lower.saturating_add(width),
                total_items,
            }
        })
        .collect();

    let mean = buckets.iter().map(|b| b.total_items as f64).sum::<f64>() / buckets.len() as f64;
    Histogram {
        width,
        buckets,
        mean: Some(mean),
    }
}

// ---------------------------------------------------------------------------
// Season x year cost rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCost {
    pub year: i32,
    pub total_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSeries {
    pub season: Season,
    pub points: Vec<YearCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalRollup {
    /// One series per season, in `Season::ALL` order.
    pub series: Vec<SeasonSeries>,
    /// Rows left out for an unknown season, bad date or bad cost.
    pub excluded_rows: usize,
}

impl SeasonalRollup {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.year))
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn get(&self, season: Season, year: i32) -> Option<i64> {
        self.series
            .iter()
            .find(|s| s.season == season)?
            .points
            .iter()
            .find(|p| p.year == year)
            .map(|p| p.total_cost)
    }
}

/// Nearest whole currency unit, half to even.
fn round_currency(value: f64) -> i64 {
    value.round_ties_even() as i64
}

pub fn seasonal_costs(view: &FilteredView) -> SeasonalRollup {
    let mut totals: BTreeMap<(Season, i32), f64> = BTreeMap::new();
    let mut excluded_rows = 0usize;

    for t in view.iter() {
        let (Some(season), Some(date), Some(cost)) =
            (t.season_kind(), t.date.valid(), t.total_cost.valid())
        else {
            excluded_rows += 1;
            continue;
        };
        *totals.entry((season, date.year())).or_insert(0.0) += cost;
    }

    if excluded_rows > 0 {
        debug!(excluded_rows, "rows left out of seasonal rollup");
    }

    let series = Season::ALL
        .iter()
        .map(|&season| SeasonSeries {
            season,
            points: totals
                .range((season, i32::MIN)..=(season, i32::MAX))
                .map(|(&(_, year), &cost)| YearCost {
                    year,
                    total_cost: round_currency(cost),
                })
                .collect(),
        })
        .collect();

    SeasonalRollup {
        series,
        excluded_rows,
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub transactions: usize,
    pub total_items: u64,
    pub average_items: Option<f64>,
    /// Sum over rows with a readable cost.
    pub total_cost: f64,
}

pub fn summarize(view: &FilteredView) -> Summary {
    let transactions = view.len();
    let total_items: u64 = view.iter().map(|t| u64::from(t.total_items)).sum();
    let total_cost: f64 = view.iter().filter_map(|t| t.total_cost.valid()).sum();
    Summary {
        transactions,
        total_items,
        average_items: (!view.is_empty()).then(|| total_items as f64 / transactions as f64),
        total_cost,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakCost {
    pub season: Season,
    pub year: i32,
    pub total_cost: i64,
}

/// Direct answers to the dashboard's guiding questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlights {
    pub most_sold: Option<ProductTotal>,
    pub busiest_bucket: Option<Bucket>,
    /// Year with the lowest cost summed across all seasons.
    pub cheapest_year: Option<YearCost>,
    pub peak: Option<PeakCost>,
}

pub fn highlights(top: &[ProductTotal], histogram: &Histogram, seasonal: &SeasonalRollup) -> Highlights {
    let mut per_year: BTreeMap<i32, i64> = BTreeMap::new();
    for s in &seasonal.series {
        for p in &s.points {
            *per_year.entry(p.year).or_insert(0) += p.total_cost;
        }
    }
    let cheapest_year = per_year
        .iter()
        .fold(None, |best: Option<(i32, i64)>, (&year, &cost)| match best {
            Some((_, c)) if c <= cost => best,
            _ => Some((year, cost)),
        })
        .map(|(year, total_cost)| YearCost { year, total_cost });

    let mut peak: Option<PeakCost> = None;
    for s in &seasonal.series {
        for p in &s.points {
            if peak.as_ref().map_or(true, |pk| p.total_cost > pk.total_cost) {
                peak = Some(PeakCost {
                    season: s.season,
                    year: p.year,
                    total_cost: p.total_cost,
                });
            }
        }
    }

    Highlights {
        most_sold: top.first().cloned(),
        busiest_bucket: histogram.busiest().cloned(),
        cheapest_year,
        peak,
    }
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub summary: Summary,
    pub top_products: Vec<ProductTotal>,
    pub histogram: Histogram,
    pub seasonal: SeasonalRollup,
    pub highlights: Highlights,
}

/// Filter once, then run every aggregation over the same view.
pub fn analyze(dataset: &Dataset, filter: &Filter, top_n: usize) -> Analysis {
    let view = filter.apply(dataset.records());
    debug!(rows = view.len(), of = dataset.len(), "filter applied");

    let top_products = top_products(&view, top_n);
    let histogram = basket_histogram(&view, BIN_WIDTH);
    let seasonal = seasonal_costs(&view);
    let highlights = highlights(&top_products, &histogram, &seasonal);

    Analysis {
        summary: summarize(&view),
        top_products,
        histogram,
        seasonal,
        highlights,
    }
}
