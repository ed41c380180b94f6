use crate::cache;
use crate::dataset::{self, Dataset, LoadMode};
use crate::error::Result;
use crate::filter::FilteredView;
use crate::fmt::{format_bytes, money, number};
use crate::reports;
use crate::settings::{load_settings, settings_path};

/// Rejected rows listed before the output is truncated.
const REJECTED_PREVIEW: usize = 5;

pub fn run(mode: LoadMode) -> Result<()> {
    let settings = load_settings();
    let policy = settings.cache_policy();

    println!("Settings:   {}", settings_path().display());
    println!("Data dir:   {}", settings.data_dir);
    println!("Source URL: {}", settings.dataset_url);
    println!(
        "Cache TTL:  {}",
        match settings.cache_ttl_hours {
            0 => "never expires".to_string(),
            h => format!("{h}h"),
        }
    );
    println!(
        "Pinned:     {}",
        policy.expected_sha256.as_deref().unwrap_or("(none)")
    );
    println!();

    // Status never downloads.
    let dataset = if let LoadMode::Local(path) = mode {
        println!("Dataset:    {} (local file)", path.display());
        Some(dataset::load_path(&path)?)
    } else {
        let path = settings.cache_path();
        let freshness = cache::evaluate(&path, &policy, chrono::Utc::now())?;
        println!("Dataset:    {}", path.display());
        println!("State:      {}", freshness.label());
        if let Some(manifest) = cache::read_manifest(&path)? {
            println!("From:       {}", manifest.source_url);
            println!("Size:       {}", format_bytes(manifest.bytes));
            println!("SHA-256:    {}", manifest.sha256);
            println!(
                "Fetched:    {}",
                manifest.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        if path.exists() {
            Some(dataset::load_path(&path)?)
        } else {
            println!();
            println!("No cached dataset. Run `basket fetch` to download it.");
            None
        }
    };

    if let Some(ds) = dataset {
        print_dataset_stats(&ds);
    }
    Ok(())
}

fn print_dataset_stats(ds: &Dataset) {
    let opts = ds.filter_options();
    let bad_dates = ds.records().iter().filter(|r| !r.date.is_valid()).count();
    let bad_date_example = ds.records().iter().find_map(|r| r.date.malformed());
    let bad_costs = ds.records().iter().filter(|r| !r.total_cost.is_valid()).count();
    let unknown_seasons = ds
        .records()
        .iter()
        .filter(|r| r.season_kind().is_none())
        .count();

    println!();
    if ds.is_empty() {
        println!("Dataset has no usable rows.");
    }
    let totals = reports::summarize(&FilteredView::all(ds.records()));
    println!("Rows:            {}", number(ds.len() as u64));
    println!("Rejected:        {}", number(ds.rejected().len() as u64));
    match bad_date_example {
        Some(raw) => println!("Bad dates:       {} (e.g. {raw:?})", number(bad_dates as u64)),
        None => println!("Bad dates:       {}", number(bad_dates as u64)),
    }
    println!("Bad costs:       {}", number(bad_costs as u64));
    println!("Unknown seasons: {}", number(unknown_seasons as u64));
    println!("Total items:     {}", number(totals.total_items));
    println!("Total cost:      {}", money(totals.total_cost));
    println!("Categories:      {}", opts.categories.join(", "));
    println!("Seasons:         {}", opts.seasons.join(", "));
    if let Some((lo, hi)) = opts.item_bounds {
        println!("Basket sizes:    {lo} to {hi}");
    }

    if !ds.rejected().is_empty() {
        println!();
        for row in ds.rejected().iter().take(REJECTED_PREVIEW) {
            println!("  line {}: {}", row.line, row.reason);
        }
        let more = ds.rejected().len().saturating_sub(REJECTED_PREVIEW);
        if more > 0 {
            println!("  ... and {more} more");
        }
    }
}
