use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::fmt::{money, money_whole, number};
use crate::models::Season;
use crate::reports::{Analysis, Highlights, Histogram, ProductTotal, SeasonalRollup, Summary};

const EMPTY: &str = "No transactions match the current filters.";

/// Longest bar drawn in the histogram table.
const BAR_WIDTH: usize = 30;

fn titled(title: &str, body: String) -> String {
    format!("{}\n{body}", title.bold())
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report data -> String)
// ---------------------------------------------------------------------------

pub fn format_top(top: &[ProductTotal]) -> String {
    if top.is_empty() {
        return titled("Top Most Sold Products", EMPTY.to_string());
    }
    let mut table = Table::new();
    table.set_header(vec!["#", "Product", "Total Items"]);
    for (i, p) in top.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&p.product),
            right(number(p.total_items)),
        ]);
    }
    titled(&format!("Top {} Most Sold Products", top.len()), table.to_string())
}

pub fn format_histogram(hist: &Histogram) -> String {
    let title = "Total Products Sold by Basket Size Range";
    if hist.buckets.is_empty() {
        return titled(title, EMPTY.to_string());
    }
    let max = hist.buckets.iter().map(|b| b.total_items).max().unwrap_or(0).max(1);
    let mut table = Table::new();
    table.set_header(vec!["Basket Size", "Total Items Sold", ""]);
    for b in &hist.buckets {
        let len = (b.total_items as f64 / max as f64 * BAR_WIDTH as f64).round() as usize;
        table.add_row(vec![
            Cell::new(b.label()),
            right(number(b.total_items)),
            Cell::new("█".repeat(len)),
        ]);
    }
    let mut out = table.to_string();
    if let Some(mean) = hist.mean {
        out.push_str(&format!("\nAverage per bucket: {mean:.2}"));
    }
    titled(title, out)
}

pub fn format_seasonal(rollup: &SeasonalRollup) -> String {
    let title = "Total Sales Cost by Season and Year";
    if rollup.is_empty() {
        return titled(title, EMPTY.to_string());
    }
    let mut table = Table::new();
    let mut header = vec!["Year".to_string()];
    header.extend(Season::ALL.iter().map(|s| s.to_string()));
    table.set_header(header);

    for year in rollup.years() {
        let mut row = vec![Cell::new(year)];
        for season in Season::ALL {
            let cell = match rollup.get(season, year) {
                Some(cost) => money_whole(cost),
                None => "-".to_string(),
            };
            row.push(right(cell));
        }
        table.add_row(row);
    }

    let mut out = table.to_string();
    if rollup.excluded_rows > 0 {
        out.push_str(&format!(
            "\n{} rows left out (unknown season, bad date or bad cost)",
            number(rollup.excluded_rows as u64)
        ));
    }
    titled(title, out)
}

pub fn format_summary(summary: &Summary, highlights: &Highlights) -> String {
    let mut table = Table::new();
    table.set_header(vec!["", ""]);
    table.add_row(vec![
        Cell::new("Transactions"),
        right(number(summary.transactions as u64)),
    ]);
    table.add_row(vec![Cell::new("Total items"), right(number(summary.total_items))]);
    table.add_row(vec![
        Cell::new("Average items per transaction"),
        right(
            summary
                .average_items
                .map(|a| format!("{a:.2}"))
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    table.add_row(vec![Cell::new("Total cost"), right(money(summary.total_cost))]);
    table.add_row(vec![
        Cell::new("Most sold product"),
        right(
            highlights
                .most_sold
                .as_ref()
                .map(|p| format!("{} ({})", p.product, number(p.total_items)))
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Busiest basket size"),
        right(
            highlights
                .busiest_bucket
                .as_ref()
                .map(|b| format!("{} ({} items)", b.label(), number(b.total_items)))
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Lowest-cost year"),
        right(
            highlights
                .cheapest_year
                .as_ref()
                .map(|y| format!("{} ({})", y.year, money_whole(y.total_cost)))
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Peak season"),
        right(
            highlights
                .peak
                .as_ref()
                .map(|p| format!("{} {} ({})", p.season, p.year, money_whole(p.total_cost)))
                .unwrap_or_else(|| "-".into()),
        ),
    ]);
    titled("Summary", table.to_string())
}

pub fn format_all(analysis: &Analysis) -> String {
    [
        format_summary(&analysis.summary, &analysis.highlights),
        format_top(&analysis.top_products),
        format_histogram(&analysis.histogram),
        format_seasonal(&analysis.seasonal),
    ]
    .join("\n\n")
}
