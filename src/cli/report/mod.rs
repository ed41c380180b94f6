pub mod text;

use colored::Colorize;
use serde_json::json;
use tracing::debug;

use crate::dataset::{self, LoadMode};
use crate::error::Result;
use crate::reports::{self, Analysis};
use crate::settings::load_settings;

use super::{OutputFormat, ReportCommands};

pub fn dispatch(mode: LoadMode, cmd: ReportCommands) -> Result<()> {
    let args = cmd.args();
    // Bad filter flags fail before anything is downloaded.
    let filter = args.filter.to_filter()?;

    let settings = load_settings();
    let loaded = dataset::load(&settings, mode)?;
    debug!(filter = %filter.describe(), rows = loaded.dataset.len(), "running report");
    let analysis = reports::analyze(&loaded.dataset, &filter, settings.top_n);

    let out = match args.format {
        OutputFormat::Json => render_json(&cmd, &analysis, &filter.describe())?,
        OutputFormat::Text => {
            let body = render_text(&cmd, &analysis);
            format!("{} {}\n\n{body}", "Filters:".dimmed(), filter.describe())
        }
    };
    println!("{out}");
    Ok(())
}

fn render_text(cmd: &ReportCommands, analysis: &Analysis) -> String {
    match cmd {
        ReportCommands::Top(_) => text::format_top(&analysis.top_products),
        ReportCommands::Histogram(_) => text::format_histogram(&analysis.histogram),
        ReportCommands::Seasonal(_) => text::format_seasonal(&analysis.seasonal),
        ReportCommands::Summary(_) => text::format_summary(&analysis.summary, &analysis.highlights),
        ReportCommands::All(_) => text::format_all(analysis),
    }
}

fn render_json(cmd: &ReportCommands, analysis: &Analysis, filter: &str) -> Result<String> {
    let value = match cmd {
        ReportCommands::Top(_) => serde_json::to_value(&analysis.top_products)?,
        ReportCommands::Histogram(_) => serde_json::to_value(&analysis.histogram)?,
        ReportCommands::Seasonal(_) => serde_json::to_value(&analysis.seasonal)?,
        ReportCommands::Summary(_) => json!({
            "filter": filter,
            "summary": analysis.summary,
            "highlights": analysis.highlights,
        }),
        ReportCommands::All(_) => json!({
            "filter": filter,
            "analysis": analysis,
        }),
    };
    Ok(serde_json::to_string_pretty(&value)?)
}
