use crate::dataset::{self, LoadMode, LoadSource};
use crate::error::{BasketError, Result};
use crate::fmt::{format_bytes, number};
use crate::settings::load_settings;

pub fn run(mode: LoadMode, force: bool) -> Result<()> {
    let mode = match mode {
        LoadMode::Local(path) => {
            return Err(BasketError::Other(format!(
                "--csv {} reads a local file; there is nothing to fetch",
                path.display()
            )))
        }
        LoadMode::Offline => {
            return Err(BasketError::Other("`fetch` cannot run with --offline".into()))
        }
        LoadMode::Auto | LoadMode::Refresh if force => LoadMode::Refresh,
        other => other,
    };

    let settings = load_settings();
    let loaded = dataset::load(&settings, mode)?;

    match &loaded.source {
        LoadSource::Download(manifest) => {
            println!("Downloaded {}", settings.cache_path().display());
            println!("  Size:     {}", format_bytes(manifest.bytes));
            println!("  SHA-256:  {}", manifest.sha256);
            println!("  Fetched:  {}", manifest.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        LoadSource::Cache { path, freshness } => {
            println!("Cached copy is {}: {}", freshness.label(), path.display());
            println!("Use `basket fetch --force` to download again.");
        }
        LoadSource::Local(_) => {}
    }

    println!(
        "Rows: {} loaded, {} rejected",
        number(loaded.dataset.len() as u64),
        number(loaded.dataset.rejected().len() as u64)
    );
    Ok(())
}
