use crate::error::{BasketError, Result};
use crate::settings::{load_settings, save_settings, settings_path, shellexpand_path, Settings};

pub fn run(
    data_dir: Option<String>,
    url: Option<String>,
    ttl_hours: Option<u64>,
    sha256: Option<String>,
    top_n: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings();
    let changed = apply(&mut settings, data_dir, url, ttl_hours, sha256, top_n)?;
    if changed {
        save_settings(&settings)?;
        println!("Saved {}", settings_path().display());
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn apply(
    settings: &mut Settings,
    data_dir: Option<String>,
    url: Option<String>,
    ttl_hours: Option<u64>,
    sha256: Option<String>,
    top_n: Option<usize>,
) -> Result<bool> {
    let mut changed = false;
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
        changed = true;
    }
    if let Some(url) = url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(BasketError::Settings(format!("not an http(s) URL: {url}")));
        }
        settings.dataset_url = url;
        changed = true;
    }
    if let Some(h) = ttl_hours {
        settings.cache_ttl_hours = h;
        changed = true;
    }
    if let Some(sum) = sha256 {
        let sum = sum.trim().to_lowercase();
        if sum.is_empty() {
            settings.expected_sha256 = None;
        } else if sum.len() == 64 && sum.chars().all(|c| c.is_ascii_hexdigit()) {
            settings.expected_sha256 = Some(sum);
        } else {
            return Err(BasketError::Settings(
                "sha256 must be 64 hex characters".into(),
            ));
        }
        changed = true;
    }
    if let Some(n) = top_n {
        if n == 0 {
            return Err(BasketError::Settings("top-n must be at least 1".into()));
        }
        settings.top_n = n;
        changed = true;
    }
    Ok(changed)
}
