use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;
use crate::error::{BasketError, Result};
use crate::fetch::{default_dataset_url, DATASET_FILE_NAME};
use crate::reports::TOP_N;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
    /// Hours before a cached download is refetched. 0 keeps it forever.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    #[serde(default)]
    pub expected_sha256: Option<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_cache_ttl_hours() -> u64 {
    24 * 7
}

fn default_top_n() -> usize {
    TOP_N
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            dataset_url: default_dataset_url(),
            cache_ttl_hours: default_cache_ttl_hours(),
            expected_sha256: None,
            top_n: default_top_n(),
        }
    }
}

impl Settings {
    pub fn cache_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(DATASET_FILE_NAME)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: match self.cache_ttl_hours {
                0 => None,
                h => Some(chrono::Duration::hours(h as i64)),
            },
            expected_sha256: self
                .expected_sha256
                .as_ref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("basket")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("basket")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| BasketError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            cache_ttl_hours: 0,
            expected_sha256: Some("ABC".to_string()),
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.cache_ttl_hours, 0);
        assert_eq!(loaded.expected_sha256.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.cache_ttl_hours, 168);
        assert_eq!(s.top_n, 10);
        assert_eq!(s.dataset_url, default_dataset_url());
        assert!(s.expected_sha256.is_none());
    }

    #[test]
    fn test_cache_policy_from_settings() {
        let s = Settings {
            cache_ttl_hours: 0,
            expected_sha256: Some("  ".to_string()),
            ..Settings::default()
        };
        let policy = s.cache_policy();
        assert!(policy.ttl.is_none());
        assert!(policy.expected_sha256.is_none());

        let s = Settings {
            cache_ttl_hours: 2,
            expected_sha256: Some("AbCd".to_string()),
            ..Settings::default()
        };
        let policy = s.cache_policy();
        assert_eq!(policy.ttl, Some(chrono::Duration::hours(2)));
        assert_eq!(policy.expected_sha256.as_deref(), Some("abcd"));
    }

    #[test]
    fn test_cache_path_under_data_dir() {
        let s = Settings {
            data_dir: "/tmp/basket".to_string(),
            ..Settings::default()
        };
        assert_eq!(s.cache_path(), PathBuf::from("/tmp/basket").join(DATASET_FILE_NAME));
    }
}
