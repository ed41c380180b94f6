use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Sidecar written next to a downloaded dataset describing what was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub source_url: String,
    pub sha256: String,
    pub bytes: u64,
    pub fetched_at: DateTime<Utc>,
}

pub fn manifest_path(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".manifest.json");
    data_path.with_file_name(name)
}

pub fn read_manifest(data_path: &Path) -> Result<Option<CacheManifest>> {
    let path = manifest_path(data_path);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn write_manifest(data_path: &Path, manifest: &CacheManifest) -> Result<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(manifest_path(data_path), format!("{json}\n"))?;
    Ok(())
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Freshness policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    /// Maximum age of a cached download. `None` never expires.
    pub ttl: Option<Duration>,
    /// Pinned content hash. A cached file that does not hash to this is corrupt.
    pub expected_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    Missing,
    Fresh,
    Expired { age: Duration },
    Corrupt { expected: String, actual: String },
    /// File present but no manifest to check it against.
    Unverified,
}

impl Freshness {
    pub fn label(&self) -> String {
        match self {
            Freshness::Missing => "missing".to_string(),
            Freshness::Fresh => "fresh".to_string(),
            Freshness::Expired { age } => format!("expired ({}h old)", age.num_hours()),
            Freshness::Corrupt { .. } => "corrupt (checksum mismatch)".to_string(),
            Freshness::Unverified => "unverified (no manifest)".to_string(),
        }
    }
}

impl CachePolicy {
    /// Whether a cached file in this state may be reused without refetching.
    pub fn accepts(&self, freshness: &Freshness) -> bool {
        match freshness {
            Freshness::Fresh => true,
            Freshness::Unverified => self.ttl.is_none(),
            Freshness::Missing | Freshness::Expired { .. } | Freshness::Corrupt { .. } => false,
        }
    }
}

pub fn evaluate(data_path: &Path, policy: &CachePolicy, now: DateTime<Utc>) -> Result<Freshness> {
    if !data_path.exists() {
        return Ok(Freshness::Missing);
    }
    let actual = compute_checksum(data_path)?;

    if let Some(expected) = &policy.expected_sha256 {
        if !expected.eq_ignore_ascii_case(&actual) {
            return Ok(Freshness::Corrupt {
                expected: expected.to_lowercase(),
                actual,
            });
        }
    }

    let manifest = match read_manifest(data_path)? {
        Some(m) => m,
        None if policy.expected_sha256.is_some() => return Ok(Freshness::Fresh),
        None => return Ok(Freshness::Unverified),
    };

    if !manifest.sha256.eq_ignore_ascii_case(&actual) {
        return Ok(Freshness::Corrupt {
            expected: manifest.sha256,
            actual,
        });
    }

    if let Some(ttl) = policy.ttl {
        let age = now - manifest.fetched_at;
        if age > ttl {
            debug!(age_hours = age.num_hours(), "cached dataset past ttl");
            return Ok(Freshness::Expired { age });
        }
    }

    Ok(Freshness::Fresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_cached(dir: &Path, body: &str, fetched_at: DateTime<Utc>) -> PathBuf {
        let path = dir.join("data.csv");
        std::fs::write(&path, body).unwrap();
        let manifest = CacheManifest {
            source_url: "https://example.invalid/data.csv".into(),
            sha256: checksum_bytes(body.as_bytes()),
            bytes: body.len() as u64,
            fetched_at,
        };
        write_manifest(&path, &manifest).unwrap();
        path
    }

    #[test]
    fn test_manifest_path_is_sidecar() {
        let p = manifest_path(Path::new("/tmp/x/data.csv"));
        assert_eq!(p, PathBuf::from("/tmp/x/data.csv.manifest.json"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let f = evaluate(&dir.path().join("nope.csv"), &CachePolicy::default(), Utc::now()).unwrap();
        assert_eq!(f, Freshness::Missing);
    }

    #[test]
    fn test_fresh_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let path = write_cached(dir.path(), "a,b\n1,2\n", now - Duration::hours(1));
        let policy = CachePolicy {
            ttl: Some(Duration::hours(24)),
            expected_sha256: None,
        };
        assert_eq!(evaluate(&path, &policy, now).unwrap(), Freshness::Fresh);
    }

    #[test]
    fn test_expired_past_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let path = write_cached(dir.path(), "a,b\n1,2\n", now - Duration::hours(48));
        let policy = CachePolicy {
            ttl: Some(Duration::hours(24)),
            expected_sha256: None,
        };
        let f = evaluate(&path, &policy, now).unwrap();
        assert!(matches!(f, Freshness::Expired { .. }));
        assert!(!policy.accepts(&f));
    }

    #[test]
    fn test_tampered_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let path = write_cached(dir.path(), "a,b\n1,2\n", now);
        std::fs::write(&path, "a,b\n1,3\n").unwrap();
        let f = evaluate(&path, &CachePolicy::default(), now).unwrap();
        assert!(matches!(f, Freshness::Corrupt { .. }));
    }

    #[test]
    fn test_pinned_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let path = write_cached(dir.path(), "a,b\n1,2\n", now);
        let policy = CachePolicy {
            ttl: None,
            expected_sha256: Some("00".repeat(32)),
        };
        let f = evaluate(&path, &policy, now).unwrap();
        assert!(matches!(f, Freshness::Corrupt { .. }));
    }

    #[test]
    fn test_unverified_only_accepted_without_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a\n1\n").unwrap();
        let f = evaluate(&path, &CachePolicy::default(), Utc::now()).unwrap();
        assert_eq!(f, Freshness::Unverified);
        assert!(CachePolicy::default().accepts(&f));
        let strict = CachePolicy {
            ttl: Some(Duration::hours(1)),
            expected_sha256: None,
        };
        assert!(!strict.accepts(&f));
    }

    #[test]
    fn test_pinned_checksum_without_manifest_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a\n1\n").unwrap();
        let policy = CachePolicy {
            ttl: Some(Duration::hours(1)),
            expected_sha256: Some(checksum_bytes(b"a\n1\n").to_uppercase()),
        };
        assert_eq!(evaluate(&path, &policy, Utc::now()).unwrap(), Freshness::Fresh);
    }
}
