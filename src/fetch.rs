use std::path::Path;

use crate::cache::CacheManifest;
use crate::error::Result;

/// Drive file id of the published retail transactions dataset.
pub const DATASET_FILE_ID: &str = "1unNEL3twDD3-tiUNWL1FrQe60nl0LA2-";

pub const DATASET_FILE_NAME: &str = "Retail_Transactions_Dataset.csv";

pub fn default_dataset_url() -> String {
    format!("https://drive.google.com/uc?export=download&confirm=t&id={DATASET_FILE_ID}")
}

/// Download `url` into `dest`, replacing it atomically, and write the manifest.
/// When `expected_sha256` is set the body must hash to it; otherwise `dest`
/// and its manifest are left untouched. No retry: any failure is returned to
/// the caller.
#[cfg(feature = "fetch")]
pub fn download(url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<CacheManifest> {
    use tracing::info;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let body = runtime.block_on(get_bytes(url))?;

    if looks_like_html(&body) {
        return Err(crate::error::BasketError::NotCsv(url.to_string()));
    }

    let sha256 = crate::cache::checksum_bytes(&body);
    if let Some(expected) = expected_sha256 {
        if !expected.eq_ignore_ascii_case(&sha256) {
            return Err(crate::error::BasketError::ChecksumMismatch {
                path: dest.display().to_string(),
                expected: expected.to_lowercase(),
                actual: sha256,
            });
        }
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = dest.with_extension("partial");
    std::fs::write(&tmp, &body)?;
    std::fs::rename(&tmp, dest)?;

    let manifest = CacheManifest {
        source_url: url.to_string(),
        sha256,
        bytes: body.len() as u64,
        fetched_at: chrono::Utc::now(),
    };
    crate::cache::write_manifest(dest, &manifest)?;
    info!(bytes = manifest.bytes, path = %dest.display(), "dataset downloaded");
    Ok(manifest)
}

#[cfg(not(feature = "fetch"))]
pub fn download(url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<CacheManifest> {
    let _ = (url, dest, expected_sha256);
    Err(crate::error::BasketError::Other(
        "Remote fetch requires the 'fetch' feature. Build with `cargo build --features fetch` or pass --csv".into(),
    ))
}

#[cfg(feature = "fetch")]
async fn get_bytes(url: &str) -> Result<Vec<u8>> {
    use tracing::debug;

    debug!(url, "requesting dataset");
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(crate::error::BasketError::HttpStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}

/// Drive serves an HTML interstitial instead of the file for some requests.
pub(crate) fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(512)];
    let text = String::from_utf8_lossy(head).trim_start().to_ascii_lowercase();
    text.starts_with("<!doctype html") || text.starts_with("<html")
}

#[cfg(test)]
pub(crate) mod tests {
    #[cfg(feature = "fetch")]
    use std::io::{Read, Write};
    #[cfg(feature = "fetch")]
    use std::net::TcpListener;

    use super::*;

    /// Answers a single HTTP request on a loopback port with `status` and
    /// `body`. Returns the URL to request.
    #[cfg(feature = "fetch")]
    pub(crate) fn serve_once(status: &'static str, body: &[u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_vec();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{addr}/dataset.csv")
    }

    #[test]
    fn test_default_url_contains_file_id() {
        assert!(default_dataset_url().ends_with(DATASET_FILE_ID));
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html(b"  <!DOCTYPE html><html><body>virus scan</body></html>"));
        assert!(looks_like_html(b"<html lang=\"en\">"));
        assert!(!looks_like_html(b"Transaction_ID,Date,Product\n1,2021-01-01,A\n"));
        assert!(!looks_like_html(b""));
    }

    #[cfg(feature = "fetch")]
    mod remote {
        use super::*;
        use crate::cache::{self, read_manifest};
        use crate::error::BasketError;

        const BODY: &[u8] = b"Product,Total_Items\nA,1\n";

        #[test]
        fn test_download_writes_file_and_manifest() {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("cache").join("data.csv");
            let url = serve_once("200 OK", BODY);

            let manifest = download(&url, &dest, None).unwrap();
            assert_eq!(std::fs::read(&dest).unwrap(), BODY);
            assert!(!dest.with_extension("partial").exists());
            assert_eq!(manifest.sha256, cache::checksum_bytes(BODY));
            assert_eq!(manifest.bytes, BODY.len() as u64);
            assert_eq!(manifest.source_url, url);
            assert_eq!(read_manifest(&dest).unwrap(), Some(manifest));
        }

        #[test]
        fn test_download_http_error() {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("data.csv");
            let url = serve_once("404 Not Found", b"gone");

            let err = download(&url, &dest, None).unwrap_err();
            assert!(matches!(err, BasketError::HttpStatus { status: 404, .. }));
            assert!(!dest.exists());
        }

        #[test]
        fn test_download_rejects_html_page() {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("data.csv");
            let url = serve_once("200 OK", b"<!DOCTYPE html><html>virus scan warning</html>");

            let err = download(&url, &dest, None).unwrap_err();
            assert!(matches!(err, BasketError::NotCsv(_)));
            assert!(!dest.exists());
        }

        #[test]
        fn test_download_pin_mismatch_keeps_existing_cache() {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("data.csv");
            let good = b"Product,Total_Items\nGood,2\n";
            std::fs::write(&dest, good).unwrap();
            let old = CacheManifest {
                source_url: "http://old".into(),
                sha256: cache::checksum_bytes(good),
                bytes: good.len() as u64,
                fetched_at: chrono::Utc::now(),
            };
            cache::write_manifest(&dest, &old).unwrap();

            let url = serve_once("200 OK", BODY);
            let err = download(&url, &dest, Some(&old.sha256)).unwrap_err();
            assert!(matches!(err, BasketError::ChecksumMismatch { .. }));
            assert_eq!(std::fs::read(&dest).unwrap(), good);
            assert_eq!(read_manifest(&dest).unwrap(), Some(old));
        }

        #[test]
        fn test_download_pin_match_is_accepted() {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("data.csv");
            let url = serve_once("200 OK", BODY);
            let pin = cache::checksum_bytes(BODY).to_uppercase();
            assert!(download(&url, &dest, Some(&pin)).is_ok());
            assert_eq!(std::fs::read(&dest).unwrap(), BODY);
        }
    }
}
