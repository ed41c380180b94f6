use thiserror::Error;

#[derive(Error, Debug)]
pub enum BasketError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "fetch")]
    #[error("Download error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download of {url} failed with status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Downloaded file is not CSV (got an HTML page from {0})")]
    NotCsv(String),

    #[error("Dataset is missing required column: {0}")]
    MissingColumn(String),

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("No usable cached dataset at {0}. Run `basket fetch` first.")]
    NoCachedData(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BasketError>;
