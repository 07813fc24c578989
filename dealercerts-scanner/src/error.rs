use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Extraction failed for {hostname}: {reason}")]
    ExtractionFailed { hostname: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
