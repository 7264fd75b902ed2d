use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum EstuaryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store lock poisoned: {0}")]
    Lock(String),

    #[error("{0}")]
    Other(String),
}

impl EstuaryError {
    /// Wrap any failure of a single source so it can be reported without
    /// leaking transport details to callers.
    pub fn fetch_failed(url: &str, reason: impl ToString) -> Self {
        EstuaryError::FetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<ConfigError> for EstuaryError {
    fn from(e: ConfigError) -> Self {
        EstuaryError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EstuaryError>;
