//! Errors raised by catalog clients.

use thiserror::Error;

/// A failed catalog request, classified for retry.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// Timeouts, connection resets, HTTP 5xx and 429. Worth retrying.
    #[error("transient catalog failure: {0}")]
    Transient(String),

    /// HTTP 4xx, undecodable responses. Retrying will not help.
    #[error("catalog request failed: {0}")]
    Permanent(String),
}

impl CatalogError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transient(_))
    }

    /// Classify an HTTP status code returned by a catalog.
    pub fn from_status(status: u16, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        let message = format!("HTTP {}: {}", status, snippet);
        if status >= 500 || status == 429 || status == 408 {
            CatalogError::Transient(message)
        } else {
            CatalogError::Permanent(message)
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return CatalogError::Transient(err.to_string());
        }
        match err.status() {
            Some(status) => CatalogError::from_status(status.as_u16(), &err.to_string()),
            None if err.is_decode() => CatalogError::Permanent(err.to_string()),
            None => CatalogError::Transient(err.to_string()),
        }
    }
}
