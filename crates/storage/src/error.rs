//! Error types for the save dispatcher.

use thiserror::Error;

/// Result type alias using SaveError.
pub type SaveResult<T> = Result<T, SaveError>;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Invalid save parameters: {0}")]
    InvalidParams(String),

    #[error("Naming template error: {0}")]
    Template(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Write to {location} failed: {message}")]
    Store { location: String, message: String },

    #[error("Failed to set up {destination} destination: {message}")]
    Destination { destination: String, message: String },
}

impl From<tiff::TiffError> for SaveError {
    fn from(e: tiff::TiffError) -> Self {
        SaveError::Encode(e.to_string())
    }
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Encode(e.to_string())
    }
}
