//! Error types for the acquisition pipeline.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using AcquisitionError.
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// Failure taxonomy of the search-retrieve-assemble pipeline.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    // === Parameter / capability errors (raised before any network call) ===
    #[error("Unknown satellite '{satellite}'. Known satellites: {}", known.join(", "))]
    UnknownSatellite { satellite: String, known: Vec<String> },

    #[error("Unknown band(s) {} for satellite {satellite}", bands.join(", "))]
    UnknownBand { satellite: String, bands: Vec<String> },

    #[error("{capability} is not supported by {satellite} on {provider}")]
    UnsupportedCapability {
        satellite: String,
        provider: String,
        capability: String,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // === Provider errors ===
    #[error("Provider {provider} unavailable after {attempts} attempts: {message}")]
    ProviderUnavailable {
        provider: String,
        attempts: u32,
        message: String,
    },

    #[error("Provider {provider} rejected the request: {message}")]
    Catalog { provider: String, message: String },

    #[error("No data found matching the query")]
    NoDataFound,

    // === Raster errors ===
    #[error("Inconsistent shape: {0}")]
    InconsistentShape(String),

    #[error("Reprojection failed for item {item_id}, band {band}: {message}")]
    Reprojection {
        item_id: String,
        band: String,
        message: String,
    },

    #[error("Query cancelled")]
    Cancelled,
}

impl AcquisitionError {
    pub fn unsupported(
        satellite: impl Into<String>,
        provider: impl Into<String>,
        capability: impl Into<String>,
    ) -> Self {
        AcquisitionError::UnsupportedCapability {
            satellite: satellite.into(),
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AcquisitionError::InvalidQuery(message.into())
    }

    /// Parameter and capability errors never reach the network.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            AcquisitionError::UnknownSatellite { .. }
                | AcquisitionError::UnknownBand { .. }
                | AcquisitionError::UnsupportedCapability { .. }
                | AcquisitionError::InvalidQuery(_)
        )
    }
}

/// The query parameters attached to every user visible failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryContext {
    pub satellite: String,
    pub geometry: String,
    pub date_range: Option<String>,
    pub bands: Vec<String>,
}

impl fmt::Display for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "satellite={} geometry={} dates={} bands=[{}]",
            self.satellite,
            self.geometry,
            self.date_range.as_deref().unwrap_or("none"),
            self.bands.join(",")
        )
    }
}

/// An [`AcquisitionError`] annotated with the query that produced it.
#[derive(Debug, Clone, Error)]
#[error("{source} ({context})")]
pub struct QueryError {
    pub context: QueryContext,
    #[source]
    pub source: AcquisitionError,
}

impl QueryError {
    pub fn kind(&self) -> &AcquisitionError {
        &self.source
    }
}

pub trait WithQueryContext<T> {
    fn with_query(self, context: &QueryContext) -> Result<T, QueryError>;
}

impl<T> WithQueryContext<T> for AcquisitionResult<T> {
    fn with_query(self, context: &QueryContext) -> Result<T, QueryError> {
        self.map_err(|source| QueryError {
            context: context.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_carries_parameters() {
        let context = QueryContext {
            satellite: "S2MPC".to_string(),
            geometry: "bbox(12.5,55.6,12.6,55.7)".to_string(),
            date_range: Some("2024-06-01/2024-06-15".to_string()),
            bands: vec!["red".to_string(), "nir".to_string()],
        };

        let err = Err::<(), _>(AcquisitionError::NoDataFound)
            .with_query(&context)
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("No data found"));
        assert!(message.contains("S2MPC"));
        assert!(message.contains("2024-06-01/2024-06-15"));
        assert!(message.contains("red,nir"));
        assert!(matches!(err.kind(), AcquisitionError::NoDataFound));
    }

    #[test]
    fn test_parameter_error_classification() {
        assert!(AcquisitionError::invalid("x").is_parameter_error());
        assert!(AcquisitionError::unsupported("S1MPC", "planetary_computer", "tile search")
            .is_parameter_error());
        assert!(!AcquisitionError::NoDataFound.is_parameter_error());
    }
}
