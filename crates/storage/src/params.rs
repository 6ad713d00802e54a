//! Save destination and encoding options.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{SaveError, SaveResult};
use crate::naming::ArtifactFormat;

/// Where and how a dataset is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveParams {
    /// Root of the local layout, also the base of S3 relative keys.
    pub output_path: PathBuf,
    pub save_to_local: bool,
    pub save_to_s3: bool,
    pub s3_bucket: Option<String>,
    /// Key prefix inside the bucket.
    pub s3_path: String,
    pub save_as_geotiff: bool,
    pub save_as_numpy: bool,
    /// DEFLATE for GeoTIFF output.
    pub enable_compression: bool,
    /// One artifact holding every band instead of one per band.
    pub merge_bands: bool,
    /// Filename template relative to `output_path`.
    pub custom_naming: Option<String>,
}

impl Default for SaveParams {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output"),
            save_to_local: true,
            save_to_s3: false,
            s3_bucket: None,
            s3_path: String::new(),
            save_as_geotiff: true,
            save_as_numpy: false,
            enable_compression: true,
            merge_bands: true,
            custom_naming: None,
        }
    }
}

impl SaveParams {
    pub fn validate(&self) -> SaveResult<()> {
        if !self.save_to_local && !self.save_to_s3 {
            return Err(SaveError::InvalidParams(
                "enable save_to_local or save_to_s3".to_string(),
            ));
        }

        if self.formats().is_empty() {
            return Err(SaveError::InvalidParams(
                "enable save_as_geotiff or save_as_numpy".to_string(),
            ));
        }

        if self.save_to_s3 && self.s3_bucket.as_deref().map_or(true, str::is_empty) {
            return Err(SaveError::InvalidParams(
                "s3_bucket is required when save_to_s3 is set".to_string(),
            ));
        }

        if self.save_to_local && self.output_path.as_os_str().is_empty() {
            return Err(SaveError::InvalidParams(
                "output_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Requested encodings, GeoTIFF first.
    pub fn formats(&self) -> Vec<ArtifactFormat> {
        let mut formats = Vec::new();
        if self.save_as_geotiff {
            formats.push(ArtifactFormat::GeoTiff);
        }
        if self.save_as_numpy {
            formats.push(ArtifactFormat::Numpy);
        }
        formats
    }

    /// Object key for a path relative to `output_path`.
    pub fn s3_key(&self, relative: &str) -> String {
        let prefix = self.s3_path.trim_matches('/');
        if prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", prefix, relative)
        }
    }
}
