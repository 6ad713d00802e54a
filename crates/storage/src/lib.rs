//! Persistence of assembled datasets.
//!
//! Provides:
//! - File naming and the `{satellite}/{year}/{format}/{file}` layout
//! - GeoTIFF and NumPy `.npy` encoders
//! - A dispatcher writing to the local filesystem and/or S3 via `object_store`

pub mod dispatcher;
pub mod error;
pub mod geotiff;
pub mod naming;
pub mod npy;
pub mod params;

pub use dispatcher::{ArtifactResult, SaveDispatcher};
pub use error::{SaveError, SaveResult};
pub use geotiff::GeoTiffWriter;
pub use naming::{ArtifactFormat, ArtifactName};
pub use npy::encode_npy;
pub use params::SaveParams;
