//! Writes dataset time steps to local and object-storage destinations.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::ObjectStore;
use tracing::{debug, info, instrument, warn};

use acquisition::{Dataset, PixelBuffer};

use crate::error::{SaveError, SaveResult};
use crate::geotiff::GeoTiffWriter;
use crate::naming::{ArtifactFormat, ArtifactName, DEFAULT_IDENTIFIER, MERGED_LABEL};
use crate::npy::encode_npy;
use crate::params::SaveParams;

/// Outcome of one output file.
#[derive(Debug)]
pub struct ArtifactResult {
    pub time: DateTime<Utc>,
    pub format: ArtifactFormat,
    /// `merged` or the native band name.
    pub bands: String,
    /// Path relative to the output root.
    pub relative_path: String,
    /// Destinations written successfully.
    pub locations: Vec<String>,
    /// Encoded size in bytes.
    pub outcome: SaveResult<usize>,
}

impl ArtifactResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

struct Destination {
    store: Arc<dyn ObjectStore>,
    kind: DestinationKind,
}

enum DestinationKind {
    Local,
    S3 { bucket: String },
}

impl Destination {
    fn key(&self, params: &SaveParams, relative: &str) -> String {
        match self.kind {
            DestinationKind::Local => relative.to_string(),
            DestinationKind::S3 { .. } => params.s3_key(relative),
        }
    }

    fn location(&self, params: &SaveParams, key: &str) -> String {
        match &self.kind {
            DestinationKind::Local => params.output_path.join(key).display().to_string(),
            DestinationKind::S3 { bucket } => format!("s3://{}/{}", bucket, key),
        }
    }
}

/// One artifact before encoding: which time step and which bands.
struct ArtifactJob {
    time_index: usize,
    format: ArtifactFormat,
    band: Option<usize>,
    label: String,
}

/// Saves datasets according to [`SaveParams`].
///
/// Every artifact is encoded in memory and then written to each enabled
/// destination, so S3-only saves never touch the local disk.
pub struct SaveDispatcher {
    params: SaveParams,
    destinations: Vec<Destination>,
}

impl SaveDispatcher {
    /// Dispatcher with a local filesystem store and an S3 store configured
    /// from the environment, as enabled in `params`.
    pub fn new(params: SaveParams) -> SaveResult<Self> {
        params.validate()?;

        let local = if params.save_to_local {
            std::fs::create_dir_all(&params.output_path).map_err(|e| SaveError::Destination {
                destination: params.output_path.display().to_string(),
                message: e.to_string(),
            })?;
            let store = LocalFileSystem::new_with_prefix(&params.output_path).map_err(|e| {
                SaveError::Destination {
                    destination: params.output_path.display().to_string(),
                    message: e.to_string(),
                }
            })?;
            Some(Arc::new(store) as Arc<dyn ObjectStore>)
        } else {
            None
        };

        let s3 = if params.save_to_s3 {
            let bucket = params.s3_bucket.clone().unwrap_or_default();
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(&bucket)
                .build()
                .map_err(|e| SaveError::Destination {
                    destination: format!("s3://{}", bucket),
                    message: e.to_string(),
                })?;
            Some(Arc::new(store) as Arc<dyn ObjectStore>)
        } else {
            None
        };

        Self::with_stores(params, local, s3)
    }

    /// Dispatcher over caller-provided stores.
    pub fn with_stores(
        params: SaveParams,
        local: Option<Arc<dyn ObjectStore>>,
        s3: Option<Arc<dyn ObjectStore>>,
    ) -> SaveResult<Self> {
        params.validate()?;

        let mut destinations = Vec::new();
        match (params.save_to_local, local) {
            (true, Some(store)) => destinations.push(Destination {
                store,
                kind: DestinationKind::Local,
            }),
            (true, None) => {
                return Err(SaveError::InvalidParams(
                    "save_to_local is set but no local store was given".to_string(),
                ))
            }
            (false, _) => {}
        }
        match (params.save_to_s3, s3) {
            (true, Some(store)) => destinations.push(Destination {
                store,
                kind: DestinationKind::S3 {
                    bucket: params.s3_bucket.clone().unwrap_or_default(),
                },
            }),
            (true, None) => {
                return Err(SaveError::InvalidParams(
                    "save_to_s3 is set but no S3 store was given".to_string(),
                ))
            }
            (false, _) => {}
        }

        Ok(Self {
            params,
            destinations,
        })
    }

    pub fn params(&self) -> &SaveParams {
        &self.params
    }

    /// Write every time step of `dataset`. One result per artifact; a
    /// failed artifact does not stop the others.
    #[instrument(skip_all, fields(satellite = %dataset.satellite, identifier = %identifier))]
    pub async fn dispatch(&self, dataset: &Dataset, identifier: &str) -> Vec<ArtifactResult> {
        let identifier = if identifier.trim().is_empty() {
            DEFAULT_IDENTIFIER
        } else {
            identifier
        };

        let jobs = self.plan_jobs(dataset);
        let results = join_all(
            jobs.into_iter()
                .map(|job| self.save_artifact(dataset, identifier, job)),
        )
        .await;

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            warn!(
                artifacts = results.len(),
                failed = failed,
                "Some artifacts could not be saved"
            );
        } else {
            info!(artifacts = results.len(), "Dataset saved");
        }
        results
    }

    fn plan_jobs(&self, dataset: &Dataset) -> Vec<ArtifactJob> {
        let mut jobs = Vec::new();
        for time_index in 0..dataset.times.len() {
            for format in self.params.formats() {
                if self.params.merge_bands {
                    jobs.push(ArtifactJob {
                        time_index,
                        format,
                        band: None,
                        label: MERGED_LABEL.to_string(),
                    });
                } else {
                    for (band_index, band) in dataset.bands.iter().enumerate() {
                        jobs.push(ArtifactJob {
                            time_index,
                            format,
                            band: Some(band_index),
                            label: band.native.clone(),
                        });
                    }
                }
            }
        }
        jobs
    }

    async fn save_artifact(
        &self,
        dataset: &Dataset,
        identifier: &str,
        job: ArtifactJob,
    ) -> ArtifactResult {
        let time = dataset.times[job.time_index];
        let provider = dataset
            .providers
            .get(job.time_index)
            .map(|providers| {
                providers
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .unwrap_or_default();

        let name = ArtifactName {
            satellite: &dataset.satellite,
            datetime: time,
            identifier,
            bands: &job.label,
            provider: &provider,
            format: job.format,
        };

        let mut result = ArtifactResult {
            time,
            format: job.format,
            bands: job.label.clone(),
            relative_path: String::new(),
            locations: Vec::new(),
            outcome: Ok(0),
        };

        let relative = match name.relative_path(self.params.custom_naming.as_deref()) {
            Ok(path) => path,
            Err(e) => {
                warn!(time = %time, bands = %job.label, error = %e, "Cannot name artifact");
                result.outcome = Err(e);
                return result;
            }
        };
        result.relative_path = relative.clone();

        let encoded = match self.encode(dataset, &job) {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!(path = %relative, error = %e, "Cannot encode artifact");
                result.outcome = Err(e);
                return result;
            }
        };
        let size = encoded.len();

        for destination in &self.destinations {
            let key = destination.key(&self.params, &relative);
            let location = destination.location(&self.params, &key);

            match destination.store.put(&Path::from(key.as_str()), encoded.clone()).await {
                Ok(_) => {
                    debug!(location = %location, bytes = size, "Artifact written");
                    result.locations.push(location);
                }
                Err(e) => {
                    warn!(location = %location, error = %e, "Artifact write failed");
                    if result.outcome.is_ok() {
                        result.outcome = Err(SaveError::Store {
                            location,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        if result.outcome.is_ok() {
            result.outcome = Ok(size);
        }
        result
    }

    fn encode(&self, dataset: &Dataset, job: &ArtifactJob) -> SaveResult<Vec<u8>> {
        let (buffer, band_count) = match job.band {
            Some(band) => (dataset.plane(job.time_index, band), 1),
            None => (dataset.time_step(job.time_index), dataset.bands.len()),
        };
        let buffer: PixelBuffer = buffer.ok_or_else(|| {
            SaveError::Encode(format!(
                "time step {} band {:?} is outside the dataset",
                job.time_index, job.band
            ))
        })?;

        match job.format {
            ArtifactFormat::GeoTiff => {
                GeoTiffWriter::new(dataset.crs, dataset.transform, dataset.fill_value)
                    .compression(self.params.enable_compression)
                    .encode(&buffer, band_count, dataset.height, dataset.width)
            }
            ArtifactFormat::Numpy => {
                if job.band.is_some() {
                    encode_npy(&buffer, &[dataset.height, dataset.width])
                } else {
                    encode_npy(&buffer, &[band_count, dataset.height, dataset.width])
                }
            }
        }
    }
}
