//! Lazy asset opening.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use catalog::{CatalogItem, ResolvedBandSet};
use sat_common::{AcquisitionError, AcquisitionResult};

use crate::engine::{AssetInfo, EngineError, PixelGrid, RasterEngine, ReadRequest};

/// An opened, not yet read asset of one band.
///
/// Holds the engine's asset handle until it is read or dropped; either way
/// the engine is told to release it exactly once.
pub struct RasterWindow {
    item_id: String,
    band: String,
    asset: AssetInfo,
    engine: Arc<dyn RasterEngine>,
}

impl RasterWindow {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// Native band name.
    pub fn band(&self) -> &str {
        &self.band
    }

    pub fn asset(&self) -> &AssetInfo {
        &self.asset
    }

    /// Read pixels into the request grid, consuming the window.
    pub async fn read(self, request: &ReadRequest) -> Result<PixelGrid, EngineError> {
        self.engine.windowed_read(&self.asset, request).await
    }
}

impl Drop for RasterWindow {
    fn drop(&mut self) {
        self.engine.release(&self.asset);
    }
}

impl std::fmt::Debug for RasterWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterWindow")
            .field("item_id", &self.item_id)
            .field("band", &self.band)
            .field("href", &self.asset.href)
            .finish()
    }
}

/// The windows opened for one item plus the bands it could not provide.
#[derive(Debug)]
pub struct OpenedItem {
    pub item: CatalogItem,
    /// Keyed by native band name.
    pub windows: BTreeMap<String, RasterWindow>,
    pub dropped_bands: Vec<String>,
}

impl OpenedItem {
    /// True when no requested band could be opened; the item is excluded.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Opens the assets of catalog items through a [`RasterEngine`].
#[derive(Clone)]
pub struct AssetLoader {
    engine: Arc<dyn RasterEngine>,
}

impl AssetLoader {
    pub fn new(engine: Arc<dyn RasterEngine>) -> Self {
        Self { engine }
    }

    /// Open one window per resolved native band of `item`.
    ///
    /// A band whose asset is absent from the item, or which the engine
    /// reports as not found, is dropped for this item only. Any other
    /// engine failure fails the item and releases what was already opened.
    #[instrument(skip_all, fields(item_id = %item.id, provider = %item.provider))]
    pub async fn open(
        &self,
        item: &CatalogItem,
        bands: &ResolvedBandSet,
    ) -> AcquisitionResult<OpenedItem> {
        let mut dropped_bands = Vec::new();
        let mut pending = Vec::new();

        for native in bands.natives() {
            match item.asset(&native) {
                Some(asset) => pending.push((native, asset.href.clone())),
                None => {
                    warn!(
                        item_id = %item.id,
                        band = %native,
                        provider = %item.provider,
                        "Asset missing for band, dropping band for this item"
                    );
                    dropped_bands.push(native);
                }
            }
        }

        let opened = join_all(pending.into_iter().map(|(native, href)| {
            let engine = self.engine.clone();
            async move {
                let result = engine.open(&href).await;
                (native, result)
            }
        }))
        .await;

        let mut windows = BTreeMap::new();
        let mut failure = None;

        for (native, result) in opened {
            match result {
                Ok(asset) => {
                    windows.insert(
                        native.clone(),
                        RasterWindow {
                            item_id: item.id.clone(),
                            band: native,
                            asset,
                            engine: self.engine.clone(),
                        },
                    );
                }
                Err(EngineError::NotFound(message)) => {
                    warn!(
                        item_id = %item.id,
                        band = %native,
                        provider = %item.provider,
                        error = %message,
                        "Asset not found, dropping band for this item"
                    );
                    dropped_bands.push(native);
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(AcquisitionError::Reprojection {
                            item_id: item.id.clone(),
                            band: native,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(error) = failure {
            // Windows opened so far are released on drop.
            return Err(error);
        }

        if windows.is_empty() {
            warn!(
                item_id = %item.id,
                provider = %item.provider,
                "No requested band available, excluding item"
            );
        } else {
            debug!(opened = windows.len(), dropped = dropped_bands.len(), "Item assets opened");
        }

        Ok(OpenedItem {
            item: item.clone(),
            windows,
            dropped_bands,
        })
    }
}
