//! End-to-end query execution.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use catalog::{
    profile, BandResolver, CatalogClient, CatalogError, CatalogItem, CatalogSession, Query,
    ResolvedBandSet, SearchCoordinator,
};
use sat_common::{AcquisitionError, AcquisitionResult, QueryError, WithQueryContext};

use crate::config::AcquisitionConfig;
use crate::dataset::{Dataset, DatasetAssembler};
use crate::engine::RasterEngine;
use crate::grouping::{MergedTimeStep, TemporalGrouper};
use crate::loader::AssetLoader;
use crate::spatial::SpatialProcessor;

/// Result of one query: the dataset plus what had to be left out.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub dataset: Dataset,
    /// Items whose requested bands were all missing.
    pub excluded_items: usize,
    /// (item id, native band) pairs dropped from otherwise usable items.
    pub dropped_bands: Vec<(String, String)>,
    /// Items returned by the catalog search.
    pub items_found: usize,
}

enum ItemOutcome {
    Processed {
        step: MergedTimeStep,
        dropped: Vec<String>,
    },
    Excluded {
        item_id: String,
        dropped: Vec<String>,
    },
}

/// Runs queries against a catalog client and a raster engine.
///
/// The catalog client is owned by the pipeline and shared by every request
/// of a query; dropping the pipeline closes it.
pub struct Pipeline {
    catalog: Arc<dyn CatalogClient>,
    engine: Arc<dyn RasterEngine>,
    config: AcquisitionConfig,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        engine: Arc<dyn RasterEngine>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            catalog,
            engine,
            config,
        }
    }

    /// Pipeline with an HTTP catalog session built from `config`.
    pub fn from_config(
        engine: Arc<dyn RasterEngine>,
        config: AcquisitionConfig,
    ) -> Result<Self, CatalogError> {
        config.validate().map_err(CatalogError::Permanent)?;
        let session = CatalogSession::new(config.request_timeout)?;
        Ok(Self::new(Arc::new(session), engine, config))
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    fn coordinator(&self) -> SearchCoordinator {
        SearchCoordinator::new(self.catalog.clone(), self.config.retry)
            .with_endpoints(self.config.endpoints.clone())
            .with_page_size(self.config.page_size)
            .with_max_items(self.config.max_items)
    }

    /// Run `query` to completion.
    pub async fn acquire(&self, query: &Query) -> Result<Acquisition, QueryError> {
        self.acquire_until(query, &CancellationToken::new()).await
    }

    /// Run `query` unless `cancel` fires first.
    ///
    /// On cancellation every opened window is released and no partial
    /// dataset is returned.
    pub async fn acquire_until(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Acquisition, QueryError> {
        let context = query.context();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(satellite = %query.satellite, "Query cancelled");
                Err(AcquisitionError::Cancelled)
            }
            result = self.run(query) => result,
        };

        result.with_query(&context)
    }

    #[instrument(skip_all, fields(satellite = %query.satellite))]
    async fn run(&self, query: &Query) -> AcquisitionResult<Acquisition> {
        let profile = profile(&query.satellite)?;
        let bands = BandResolver::resolve(profile, query.bands.as_deref())?;
        let processor = SpatialProcessor::new(query, profile)?;

        let items = self.coordinator().search(query, profile, &bands).await?;
        let items_found = items.len();

        let loader = AssetLoader::new(self.engine.clone());
        let outcomes: Vec<AcquisitionResult<ItemOutcome>> = stream::iter(items)
            .map(|item| process_item(item, &bands, &loader, &processor))
            .buffered(self.config.max_concurrent_items.max(1))
            .collect()
            .await;

        let mut steps = Vec::with_capacity(outcomes.len());
        let mut excluded_items = 0;
        let mut dropped_bands = Vec::new();

        for outcome in outcomes {
            match outcome? {
                ItemOutcome::Processed { step, dropped } => {
                    let item_id = step.item_ids.first().cloned().unwrap_or_default();
                    dropped_bands.extend(dropped.into_iter().map(|band| (item_id.clone(), band)));
                    steps.push(step);
                }
                ItemOutcome::Excluded { item_id, dropped } => {
                    excluded_items += 1;
                    dropped_bands.extend(dropped.into_iter().map(|band| (item_id.clone(), band)));
                }
            }
        }

        if steps.is_empty() {
            warn!(
                items_found = items_found,
                excluded = excluded_items,
                "Every item was excluded"
            );
            return Err(AcquisitionError::NoDataFound);
        }

        let grouped = TemporalGrouper::new(query.grouping, processor.plan().fill)
            .static_product(profile.is_static())
            .group(steps)?;

        let dataset = DatasetAssembler::new(profile, processor.plan())
            .with_dtype(query.dtype)
            .assemble(grouped, &bands)?;

        info!(
            items_found = items_found,
            excluded = excluded_items,
            dropped_bands = dropped_bands.len(),
            times = dataset.times.len(),
            "Acquisition complete"
        );

        Ok(Acquisition {
            dataset,
            excluded_items,
            dropped_bands,
            items_found,
        })
    }
}

async fn process_item(
    item: CatalogItem,
    bands: &ResolvedBandSet,
    loader: &AssetLoader,
    processor: &SpatialProcessor,
) -> AcquisitionResult<ItemOutcome> {
    let opened = loader.open(&item, bands).await?;
    if opened.is_empty() {
        return Ok(ItemOutcome::Excluded {
            item_id: item.id,
            dropped: opened.dropped_bands,
        });
    }

    let grids = try_join_all(opened.windows.into_iter().map(|(band, window)| async move {
        processor.process(window).await.map(|grid| (band, grid))
    }))
    .await?;

    let bands: BTreeMap<_, _> = grids.into_iter().collect();
    Ok(ItemOutcome::Processed {
        step: MergedTimeStep::from_item(&item, bands),
        dropped: opened.dropped_bands,
    })
}
