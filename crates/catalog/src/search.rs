//! Multi-provider search orchestration.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use sat_common::{AcquisitionError, AcquisitionResult};

use crate::bands::ResolvedBandSet;
use crate::client::CatalogClient;
use crate::item::CatalogItem;
use crate::profile::SatelliteProfile;
use crate::provider::{CatalogEndpoints, ProviderAdapter};
use crate::query::Query;
use crate::retry::{RetryFailure, RetryPolicy};

/// Default cap on the number of items a single query may return.
pub const DEFAULT_MAX_ITEMS: usize = 100;
/// Default STAC page size.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Searches every provider of a profile and merges the results.
///
/// Pages of one provider are fetched sequentially; different providers of
/// a fan-out profile are searched concurrently. Each page request is
/// wrapped in the retry policy, and a page whose retries are exhausted
/// fails the whole search rather than being skipped.
pub struct SearchCoordinator {
    client: Arc<dyn CatalogClient>,
    retry: RetryPolicy,
    endpoints: CatalogEndpoints,
    page_size: usize,
    max_items: usize,
}

impl SearchCoordinator {
    pub fn new(client: Arc<dyn CatalogClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            endpoints: CatalogEndpoints::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn with_endpoints(mut self, endpoints: CatalogEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    /// Adapters for the query. Fails on capability errors without any I/O.
    pub fn adapters(
        &self,
        query: &Query,
        profile: &'static SatelliteProfile,
    ) -> AcquisitionResult<Vec<ProviderAdapter>> {
        ProviderAdapter::for_query(profile, query, &self.endpoints, self.page_size)
    }

    /// Ordered, filtered, deduplicated items matching the query.
    #[instrument(skip_all, fields(satellite = %profile.id, bands = bands.len()))]
    pub async fn search(
        &self,
        query: &Query,
        profile: &'static SatelliteProfile,
        bands: &ResolvedBandSet,
    ) -> AcquisitionResult<Vec<CatalogItem>> {
        let adapters = self.adapters(query, profile)?;
        let max_items = query.max_items.unwrap_or(self.max_items);
        let ceiling = query
            .cloud_coverage
            .filter(|_| profile.applies_cloud_filter());

        let per_provider = try_join_all(
            adapters
                .iter()
                .map(|adapter| self.search_provider(adapter, query, bands, ceiling, max_items)),
        )
        .await?;

        let matched: usize = per_provider.iter().map(Vec::len).sum();
        let mut items = dedup(per_provider.into_iter().flatten().collect());

        if query.sort {
            items.sort_by_key(|item| item.datetime);
        }
        items.truncate(max_items);

        info!(
            matched = matched,
            returned = items.len(),
            providers = adapters.len(),
            "Catalog search finished"
        );

        if items.is_empty() {
            return Err(AcquisitionError::NoDataFound);
        }
        Ok(items)
    }

    /// Pages through one provider until `max_items` items pass the cloud
    /// ceiling or the provider runs out of pages.
    async fn search_provider(
        &self,
        adapter: &ProviderAdapter,
        query: &Query,
        bands: &ResolvedBandSet,
        ceiling: Option<f64>,
        max_items: usize,
    ) -> AcquisitionResult<Vec<CatalogItem>> {
        let provider = adapter.provider();
        let mut request = adapter.build_search_request(query, bands);
        let mut items = Vec::new();
        let mut page_number = 0usize;

        loop {
            page_number += 1;
            let label = format!("{} page {}", provider, page_number);
            let page = self
                .retry
                .run(&label, || self.client.fetch_page(&request))
                .await
                .map_err(|failure| match failure {
                    RetryFailure::Exhausted { attempts, last } => {
                        AcquisitionError::ProviderUnavailable {
                            provider: provider.to_string(),
                            attempts,
                            message: last.to_string(),
                        }
                    }
                    RetryFailure::Permanent { error, .. } => AcquisitionError::Catalog {
                        provider: provider.to_string(),
                        message: error.to_string(),
                    },
                })?;

            let mut normalized = adapter.normalize(&page, bands);
            let parsed = normalized.len();
            if let Some(ceiling) = ceiling {
                normalized.retain(|item| item.within_cloud_ceiling(ceiling));
            }
            debug!(
                provider = %provider,
                page = page_number,
                features = page.features.len(),
                items = parsed,
                kept = normalized.len(),
                "Catalog page normalized"
            );
            items.extend(normalized);

            if items.len() >= max_items {
                items.truncate(max_items);
                break;
            }

            match adapter.next_request(&page, &request) {
                Some(next) if !page.features.is_empty() => request = next,
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Drop repeated (timestamp, footprint) items, keeping the first occurrence.
fn dedup(items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.dedup_key()))
        .collect()
}
