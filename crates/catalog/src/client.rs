//! Metadata catalog client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::CatalogError;
use crate::stac::{HttpMethod, ItemCollection, PageRequest};

/// Fetches one page of STAC search results.
///
/// The pipeline never talks HTTP directly; tests substitute an in-memory
/// implementation to count and script requests.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError>;
}

/// HTTP session shared by all requests of one query.
#[derive(Debug, Clone)]
pub struct CatalogSession {
    client: Client,
}

impl CatalogSession {
    pub fn new(request_timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .user_agent(concat!("sat-acquire/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CatalogError::Permanent(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogClient for CatalogSession {
    #[instrument(skip(self, request), fields(url = %request.url, method = ?request.method))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => {
                let builder = self.client.post(&request.url);
                match &request.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::from_status(status.as_u16(), &body));
        }

        let bytes = response.bytes().await?;
        let page: ItemCollection = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::Permanent(format!("invalid STAC response: {}", e)))?;

        debug!(features = page.features.len(), "Fetched catalog page");
        Ok(page)
    }
}
