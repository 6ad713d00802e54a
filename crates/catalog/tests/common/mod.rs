//! Scripted in-memory STAC catalog shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use catalog::{CatalogClient, CatalogEndpoints, CatalogError, ItemCollection, PageRequest};
use test_utils::feature_collection;

pub const PC_URL: &str = "mock://planetary-computer/search";
pub const E84_URL: &str = "mock://earth-search/search";

pub fn endpoints() -> CatalogEndpoints {
    CatalogEndpoints {
        planetary_computer: PC_URL.to_string(),
        earth_search: E84_URL.to_string(),
    }
}

/// Serves features per endpoint URL, honouring the STAC `query` extension
/// (`eq` / `lte`), the `datetime` interval, `limit` and a `token` offset
/// carried in POST `next` links.
#[derive(Default)]
pub struct MockCatalog {
    features: HashMap<String, Vec<Value>>,
    failures: Mutex<VecDeque<CatalogError>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_features(mut self, url: &str, features: Vec<Value>) -> Self {
        self.features.entry(url.to_string()).or_default().extend(features);
        self
    }

    /// The next request fails with `error` (queued in order).
    pub fn fail_next(self, error: CatalogError) -> Self {
        self.failures.lock().unwrap().push_back(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn serve(&self, request: &PageRequest) -> Value {
        let body = request.body.clone().unwrap_or_else(|| json!({}));
        let matching: Vec<Value> = self
            .features
            .get(&request.url)
            .map(|all| all.iter().filter(|f| matches(f, &body)).cloned().collect())
            .unwrap_or_default();

        let limit = body["limit"].as_u64().unwrap_or(100) as usize;
        let offset = body["token"].as_u64().unwrap_or(0) as usize;
        let end = (offset + limit).min(matching.len());
        let page = matching.get(offset..end).map(<[Value]>::to_vec).unwrap_or_default();

        let next = (end < matching.len()).then(|| {
            json!({
                "rel": "next",
                "href": request.url,
                "method": "POST",
                "body": { "token": end },
                "merge": true
            })
        });
        feature_collection(page, next)
    }
}

fn matches(feature: &Value, body: &Value) -> bool {
    let properties = &feature["properties"];

    if let Some(filters) = body["query"].as_object() {
        for (property, clause) in filters {
            let value = &properties[property.as_str()];
            if let Some(expected) = clause.get("eq") {
                if value != expected {
                    return false;
                }
            }
            if let Some(ceiling) = clause.get("lte").and_then(Value::as_f64) {
                match value.as_f64() {
                    Some(v) if v <= ceiling => {}
                    _ => return false,
                }
            }
        }
    }

    if let Some(interval) = body["datetime"].as_str() {
        let (start, end) = interval.split_once('/').expect("closed interval");
        let parse = |s: &str| s.parse::<DateTime<Utc>>().expect("rfc3339 bound");
        let dt = parse(properties["datetime"].as_str().expect("item datetime"));
        if dt < parse(start) || dt > parse(end) {
            return false;
        }
    }
    true
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        serde_json::from_value(self.serve(request))
            .map_err(|e| CatalogError::Permanent(e.to_string()))
    }
}
