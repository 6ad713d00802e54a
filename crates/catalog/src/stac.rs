//! STAC API wire types and pagination.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// One page request against a STAC `/search` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
}

impl PageRequest {
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A page of search results (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,
}

impl StacItem {
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    pub href: String,
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(default)]
    pub method: Option<HttpMethod>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub merge: bool,
}

impl ItemCollection {
    /// Request for the page after this one, following the `next` link.
    ///
    /// A POST link without a body repeats the previous body; with
    /// `merge: true` its body is merged over the previous one.
    pub fn next_request(&self, previous: &PageRequest) -> Option<PageRequest> {
        let link = self.links.iter().find(|l| l.rel == "next")?;
        let method = link.method.unwrap_or(HttpMethod::Get);

        let body = match method {
            HttpMethod::Get => None,
            HttpMethod::Post => match (&link.body, &previous.body) {
                (Some(Value::Object(next)), Some(Value::Object(prev))) if link.merge => {
                    let mut merged = prev.clone();
                    for (k, v) in next {
                        merged.insert(k.clone(), v.clone());
                    }
                    Some(Value::Object(merged))
                }
                (Some(next), _) => Some(next.clone()),
                (None, prev) => prev.clone(),
            },
        };

        Some(PageRequest {
            method,
            url: link.href.clone(),
            body,
        })
    }
}
