//! JSON views printed by the CLI.

use std::collections::BTreeMap;

use serde::Serialize;

use acquisition::SpatialPlan;
use catalog::{CatalogItem, Provider, ResolvedBandSet, SatelliteProfile};
use sat_common::QueryContext;
use storage::{ArtifactFormat, SaveParams};

/// Registry entry plus the search methods it accepts.
#[derive(Debug, Serialize)]
pub struct ProfileSummary<'a> {
    #[serde(flatten)]
    pub profile: &'a SatelliteProfile,
    pub search_methods: Vec<&'static str>,
}

impl<'a> From<&'a SatelliteProfile> for ProfileSummary<'a> {
    fn from(profile: &'a SatelliteProfile) -> Self {
        Self {
            profile,
            search_methods: profile.search_methods(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemSummary<'a> {
    pub id: &'a str,
    pub provider: Provider,
    pub collection: &'a str,
    pub datetime: String,
    pub cloud_cover: Option<f64>,
    /// Native band name to asset href.
    pub assets: BTreeMap<&'a str, &'a str>,
}

impl<'a> From<&'a CatalogItem> for ItemSummary<'a> {
    fn from(item: &'a CatalogItem) -> Self {
        Self {
            id: &item.id,
            provider: item.provider,
            collection: &item.collection,
            datetime: item.datetime.to_rfc3339(),
            cloud_cover: item.cloud_cover,
            assets: item
                .assets
                .iter()
                .map(|(band, asset)| (band.as_str(), asset.href.as_str()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchReport<'a> {
    pub query: &'a QueryContext,
    pub bands: &'a ResolvedBandSet,
    pub plan: &'a SpatialPlan,
    /// Pixels inside the clip geometry.
    pub valid_pixels: usize,
    /// Distinct acquisition days among the items.
    pub acquisition_days: usize,
    pub items: Vec<ItemSummary<'a>>,
}

impl<'a> SearchReport<'a> {
    pub fn new(
        query: &'a QueryContext,
        bands: &'a ResolvedBandSet,
        plan: &'a SpatialPlan,
        items: &'a [CatalogItem],
    ) -> Self {
        let mut days: Vec<_> = items.iter().map(|item| item.datetime.date_naive()).collect();
        days.sort();
        days.dedup();

        Self {
            query,
            bands,
            plan,
            valid_pixels: plan.valid_pixels(),
            acquisition_days: days.len(),
            items: items.iter().map(ItemSummary::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArtifactPreview {
    pub format: ArtifactFormat,
    pub relative_path: String,
    pub local: Option<String>,
    pub s3: Option<String>,
}

impl ArtifactPreview {
    pub fn new(params: &SaveParams, format: ArtifactFormat, relative_path: String) -> Self {
        let local = params
            .save_to_local
            .then(|| params.output_path.join(&relative_path).display().to_string());
        let s3 = match (&params.s3_bucket, params.save_to_s3) {
            (Some(bucket), true) => Some(format!("s3://{}/{}", bucket, params.s3_key(&relative_path))),
            _ => None,
        };
        Self {
            format,
            relative_path,
            local,
            s3,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveParamsReport<'a> {
    pub params: &'a SaveParams,
    pub artifacts: Vec<ArtifactPreview>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::profile;

    #[test]
    fn test_profile_summary_lists_search_methods() {
        let s2 = serde_json::to_value(ProfileSummary::from(profile("S2MPC").unwrap())).unwrap();
        assert_eq!(s2["id"], "S2MPC");
        assert_eq!(s2["search_methods"], serde_json::json!(["geometry", "tile"]));

        let dem = serde_json::to_value(ProfileSummary::from(profile("COPDEM30MPC").unwrap()))
            .unwrap();
        assert_eq!(dem["search_methods"], serde_json::json!(["geometry"]));
    }
}
