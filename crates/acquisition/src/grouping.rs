//! Temporal grouping of processed items into time steps.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use geo::{BooleanOps, MultiPolygon};
use tracing::debug;

use catalog::{CatalogItem, GroupingMode, Provider};
use sat_common::{AcquisitionError, AcquisitionResult};

use crate::engine::PixelGrid;

/// One output time index: one or more items composited together.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTimeStep {
    /// Earliest acquisition time of the members.
    pub datetime: DateTime<Utc>,
    pub item_ids: Vec<String>,
    pub providers: Vec<Provider>,
    /// Union of the member footprints (geographic).
    pub footprint: MultiPolygon<f64>,
    /// Composite grids keyed by native band name.
    pub bands: BTreeMap<String, PixelGrid>,
}

impl MergedTimeStep {
    /// A single processed item as its own time step.
    pub fn from_item(item: &CatalogItem, bands: BTreeMap<String, PixelGrid>) -> Self {
        Self {
            datetime: item.datetime,
            item_ids: vec![item.id.clone()],
            providers: vec![item.provider],
            footprint: item.footprint.clone(),
            bands,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.datetime.date_naive()
    }

    /// Fold `other` into this step. Pixels already valid here are kept;
    /// invalid ones (fill or NaN) take `other`'s value.
    fn absorb(&mut self, other: MergedTimeStep, fill: f32) -> AcquisitionResult<()> {
        for (band, incoming) in other.bands {
            match self.bands.get_mut(&band) {
                None => {
                    self.bands.insert(band, incoming);
                }
                Some(current) => {
                    if current.shape() != incoming.shape() {
                        return Err(AcquisitionError::InconsistentShape(format!(
                            "band {} is {:?} in {} but {:?} in {}",
                            band,
                            current.shape(),
                            self.item_ids.join("+"),
                            incoming.shape(),
                            other.item_ids.join("+"),
                        )));
                    }
                    for (dst, src) in current.data.iter_mut().zip(incoming.data) {
                        if !is_valid(*dst, fill) && is_valid(src, fill) {
                            *dst = src;
                        }
                    }
                }
            }
        }

        self.datetime = self.datetime.min(other.datetime);
        self.item_ids.extend(other.item_ids);
        for provider in other.providers {
            if !self.providers.contains(&provider) {
                self.providers.push(provider);
            }
        }
        self.footprint = self.footprint.union(&other.footprint);
        Ok(())
    }
}

fn is_valid(value: f32, fill: f32) -> bool {
    !value.is_nan() && value != fill
}

/// Merges time steps according to a [`GroupingMode`].
///
/// Input order is the time-axis order (acquisition time when sorting,
/// provider order otherwise); groups keep the position of their first
/// member and composite in that order, so the first valid value wins.
#[derive(Debug, Clone, Copy)]
pub struct TemporalGrouper {
    mode: GroupingMode,
    fill: f32,
    static_product: bool,
}

impl TemporalGrouper {
    pub fn new(mode: GroupingMode, fill: f64) -> Self {
        Self {
            mode,
            fill: fill as f32,
            static_product: false,
        }
    }

    /// Time-independent products collapse into a single step.
    pub fn static_product(mut self, is_static: bool) -> Self {
        self.static_product = is_static;
        self
    }

    pub fn group(&self, steps: Vec<MergedTimeStep>) -> AcquisitionResult<Vec<MergedTimeStep>> {
        let input = steps.len();
        let mut groups: Vec<MergedTimeStep> = Vec::with_capacity(steps.len());

        for step in steps {
            let target = if self.static_product {
                groups.first_mut()
            } else {
                match self.mode {
                    GroupingMode::SolarDay => groups.iter_mut().find(|g| g.day() == step.day()),
                    // Identical instants would break the duplicate-free time axis.
                    GroupingMode::None => groups.iter_mut().find(|g| g.datetime == step.datetime),
                }
            };

            match target {
                Some(group) => group.absorb(step, self.fill)?,
                None => groups.push(step),
            }
        }

        debug!(
            mode = ?self.mode,
            static_product = self.static_product,
            input = input,
            output = groups.len(),
            "Time steps grouped"
        );
        Ok(groups)
    }
}
