//! Retrieval half of the acquisition pipeline.
//!
//! Takes the ordered items found by the catalog search and turns them into
//! one analysis-ready [`Dataset`]:
//!
//! ```text
//! SearchCoordinator (catalog crate)
//!      │ Vec<CatalogItem>
//!      ▼
//! AssetLoader::open(item, bands)          metadata only, one window per band
//!      │
//!      ▼
//! SpatialProcessor::process(window)        clip + reproject via RasterEngine
//!      │                                    into the query's UTM grid
//!      ▼
//! TemporalGrouper::group(steps)            same-day merge, first valid wins
//!      │
//!      ▼
//! DatasetAssembler::assemble(steps)        (time, band, y, x) in request order
//! ```
//!
//! Pixel reading and resampling are delegated to a [`RasterEngine`]
//! implementation supplied by the caller. [`Pipeline`] wires the stages
//! together with bounded per-item concurrency and cancellation.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod grouping;
pub mod loader;
pub mod pipeline;
pub mod spatial;

pub use config::AcquisitionConfig;
pub use dataset::{Dataset, DatasetAssembler, PixelBuffer};
pub use engine::{AssetInfo, EngineError, PixelGrid, RasterEngine, ReadRequest, Resampling};
pub use grouping::{MergedTimeStep, TemporalGrouper};
pub use loader::{AssetLoader, OpenedItem, RasterWindow};
pub use pipeline::{Acquisition, Pipeline};
pub use spatial::{SpatialPlan, SpatialProcessor};
