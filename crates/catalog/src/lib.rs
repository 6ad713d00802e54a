//! Catalog side of the acquisition pipeline.
//!
//! Turns an abstract [`Query`] into an ordered, deduplicated list of
//! provider-agnostic [`CatalogItem`]s:
//!
//! ```text
//!   Query ──► profile() ──► BandResolver ──► ProviderAdapter(s) ──► SearchCoordinator
//!              registry       common→native     request / normalize     paginate, retry,
//!                                                                        filter, dedup, sort
//! ```
//!
//! Parameter and capability problems (unknown satellite, unknown band,
//! tile search where unsupported) are detected before any request is
//! issued. Network access goes through the [`CatalogClient`] trait; the
//! production implementation is [`CatalogSession`], a reqwest client owned
//! by the caller for the lifetime of one query.

pub mod bands;
pub mod client;
pub mod error;
pub mod item;
pub mod profile;
pub mod provider;
pub mod query;
pub mod retry;
pub mod search;
pub mod stac;

pub use bands::{BandResolver, ResolvedBand, ResolvedBandSet};
pub use client::{CatalogClient, CatalogSession};
pub use error::CatalogError;
pub use item::{AssetRef, CatalogItem};
pub use profile::{profile, satellites, ProductKind, Provider, ProviderBinding, SatelliteProfile};
pub use provider::{CatalogEndpoints, ProviderAdapter};
pub use query::{ClipMethod, GroupingMode, Query, QueryBuilder, SearchMethod};
pub use retry::{RetryFailure, RetryPolicy};
pub use search::SearchCoordinator;
pub use stac::{HttpMethod, ItemCollection, PageRequest};
