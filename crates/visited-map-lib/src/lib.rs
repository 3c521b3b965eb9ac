//! Visited Map Library - Zoom-aware clustering of visited places
//!
//! This library turns a list of geo-tagged places into render-ready map markers. Nearby places
//! are merged into clusters so that markers never overlap at the current zoom level, and
//! clusters split apart again as the user zooms in.
//!
//! # Architecture
//!
//! - **[`GeoPoint`]**: Immutable visited-place record, produced by [`normalize`]
//! - **[`ClusterIndex`]**: Hierarchical per-zoom clustering snapshot, rebuilt (never mutated)
//! - **[`ClusterResult`]**: Either a single [`GeoPoint`] leaf or a [`ClusterSummary`]
//! - **[`Expansion`]**: What to do when a cluster marker is clicked
//! - **[`PlaceCollection`]**: High-level manager that republishes index snapshots
//!
//! # Performance Characteristics
//!
//! - **Build Time**: O(Z · N log N) where Z = zoom levels, N = places
//! - **Query Time**: O(log N + K) where K = results
//! - **Memory**: O(Z · N) for the per-zoom levels

mod cluster;
mod collection;
mod expansion;
mod index;
mod place;
mod sizing;
pub mod utils;
mod viewport;

// Public API exports
pub use cluster::{ClusterId, ClusterResult, ClusterSummary};
pub use collection::{CollectionInfo, Config, PlaceCollection};
pub use expansion::Expansion;
pub use index::{ClusterIndex, ClusterOptions, ZOOM_CEILING};
pub use place::{
    CoordinateField, GeoPoint, Ingested, RawRecord, RejectedRecord, filter_by_year, normalize,
    year_range,
};
pub use sizing::{Marker, marker_radius};
pub use viewport::{Bounds, Viewport};

/// Error types for the clustering core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("Invalid {field} for '{name}': {value:?} ({reason})")]
    InvalidCoordinate {
        name: String,
        field: CoordinateField,
        value: String,
        reason: &'static str,
    },

    #[error("Unknown cluster {0}, the index was rebuilt since it was queried")]
    UnknownCluster(ClusterId),

    #[error("Malformed cluster id: {0:?}")]
    InvalidClusterId(String),

    #[error("Invalid cluster options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
