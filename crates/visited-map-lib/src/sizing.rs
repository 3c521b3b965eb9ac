//! Marker sizing
//!
//! Marker radius grows linearly with the number of places behind it and saturates, so that a
//! cluster never dwarfs the map. Zoomed-in views use a steeper, smaller scale.

use crate::ClusterResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Radius of a single place marker
const LEAF_BASE_RADIUS: f64 = 20.0;
/// Smallest cluster marker radius
const CLUSTER_BASE_RADIUS: f64 = 30.0;
/// Above this zoom the detailed scale is used
const DETAIL_ZOOM: f64 = 3.0;

/// A query result paired with its on-screen radius
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Marker {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub result: ClusterResult,
    pub radius_px: f64,
}

/// Marker radius in pixels for `point_count` places at `zoom`
///
/// Maps the count domain `[1, 10]` (or `[1, 5]` above zoom 3) linearly onto
/// `[base, 60]` (or `[base, 40]`), clamping at both ends. `base` is 20 for a single place
/// and 30 otherwise.
pub fn marker_radius(point_count: f64, zoom: f64) -> f64 {
    let base = if point_count == 1.0 {
        LEAF_BASE_RADIUS
    } else {
        CLUSTER_BASE_RADIUS
    };
    if !point_count.is_finite() {
        return base;
    }

    let (domain_max, range_max) = if zoom > DETAIL_ZOOM {
        (5.0, 40.0)
    } else {
        (10.0, 60.0)
    };

    let t = ((point_count - 1.0) / (domain_max - 1.0)).clamp(0.0, 1.0);
    base + t * (range_max - base)
}

impl Marker {
    /// Size a query result for display at `zoom`
    pub fn new(result: ClusterResult, zoom: f64) -> Self {
        let radius_px = marker_radius(result.point_count() as f64, zoom);
        Self { result, radius_px }
    }
}
