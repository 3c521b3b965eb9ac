//! Query results: single places and aggregated clusters

use crate::{DataError, GeoPoint};
use geo::Point;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque identifier of a cluster inside one specific [`ClusterIndex`](crate::ClusterIndex)
///
/// Formats as `<index fingerprint>-<zoom>-<seed>` and parses back from the same text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "String", try_from = "String")
)]
pub struct ClusterId {
    /// Fingerprint of the index that produced the cluster
    pub(crate) index: u64,
    /// Zoom level holding the cluster's direct children
    pub(crate) zoom: u8,
    /// Position of the seed item in that zoom level
    pub(crate) seed: u32,
}

/// An aggregated marker for two or more places
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterSummary {
    pub id: ClusterId,
    /// Number of places merged into this cluster (always >= 2)
    pub point_count: usize,
    /// Point-count weighted centroid of the members
    pub coordinates: Point<f64>,
}

/// One render-ready entry returned by a viewport query
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum ClusterResult {
    Leaf(GeoPoint),
    Cluster(ClusterSummary),
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}-{}-{}", self.index, self.zoom, self.seed)
    }
}

impl FromStr for ClusterId {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DataError::InvalidClusterId(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let (Some(index), Some(zoom), Some(seed)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            index: u64::from_str_radix(index, 16).map_err(|_| invalid())?,
            zoom: zoom.parse().map_err(|_| invalid())?,
            seed: seed.parse().map_err(|_| invalid())?,
        })
    }
}

impl From<ClusterId> for String {
    fn from(id: ClusterId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ClusterId {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ClusterResult {
    /// Marker position: the place itself, or the cluster centroid
    #[inline]
    pub fn coordinates(&self) -> Point<f64> {
        match self {
            Self::Leaf(point) => point.coordinates,
            Self::Cluster(summary) => summary.coordinates,
        }
    }

    /// Number of places represented by this marker
    #[inline]
    pub fn point_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Cluster(summary) => summary.point_count,
        }
    }

    #[inline]
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }

    #[inline]
    pub fn cluster_id(&self) -> Option<ClusterId> {
        match self {
            Self::Leaf(_) => None,
            Self::Cluster(summary) => Some(summary.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_id_text_format() {
        let id = ClusterId {
            index: 0xdead_beef,
            zoom: 7,
            seed: 42,
        };
        assert_eq!(id.to_string(), "00000000deadbeef-7-42");
        assert_eq!("00000000deadbeef-7-42".parse::<ClusterId>().unwrap(), id);
    }

    #[test]
    fn test_cluster_id_rejects_garbage() {
        for text in ["", "abc", "zz-1-2", "ff-1", "ff-300-1", "ff-1--2"] {
            assert!(
                matches!(
                    text.parse::<ClusterId>(),
                    Err(DataError::InvalidClusterId(_))
                ),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn test_result_accessors() {
        let leaf = ClusterResult::Leaf(GeoPoint::new("Oslo", 10.75, 59.91, "2022", ""));
        assert_eq!(leaf.point_count(), 1);
        assert!(!leaf.is_cluster());
        assert_eq!(leaf.cluster_id(), None);
        assert_eq!(leaf.coordinates(), Point::new(10.75, 59.91));

        let id = ClusterId {
            index: 1,
            zoom: 3,
            seed: 0,
        };
        let cluster = ClusterResult::Cluster(ClusterSummary {
            id,
            point_count: 4,
            coordinates: Point::new(1.0, 2.0),
        });
        assert_eq!(cluster.point_count(), 4);
        assert!(cluster.is_cluster());
        assert_eq!(cluster.cluster_id(), Some(id));
    }
}
