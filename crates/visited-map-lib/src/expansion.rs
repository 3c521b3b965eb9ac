//! Resolving a click on a marker into a plain value the map view can apply

use crate::{ClusterId, ClusterIndex, ClusterResult, GeoPoint, Result};
use geo::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the map view should do after a marker was clicked
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "action", rename_all = "snake_case")
)]
pub enum Expansion {
    /// Zoom to `target_zoom` centered on `center`, where the members separate
    Zoom {
        target_zoom: u8,
        center: Point<f64>,
        leaves: Vec<GeoPoint>,
    },
    /// Show the place's details directly, no zoom change
    Popup { leaf: GeoPoint },
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ClusterIndex {
    /// Resolve a clicked cluster
    ///
    /// Fails with [`DataError::UnknownCluster`](crate::DataError::UnknownCluster) when the id
    /// does not belong to this index; the caller should query again and retry.
    pub fn expand(&self, id: ClusterId) -> Result<Expansion> {
        let mut leaves = self.leaves(id, usize::MAX, 0)?;
        if leaves.len() == 1 {
            return Ok(Expansion::Popup {
                leaf: leaves.remove(0),
            });
        }

        let target_zoom = self.expansion_zoom(id)?;
        let center = self.cluster_center(id)?;
        Ok(Expansion::Zoom {
            target_zoom,
            center,
            leaves,
        })
    }
}

impl ClusterResult {
    /// Resolve a click on this marker against the index that produced it
    ///
    /// Single places resolve to [`Expansion::Popup`] without consulting the index.
    pub fn expand(&self, index: &ClusterIndex) -> Result<Expansion> {
        match self {
            Self::Leaf(point) => Ok(Expansion::Popup {
                leaf: point.clone(),
            }),
            Self::Cluster(summary) => index.expand(summary.id),
        }
    }
}

impl Expansion {
    /// Places behind the clicked marker
    pub fn leaves(&self) -> &[GeoPoint] {
        match self {
            Self::Zoom { leaves, .. } => leaves,
            Self::Popup { leaf } => std::slice::from_ref(leaf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClusterOptions, DataError, Viewport};

    fn pair_index() -> ClusterIndex {
        let points = vec![
            GeoPoint::new("Kyoto", 135.7681, 35.0116, "2018", ""),
            GeoPoint::new("Nara", 135.8048, 34.6851, "2018", ""),
            GeoPoint::new("Lima", -77.0428, -12.0464, "2016", ""),
        ];
        ClusterIndex::build(points, ClusterOptions::default()).unwrap()
    }

    #[test]
    fn test_expand_cluster() {
        let index = pair_index();
        let results = index.query(&Viewport::world(3.0));
        let cluster = results.iter().find(|r| r.is_cluster()).unwrap();
        let ClusterResult::Cluster(summary) = cluster else {
            unreachable!()
        };

        match cluster.expand(&index).unwrap() {
            Expansion::Zoom {
                target_zoom,
                center,
                leaves,
            } => {
                assert!(target_zoom > 3);
                assert!(target_zoom <= index.options().max_zoom + 1);
                assert_eq!(center, summary.coordinates);
                let mut names: Vec<&str> = leaves.iter().map(|p| p.name.as_str()).collect();
                names.sort_unstable();
                assert_eq!(names, vec!["Kyoto", "Nara"]);

                // At the target zoom the two places are separate markers
                let split = index.query(&Viewport::world(f64::from(target_zoom)));
                assert_eq!(split.len(), 3);
            }
            other => panic!("expected a zoom, got {other:?}"),
        }
    }

    #[test]
    fn test_expand_leaf_is_popup() {
        let index = pair_index();
        let results = index.query(&Viewport::world(3.0));
        let leaf = results.iter().find(|r| !r.is_cluster()).unwrap();

        let expansion = leaf.expand(&index).unwrap();
        match &expansion {
            Expansion::Popup { leaf } => assert_eq!(leaf.name, "Lima"),
            other => panic!("expected a popup, got {other:?}"),
        }
        assert_eq!(expansion.leaves().len(), 1);
    }

    #[test]
    fn test_expand_after_rebuild_is_unknown() {
        let index = pair_index();
        let id = index
            .query(&Viewport::world(3.0))
            .iter()
            .find_map(ClusterResult::cluster_id)
            .unwrap();

        let mut points = index.points().to_vec();
        points.push(GeoPoint::new("Osaka", 135.5023, 34.6937, "2024", ""));
        let rebuilt = ClusterIndex::build(points, ClusterOptions::default()).unwrap();

        assert_eq!(rebuilt.expand(id), Err(DataError::UnknownCluster(id)));
    }
}
