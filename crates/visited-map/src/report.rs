//! JSON report of the markers visible in one viewport

use geo::Point;
use serde::Serialize;
use visited_map_lib::{
    Bounds, ClusterId, CollectionInfo, Expansion, Marker, PlaceCollection, Result, Viewport,
};

/// Everything the map view needs to draw one frame
#[derive(Debug, Serialize)]
pub struct Report {
    pub zoom: f64,
    pub bounds: Bounds,
    pub info: CollectionInfo,
    /// Shown places lying inside the bounds
    pub visible_count: usize,
    /// Center of the visible places, where a fresh map view would start
    pub center: Option<Point<f64>>,
    pub markers: Vec<Marker>,
    /// Only filled when expansions were requested
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expansions: Vec<ExpansionEntry>,
}

#[derive(Debug, Serialize)]
pub struct ExpansionEntry {
    pub cluster: ClusterId,
    #[serde(flatten)]
    pub expansion: Expansion,
}

impl Report {
    /// Query `collection` and optionally resolve a click on every cluster marker
    pub fn build(collection: &PlaceCollection, viewport: &Viewport, expand: bool) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("report::build");

        // One snapshot for markers and expansions so ids stay valid
        let snapshot = collection.snapshot();
        let markers: Vec<Marker> = snapshot
            .query(viewport)
            .into_iter()
            .map(|result| Marker::new(result, viewport.zoom))
            .collect();

        let expansions = if expand {
            markers
                .iter()
                .filter_map(|marker| marker.result.cluster_id())
                .map(|cluster| {
                    Ok(ExpansionEntry {
                        cluster,
                        expansion: snapshot.expand(cluster)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let visible_count = snapshot
            .points()
            .iter()
            .filter(|p| viewport.bounds.contains(p.longitude(), p.latitude()))
            .count();

        tracing::info!(
            "{} markers ({} clusters) for {visible_count} places at zoom {}",
            markers.len(),
            markers.iter().filter(|m| m.result.is_cluster()).count(),
            viewport.zoom
        );

        Ok(Self {
            zoom: viewport.zoom,
            bounds: viewport.bounds,
            info: collection.get_info(),
            visible_count,
            center: collection.center_wgs84(),
            markers,
            expansions,
        })
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
