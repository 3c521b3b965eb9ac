//! PlaceCollection - Top-level manager for places, the year filter, and index snapshots
//!
//! The collection owns the full list of places and republishes an immutable
//! [`ClusterIndex`] snapshot whenever the places, the year filter, or the clustering options
//! change. Readers holding an older snapshot keep a consistent view until they ask again.

use crate::{
    Bounds, ClusterId, ClusterIndex, ClusterOptions, ClusterResult, Expansion, GeoPoint, Marker,
    RawRecord, RejectedRecord, Result, Viewport, filter_by_year, normalize, year_range,
};

use geo::{BoundingRect, MultiPoint, Point};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for the place collection
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Clustering parameters for every snapshot
    pub options: ClusterOptions,
    /// Only places dated this year or later are shown. Places without a year are always shown.
    pub min_year: Option<u16>,
}

/// Information about the place collection
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollectionInfo {
    /// Number of places loaded
    pub place_count: usize,
    /// Number of places passing the year filter
    pub active_count: usize,
    /// Number of places without a recognizable year
    pub yearless_count: usize,
    /// Earliest and latest year over all loaded places
    pub year_range: Option<(u16, u16)>,
}

/// Top-level manager for all places and queries
#[derive(Clone)]
pub struct PlaceCollection {
    /// All loaded places, unfiltered
    places: Vec<GeoPoint>,
    /// Configuration settings
    config: Config,
    /// Current index over the places passing the year filter
    snapshot: Arc<ClusterIndex>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PlaceCollection {
    /// Create a new, empty collection
    ///
    /// Fails if the clustering options are invalid.
    pub fn new(config: Config) -> Result<Self> {
        let snapshot = Arc::new(ClusterIndex::build(Vec::new(), config.options.clone())?);
        Ok(Self {
            places: Vec::new(),
            config,
            snapshot,
        })
    }

    /// Replace all places
    pub fn set_places(&mut self, places: Vec<GeoPoint>) -> Result<()> {
        self.snapshot = Self::build_snapshot(&places, &self.config)?;
        self.places = places;
        Ok(())
    }

    /// Validate and append raw rows, returning the rows that were skipped
    pub fn add_records<I>(&mut self, records: I) -> Result<Vec<RejectedRecord>>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("collection::add_records");

        let ingested = normalize(records);
        if !ingested.points.is_empty() {
            let mut places = self.places.clone();
            places.extend(ingested.points);
            self.set_places(places)?;
        }
        Ok(ingested.rejected)
    }

    /// Change the year threshold
    pub fn set_min_year(&mut self, min_year: Option<u16>) -> Result<()> {
        let config = Config {
            min_year,
            ..self.config.clone()
        };
        self.apply_config(config)
    }

    /// Change the clustering options
    ///
    /// Invalid options are rejected and the current snapshot is kept.
    pub fn set_options(&mut self, options: ClusterOptions) -> Result<()> {
        let config = Config {
            options,
            ..self.config.clone()
        };
        self.apply_config(config)
    }

    /// The current immutable index
    #[inline]
    pub fn snapshot(&self) -> Arc<ClusterIndex> {
        Arc::clone(&self.snapshot)
    }

    /// Query the current snapshot
    #[inline]
    pub fn query(&self, viewport: &Viewport) -> Vec<ClusterResult> {
        self.snapshot.query(viewport)
    }

    /// Query the current snapshot and size every result for display
    pub fn markers(&self, viewport: &Viewport) -> Vec<Marker> {
        #[cfg(feature = "profiling")]
        profiling::scope!("collection::markers");

        self.snapshot
            .query(viewport)
            .into_iter()
            .map(|result| Marker::new(result, viewport.zoom))
            .collect()
    }

    /// Resolve a clicked cluster against the current snapshot
    #[inline]
    pub fn expand(&self, id: ClusterId) -> Result<Expansion> {
        self.snapshot.expand(id)
    }

    /// All loaded places, including those hidden by the year filter
    #[inline]
    pub fn places(&self) -> &[GeoPoint] {
        &self.places
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Get collection information
    pub fn get_info(&self) -> CollectionInfo {
        CollectionInfo {
            place_count: self.places.len(),
            active_count: self.snapshot.len(),
            yearless_count: self.places.iter().filter(|p| p.year().is_none()).count(),
            year_range: year_range(&self.places),
        }
    }

    /// Bounds of the places passing the year filter
    ///
    /// Returns `None` if no place is visible.
    pub fn bounding_box_wgs84(&self) -> Option<Bounds> {
        let points: MultiPoint<f64> = self
            .snapshot
            .points()
            .iter()
            .map(|p| p.coordinates)
            .collect();
        points.bounding_rect().map(Bounds::from)
    }

    /// Center of [`Self::bounding_box_wgs84`] as (lon, lat)
    #[inline]
    pub fn center_wgs84(&self) -> Option<Point<f64>> {
        self.bounding_box_wgs84()
            .map(|b| Point::new((b.west + b.east) / 2.0, (b.south + b.north) / 2.0))
    }

    /// Remove all places
    pub fn clear(&mut self) -> Result<()> {
        self.set_places(Vec::new())
    }

    fn apply_config(&mut self, config: Config) -> Result<()> {
        self.snapshot = Self::build_snapshot(&self.places, &config)?;
        self.config = config;
        Ok(())
    }

    fn build_snapshot(places: &[GeoPoint], config: &Config) -> Result<Arc<ClusterIndex>> {
        let active = filter_by_year(places, config.min_year);
        tracing::debug!(
            "Rebuilding index: {} of {} places pass year filter {:?}",
            active.len(),
            places.len(),
            config.min_year
        );
        Ok(Arc::new(ClusterIndex::build(active, config.options.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataError;

    fn create_test_places() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new("Reykjavik", -21.9426, 64.1466, "July 2017", ""),
            GeoPoint::new("Berlin", 13.4050, 52.5200, "2019", ""),
            GeoPoint::new("Potsdam", 13.0645, 52.3906, "2019", ""),
            GeoPoint::new("Nairobi", 36.8219, -1.2921, "March 2022", ""),
            GeoPoint::new("Home", -3.7038, 40.4168, "always", ""),
        ]
    }

    fn raw(name: &str, lon: &str, lat: &str, date: &str) -> RawRecord {
        RawRecord {
            name: name.to_string(),
            longitude: lon.to_string(),
            latitude: lat.to_string(),
            date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_collection_creation() {
        let collection = PlaceCollection::new(Config::default()).unwrap();
        assert!(collection.is_empty());
        assert!(collection.snapshot().is_empty());
        assert!(collection.query(&Viewport::world(1.0)).is_empty());
        assert_eq!(collection.bounding_box_wgs84(), None);
        assert_eq!(collection.center_wgs84(), None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            options: ClusterOptions {
                min_points: 0,
                ..Default::default()
            },
            min_year: None,
        };
        assert!(matches!(
            PlaceCollection::new(config),
            Err(DataError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_set_places_and_query() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection.set_places(create_test_places()).unwrap();

        let results = collection.query(&Viewport::world(17.0));
        assert_eq!(results.len(), 5);

        // Berlin and Potsdam share a marker when zoomed out
        let results = collection.query(&Viewport::world(4.0));
        let total: usize = results.iter().map(ClusterResult::point_count).sum();
        assert_eq!(total, 5);
        assert!(results.iter().any(|r| r.point_count() == 2));
    }

    #[test]
    fn test_year_filter_keeps_yearless_places() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection.set_places(create_test_places()).unwrap();
        collection.set_min_year(Some(2020)).unwrap();

        let names: Vec<String> = collection
            .query(&Viewport::world(17.0))
            .into_iter()
            .filter_map(|r| match r {
                ClusterResult::Leaf(p) => Some(p.name),
                ClusterResult::Cluster(_) => None,
            })
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Nairobi".to_string()));
        assert!(names.contains(&"Home".to_string()));

        // The full list is untouched
        assert_eq!(collection.places().len(), 5);

        collection.set_min_year(None).unwrap();
        assert_eq!(collection.query(&Viewport::world(17.0)).len(), 5);
    }

    #[test]
    fn test_add_records_skips_invalid_rows() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        let rejected = collection
            .add_records(vec![
                raw("Quito", "-78.4678", "-0.1807", "2015"),
                raw("Broken", "200", "0", "2015"),
                raw("La Paz", "-68.1193", "-16.4897", "2016"),
            ])
            .unwrap();

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].row, 1);
        assert!(matches!(
            rejected[0].error,
            DataError::InvalidCoordinate { .. }
        ));
        assert_eq!(collection.places().len(), 2);
        assert_eq!(collection.snapshot().len(), 2);
    }

    #[test]
    fn test_all_rows_rejected_gives_empty_map() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        let rejected = collection
            .add_records(vec![raw("Nope", "x", "y", ""), raw("Nope", "0", "95", "")])
            .unwrap();
        assert_eq!(rejected.len(), 2);
        assert!(collection.markers(&Viewport::world(2.0)).is_empty());
    }

    #[test]
    fn test_old_snapshot_survives_rebuild() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection.set_places(create_test_places()).unwrap();

        let old = collection.snapshot();
        let id = old
            .query(&Viewport::world(4.0))
            .iter()
            .find_map(ClusterResult::cluster_id)
            .unwrap();

        collection.set_min_year(Some(2021)).unwrap();

        // Readers of the old snapshot still see a consistent index
        assert_eq!(old.len(), 5);
        assert!(old.expand(id).is_ok());

        // The new snapshot no longer knows the cluster
        assert_eq!(collection.expand(id), Err(DataError::UnknownCluster(id)));
    }

    #[test]
    fn test_invalid_options_keep_previous_snapshot() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection.set_places(create_test_places()).unwrap();
        let before = collection.snapshot();

        let result = collection.set_options(ClusterOptions {
            max_zoom: 40,
            ..Default::default()
        });
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &collection.snapshot()));
        assert_eq!(collection.config().options, ClusterOptions::default());
    }

    #[test]
    fn test_markers_are_sized() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection.set_places(create_test_places()).unwrap();

        for marker in collection.markers(&Viewport::world(4.0)) {
            let expected = if marker.result.is_cluster() { 30.0 } else { 20.0 };
            assert!(marker.radius_px >= expected);
            assert!(marker.radius_px <= 40.0);
        }
    }

    #[test]
    fn test_get_info() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection.set_places(create_test_places()).unwrap();
        collection.set_min_year(Some(2019)).unwrap();

        let info = collection.get_info();
        assert_eq!(info.place_count, 5);
        assert_eq!(info.active_count, 4);
        assert_eq!(info.yearless_count, 1);
        assert_eq!(info.year_range, Some((2017, 2022)));
    }

    #[test]
    fn test_bounding_box_and_center() {
        let mut collection = PlaceCollection::new(Config::default()).unwrap();
        collection
            .set_places(vec![
                GeoPoint::new("SW", -10.0, -20.0, "", ""),
                GeoPoint::new("NE", 30.0, 40.0, "", ""),
            ])
            .unwrap();

        let bounds = collection.bounding_box_wgs84().unwrap();
        assert_eq!(bounds, Bounds::new(-10.0, -20.0, 30.0, 40.0));
        assert_eq!(collection.center_wgs84(), Some(Point::new(10.0, 10.0)));

        collection.clear().unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.bounding_box_wgs84(), None);
    }
}
