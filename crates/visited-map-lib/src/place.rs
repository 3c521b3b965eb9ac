//! Place records and ingestion
//!
//! This module provides the `GeoPoint` struct for visited places, the normalization step that
//! turns loosely typed rows into validated points, and the year filter applied on top of them.

use crate::{DataError, Result};
use geo::Point;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A visited place with validated WGS84 coordinates
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    /// Display name (not guaranteed unique)
    pub name: String,
    /// Longitude (x) and latitude (y) in degrees
    pub coordinates: Point<f64>,
    /// Free-text date, e.g. "June 2023"
    pub date: String,
    /// Free-text description
    pub description: String,
    /// Optional image URL
    pub image: Option<String>,
}

/// An unvalidated place row as read from a delimited file or an in-code list
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawRecord {
    pub name: String,
    pub longitude: String,
    pub latitude: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub date: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub image: Option<String>,
}

/// Which half of a coordinate pair failed validation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateField {
    Longitude,
    Latitude,
}

/// A row dropped during ingestion
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedRecord {
    /// 0-based position of the row in the ingested batch
    pub row: usize,
    /// Always a [`DataError::InvalidCoordinate`]
    pub error: DataError,
}

/// Outcome of [`normalize`]: valid points in input order plus everything that was skipped
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ingested {
    pub points: Vec<GeoPoint>,
    pub rejected: Vec<RejectedRecord>,
}

impl fmt::Display for CoordinateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Longitude => f.write_str("longitude"),
            Self::Latitude => f.write_str("latitude"),
        }
    }
}

impl CoordinateField {
    /// Inclusive valid range in degrees
    #[inline]
    fn limit(self) -> f64 {
        match self {
            Self::Longitude => 180.0,
            Self::Latitude => 90.0,
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl GeoPoint {
    /// Create a new point from already validated parts
    pub fn new(
        name: impl Into<String>,
        longitude: f64,
        latitude: f64,
        date: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            coordinates: Point::new(longitude, latitude),
            date: date.into(),
            description: description.into(),
            image: None,
        }
    }

    /// Attach an image URL
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.coordinates.x()
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.coordinates.y()
    }

    /// The first `20xx` token found anywhere in the date text
    pub fn year(&self) -> Option<u16> {
        self.date
            .as_bytes()
            .windows(4)
            .find(|w| w[0] == b'2' && w[1] == b'0' && w[2].is_ascii_digit() && w[3].is_ascii_digit())
            .map(|w| 2000 + u16::from(w[2] - b'0') * 10 + u16::from(w[3] - b'0'))
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RawRecord {
    /// Validate this row into a [`GeoPoint`]
    pub fn to_point(&self) -> Result<GeoPoint> {
        let longitude = parse_coordinate(&self.name, CoordinateField::Longitude, &self.longitude)?;
        let latitude = parse_coordinate(&self.name, CoordinateField::Latitude, &self.latitude)?;

        let point = GeoPoint::new(
            self.name.clone(),
            longitude,
            latitude,
            self.date.clone(),
            self.description.clone(),
        );
        Ok(match self.image.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => point.with_image(image),
            _ => point,
        })
    }
}

fn parse_coordinate(name: &str, field: CoordinateField, raw: &str) -> Result<f64> {
    let invalid = |reason| DataError::InvalidCoordinate {
        name: name.to_string(),
        field,
        value: raw.to_string(),
        reason,
    };

    let value: f64 = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if value.is_nan() {
        return Err(invalid("not a number"));
    }
    if !(-field.limit()..=field.limit()).contains(&value) {
        return Err(invalid("out of range"));
    }
    Ok(value)
}

/// Validate a batch of rows
///
/// Rows with unparseable or out-of-range coordinates are dropped and reported in
/// [`Ingested::rejected`]; the rest of the batch is unaffected.
pub fn normalize<I>(records: I) -> Ingested
where
    I: IntoIterator<Item = RawRecord>,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("place::normalize");

    let mut ingested = Ingested::default();
    for (row, record) in records.into_iter().enumerate() {
        match record.to_point() {
            Ok(point) => ingested.points.push(point),
            Err(error) => {
                tracing::warn!("Skipping place row {row}: {error}");
                ingested.rejected.push(RejectedRecord { row, error });
            }
        }
    }
    ingested
}

/// Keep the points dated `min_year` or later
///
/// Points without a recognizable year are always kept. `None` keeps everything.
pub fn filter_by_year(points: &[GeoPoint], min_year: Option<u16>) -> Vec<GeoPoint> {
    let Some(min_year) = min_year else {
        return points.to_vec();
    };
    points
        .iter()
        .filter(|p| p.year().is_none_or(|year| year >= min_year))
        .cloned()
        .collect()
}

/// Earliest and latest year over the points that carry one
pub fn year_range(points: &[GeoPoint]) -> Option<(u16, u16)> {
    points.iter().filter_map(GeoPoint::year).fold(None, |acc, year| match acc {
        None => Some((year, year)),
        Some((lo, hi)) => Some((lo.min(year), hi.max(year))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_normalize_valid_records() {
        let ingested = normalize(vec![
            raw("Paris", "2.3522", "48.8566", "May 2019"),
            raw("Tokyo", " 139.6917 ", "35.6895", "2023"),
        ]);

        assert!(ingested.rejected.is_empty());
        assert_eq!(ingested.points.len(), 2);
        assert_eq!(ingested.points[0].name, "Paris");
        assert!((ingested.points[1].longitude() - 139.6917).abs() < 1e-9);
        assert!((ingested.points[1].latitude() - 35.6895).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_out_of_range_longitude() {
        let ingested = normalize(vec![
            raw("Lisbon", "-9.1393", "38.7223", "2021"),
            raw("Nowhere", "200", "10", "2021"),
            raw("Rome", "12.4964", "41.9028", "2022"),
        ]);

        assert_eq!(ingested.points.len(), 2);
        assert_eq!(ingested.points[0].name, "Lisbon");
        assert_eq!(ingested.points[1].name, "Rome");

        assert_eq!(ingested.rejected.len(), 1);
        let rejected = &ingested.rejected[0];
        assert_eq!(rejected.row, 1);
        match &rejected.error {
            DataError::InvalidCoordinate { field, value, .. } => {
                assert_eq!(*field, CoordinateField::Longitude);
                assert_eq!(value, "200");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_normalize_not_a_number() {
        let ingested = normalize(vec![
            raw("Blank", "", "10", ""),
            raw("Word", "10", "north", ""),
            raw("NaN", "NaN", "0", ""),
            raw("Pole", "0", "-91", ""),
        ]);

        assert!(ingested.points.is_empty());
        assert_eq!(ingested.rejected.len(), 4);
        assert!(matches!(
            ingested.rejected[1].error,
            DataError::InvalidCoordinate {
                field: CoordinateField::Latitude,
                ..
            }
        ));
    }

    #[test]
    fn test_boundary_coordinates_are_valid() {
        let ingested = normalize(vec![
            raw("Dateline", "180", "0", ""),
            raw("Antidateline", "-180", "0", ""),
            raw("North Pole", "0", "90", ""),
        ]);
        assert_eq!(ingested.points.len(), 3);
    }

    #[test]
    fn test_empty_image_becomes_none() {
        let mut record = raw("Cairo", "31.2357", "30.0444", "2020");
        record.image = Some("   ".to_string());
        assert_eq!(record.to_point().unwrap().image, None);

        record.image = Some("https://example.com/cairo.jpg".to_string());
        assert_eq!(
            record.to_point().unwrap().image.as_deref(),
            Some("https://example.com/cairo.jpg")
        );
    }

    #[test]
    fn test_year_extraction() {
        let point = |date: &str| GeoPoint::new("x", 0.0, 0.0, date, "");

        assert_eq!(point("Summer 2019").year(), Some(2019));
        assert_eq!(point("2021-03-04").year(), Some(2021));
        assert_eq!(point("from 2015 to 2018").year(), Some(2015));
        assert_eq!(point("12025").year(), Some(2025));
        assert_eq!(point("1999").year(), None);
        assert_eq!(point("").year(), None);
        assert_eq!(point("20x1").year(), None);
    }

    #[test]
    fn test_filter_by_year_keeps_yearless_points() {
        let points = vec![
            GeoPoint::new("Old", 0.0, 0.0, "2012", ""),
            GeoPoint::new("New", 1.0, 1.0, "April 2023", ""),
            GeoPoint::new("Undated", 2.0, 2.0, "a long time ago", ""),
        ];

        let filtered = filter_by_year(&points, Some(2020));
        let names: Vec<&str> = filtered.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Undated"]);

        // Input is untouched
        assert_eq!(points.len(), 3);
        assert_eq!(filter_by_year(&points, None), points);
    }

    #[test]
    fn test_year_range() {
        let points = vec![
            GeoPoint::new("a", 0.0, 0.0, "2018", ""),
            GeoPoint::new("b", 0.0, 0.0, "no year", ""),
            GeoPoint::new("c", 0.0, 0.0, "2024", ""),
            GeoPoint::new("d", 0.0, 0.0, "2020", ""),
        ];
        assert_eq!(year_range(&points), Some((2018, 2024)));
        assert_eq!(year_range(&points[1..2]), None);
        assert_eq!(year_range(&[]), None);
    }
}
