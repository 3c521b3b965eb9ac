//! Viewport description passed in by the map view on every pan or zoom

use crate::utils;
use geo::Rect;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geographic bounds in degrees
///
/// `west > east` describes a region crossing the antimeridian.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// The currently visible map region
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Viewport {
    pub bounds: Bounds,
    pub zoom: f64,
}

impl Bounds {
    /// The whole world
    pub const WORLD: Bounds = Bounds {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Split into at most two non-wrapping rectangles with longitudes in `[-180, 180]`
    ///
    /// Spans of 360 degrees or more cover the whole world. Bounds crossing the antimeridian
    /// yield the eastern part first, then the western part.
    pub(crate) fn normalized_parts(&self) -> Vec<Bounds> {
        let south = self.south.clamp(-90.0, 90.0);
        let north = self.north.clamp(-90.0, 90.0);

        if self.east - self.west >= 360.0 {
            return vec![Bounds::new(-180.0, south, 180.0, north)];
        }

        // 180 stays on the eastern edge so that a strip ending (or starting) there does not
        // wrap around to -180 and swallow the whole world
        let wrap = |lng: f64| {
            if lng == 180.0 {
                180.0
            } else {
                utils::wrap_longitude(lng)
            }
        };
        let west = wrap(self.west);
        let east = wrap(self.east);

        if west > east {
            vec![
                Bounds::new(west, south, 180.0, north),
                Bounds::new(-180.0, south, east, north),
            ]
        } else {
            vec![Bounds::new(west, south, east, north)]
        }
    }

    /// Whether a longitude/latitude pair lies inside, honoring antimeridian crossing
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        self.normalized_parts().iter().any(|part| {
            lng >= part.west && lng <= part.east && lat >= part.south && lat <= part.north
        })
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::WORLD
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl Viewport {
    pub fn new(bounds: Bounds, zoom: f64) -> Self {
        Self { bounds, zoom }
    }

    /// The whole world at the given zoom
    pub fn world(zoom: f64) -> Self {
        Self::new(Bounds::WORLD, zoom)
    }
}
