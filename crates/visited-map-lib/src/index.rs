//! Hierarchical cluster index for zoom-dependent marker aggregation
//!
//! The index stores one level per integer zoom between `min_zoom` and `max_zoom + 1`. The
//! deepest level holds every place on its own; each shallower level is produced by greedily
//! merging items of the level below that fall within the pixel radius at that zoom. Every level
//! is backed by an R-tree so that both construction and viewport queries stay logarithmic.
//!
//! Each item is indexed by the bounding box of all places it stands for, not by its centroid.
//! A viewport query therefore returns every item holding at least one place inside the
//! bounds, and since each place belongs to exactly one item per level it is never dropped or
//! returned twice.
//!
//! An index is an immutable snapshot. Changing the input places or the options means building
//! a new index; cluster ids from the old one are then reported as unknown.

use crate::utils::{lat_to_y, lng_to_x, project, unproject};
use crate::{ClusterId, ClusterResult, ClusterSummary, DataError, GeoPoint, Result, Viewport};
use rstar::{AABB, Envelope, RTree, RTreeObject};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hard upper bound for any zoom produced by the index
pub const ZOOM_CEILING: u8 = 20;

/// Clustering parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterOptions {
    /// Shallowest zoom level that is clustered
    pub min_zoom: u8,
    /// Deepest zoom level that is clustered; beyond it every place is shown on its own.
    /// Must stay below [`ZOOM_CEILING`].
    pub max_zoom: u8,
    /// Neighbor distance in screen pixels under which items are merged
    pub radius_px: f64,
    /// Tile size in pixels, the world is `extent * 2^zoom` pixels wide
    pub extent: f64,
    /// Minimum number of places needed to form a cluster (at least 2)
    pub min_points: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 16,
            radius_px: 60.0,
            extent: 512.0,
            min_points: 2,
        }
    }
}

impl ClusterOptions {
    /// Check that the options describe a usable index
    pub fn validate(&self) -> Result<()> {
        if self.max_zoom >= ZOOM_CEILING {
            return Err(DataError::InvalidOptions(format!(
                "max_zoom {} must be below {ZOOM_CEILING}",
                self.max_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(DataError::InvalidOptions(format!(
                "min_zoom {} is greater than max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.radius_px.is_finite() && self.radius_px > 0.0) {
            return Err(DataError::InvalidOptions(format!(
                "radius_px must be positive, got {}",
                self.radius_px
            )));
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(DataError::InvalidOptions(format!(
                "extent must be positive, got {}",
                self.extent
            )));
        }
        if self.min_points < 2 {
            return Err(DataError::InvalidOptions(format!(
                "min_points must be at least 2, got {}",
                self.min_points
            )));
        }
        Ok(())
    }

    /// Merge radius at `zoom`, in unit-square coordinates
    #[inline]
    fn radius_at(&self, zoom: u8) -> f64 {
        self.radius_px / (self.extent * f64::from(1u32 << zoom))
    }
}

/// What a level item stands for
#[derive(Clone, Copy, Debug)]
enum ItemKind {
    /// Index into `ClusterIndex::points`
    Leaf(u32),
    Cluster(ClusterId),
}

/// A single marker candidate at one zoom level
#[derive(Clone, Debug)]
struct LevelItem {
    /// Projected position (cluster items use the weighted centroid)
    xy: [f64; 2],
    /// Projected bounding box of every place behind this item
    envelope: AABB<[f64; 2]>,
    kind: ItemKind,
    num_points: usize,
    /// Seed position of the cluster this item was merged into at the next shallower zoom
    parent: Option<u32>,
}

/// R-tree entry pointing back into `Level::items`
#[derive(Clone, Copy, Debug)]
struct LevelEntry {
    xy: [f64; 2],
    envelope: AABB<[f64; 2]>,
    item: u32,
}

impl RTreeObject for LevelEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// All marker candidates at one zoom level
struct Level {
    zoom: u8,
    items: Vec<LevelItem>,
    tree: RTree<LevelEntry>,
}

/// Immutable clustering snapshot over a set of places
pub struct ClusterIndex {
    points: Vec<GeoPoint>,
    options: ClusterOptions,
    fingerprint: u64,
    /// `levels[z - min_zoom]` holds zoom `z`, up to and including `max_zoom + 1`
    levels: Vec<Level>,
}

impl Level {
    fn new(zoom: u8, items: Vec<LevelItem>) -> Self {
        let entries = items
            .iter()
            .enumerate()
            .map(|(i, item)| LevelEntry {
                xy: item.xy,
                envelope: item.envelope,
                item: i as u32,
            })
            .collect();
        Self {
            zoom,
            items,
            tree: RTree::bulk_load(entries),
        }
    }

    /// Items with at least one place inside the axis-aligned box, in item order
    fn range(&self, min: [f64; 2], max: [f64; 2]) -> Vec<usize> {
        let envelope = AABB::from_corners(min, max);
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.item as usize)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Items within Euclidean distance `r` of `center`, in item order
    fn within(&self, center: [f64; 2], r: f64) -> SmallVec<[usize; 16]> {
        let envelope = AABB::from_corners(
            [center[0] - r, center[1] - r],
            [center[0] + r, center[1] + r],
        );
        let r2 = r * r;
        // An item's position always lies inside its envelope
        let mut ids: SmallVec<[usize; 16]> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| {
                let dx = entry.xy[0] - center[0];
                let dy = entry.xy[1] - center[1];
                dx * dx + dy * dy <= r2
            })
            .map(|entry| entry.item as usize)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Merge this level's items into the level for `zoom` (one shallower)
    ///
    /// Marks every absorbed item with the seed position of its new cluster.
    fn cluster(&mut self, zoom: u8, options: &ClusterOptions, fingerprint: u64) -> Vec<LevelItem> {
        let r = options.radius_at(zoom);
        let mut visited = vec![false; self.items.len()];
        let mut next = Vec::new();

        for i in 0..self.items.len() {
            if visited[i] {
                continue;
            }
            visited[i] = true;

            let seed_xy = self.items[i].xy;
            let neighbors = self.within(seed_xy, r);

            let origin_points = self.items[i].num_points;
            let num_points = origin_points
                + neighbors
                    .iter()
                    .filter(|&&n| !visited[n])
                    .map(|&n| self.items[n].num_points)
                    .sum::<usize>();

            if num_points > origin_points && num_points >= options.min_points {
                let seed = i as u32;
                let mut wx = seed_xy[0] * origin_points as f64;
                let mut wy = seed_xy[1] * origin_points as f64;
                let mut envelope = self.items[i].envelope;

                for &n in &neighbors {
                    if visited[n] {
                        continue;
                    }
                    visited[n] = true;
                    let neighbor = &mut self.items[n];
                    wx += neighbor.xy[0] * neighbor.num_points as f64;
                    wy += neighbor.xy[1] * neighbor.num_points as f64;
                    envelope.merge(&neighbor.envelope);
                    neighbor.parent = Some(seed);
                }
                self.items[i].parent = Some(seed);

                next.push(LevelItem {
                    xy: [wx / num_points as f64, wy / num_points as f64],
                    envelope,
                    kind: ItemKind::Cluster(ClusterId {
                        index: fingerprint,
                        zoom: self.zoom,
                        seed,
                    }),
                    num_points,
                    parent: None,
                });
            } else {
                next.push(LevelItem {
                    parent: None,
                    ..self.items[i].clone()
                });

                // Not enough for a cluster: keep the neighbors as they are so they do not
                // seed clusters of their own at this zoom
                if num_points > 1 {
                    for &n in &neighbors {
                        if visited[n] {
                            continue;
                        }
                        visited[n] = true;
                        next.push(LevelItem {
                            parent: None,
                            ..self.items[n].clone()
                        });
                    }
                }
            }
        }

        next
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ClusterIndex {
    /// Build an index over `points`
    ///
    /// The same points and options always produce the same clusters and cluster ids.
    pub fn build(points: Vec<GeoPoint>, options: ClusterOptions) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("index::build");

        options.validate()?;
        let fingerprint = fingerprint(&points, &options);

        let leaves = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let xy = project(point.coordinates);
                LevelItem {
                    xy,
                    envelope: AABB::from_point(xy),
                    kind: ItemKind::Leaf(i as u32),
                    num_points: 1,
                    parent: None,
                }
            })
            .collect();

        let mut levels = Vec::with_capacity(usize::from(options.max_zoom - options.min_zoom) + 2);
        let mut current = Level::new(options.max_zoom + 1, leaves);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let next = current.cluster(zoom, &options, fingerprint);
            tracing::trace!("Zoom {zoom}: {} markers", next.len());
            levels.push(current);
            current = Level::new(zoom, next);
        }
        levels.push(current);
        levels.reverse();

        tracing::debug!(
            "Built cluster index {fingerprint:016x} over {} places ({} markers at zoom {})",
            points.len(),
            levels[0].items.len(),
            options.min_zoom
        );

        Ok(Self {
            points,
            options,
            fingerprint,
            levels,
        })
    }

    /// Every cluster and place visible within the viewport, at the viewport's zoom
    ///
    /// A cluster is returned when any of its places lies inside the bounds, so every place
    /// inside the bounds is represented exactly once. Fractional zooms are floored, and zooms
    /// outside `[min_zoom, max_zoom + 1]` are clamped. Results are ordered deterministically
    /// for a given index and viewport.
    pub fn query(&self, viewport: &Viewport) -> Vec<ClusterResult> {
        #[cfg(feature = "profiling")]
        profiling::scope!("index::query");

        let level = self.level(self.limit_zoom(viewport.zoom));
        let mut taken: Vec<usize> = Vec::new();
        let mut results = Vec::new();
        for part in viewport.bounds.normalized_parts() {
            let min = [lng_to_x(part.west), lat_to_y(part.north)];
            let max = [lng_to_x(part.east), lat_to_y(part.south)];

            // A cluster reaching into both sides of the antimeridian is only returned once
            let fresh: Vec<usize> = level
                .range(min, max)
                .into_iter()
                .filter(|i| taken.binary_search(i).is_err())
                .collect();
            results.extend(fresh.iter().map(|&i| self.to_result(&level.items[i])));
            taken.extend(fresh);
            taken.sort_unstable();
        }
        results
    }

    /// Direct children of a cluster, one zoom level deeper than where it appears
    pub fn children(&self, id: ClusterId) -> Result<Vec<ClusterResult>> {
        Ok(self
            .child_items(id)?
            .into_iter()
            .map(|item| self.to_result(item))
            .collect())
    }

    /// Places belonging to a cluster, skipping `offset` and returning at most `limit`
    pub fn leaves(&self, id: ClusterId, limit: usize, offset: usize) -> Result<Vec<GeoPoint>> {
        let mut leaves = Vec::new();
        let mut skipped = 0;
        self.append_leaves(&mut leaves, id, limit, offset, &mut skipped)?;
        Ok(leaves)
    }

    /// Smallest zoom at which the cluster splits into more than one marker
    ///
    /// Never exceeds `max_zoom + 1`, where every place is shown individually.
    pub fn expansion_zoom(&self, id: ClusterId) -> Result<u8> {
        let mut id = id;
        let mut expansion_zoom = self.origin_level(id)?.zoom - 1;
        while expansion_zoom <= self.options.max_zoom {
            let children = self.child_items(id)?;
            expansion_zoom += 1;
            match children.as_slice() {
                [only] => match only.kind {
                    ItemKind::Cluster(child) => id = child,
                    ItemKind::Leaf(_) => break,
                },
                _ => break,
            }
        }
        Ok(expansion_zoom.min(ZOOM_CEILING))
    }

    /// Representative coordinate of a cluster
    pub fn cluster_center(&self, id: ClusterId) -> Result<geo::Point<f64>> {
        let level = self.origin_level(id)?;
        let parent_level = self.level(level.zoom - 1);
        parent_level
            .items
            .iter()
            .find(|item| matches!(item.kind, ItemKind::Cluster(other) if other == id))
            .map(|item| unproject(item.xy))
            .ok_or(DataError::UnknownCluster(id))
    }

    /// Places the index was built from, in input order
    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Hash of the input places and options, embedded in every [`ClusterId`]
    #[inline]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Map a requested zoom onto a stored level
    fn limit_zoom(&self, zoom: f64) -> u8 {
        let min = f64::from(self.options.min_zoom);
        let max = f64::from(self.options.max_zoom) + 1.0;
        if zoom.is_nan() {
            return self.options.min_zoom;
        }
        zoom.floor().clamp(min, max) as u8
    }

    #[inline]
    fn level(&self, zoom: u8) -> &Level {
        &self.levels[usize::from(zoom - self.options.min_zoom)]
    }

    /// Level holding the cluster's children, after checking the id belongs to this index
    fn origin_level(&self, id: ClusterId) -> Result<&Level> {
        let in_range = id.zoom > self.options.min_zoom && id.zoom <= self.options.max_zoom + 1;
        if id.index != self.fingerprint || !in_range {
            return Err(DataError::UnknownCluster(id));
        }
        let level = self.level(id.zoom);
        if id.seed as usize >= level.items.len() {
            return Err(DataError::UnknownCluster(id));
        }
        Ok(level)
    }

    fn child_items(&self, id: ClusterId) -> Result<Vec<&LevelItem>> {
        let level = self.origin_level(id)?;
        let origin = &level.items[id.seed as usize];
        let r = self.options.radius_at(id.zoom - 1);

        let children: Vec<&LevelItem> = level
            .within(origin.xy, r)
            .into_iter()
            .map(|i| &level.items[i])
            .filter(|item| item.parent == Some(id.seed))
            .collect();

        if children.is_empty() {
            return Err(DataError::UnknownCluster(id));
        }
        Ok(children)
    }

    fn append_leaves(
        &self,
        leaves: &mut Vec<GeoPoint>,
        id: ClusterId,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
    ) -> Result<()> {
        for child in self.child_items(id)? {
            if leaves.len() >= limit {
                break;
            }
            match child.kind {
                ItemKind::Cluster(child_id) => {
                    if *skipped + child.num_points <= offset {
                        // Whole subtree falls inside the offset
                        *skipped += child.num_points;
                    } else {
                        self.append_leaves(leaves, child_id, limit, offset, skipped)?;
                    }
                }
                ItemKind::Leaf(i) => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        leaves.push(self.points[i as usize].clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn to_result(&self, item: &LevelItem) -> ClusterResult {
        match item.kind {
            ItemKind::Leaf(i) => ClusterResult::Leaf(self.points[i as usize].clone()),
            ItemKind::Cluster(id) => ClusterResult::Cluster(ClusterSummary {
                id,
                point_count: item.num_points,
                coordinates: unproject(item.xy),
            }),
        }
    }
}

impl fmt::Debug for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterIndex")
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint))
            .field("points", &self.points.len())
            .field("levels", &self.levels.len())
            .field("options", &self.options)
            .finish()
    }
}

fn fingerprint(points: &[GeoPoint], options: &ClusterOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    points.len().hash(&mut hasher);
    for point in points {
        point.name.hash(&mut hasher);
        point.longitude().to_bits().hash(&mut hasher);
        point.latitude().to_bits().hash(&mut hasher);
        point.date.hash(&mut hasher);
        point.description.hash(&mut hasher);
        point.image.hash(&mut hasher);
    }
    options.min_zoom.hash(&mut hasher);
    options.max_zoom.hash(&mut hasher);
    options.radius_px.to_bits().hash(&mut hasher);
    options.extent.to_bits().hash(&mut hasher);
    options.min_points.hash(&mut hasher);
    hasher.finish()
}
