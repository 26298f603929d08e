//! Stripe-clipping slicer that eagerly produces every tile touched by one
//! geometry at a zoom level.
//!
//! The clipping approach follows the stripe algorithm popularised by
//! geojson-vt: first cut the geometry into vertical stripes one tile column
//! wide (plus buffer), then cut each stripe into tile-sized cells. While
//! sweeping a stripe, runs of tiles that a polygon covers entirely are
//! recorded as *filled* instead of materialising their interiors, which is
//! what keeps ocean-sized polygons tractable.
//!
//! Coordinates come in scaled so one tile spans one unit (`[0, 2^z)` per
//! axis) and leave in tile-local pixels (`[0, 256]` plus the clip buffer).
//!
//! A single `TiledGeometry` is built for one input geometry, read, and
//! dropped; parallelism belongs to the caller, across geometries.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use geo::{Coord, LineString};

use crate::geom::RingGroup;
use crate::range::IntRange;
use crate::sequence::MutableCoordinateSequence;
use crate::tile::{TileCoord, TileExtents};

/// Extra margin beyond the clip buffer used when deciding which neighboring
/// tiles a segment or point touches, so geometry running exactly along a
/// tile edge lands in both neighbors.
const NEIGHBOR_BUFFER_EPS: f64 = 0.1 / 4096.0;

/// Clipped output coordinates span `[0, 256]` per tile.
const TILE_SCALE: f64 = 256.0;

/// A clipped polygon ring below this many points is degenerate.
const MIN_POLYGON_POINTS: usize = 4;

/// A clipped polyline piece below this many points is degenerate.
const MIN_LINE_POINTS: usize = 2;

/// Clipped rings of one source shape inside one tile.
///
/// For polygon input the outer ring occupies slot 0 (possibly a synthetic
/// tile-sized square when only a hole pierces the tile) and holes follow in
/// input order; for polyline input each entry is one clipped piece.
pub type SlicedRings = Vec<LineString<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

/// Journal entry for a run of tile rows skipped while tracing a stripe edge.
#[derive(Debug, Clone, Copy)]
struct SkippedSegment {
    side: Direction,
    lo: i32,
    hi: i32,
}

/// All tiles produced by slicing one geometry at one zoom level.
pub struct TiledGeometry {
    tile_contents: HashMap<TileCoord, Vec<SlicedRings>>,
    filled_ranges: Option<HashMap<i32, IntRange>>,
    extents: TileExtents,
    buffer: f64,
    neighbor_buffer: f64,
    z: u8,
    area: bool,
    world: i32,
}

impl TiledGeometry {
    fn new(extents: TileExtents, buffer: f64, z: u8, area: bool) -> Self {
        Self {
            tile_contents: HashMap::new(),
            filled_ranges: None,
            extents,
            buffer,
            neighbor_buffer: buffer + NEIGHBOR_BUFFER_EPS,
            z,
            area,
            world: 1 << z,
        }
    }

    /// Slice a point set into tiles.
    ///
    /// `coords` are world-normalised (`[0, 1]` spans the whole world). Each
    /// point lands in every tile within `neighbor_buffer` of it, up to the
    /// four tiles around a corner. A tile holds one group containing one
    /// sequence that accumulates all of its points.
    pub fn slice_points(extents: TileExtents, buffer: f64, z: u8, coords: &[Coord<f64>]) -> Self {
        let mut result = Self::new(extents, buffer, z, false);
        for &coord in coords {
            result.slice_point(coord);
        }
        result
    }

    /// Slice ring groups into tiles.
    ///
    /// Coordinates are in world tile units at `z` (`[0, 2^z)` per axis; the
    /// supported zoom range is `0..=30`). `area` selects polygon semantics
    /// (closed rings, fill detection) over polyline semantics. Geometry
    /// hanging past the world seam is wrapped by re-slicing with a `±2^z`
    /// horizontal offset.
    pub fn slice_shapes(
        extents: TileExtents,
        buffer: f64,
        area: bool,
        z: u8,
        groups: &[RingGroup],
    ) -> Self {
        let mut result = Self::new(extents, buffer, z, area);
        let world = result.world;
        let (overflow_left, overflow_right) = result.slice_world_copy(groups, 0);
        if overflow_right {
            result.slice_world_copy(groups, -world);
        }
        if overflow_left {
            result.slice_world_copy(groups, world);
        }
        result
    }

    /// The zoom level this geometry was sliced at.
    pub fn zoom_level(&self) -> u8 {
        self.z
    }

    /// Every tile with clipped geometry, with its groups of ring sequences.
    pub fn tile_data(&self) -> impl Iterator<Item = (TileCoord, &[SlicedRings])> + '_ {
        self.tile_contents
            .iter()
            .map(|(&tile, groups)| (tile, groups.as_slice()))
    }

    /// Every tile covered entirely by a polygon interior, excluding tiles
    /// that already appear in [`tile_data`](Self::tile_data).
    pub fn filled_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.filled_ranges.iter().flat_map(move |ranges| {
            ranges.iter().flat_map(move |(&x, range)| {
                range.iter().filter_map(move |y| {
                    let tile = TileCoord::new(x as u32, y as u32, self.z);
                    (!self.tile_contents.contains_key(&tile)).then_some(tile)
                })
            })
        })
    }

    fn slice_point(&mut self, coord: Coord<f64>) {
        let world_x = coord.x * self.world as f64;
        let world_y = coord.y * self.world as f64;
        let nb = self.neighbor_buffer;
        let min_x = (world_x - nb).floor() as i32;
        let max_x = (world_x + nb).floor() as i32;
        let min_y = self.extents.min_y().max((world_y - nb).floor() as i32);
        let max_y = (self.extents.max_y() - 1).min((world_y + nb).floor() as i32);
        for x in min_x..=max_x {
            let tile_x = world_x - x as f64;
            let wrapped = wrap_x(x, self.world);
            if !self.extents.test_x(wrapped) {
                continue;
            }
            for y in min_y..=max_y {
                let tile = TileCoord::new(wrapped as u32, y as u32, self.z);
                let tile_y = world_y - y as f64;
                let groups = self
                    .tile_contents
                    .entry(tile)
                    .or_insert_with(|| vec![vec![LineString::new(Vec::new())]]);
                groups[0][0].0.push(Coord {
                    x: tile_x * TILE_SCALE,
                    y: tile_y * TILE_SCALE,
                });
            }
        }
    }

    /// One slicing pass with a horizontal offset, reporting whether any
    /// stripe landed past the world seam on either side.
    fn slice_world_copy(&mut self, groups: &[RingGroup], x_offset: i32) -> (bool, bool) {
        let mut overflow_left = false;
        let mut overflow_right = false;
        for group in groups {
            let mut in_progress: HashMap<TileCoord, Vec<LineString<f64>>> = HashMap::new();
            for (i, ring) in group.rings().enumerate() {
                let outer = i == 0;
                let x_slices = self.slice_x(ring);
                if self.z >= 6 && x_slices.len() as u64 >= (1u64 << self.z) - 1 {
                    log::warn!(
                        "segment spans nearly the whole world at z{}: {} stripes",
                        self.z,
                        x_slices.len()
                    );
                }
                for (x, slices) in x_slices {
                    let x = x + x_offset;
                    if x >= self.world {
                        overflow_right = true;
                    } else if x < 0 {
                        overflow_left = true;
                    } else {
                        for stripe in &slices {
                            let filled = self.slice_y(stripe.points(), x, outer, &mut in_progress);
                            if self.area {
                                if let Some(range) = filled {
                                    if outer {
                                        self.add_filled_range(x, range);
                                    } else {
                                        self.remove_filled_range(x, &range);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            self.add_shape_to_results(in_progress);
        }
        (overflow_left, overflow_right)
    }

    /// Flush one group's scratch shapes into the tile store, dropping
    /// degenerate sequences.
    fn add_shape_to_results(&mut self, in_progress: HashMap<TileCoord, Vec<LineString<f64>>>) {
        for (tile, sequences) in in_progress {
            if self.area {
                // not enough points in the outer ring: drop the whole group
                match sequences.first() {
                    Some(outer) if outer.0.len() >= MIN_POLYGON_POINTS => {}
                    _ => continue,
                }
            }
            let min_points = if self.area {
                MIN_POLYGON_POINTS
            } else {
                MIN_LINE_POINTS
            };
            let surviving: Vec<LineString<f64>> = sequences
                .into_iter()
                .filter(|seq| seq.0.len() >= min_points)
                .collect();
            if !surviving.is_empty() {
                self.tile_contents.entry(tile).or_default().push(surviving);
            }
        }
    }

    /// Cut one ring into vertical stripes one tile column wide, producing
    /// stripe-local X coordinates.
    ///
    /// Iteration bounds use `neighbor_buffer` (over-include candidate
    /// columns) while the clip window uses `buffer`, so a segment running
    /// exactly on a column edge is emitted into both neighbors. Polyline
    /// slices retire from the active map when the line exits the window, so
    /// a later re-entry starts a fresh piece; polygon slices stay live and
    /// are closed at the end.
    fn slice_x(&self, ring: &LineString<f64>) -> HashMap<i32, Vec<MutableCoordinateSequence>> {
        let k1 = -self.buffer;
        let k2 = 1.0 + self.buffer;
        let nb = self.neighbor_buffer;
        let points = &ring.0;

        // The active map and the per-column output both reference slices by
        // arena index; a retired slice stays in its column's output.
        let mut arena: Vec<MutableCoordinateSequence> = Vec::new();
        let mut active: HashMap<i32, usize> = HashMap::new();
        let mut columns: HashMap<i32, Vec<usize>> = HashMap::new();

        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let start_x = (a.x.min(b.x) - nb).floor() as i32;
            let end_x = (a.x.max(b.x) + nb).floor() as i32;

            for x in start_x..=end_x {
                let ax_tile = a.x - x as f64;
                let bx_tile = b.x - x as f64;
                let idx = match active.entry(x) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let idx = arena.len();
                        arena.push(MutableCoordinateSequence::new());
                        entry.insert(idx);
                        columns.entry(x).or_default().push(idx);
                        idx
                    }
                };
                let slice = &mut arena[idx];

                let mut exited = false;
                if ax_tile < k1 {
                    // ---|-->  | (segment enters the window from the left)
                    if bx_tile > k1 {
                        intersect_x(slice, ax_tile, a.y, bx_tile, b.y, k1);
                    }
                } else if ax_tile > k2 {
                    // |  <--|--- (segment enters the window from the right)
                    if bx_tile < k2 {
                        intersect_x(slice, ax_tile, a.y, bx_tile, b.y, k2);
                    }
                } else {
                    slice.add_point(ax_tile, a.y);
                }
                if bx_tile < k1 && ax_tile >= k1 {
                    // <--|---  | (segment exits the window on the left)
                    intersect_x(slice, ax_tile, a.y, bx_tile, b.y, k1);
                    exited = true;
                }
                if bx_tile > k2 && ax_tile <= k2 {
                    // |  ---|--> (segment exits the window on the right)
                    intersect_x(slice, ax_tile, a.y, bx_tile, b.y, k2);
                    exited = true;
                }
                if !self.area && exited {
                    active.remove(&x);
                }
            }
        }

        // append the final vertex to any live slice near it
        if let Some(&last) = points.last() {
            let start_x = (last.x - nb).floor() as i32;
            let end_x = (last.x + nb).floor() as i32;
            for x in (start_x - 1)..=(end_x + 1) {
                let ax_tile = last.x - x as f64;
                if let Some(&idx) = active.get(&x) {
                    if ax_tile >= k1 && ax_tile <= k2 {
                        arena[idx].add_point(ax_tile, last.y);
                    }
                }
            }
        }

        // close the rings if endpoints are not the same after clipping
        if self.area {
            for &idx in active.values() {
                arena[idx].close_ring();
            }
        }

        columns.retain(|&x, _| self.extents.test_x(wrap_x(x, self.world)));

        columns
            .into_iter()
            .map(|(x, indices)| {
                let slices = indices
                    .into_iter()
                    .map(|idx| std::mem::take(&mut arena[idx]))
                    .collect();
                (x, slices)
            })
            .collect()
    }

    /// Cut one stripe slice into tile-sized cells at column `x`, adding
    /// finished sequences to the group's scratch map in tile-local pixels.
    ///
    /// For polygons, a segment running exactly down the stripe's right edge
    /// (or up its left edge) traces the boundary of a column the polygon
    /// covers entirely; the rows it passes are skipped and journaled instead
    /// of materialised. A row is reported filled when both edges skipped it.
    /// When a later segment of the same ring does need points in a skipped
    /// row, the journal is replayed into the fresh slice first so the ring
    /// stays locally correct.
    fn slice_y(
        &self,
        stripe: &[Coord<f64>],
        x: i32,
        outer: bool,
        in_progress: &mut HashMap<TileCoord, Vec<LineString<f64>>>,
    ) -> Option<IntRange> {
        if stripe.is_empty() {
            return None;
        }
        if x < 0 || x >= self.world {
            return None;
        }

        let left_edge = -self.buffer;
        let right_edge = 1.0 + self.buffer;
        let nb = self.neighbor_buffer;

        let mut tiles: Option<BTreeSet<i32>> = None;
        let mut left_filled: Option<IntRange> = None;
        let mut right_filled: Option<IntRange> = None;
        let mut skipped: Option<Vec<SkippedSegment>> = None;

        struct YSlice {
            seq: MutableCoordinateSequence,
            y: i32,
            needs_fill: bool,
        }
        let mut arena: Vec<YSlice> = Vec::new();
        let mut active: HashMap<i32, usize> = HashMap::new();

        for i in 0..stripe.len() - 1 {
            let a = stripe[i];
            let b = stripe[i + 1];
            let min_y = a.y.min(b.y);
            let max_y = a.y.max(b.y);

            let extent_min_y = self.extents.min_y();
            let extent_max_y = self.extents.max_y();
            let start_y = extent_min_y.max((min_y - nb).floor() as i32);
            let end_start_y = extent_min_y.max((min_y + nb).floor() as i32);
            let start_end_y = (extent_max_y - 1).min((max_y - nb).floor() as i32);
            let end_y = (extent_max_y - 1).min((max_y + nb).floor() as i32);

            let on_right_edge = self.area && a.x == b.x && a.x == right_edge && b.y > a.y;
            let on_left_edge = self.area && a.x == b.x && a.x == left_edge && b.y < a.y;

            let mut y = start_y;
            while y <= end_y {
                if self.area
                    && y > end_start_y
                    && y < start_end_y
                    && (on_right_edge || on_left_edge)
                {
                    // skip to the next row that already has a slice (or the
                    // last row this edge reaches), journaling the run
                    let tiles =
                        tiles.get_or_insert_with(|| active.keys().copied().collect());
                    let next = tiles.range(y..).next().copied();
                    let next_non_edge_tile = next.map_or(start_end_y, |n| n.min(start_end_y));
                    let end_skip = next_non_edge_tile - 1;
                    let side = if on_left_edge {
                        Direction::Left
                    } else {
                        Direction::Right
                    };
                    skipped.get_or_insert_with(Vec::new).push(SkippedSegment {
                        side,
                        lo: y,
                        hi: end_skip,
                    });
                    if right_filled.is_none() {
                        right_filled = Some(IntRange::new());
                        left_filled = Some(IntRange::new());
                    }
                    if let Some(filled) = if on_right_edge {
                        right_filled.as_mut()
                    } else {
                        left_filled.as_mut()
                    } {
                        filled.add(y, end_skip);
                    }

                    y = next_non_edge_tile;
                }

                let k1 = y as f64 - self.buffer;
                let k2 = y as f64 + 1.0 + self.buffer;
                let idx = match active.entry(y) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        if let Some(tiles) = tiles.as_mut() {
                            tiles.insert(y);
                        }
                        // stripe X is already tile-relative; shift and scale Y
                        let mut seq =
                            MutableCoordinateSequence::scaling(0.0, y as f64, TILE_SCALE);
                        let tile = TileCoord::new(x as u32, y as u32, self.z);
                        // a hole reaching a tile the outer never touched means
                        // the tile sits inside the outer's body; give the hole
                        // a containing boundary
                        let needs_fill = self.area
                            && !outer
                            && in_progress.get(&tile).map_or(true, |seqs| seqs.is_empty());

                        // replay every edge run that skipped this row
                        if self.area {
                            if let (Some(lf), Some(rf), Some(entries)) = (
                                left_filled.as_ref(),
                                right_filled.as_ref(),
                                skipped.as_ref(),
                            ) {
                                if lf.contains(y) || rf.contains(y) {
                                    let top = y as f64 - self.buffer;
                                    let bottom = y as f64 + 1.0 + self.buffer;
                                    for entry in entries {
                                        if entry.lo <= y && entry.hi >= y {
                                            match entry.side {
                                                Direction::Left => {
                                                    seq.add_point(left_edge, bottom);
                                                    seq.add_point(left_edge, top);
                                                }
                                                Direction::Right => {
                                                    seq.add_point(right_edge, top);
                                                    seq.add_point(right_edge, bottom);
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }

                        let idx = arena.len();
                        arena.push(YSlice {
                            seq,
                            y,
                            needs_fill,
                        });
                        entry.insert(idx);
                        idx
                    }
                };
                let slice = &mut arena[idx].seq;

                let mut exited = false;
                if a.y < k1 {
                    // segment enters the window from above
                    if b.y > k1 {
                        intersect_y(slice, a.x, a.y, b.x, b.y, k1);
                    }
                } else if a.y > k2 {
                    // segment enters the window from below
                    if b.y < k2 {
                        intersect_y(slice, a.x, a.y, b.x, b.y, k2);
                    }
                } else {
                    slice.add_point(a.x, a.y);
                }
                if b.y < k1 && a.y >= k1 {
                    // segment exits the window above
                    intersect_y(slice, a.x, a.y, b.x, b.y, k1);
                    exited = true;
                }
                if b.y > k2 && a.y <= k2 {
                    // segment exits the window below
                    intersect_y(slice, a.x, a.y, b.x, b.y, k2);
                    exited = true;
                }
                if !self.area && exited {
                    active.remove(&y);
                }

                y += 1;
            }
        }

        // append the final vertex to any live slice near it
        let last = stripe[stripe.len() - 1];
        let start_y = (last.y - nb).floor() as i32;
        let end_y = (last.y + nb).floor() as i32;
        for y in (start_y - 1)..=(end_y + 1) {
            if let Some(&idx) = active.get(&y) {
                let k1 = y as f64 - self.buffer;
                let k2 = y as f64 + 1.0 + self.buffer;
                if last.y >= k1 && last.y <= k2 {
                    arena[idx].seq.add_point(last.x, last.y);
                }
            }
        }

        // close the rings if endpoints are not the same after clipping
        if self.area {
            for &idx in active.values() {
                arena[idx].seq.close_ring();
            }
        }

        // commit finished slices to the scratch map, in creation order
        for slice in arena {
            let tile = TileCoord::new(x as u32, slice.y as u32, self.z);
            let to_add_to = in_progress.entry(tile).or_default();
            if slice.needs_fill {
                to_add_to.push(fill(self.buffer));
            }
            to_add_to.push(slice.seq.into_line_string());
        }

        match (right_filled, left_filled) {
            (Some(right), Some(left)) => Some(right.intersect(&left)),
            _ => None,
        }
    }

    fn add_filled_range(&mut self, x: i32, y_range: IntRange) {
        let ranges = self.filled_ranges.get_or_insert_with(HashMap::new);
        match ranges.entry(x) {
            Entry::Occupied(mut entry) => entry.get_mut().add_all(&y_range),
            Entry::Vacant(entry) => {
                entry.insert(y_range);
            }
        }
    }

    fn remove_filled_range(&mut self, x: i32, y_range: &IntRange) {
        let ranges = self.filled_ranges.get_or_insert_with(HashMap::new);
        if let Some(existing) = ranges.get_mut(&x) {
            existing.remove_all(y_range);
        }
    }
}

fn wrap_x(x: i32, world: i32) -> i32 {
    let x = x % world;
    if x < 0 {
        x + world
    } else {
        x
    }
}

/// Add the interpolated vertex where segment `a -> b` crosses vertical `x`.
fn intersect_x(out: &mut MutableCoordinateSequence, ax: f64, ay: f64, bx: f64, by: f64, x: f64) {
    let t = (x - ax) / (bx - ax);
    out.add_point(x, ay + (by - ay) * t);
}

/// Add the interpolated vertex where segment `a -> b` crosses horizontal `y`.
fn intersect_y(out: &mut MutableCoordinateSequence, ax: f64, ay: f64, bx: f64, by: f64, y: f64) {
    let t = (y - ay) / (by - ay);
    out.add_point(ax + (bx - ax) * t, y);
}

/// Tile-sized square used as a synthetic outer ring, padded slightly past
/// the clip buffer so it strictly encloses any clipped hole.
fn fill(buffer: f64) -> LineString<f64> {
    let buffer = buffer + 1.0 / 4096.0;
    let min = -TILE_SCALE * buffer;
    let max = TILE_SCALE - min;
    LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)])
}
