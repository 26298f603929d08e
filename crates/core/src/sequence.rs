//! Append-only coordinate sequence builder used by the clippers.

use geo::{Coord, LineString};

/// Builder for one clipped coordinate sequence.
///
/// Points are transformed at insertion time by `(p - (dx, dy)) * scale`, so
/// the cell clipper can emit tile-local pixel coordinates directly while
/// working in world units. Consecutive duplicate points (exact equality
/// after the transform) are dropped; clipping a segment that runs exactly
/// along a tile edge emits the same vertex twice, and the resulting slivers
/// must collapse below the minimum point thresholds.
#[derive(Debug, Clone)]
pub struct MutableCoordinateSequence {
    points: Vec<Coord<f64>>,
    dx: f64,
    dy: f64,
    scale: f64,
}

impl Default for MutableCoordinateSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl MutableCoordinateSequence {
    /// A sequence that stores points unchanged.
    pub fn new() -> Self {
        Self::scaling(0.0, 0.0, 1.0)
    }

    /// A sequence that stores `((x - dx) * scale, (y - dy) * scale)`.
    pub fn scaling(dx: f64, dy: f64, scale: f64) -> Self {
        Self {
            points: Vec::new(),
            dx,
            dy,
            scale,
        }
    }

    /// Append a point, skipping it when it equals the previous one.
    pub fn add_point(&mut self, x: f64, y: f64) {
        let point = Coord {
            x: (x - self.dx) * self.scale,
            y: (y - self.dy) * self.scale,
        };
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    /// Re-append the first point when it differs from the last.
    pub fn close_ring(&mut self) {
        if let (Some(&first), Some(&last)) = (self.points.first(), self.points.last()) {
            if first != last {
                self.points.push(first);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The stored (already transformed) points.
    pub fn points(&self) -> &[Coord<f64>] {
        &self.points
    }

    /// Finish the builder into a line string.
    pub fn into_line_string(self) -> LineString<f64> {
        LineString::new(self.points)
    }
}
