//! Core library for slicing geometries into vector-tile pieces.
//!
//! Given one input geometry (a point set, a polyline group, or a polygon
//! group) in world tile coordinates at a fixed zoom level, the slicer
//! eagerly produces the clipped piece for every tile the geometry touches,
//! and detects tiles a polygon covers entirely so their interiors never have
//! to be materialised.
//!
//! # Examples
//!
//! ```
//! use geo::LineString;
//! use tile_slicer_core::{RingGroup, TileExtents, TiledGeometry};
//!
//! // A polygon covering tile (0, 0) at zoom 1, in world tile coordinates.
//! let square = LineString::from(vec![
//!     (0.0, 0.0),
//!     (1.0, 0.0),
//!     (1.0, 1.0),
//!     (0.0, 1.0),
//!     (0.0, 0.0),
//! ]);
//! let groups = vec![RingGroup::polygon(square, vec![])];
//! let sliced =
//!     TiledGeometry::slice_shapes(TileExtents::full_at_zoom(1), 0.0, true, 1, &groups);
//!
//! assert_eq!(sliced.tile_data().count(), 1);
//! assert_eq!(sliced.filled_tiles().count(), 0);
//! ```

use thiserror::Error;

pub mod geom;
pub mod range;
pub mod sequence;
pub mod slicer;
pub mod tile;

pub use geom::{ring_groups, RingGroup, ShapeGroups};
pub use range::IntRange;
pub use sequence::MutableCoordinateSequence;
pub use slicer::{SlicedRings, TiledGeometry};
pub use tile::{TileCoord, TileExtents};

/// Errors that can occur while preparing geometries for slicing.
///
/// The slicer itself is total over floating-point input and never fails;
/// these errors come from the decomposition layer that turns a
/// `geo::Geometry` into ring groups.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(&'static str),

    #[error("non-finite coordinate in {0}")]
    NonFiniteCoordinate(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
