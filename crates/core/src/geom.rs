//! Ring groups and decomposition of input geometries.
//!
//! The slicer consumes *ring groups*: one outer ring plus zero or more
//! holes for polygons, or a single sequence for polylines. This module
//! defines that shape and decomposes a `geo::Geometry` in world coordinates
//! into it.

use geo::{Geometry, LineString, Polygon};

use crate::{Error, Result};

/// One polygon with holes (or one polyline) prepared for slicing.
///
/// The outer ring always occupies slot 0 when iterating [`rings`](Self::rings);
/// holes follow in input order.
#[derive(Debug, Clone)]
pub struct RingGroup {
    pub outer: LineString<f64>,
    pub holes: Vec<LineString<f64>>,
}

impl RingGroup {
    /// A polygon group: closed outer ring plus closed hole rings.
    pub fn polygon(outer: LineString<f64>, holes: Vec<LineString<f64>>) -> Self {
        Self { outer, holes }
    }

    /// A polyline group: one open sequence, no holes.
    pub fn line(line: LineString<f64>) -> Self {
        Self {
            outer: line,
            holes: Vec::new(),
        }
    }

    /// All rings of the group, outer first.
    pub fn rings(&self) -> impl Iterator<Item = &LineString<f64>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }
}

/// Ring groups plus the polygon/polyline flag expected by the slicer.
#[derive(Debug, Clone)]
pub struct ShapeGroups {
    pub groups: Vec<RingGroup>,
    pub area: bool,
}

/// Decompose a geometry in world coordinates into ring groups.
///
/// Polygonal geometries become one group per polygon with `area = true`;
/// linear geometries become one group per line with `area = false`. Point
/// geometries are rejected here — they go through
/// [`TiledGeometry::slice_points`](crate::TiledGeometry::slice_points),
/// which needs no ring structure.
pub fn ring_groups(geom: &Geometry<f64>) -> Result<ShapeGroups> {
    match geom {
        Geometry::Polygon(polygon) => Ok(ShapeGroups {
            groups: vec![polygon_group(polygon)?],
            area: true,
        }),
        Geometry::MultiPolygon(multi) => Ok(ShapeGroups {
            groups: multi
                .0
                .iter()
                .map(polygon_group)
                .collect::<Result<Vec<_>>>()?,
            area: true,
        }),
        Geometry::Rect(rect) => ring_groups(&Geometry::Polygon(rect.to_polygon())),
        Geometry::Triangle(triangle) => ring_groups(&Geometry::Polygon(triangle.to_polygon())),
        Geometry::LineString(line) => Ok(ShapeGroups {
            groups: vec![line_group(line)?],
            area: false,
        }),
        Geometry::MultiLineString(multi) => Ok(ShapeGroups {
            groups: multi
                .0
                .iter()
                .map(line_group)
                .collect::<Result<Vec<_>>>()?,
            area: false,
        }),
        Geometry::Line(line) => Ok(ShapeGroups {
            groups: vec![line_group(&LineString::new(vec![line.start, line.end]))?],
            area: false,
        }),
        Geometry::Point(_) => Err(Error::UnsupportedGeometry("Point")),
        Geometry::MultiPoint(_) => Err(Error::UnsupportedGeometry("MultiPoint")),
        Geometry::GeometryCollection(_) => Err(Error::UnsupportedGeometry("GeometryCollection")),
    }
}

fn polygon_group(polygon: &Polygon<f64>) -> Result<RingGroup> {
    check_finite(polygon.exterior(), "outer ring")?;
    for hole in polygon.interiors() {
        check_finite(hole, "interior ring")?;
    }
    Ok(RingGroup::polygon(
        polygon.exterior().clone(),
        polygon.interiors().to_vec(),
    ))
}

fn line_group(line: &LineString<f64>) -> Result<RingGroup> {
    check_finite(line, "line string")?;
    Ok(RingGroup::line(line.clone()))
}

fn check_finite(line: &LineString<f64>, what: &'static str) -> Result<()> {
    if line.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(Error::NonFiniteCoordinate(what));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Coord, GeometryCollection, MultiLineString, MultiPolygon};

    #[test]
    fn test_polygon_decomposes_to_one_group() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ];
        let shapes = ring_groups(&Geometry::Polygon(poly)).unwrap();
        assert!(shapes.area);
        assert_eq!(shapes.groups.len(), 1);
        assert!(shapes.groups[0].holes.is_empty());
        assert!(shapes.groups[0].outer.is_closed());
    }

    #[test]
    fn test_polygon_with_hole_keeps_slot_order() {
        let poly = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0), (0.0, 0.0)]),
            vec![LineString::from(vec![
                (2.0, 2.0),
                (4.0, 2.0),
                (4.0, 4.0),
                (2.0, 4.0),
                (2.0, 2.0),
            ])],
        );
        let shapes = ring_groups(&Geometry::Polygon(poly)).unwrap();
        let rings: Vec<_> = shapes.groups[0].rings().collect();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].0[1], Coord { x: 8.0, y: 0.0 });
        assert_eq!(rings[1].0[1], Coord { x: 4.0, y: 2.0 });
    }

    #[test]
    fn test_multipolygon_one_group_per_polygon() {
        let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let b = polygon![(x: 2.0, y: 2.0), (x: 3.0, y: 2.0), (x: 3.0, y: 3.0)];
        let shapes = ring_groups(&Geometry::MultiPolygon(MultiPolygon::new(vec![a, b]))).unwrap();
        assert!(shapes.area);
        assert_eq!(shapes.groups.len(), 2);
    }

    #[test]
    fn test_lines_are_not_area() {
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]);
        let shapes = ring_groups(&Geometry::LineString(line.clone())).unwrap();
        assert!(!shapes.area);
        assert_eq!(shapes.groups[0].outer, line);

        let multi = MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
            LineString::from(vec![(2.0, 2.0), (3.0, 3.0)]),
        ]);
        let shapes = ring_groups(&Geometry::MultiLineString(multi)).unwrap();
        assert_eq!(shapes.groups.len(), 2);
    }

    #[test]
    fn test_points_are_rejected() {
        let geom = Geometry::Point(geo::point!(x: 1.0, y: 1.0));
        assert!(matches!(
            ring_groups(&geom),
            Err(Error::UnsupportedGeometry("Point"))
        ));
    }

    #[test]
    fn test_collections_are_rejected() {
        let geom = Geometry::GeometryCollection(GeometryCollection::default());
        assert!(matches!(
            ring_groups(&geom),
            Err(Error::UnsupportedGeometry(_))
        ));
    }

    #[test]
    fn test_non_finite_coordinates_are_rejected() {
        let line = LineString::from(vec![(0.0, 0.0), (f64::NAN, 1.0)]);
        assert!(matches!(
            ring_groups(&Geometry::LineString(line)),
            Err(Error::NonFiniteCoordinate("line string"))
        ));
    }
}
