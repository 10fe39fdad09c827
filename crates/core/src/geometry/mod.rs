//! Point-in-polygon containment for watershed boundaries.
//!
//! Containment uses a horizontal ray cast from the query point and counts
//! edge crossings. Rings are combined with the even-odd rule, so a point
//! inside a hole (an interior ring) is outside the polygon. The same rule
//! lets flattened Esri ring lists be tested without first sorting rings
//! into shells and holes.
//!
//! Points exactly on a boundary may land on either side.

mod bbox;

pub use bbox::{bounding_box, BoundingBox};

use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};

/// Ray-casting test of a single ring.
///
/// The ring may be closed (first == last) or open; the closing edge is
/// implied either way. Rings with fewer than three distinct vertices
/// contain nothing.
pub fn point_in_ring(point: Coord<f64>, ring: &[Coord<f64>]) -> bool {
    if !point.x.is_finite() || !point.y.is_finite() {
        return false;
    }

    let n = if ring.len() > 1 && ring[0] == ring[ring.len() - 1] {
        ring.len() - 1
    } else {
        ring.len()
    };
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        // Half-open on y so a vertex shared by two edges is counted once.
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Even-odd containment over a set of rings.
pub fn point_in_rings<'a, I>(point: Coord<f64>, rings: I) -> bool
where
    I: IntoIterator<Item = &'a [Coord<f64>]>,
{
    rings
        .into_iter()
        .filter(|ring| point_in_ring(point, ring))
        .count()
        % 2
        == 1
}

fn ring_coords(ring: &LineString<f64>) -> &[Coord<f64>] {
    &ring.0
}

/// Polygon containment: exterior plus interiors under even-odd.
pub fn polygon_contains(polygon: &Polygon<f64>, point: Coord<f64>) -> bool {
    let rings = std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(ring_coords);
    point_in_rings(point, rings)
}

/// A multipolygon contains a point when any member polygon does.
pub fn multipolygon_contains(multi: &MultiPolygon<f64>, point: Coord<f64>) -> bool {
    multi.0.iter().any(|p| polygon_contains(p, point))
}

/// Containment for any geometry.
///
/// Only areal geometries can contain a point; points and lines return
/// `false`. A bounding-box check rejects distant points before any ring
/// is walked.
pub fn geometry_contains(geometry: &Geometry<f64>, point: Coord<f64>) -> bool {
    match bounding_box(geometry) {
        Some(bb) if bb.contains_point(point.x, point.y) => {}
        _ => return false,
    }

    match geometry {
        Geometry::Polygon(p) => polygon_contains(p, point),
        Geometry::MultiPolygon(mp) => multipolygon_contains(mp, point),
        Geometry::Rect(r) => polygon_contains(&r.to_polygon(), point),
        Geometry::Triangle(t) => polygon_contains(&t.to_polygon(), point),
        Geometry::GeometryCollection(gc) => gc.0.iter().any(|g| geometry_contains(g, point)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, polygon, Rect};

    fn square(min: f64, max: f64) -> Vec<Coord<f64>> {
        vec![
            coord! { x: min, y: min },
            coord! { x: max, y: min },
            coord! { x: max, y: max },
            coord! { x: min, y: max },
            coord! { x: min, y: min },
        ]
    }

    fn donut() -> Polygon<f64> {
        Polygon::new(
            LineString::from(square(0.0, 10.0)),
            vec![LineString::from(square(4.0, 6.0))],
        )
    }

    #[test]
    fn test_ring_inside_outside() {
        let ring = square(0.0, 10.0);
        assert!(point_in_ring(coord! { x: 5.0, y: 5.0 }, &ring));
        assert!(!point_in_ring(coord! { x: 15.0, y: 5.0 }, &ring));
        assert!(!point_in_ring(coord! { x: -1.0, y: 5.0 }, &ring));
    }

    #[test]
    fn test_open_ring_is_closed_implicitly() {
        let mut ring = square(0.0, 10.0);
        ring.pop();
        assert!(point_in_ring(coord! { x: 2.0, y: 8.0 }, &ring));
    }

    #[test]
    fn test_degenerate_ring() {
        let ring = vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }];
        assert!(!point_in_ring(coord! { x: 0.5, y: 0.5 }, &ring));
        assert!(!point_in_ring(coord! { x: 0.5, y: 0.5 }, &[]));
    }

    #[test]
    fn test_nan_is_never_inside() {
        let ring = square(0.0, 10.0);
        assert!(!point_in_ring(coord! { x: f64::NAN, y: 5.0 }, &ring));
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening upwards.
        let ring = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 6.0, y: 0.0 },
            coord! { x: 6.0, y: 6.0 },
            coord! { x: 4.0, y: 6.0 },
            coord! { x: 4.0, y: 2.0 },
            coord! { x: 2.0, y: 2.0 },
            coord! { x: 2.0, y: 6.0 },
            coord! { x: 0.0, y: 6.0 },
        ];
        assert!(point_in_ring(coord! { x: 1.0, y: 5.0 }, &ring));
        assert!(point_in_ring(coord! { x: 5.0, y: 5.0 }, &ring));
        assert!(!point_in_ring(coord! { x: 3.0, y: 5.0 }, &ring));
        assert!(point_in_ring(coord! { x: 3.0, y: 1.0 }, &ring));
    }

    #[test]
    fn test_hole_excludes_point() {
        let p = donut();
        assert!(polygon_contains(&p, coord! { x: 2.0, y: 2.0 }));
        assert!(!polygon_contains(&p, coord! { x: 5.0, y: 5.0 }));
    }

    #[test]
    fn test_flat_rings_even_odd() {
        let outer = square(0.0, 10.0);
        let hole = square(4.0, 6.0);
        let island = square(4.5, 5.5);
        let rings = [outer.as_slice(), hole.as_slice(), island.as_slice()];
        assert!(point_in_rings(coord! { x: 1.0, y: 1.0 }, rings));
        assert!(!point_in_rings(coord! { x: 4.2, y: 4.2 }, rings));
        assert!(point_in_rings(coord! { x: 5.0, y: 5.0 }, rings));
    }

    #[test]
    fn test_multipolygon_any_member() {
        let mp = MultiPolygon::new(vec![
            Polygon::new(LineString::from(square(0.0, 1.0)), vec![]),
            Polygon::new(LineString::from(square(5.0, 6.0)), vec![]),
        ]);
        assert!(multipolygon_contains(&mp, coord! { x: 0.5, y: 0.5 }));
        assert!(multipolygon_contains(&mp, coord! { x: 5.5, y: 5.5 }));
        assert!(!multipolygon_contains(&mp, coord! { x: 3.0, y: 3.0 }));
    }

    #[test]
    fn test_multipolygon_overlapping_members() {
        // members are unioned, not counted even-odd
        let mp = MultiPolygon::new(vec![
            Polygon::new(LineString::from(square(0.0, 4.0)), vec![]),
            Polygon::new(LineString::from(square(2.0, 6.0)), vec![]),
        ]);
        assert!(multipolygon_contains(&mp, coord! { x: 3.0, y: 3.0 }));
        assert!(multipolygon_contains(&mp, coord! { x: 1.0, y: 1.0 }));
        assert!(multipolygon_contains(&mp, coord! { x: 5.0, y: 5.0 }));
        assert!(!multipolygon_contains(&mp, coord! { x: 1.0, y: 5.0 }));
    }

    #[test]
    fn test_geometry_dispatch() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 0.0, y: 4.0)];
        let g = Geometry::Polygon(poly);
        assert!(geometry_contains(&g, coord! { x: 1.0, y: 1.0 }));
        assert!(!geometry_contains(&g, coord! { x: 3.0, y: 3.0 }));

        let rect = Geometry::Rect(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }));
        assert!(geometry_contains(&rect, coord! { x: 1.0, y: 1.0 }));

        let pt = Geometry::Point(geo_types::Point::new(1.0, 1.0));
        assert!(!geometry_contains(&pt, coord! { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn test_geometry_collection_and_hole() {
        let gc = Geometry::GeometryCollection(geo_types::GeometryCollection(vec![
            Geometry::Polygon(donut()),
        ]));
        assert!(geometry_contains(&gc, coord! { x: 8.0, y: 8.0 }));
        assert!(!geometry_contains(&gc, coord! { x: 5.0, y: 5.0 }));
    }
}
