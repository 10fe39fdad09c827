//! GeoJSON geometry <-> geo-types conversion.

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::{json, Value};

use crate::error::{Error, Result};

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidGeoJson(msg.into())
}

fn position(v: &Value) -> Result<Coord<f64>> {
    let arr = v.as_array().ok_or_else(|| invalid("position is not an array"))?;
    match (arr.first().and_then(Value::as_f64), arr.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(invalid("position needs two numbers")),
    }
}

fn positions(v: &Value) -> Result<Vec<Coord<f64>>> {
    v.as_array()
        .ok_or_else(|| invalid("expected an array of positions"))?
        .iter()
        .map(position)
        .collect()
}

fn polygon(v: &Value) -> Result<Polygon<f64>> {
    let mut rings = v
        .as_array()
        .ok_or_else(|| invalid("polygon is not an array of rings"))?
        .iter()
        .map(|r| positions(r).map(LineString::from));
    let exterior = rings.next().ok_or_else(|| invalid("polygon has no rings"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn array<'a>(v: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    v.as_array().ok_or_else(|| invalid(format!("{what} is not an array")))
}

/// Parse a GeoJSON geometry object.
pub fn geometry_from_geojson(value: &Value) -> Result<Geometry<f64>> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("geometry has no type"))?;

    if kind == "GeometryCollection" {
        let members = value
            .get("geometries")
            .ok_or_else(|| invalid("GeometryCollection has no geometries"))?;
        let geoms = array(members, "geometries")?
            .iter()
            .map(geometry_from_geojson)
            .collect::<Result<Vec<_>>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(geoms)));
    }

    let coords = value
        .get("coordinates")
        .ok_or_else(|| invalid(format!("{kind} has no coordinates")))?;

    let geom = match kind {
        "Point" => Geometry::Point(Point::from(position(coords)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            positions(coords)?.into_iter().map(Point::from).collect(),
        )),
        "LineString" => Geometry::LineString(LineString::from(positions(coords)?)),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            array(coords, "MultiLineString")?
                .iter()
                .map(|l| positions(l).map(LineString::from))
                .collect::<Result<Vec<_>>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            array(coords, "MultiPolygon")?
                .iter()
                .map(polygon)
                .collect::<Result<Vec<_>>>()?,
        )),
        other => return Err(invalid(format!("unsupported geometry type {other}"))),
    };
    Ok(geom)
}

fn ring_json(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

fn polygon_json(p: &Polygon<f64>) -> Value {
    Value::Array(
        std::iter::once(p.exterior())
            .chain(p.interiors())
            .map(ring_json)
            .collect(),
    )
}

/// Serialise a geometry as GeoJSON. `Line`, `Rect` and `Triangle` are
/// written as their LineString/Polygon equivalents.
pub fn geometry_to_geojson(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": [p.x(), p.y()]}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.0.iter().map(|p| json!([p.x(), p.y()])).collect::<Vec<_>>(),
        }),
        Geometry::Line(l) => json!({
            "type": "LineString",
            "coordinates": [[l.start.x, l.start.y], [l.end.x, l.end.y]],
        }),
        Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": ring_json(ls)}),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.0.iter().map(ring_json).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_json(p)}),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.0.iter().map(polygon_json).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => geometry_to_geojson(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry_to_geojson(&Geometry::Polygon(t.to_polygon())),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.0.iter().map(geometry_to_geojson).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    #[test]
    fn test_polygon_with_hole() {
        let g = geometry_from_geojson(&json!({
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
            ]
        }))
        .unwrap();
        match g {
            Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_multipolygon_and_collection() {
        let g = geometry_from_geojson(&json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "MultiPolygon", "coordinates": [[[[0,0],[1,0],[1,1],[0,0]]]]},
                {"type": "Point", "coordinates": [3, 4]}
            ]
        }))
        .unwrap();
        let Geometry::GeometryCollection(gc) = g else {
            panic!("expected collection");
        };
        assert_eq!(gc.0.len(), 2);
        assert!(matches!(gc.0[0], Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_errors() {
        assert!(geometry_from_geojson(&json!({"coordinates": [0, 0]})).is_err());
        assert!(geometry_from_geojson(&json!({"type": "Point", "coordinates": [0]})).is_err());
        assert!(geometry_from_geojson(&json!({"type": "Polygon", "coordinates": []})).is_err());
        assert!(geometry_from_geojson(&json!({"type": "Curve", "coordinates": []})).is_err());
    }

    #[test]
    fn test_polygon_to_geojson() {
        let p = geo_types::polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let v = geometry_to_geojson(&Geometry::Polygon(p));
        assert_eq!(v["type"], "Polygon");
        // polygon! closes the ring
        assert_eq!(v["coordinates"][0].as_array().unwrap().len(), 4);
    }
}
