//! Stream gauges and the catalogue the map draws from.

use std::fmt;
use std::path::Path;

use geo_types::{Coord, Geometry, Point};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::{bounding_box, geometry_contains};
use crate::vector::{Feature, FeatureCollection};

/// Attribute holding the gauge identifier in the STREAMS gauge layer.
pub const STREAM_ID_FIELD: &str = "STREAM_ID";

/// Squared-degree radius within which a click counts as hitting a gauge.
pub const DEFAULT_PICK_THRESHOLD: f64 = 0.0001;

/// A fixed stream-monitoring station.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub stream_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Remaining attributes, without `latitude`/`longitude`.
    pub properties: Map<String, Value>,
}

impl Gauge {
    pub fn new(stream_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            stream_id: stream_id.into(),
            latitude,
            longitude,
            properties: Map::new(),
        }
    }

    /// Location as an x=lon, y=lat coordinate.
    pub fn coord(&self) -> Coord<f64> {
        Coord { x: self.longitude, y: self.latitude }
    }

    pub fn point(&self) -> Point<f64> {
        Point::from(self.coord())
    }

    fn from_feature(index: usize, feature: &Feature) -> Result<Self> {
        let (longitude, latitude) = match &feature.geometry {
            Some(Geometry::Point(p)) => (p.x(), p.y()),
            _ => match (feature.property_f64("longitude"), feature.property_f64("latitude")) {
                (Some(lon), Some(lat)) => (lon, lat),
                _ => return Err(Error::MissingLocation { index }),
            },
        };

        let stream_id = feature
            .property_str(STREAM_ID_FIELD)
            .or_else(|| feature.property_str("id"))
            .or_else(|| feature.id.clone())
            .unwrap_or_else(|| format!("gauge-{index}"));

        let properties = feature
            .properties
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "latitude" | "longitude" | "geometry"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self { stream_id, latitude, longitude, properties })
    }

    /// Popup content for this gauge.
    pub fn summary(&self) -> GaugeSummary {
        let text = |key: &str| match self.properties.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        };
        GaugeSummary {
            site_name: match self.properties.get("site name") {
                Some(Value::String(s)) => s.clone(),
                _ => "Gauge".to_string(),
            },
            stream_id: self.stream_id.clone(),
            source: text("source"),
            source_id: text("SourceID"),
            latitude: self.latitude,
            longitude: self.longitude,
            state: text("State"),
            state_code: text("State Code"),
            drainage_area_sqkm: text("drain_sqkm"),
        }
    }
}

/// Descriptive fields shown when a gauge is picked on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSummary {
    pub site_name: String,
    pub stream_id: String,
    pub source: String,
    pub source_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub state: String,
    pub state_code: String,
    pub drainage_area_sqkm: String,
}

impl fmt::Display for GaugeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.site_name)?;
        writeln!(f, "Stream ID: {}", self.stream_id)?;
        writeln!(f, "Source: {} ({})", self.source, self.source_id)?;
        writeln!(f, "Location: {}, {}", self.latitude, self.longitude)?;
        writeln!(f, "State: {} ({})", self.state, self.state_code)?;
        write!(f, "Drainage Area: {} km²", self.drainage_area_sqkm)
    }
}

/// All gauges known to the viewer.
#[derive(Debug, Clone, Default)]
pub struct GaugeCatalog {
    gauges: Vec<Gauge>,
}

impl GaugeCatalog {
    pub fn new(gauges: Vec<Gauge>) -> Self {
        Self { gauges }
    }

    pub fn from_feature_collection(fc: &FeatureCollection) -> Result<Self> {
        let gauges = fc
            .iter()
            .enumerate()
            .map(|(i, f)| Gauge::from_feature(i, f))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = gauges.len(), "loaded gauges");
        Ok(Self { gauges })
    }

    pub fn from_geojson_str(s: &str) -> Result<Self> {
        Self::from_feature_collection(&FeatureCollection::from_geojson_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&text)
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gauge> {
        self.gauges.iter()
    }

    pub fn get(&self, stream_id: &str) -> Option<&Gauge> {
        self.gauges.iter().find(|g| g.stream_id == stream_id)
    }

    /// Closest gauge to a click, if within `max_sq_dist` squared degrees.
    pub fn nearest_within(&self, lat: f64, lon: f64, max_sq_dist: f64) -> Option<&Gauge> {
        self.gauges
            .iter()
            .map(|g| {
                let d = (g.latitude - lat).powi(2) + (g.longitude - lon).powi(2);
                (g, d)
            })
            .filter(|(_, d)| d.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, d)| *d <= max_sq_dist)
            .map(|(g, _)| g)
    }

    /// Gauges located inside an areal geometry.
    pub fn within(&self, geometry: &Geometry<f64>) -> Vec<&Gauge> {
        let Some(bb) = bounding_box(geometry) else {
            return Vec::new();
        };
        self.gauges
            .iter()
            .filter(|g| bb.contains_point(g.longitude, g.latitude))
            .filter(|g| geometry_contains(geometry, g.coord()))
            .collect()
    }

    /// FeatureCollection of point features. `max_features == 0` keeps all.
    pub fn to_geojson(&self, max_features: usize) -> Value {
        let limit = if max_features == 0 { usize::MAX } else { max_features };
        let features = self
            .gauges
            .iter()
            .take(limit)
            .map(|g| {
                let mut f = Feature::new(Geometry::Point(g.point()));
                f.properties = g.properties.clone();
                f.properties
                    .entry(STREAM_ID_FIELD)
                    .or_insert_with(|| Value::String(g.stream_id.clone()));
                f
            })
            .collect();
        FeatureCollection { features }.to_geojson()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;
    use serde_json::json;

    fn catalog() -> GaugeCatalog {
        GaugeCatalog::from_geojson_str(
            &json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "geometry": {"type": "Point", "coordinates": [-77.0, 41.0]},
                        "properties": {
                            "STREAM_ID": "USGS-01540500",
                            "site name": "Susquehanna River at Danville",
                            "State": "Pennsylvania",
                            "drain_sqkm": 29060.0
                        }
                    },
                    {
                        "type": "Feature",
                        "geometry": null,
                        "properties": {"STREAM_ID": "USGS-01570500", "latitude": "40.25", "longitude": -76.88}
                    }
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_load_point_and_property_locations() {
        let c = catalog();
        assert_eq!(c.len(), 2);
        let g = c.get("USGS-01570500").unwrap();
        assert_eq!(g.latitude, 40.25);
        assert_eq!(g.longitude, -76.88);
        assert!(!g.properties.contains_key("latitude"));
    }

    #[test]
    fn test_missing_location_is_error() {
        let err = GaugeCatalog::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":null,"properties":{"STREAM_ID":"x"}}]}"#,
        );
        assert!(matches!(err, Err(Error::MissingLocation { index: 0 })));
    }

    #[test]
    fn test_nearest_within_threshold() {
        let c = catalog();
        let hit = c.nearest_within(41.005, -77.005, DEFAULT_PICK_THRESHOLD).unwrap();
        assert_eq!(hit.stream_id, "USGS-01540500");
        assert!(c.nearest_within(42.0, -77.0, DEFAULT_PICK_THRESHOLD).is_none());
        assert!(GaugeCatalog::default().nearest_within(0.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_within_polygon() {
        let c = catalog();
        let poly = Geometry::Polygon(polygon![
            (x: -78.0, y: 40.5),
            (x: -76.5, y: 40.5),
            (x: -76.5, y: 41.5),
            (x: -78.0, y: 41.5),
        ]);
        let ids: Vec<&str> = c.within(&poly).iter().map(|g| g.stream_id.as_str()).collect();
        assert_eq!(ids, vec!["USGS-01540500"]);
    }

    #[test]
    fn test_summary_defaults() {
        let c = catalog();
        let s = c.get("USGS-01540500").unwrap().summary();
        assert_eq!(s.site_name, "Susquehanna River at Danville");
        assert_eq!(s.source, "N/A");
        assert_eq!(s.drainage_area_sqkm, "29060.0");
        assert!(s.to_string().contains("State: Pennsylvania (N/A)"));

        let other = c.get("USGS-01570500").unwrap().summary();
        assert_eq!(other.site_name, "Gauge");
    }

    #[test]
    fn test_to_geojson_limit() {
        let c = catalog();
        let all = c.to_geojson(0);
        assert_eq!(all["features"].as_array().unwrap().len(), 2);
        let one = c.to_geojson(1);
        let features = one["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["STREAM_ID"], "USGS-01540500");
        assert_eq!(features[0]["geometry"]["type"], "Point");
    }
}
