//! GeoJSON features.
//!
//! Only the subset the viewer exchanges is handled: features with
//! `geometry`, `properties` and an optional `id`, wrapped in a
//! FeatureCollection. Geometries map onto `geo-types`.

mod geojson;

pub use geojson::{geometry_from_geojson, geometry_to_geojson};

use geo_types::Geometry;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: Map<String, Value>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Map::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// String view of an attribute; numbers are rendered, null is `None`.
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Numeric view of an attribute; numeric strings are parsed.
    pub fn property_f64(&self, key: &str) -> Option<f64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn from_geojson(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidGeoJson("feature is not an object".into()))?;

        let geometry = match obj.get("geometry") {
            None | Some(Value::Null) => None,
            Some(g) => Some(geometry_from_geojson(g)?),
        };
        let properties = match obj.get("properties") {
            Some(Value::Object(m)) => m.clone(),
            None | Some(Value::Null) => Map::new(),
            Some(_) => return Err(Error::InvalidGeoJson("properties is not an object".into())),
        };
        let id = match obj.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Ok(Self { geometry, properties, id })
    }

    pub fn to_geojson(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), "Feature".into());
        if let Some(id) = &self.id {
            obj.insert("id".into(), id.clone().into());
        }
        obj.insert(
            "geometry".into(),
            self.geometry.as_ref().map(geometry_to_geojson).unwrap_or(Value::Null),
        );
        obj.insert("properties".into(), Value::Object(self.properties.clone()));
        Value::Object(obj)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Parse a FeatureCollection. A bare Feature or bare geometry is
    /// accepted and wrapped in a one-element collection.
    pub fn from_geojson_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_geojson(&value)
    }

    pub fn from_geojson(value: &Value) -> Result<Self> {
        match value.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => {
                let features = value
                    .get("features")
                    .and_then(Value::as_array)
                    .ok_or_else(|| Error::InvalidGeoJson("missing features array".into()))?;
                let features = features
                    .iter()
                    .map(Feature::from_geojson)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self { features })
            }
            Some("Feature") => Ok(Self {
                features: vec![Feature::from_geojson(value)?],
            }),
            Some(_) => Ok(Self {
                features: vec![Feature::new(geometry_from_geojson(value)?)],
            }),
            None => Err(Error::InvalidGeoJson("missing type".into())),
        }
    }

    pub fn to_geojson(&self) -> Value {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
        })
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
