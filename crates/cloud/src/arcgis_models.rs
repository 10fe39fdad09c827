//! ArcGIS REST feature-service data types.
//!
//! Serde models for the JSON (`f=json`) flavour of the layer `/query`
//! operation: the request parameters, the feature set it returns, and
//! Esri polygon geometry with conversions to and from `geo-types`.

use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use streamviz_core::geometry::{point_in_ring, point_in_rings};

/// WGS84 well-known id.
pub const WGS84_WKID: u32 = 4326;

// ---------------------------------------------------------------------------
// Query request
// ---------------------------------------------------------------------------

/// Spatial relationship for geometry filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialRel {
    #[default]
    Intersects,
    Contains,
    Within,
}

impl SpatialRel {
    pub fn as_str(self) -> &'static str {
        match self {
            SpatialRel::Intersects => "esriSpatialRelIntersects",
            SpatialRel::Contains => "esriSpatialRelContains",
            SpatialRel::Within => "esriSpatialRelWithin",
        }
    }
}

/// Parameters for `GET|POST <layer>/query`.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub where_clause: String,
    pub out_fields: String,
    pub return_geometry: bool,
    pub geometry: Option<EsriPolygon>,
    pub spatial_rel: SpatialRel,
    pub out_sr: u32,
    pub result_offset: Option<u64>,
    pub result_record_count: Option<u64>,
}

impl QueryParams {
    /// All features, all fields, WGS84 output, no geometry.
    pub fn new() -> Self {
        Self {
            where_clause: "1=1".to_string(),
            out_fields: "*".to_string(),
            return_geometry: false,
            geometry: None,
            spatial_rel: SpatialRel::default(),
            out_sr: WGS84_WKID,
            result_offset: None,
            result_record_count: None,
        }
    }

    /// Set the SQL `where` clause.
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = clause.into();
        self
    }

    /// `FIELD LIKE '<prefix>%'`.
    pub fn where_starts_with(self, field: &str, prefix: &str) -> Self {
        self.where_clause(format!("{field} LIKE '{}%'", sql_escape(prefix)))
    }

    /// `FIELD = '<value>'`.
    pub fn where_equals(self, field: &str, value: &str) -> Self {
        self.where_clause(format!("{field} = '{}'", sql_escape(value)))
    }

    pub fn out_fields(mut self, fields: &[&str]) -> Self {
        self.out_fields = fields.join(",");
        self
    }

    pub fn return_geometry(mut self, yes: bool) -> Self {
        self.return_geometry = yes;
        self
    }

    /// Filter by a polygon in WGS84.
    pub fn geometry(mut self, polygon: EsriPolygon, rel: SpatialRel) -> Self {
        self.geometry = Some(polygon);
        self.spatial_rel = rel;
        self
    }

    pub fn page(mut self, offset: u64, count: Option<u64>) -> Self {
        self.result_offset = Some(offset);
        self.result_record_count = count;
        self
    }

    /// Form fields, `f=json` included.
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("f", "json".to_string()),
            ("where", self.where_clause.clone()),
            ("outFields", self.out_fields.clone()),
            ("returnGeometry", self.return_geometry.to_string()),
            ("outSR", self.out_sr.to_string()),
        ];
        if let Some(geom) = &self.geometry {
            form.push(("geometry", geom.to_json().to_string()));
            form.push(("geometryType", "esriGeometryPolygon".to_string()));
            form.push(("inSR", WGS84_WKID.to_string()));
            form.push(("spatialRel", self.spatial_rel.as_str().to_string()));
        }
        if let Some(offset) = self.result_offset {
            form.push(("resultOffset", offset.to_string()));
        }
        if let Some(count) = self.result_record_count {
            form.push(("resultRecordCount", count.to_string()));
        }
        form
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::new()
    }
}

fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A `/query` response (Esri FeatureSet).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub features: Vec<EsriFeature>,

    /// More features match than one page holds.
    #[serde(rename = "exceededTransferLimit", default)]
    pub exceeded_transfer_limit: bool,

    #[serde(rename = "geometryType", skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,

    /// ArcGIS reports failures in a 200 body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ServiceError {
    /// Message with details appended, as ArcGIS splits them.
    pub fn full_message(&self) -> String {
        if self.details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.details.join("; "))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EsriFeature {
    #[serde(default)]
    pub attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<EsriGeometry>,
}

impl EsriFeature {
    pub fn attribute_keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// First non-empty string among `keys`.
    pub fn text_attribute(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.attributes.get(*k))
            .find_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
    }

    pub fn polygon(&self) -> Option<&EsriPolygon> {
        match &self.geometry {
            Some(EsriGeometry::Polygon(p)) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpatialReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<u32>,
    #[serde(rename = "latestWkid", default, skip_serializing_if = "Option::is_none")]
    pub latest_wkid: Option<u32>,
}

/// Esri JSON geometry. Only the shapes the viewer uses are modelled.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EsriGeometry {
    Polygon(EsriPolygon),
    Point(EsriPoint),
    /// Polylines, envelopes and anything else, kept as raw JSON.
    Other(Value),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EsriPoint {
    pub x: f64,
    pub y: f64,
}

/// Esri polygon: a flat list of rings. Outer rings run clockwise, holes
/// counter-clockwise. Positions may carry z/m values, which are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EsriPolygon {
    pub rings: Vec<Vec<Vec<f64>>>,

    #[serde(rename = "spatialReference", default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

/// Twice the signed area; negative for clockwise rings (y up).
fn signed_area2(ring: &[Coord<f64>]) -> f64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum()
}

fn oriented(ring: &LineString<f64>, clockwise: bool) -> Vec<Vec<f64>> {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    if (signed_area2(&coords) < 0.0) != clockwise {
        coords.reverse();
    }
    coords.into_iter().map(|c| vec![c.x, c.y]).collect()
}

impl EsriPolygon {
    pub fn coord_rings(&self) -> Vec<Vec<Coord<f64>>> {
        self.rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect()
            })
            .collect()
    }

    /// Even-odd containment over all rings, without rebuilding polygons.
    pub fn contains(&self, point: Coord<f64>) -> bool {
        let rings = self.coord_rings();
        point_in_rings(point, rings.iter().map(Vec::as_slice))
    }

    /// Group rings into polygons: each clockwise ring starts a polygon and
    /// each counter-clockwise ring becomes a hole of the first shell that
    /// contains it. Holes with no enclosing shell are promoted to shells.
    pub fn to_multipolygon(&self) -> MultiPolygon<f64> {
        let mut shells: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
        let mut holes: Vec<LineString<f64>> = Vec::new();

        for ring in self.coord_rings() {
            if ring.len() < 3 {
                continue;
            }
            if signed_area2(&ring) <= 0.0 {
                shells.push((LineString::from(ring), Vec::new()));
            } else {
                holes.push(LineString::from(ring));
            }
        }

        for hole in holes {
            let probe = hole.0[0];
            match shells.iter_mut().find(|(shell, _)| point_in_ring(probe, &shell.0)) {
                Some((_, interiors)) => interiors.push(hole),
                None => shells.push((hole, Vec::new())),
            }
        }

        MultiPolygon::new(
            shells
                .into_iter()
                .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
                .collect(),
        )
    }

    /// Esri rings for an areal geometry, shells clockwise and holes
    /// counter-clockwise. Returns `None` for non-areal geometries.
    pub fn from_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        let polygons: Vec<&Polygon<f64>> = match geometry {
            Geometry::Polygon(p) => vec![p],
            Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
            _ => return None,
        };
        let rings = polygons
            .into_iter()
            .flat_map(|p| {
                std::iter::once(oriented(p.exterior(), true))
                    .chain(p.interiors().iter().map(|r| oriented(r, false)))
            })
            .collect();
        Some(Self {
            rings,
            spatial_reference: Some(SpatialReference { wkid: Some(WGS84_WKID), latest_wkid: None }),
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
