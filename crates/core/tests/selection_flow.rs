//! End-to-end selection over gauges loaded from disk.

use std::collections::HashMap;
use std::io::Write;

use geo_types::{polygon, Geometry};
use serde_json::json;

use streamviz_core::gauge::DEFAULT_PICK_THRESHOLD;
use streamviz_core::selection::{FeatureStyle, LayerKind, LayerStyler, EMPTY_LABEL};
use streamviz_core::{Cardinality, GaugeCatalog, SelectionMode, SelectionState};

/// Map layer stand-in that remembers the last style per feature.
#[derive(Default)]
struct MapLayers {
    styles: HashMap<(LayerKind, String), FeatureStyle>,
}

impl LayerStyler for MapLayers {
    fn apply(&mut self, layer: LayerKind, id: &str, style: &FeatureStyle) {
        self.styles.insert((layer, id.to_string()), style.clone());
    }
}

impl MapLayers {
    fn style(&self, layer: LayerKind, id: &str) -> Option<&FeatureStyle> {
        self.styles.get(&(layer, id.to_string()))
    }
}

fn write_gauges() -> tempfile::NamedTempFile {
    let fc = json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [-77.50, 39.10]},
             "properties": {"STREAM_ID": "USGS-01", "site_name": "Upper Creek"}},
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [-77.20, 39.40]},
             "properties": {"STREAM_ID": "USGS-02"}},
            {"type": "Feature",
             "geometry": null,
             "properties": {"STREAM_ID": "WQP-03", "latitude": 39.80, "longitude": -76.50}}
        ]
    });
    let mut tmp = tempfile::NamedTempFile::with_suffix(".geojson").unwrap();
    tmp.write_all(fc.to_string().as_bytes()).unwrap();
    tmp
}

fn domains() -> Vec<(&'static str, Geometry<f64>)> {
    vec![
        (
            "0207000101",
            Geometry::Polygon(polygon![
                (x: -78.0, y: 39.0), (x: -77.0, y: 39.0), (x: -77.0, y: 39.5), (x: -78.0, y: 39.5)
            ]),
        ),
        (
            "0207000102",
            Geometry::Polygon(polygon![
                (x: -77.0, y: 39.5), (x: -76.0, y: 39.5), (x: -76.0, y: 40.0), (x: -77.0, y: 40.0)
            ]),
        ),
    ]
}

#[test]
fn gauge_mode_click_flow() {
    let tmp = write_gauges();
    let catalog = GaugeCatalog::from_path(tmp.path()).unwrap();
    assert_eq!(catalog.len(), 3);

    let mut layers = MapLayers::default();
    let mut state = SelectionState::new(SelectionMode::Gauge, Cardinality::Single);

    let picked = catalog
        .nearest_within(39.10001, -77.50001, DEFAULT_PICK_THRESHOLD)
        .unwrap();
    state.toggle_gauge(&picked.stream_id).unwrap().apply_to(&mut layers);
    assert_eq!(state.label(), "USGS-01");
    assert_eq!(
        layers.style(LayerKind::Gauges, "USGS-01"),
        Some(&FeatureStyle::GAUGE_SELECTED)
    );

    // single cardinality: a second pick replaces the first
    state.toggle_gauge("USGS-02").unwrap().apply_to(&mut layers);
    assert_eq!(state.label(), "USGS-02");
    assert_eq!(layers.style(LayerKind::Gauges, "USGS-01"), Some(&FeatureStyle::GAUGE));

    state.set_cardinality(Cardinality::Multiple).apply_to(&mut layers);
    assert_eq!(state.label(), EMPTY_LABEL);
    state.toggle_gauge("USGS-01").unwrap();
    state.toggle_gauge("WQP-03").unwrap();
    assert_eq!(state.label(), "USGS-01;WQP-03");
    assert_eq!(state.download_targets(&[]), vec!["USGS-01", "WQP-03"]);
}

#[test]
fn domain_mode_resolves_contained_gauges() {
    let tmp = write_gauges();
    let catalog = GaugeCatalog::from_path(tmp.path()).unwrap();
    let domains = domains();

    let mut layers = MapLayers::default();
    let mut state = SelectionState::new(SelectionMode::Gauge, Cardinality::Multiple);
    state.toggle_gauge("USGS-01").unwrap();
    state.set_mode(SelectionMode::Domain).apply_to(&mut layers);
    assert!(!state.can_download());
    assert!(state.toggle_gauge("USGS-01").is_err());

    state.toggle_domain("0207000101").unwrap().apply_to(&mut layers);
    let found = state.gauges_in_selected_domains(&catalog, domains.iter().map(|(id, g)| (*id, g)));
    let ids: Vec<&str> = found.iter().map(|g| g.stream_id.as_str()).collect();
    assert_eq!(ids, vec!["USGS-01", "USGS-02"]);

    state.toggle_domain("0207000102").unwrap().apply_to(&mut layers);
    let found = state.gauges_in_selected_domains(&catalog, domains.iter().map(|(id, g)| (*id, g)));
    assert_eq!(state.download_targets(&found), vec!["USGS-01", "USGS-02", "WQP-03"]);
    assert_eq!(
        layers.style(LayerKind::Domains, "0207000102"),
        Some(&FeatureStyle::DOMAIN_SELECTED)
    );
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = GaugeCatalog::from_path(dir.path().join("nope.geojson")).unwrap_err();
    assert!(matches!(err, streamviz_core::Error::Io(_)));
}
