//! Selection state shared by the gauge and domain layers.
//!
//! The viewer selects gauges either directly (gauge mode) or through the
//! watershed polygons that contain them (domain mode). The two modes are
//! mutually exclusive; each holds its own id set. Every mutation returns a
//! [`SelectionDelta`] naming the features whose styling must change, so the
//! map layers can be restyled without diffing the whole state.

use std::collections::BTreeSet;
use std::fmt;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::gauge::{Gauge, GaugeCatalog};

/// Label shown when nothing is selected.
pub const EMPTY_LABEL: &str = "No Reach Selected";

/// Separator between ids in a multi-selection label.
pub const LABEL_SEPARATOR: &str = ";";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionMode {
    /// Click gauges directly.
    #[default]
    Gauge,
    /// Pick watershed polygons; their gauges are selected implicitly.
    Domain,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Gauge => f.write_str("gauge"),
            SelectionMode::Domain => f.write_str("domain"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cardinality {
    #[default]
    Single,
    Multiple,
}

/// Map layer a style change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Gauges,
    Domains,
}

impl SelectionMode {
    pub fn layer(self) -> LayerKind {
        match self {
            SelectionMode::Gauge => LayerKind::Gauges,
            SelectionMode::Domain => LayerKind::Domains,
        }
    }
}

/// Leaflet-style path options for one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStyle {
    pub color: &'static str,
    pub fill_color: &'static str,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<&'static str>,
}

impl FeatureStyle {
    pub const GAUGE: FeatureStyle = FeatureStyle {
        color: "black",
        fill_color: "#3366cc",
        weight: 1.9,
        opacity: 0.5,
        fill_opacity: 0.6,
        radius: Some(8.0),
        dash_array: Some("2"),
    };

    pub const GAUGE_SELECTED: FeatureStyle = FeatureStyle {
        color: "red",
        fill_color: "blue",
        weight: 3.0,
        opacity: 1.0,
        fill_opacity: 0.8,
        radius: Some(5.0),
        dash_array: None,
    };

    pub const DOMAIN: FeatureStyle = FeatureStyle {
        color: "#1f78b4",
        fill_color: "#a6cee3",
        weight: 1.0,
        opacity: 0.8,
        fill_opacity: 0.1,
        radius: None,
        dash_array: None,
    };

    pub const DOMAIN_SELECTED: FeatureStyle = FeatureStyle {
        color: "#e31a1c",
        fill_color: "#fb9a99",
        weight: 2.5,
        opacity: 1.0,
        fill_opacity: 0.35,
        radius: None,
        dash_array: None,
    };

    pub const HOVER: FeatureStyle = FeatureStyle {
        color: "black",
        fill_color: "red",
        weight: 1.9,
        opacity: 0.5,
        fill_opacity: 0.2,
        radius: None,
        dash_array: None,
    };

    pub fn for_layer(layer: LayerKind, selected: bool) -> &'static FeatureStyle {
        match (layer, selected) {
            (LayerKind::Gauges, false) => &Self::GAUGE,
            (LayerKind::Gauges, true) => &Self::GAUGE_SELECTED,
            (LayerKind::Domains, false) => &Self::DOMAIN,
            (LayerKind::Domains, true) => &Self::DOMAIN_SELECTED,
        }
    }
}

/// Receiver of per-feature style updates (a map layer adapter).
pub trait LayerStyler {
    fn apply(&mut self, layer: LayerKind, id: &str, style: &FeatureStyle);
}

/// Features whose selection status changed in one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionDelta {
    pub layer: LayerKind,
    pub selected: Vec<String>,
    pub deselected: Vec<String>,
}

impl SelectionDelta {
    fn new(layer: LayerKind) -> Self {
        Self { layer, selected: Vec::new(), deselected: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.deselected.is_empty()
    }

    /// Push the style changes to a layer. Deselections go first so a
    /// feature replaced by itself ends up selected.
    pub fn apply_to(&self, styler: &mut dyn LayerStyler) {
        for id in &self.deselected {
            styler.apply(self.layer, id, FeatureStyle::for_layer(self.layer, false));
        }
        for id in &self.selected {
            styler.apply(self.layer, id, FeatureStyle::for_layer(self.layer, true));
        }
    }
}

/// Current mode, cardinality and selected ids.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    mode: SelectionMode,
    cardinality: Cardinality,
    gauges: BTreeSet<String>,
    domains: BTreeSet<String>,
}

impl SelectionState {
    pub fn new(mode: SelectionMode, cardinality: Cardinality) -> Self {
        Self { mode, cardinality, ..Default::default() }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    fn active_set(&mut self) -> &mut BTreeSet<String> {
        match self.mode {
            SelectionMode::Gauge => &mut self.gauges,
            SelectionMode::Domain => &mut self.domains,
        }
    }

    /// Switch mode. The outgoing mode's selection is dropped.
    pub fn set_mode(&mut self, mode: SelectionMode) -> SelectionDelta {
        if mode == self.mode {
            return SelectionDelta::new(mode.layer());
        }
        let delta = self.clear();
        debug!(from = %self.mode, to = %mode, "selection mode changed");
        self.mode = mode;
        delta
    }

    /// Switch cardinality. The current selection is dropped.
    pub fn set_cardinality(&mut self, cardinality: Cardinality) -> SelectionDelta {
        if cardinality == self.cardinality {
            return SelectionDelta::new(self.mode.layer());
        }
        self.cardinality = cardinality;
        self.clear()
    }

    /// Drop every id selected in the active mode.
    pub fn clear(&mut self) -> SelectionDelta {
        let mut delta = SelectionDelta::new(self.mode.layer());
        delta.deselected = std::mem::take(self.active_set()).into_iter().collect();
        delta
    }

    fn toggle(&mut self, attempted: SelectionMode, id: &str) -> Result<SelectionDelta> {
        if attempted != self.mode {
            return Err(Error::InactiveMode { attempted, active: self.mode });
        }

        let cardinality = self.cardinality;
        let mut delta = SelectionDelta::new(self.mode.layer());
        let set = self.active_set();

        if set.remove(id) {
            delta.deselected.push(id.to_string());
            return Ok(delta);
        }

        if cardinality == Cardinality::Single {
            delta.deselected = std::mem::take(set).into_iter().collect();
        }
        set.insert(id.to_string());
        delta.selected.push(id.to_string());
        Ok(delta)
    }

    /// Click on a gauge. Single: replaces the selection, or clears it when
    /// the gauge was already selected. Multiple: toggles membership.
    pub fn toggle_gauge(&mut self, stream_id: &str) -> Result<SelectionDelta> {
        self.toggle(SelectionMode::Gauge, stream_id)
    }

    /// Click on a watershed polygon, with the same rules as gauges.
    pub fn toggle_domain(&mut self, code: &str) -> Result<SelectionDelta> {
        self.toggle(SelectionMode::Domain, code)
    }

    pub fn selected_gauges(&self) -> impl Iterator<Item = &str> {
        self.gauges.iter().map(String::as_str)
    }

    pub fn selected_domains(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        match self.mode {
            SelectionMode::Gauge => self.gauges.contains(id),
            SelectionMode::Domain => self.domains.contains(id),
        }
    }

    /// Gauges inside the selected domain polygons, in catalogue order.
    ///
    /// `domains` maps domain ids to their boundary; ids that are not
    /// selected are ignored, as are selected ids with no boundary.
    pub fn gauges_in_selected_domains<'a, 'g, I>(
        &self,
        catalog: &'g GaugeCatalog,
        domains: I,
    ) -> Vec<&'g Gauge>
    where
        I: IntoIterator<Item = (&'a str, &'a Geometry<f64>)>,
    {
        let boundaries: Vec<&Geometry<f64>> = domains
            .into_iter()
            .filter(|(id, _)| self.domains.contains(*id))
            .map(|(_, g)| g)
            .collect();

        let mut found: Vec<&Gauge> = Vec::new();
        for boundary in boundaries {
            for g in catalog.within(boundary) {
                if !found.iter().any(|f| f.stream_id == g.stream_id) {
                    found.push(g);
                }
            }
        }
        let order = |g: &Gauge| catalog.iter().position(|c| c.stream_id == g.stream_id);
        found.sort_by_key(|g| order(*g));
        found
    }

    /// Ids that a download would cover: the selected gauges in gauge mode,
    /// or the gauges resolved from `resolved` in domain mode.
    pub fn download_targets(&self, resolved: &[&Gauge]) -> Vec<String> {
        match self.mode {
            SelectionMode::Gauge => self.gauges.iter().cloned().collect(),
            SelectionMode::Domain => resolved.iter().map(|g| g.stream_id.clone()).collect(),
        }
    }

    /// Text for the selection box: the active ids joined by `;`.
    pub fn label(&self) -> String {
        let set = match self.mode {
            SelectionMode::Gauge => &self.gauges,
            SelectionMode::Domain => &self.domains,
        };
        if set.is_empty() {
            EMPTY_LABEL.to_string()
        } else {
            set.iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(LABEL_SEPARATOR)
        }
    }

    pub fn can_download(&self) -> bool {
        match self.mode {
            SelectionMode::Gauge => !self.gauges.is_empty(),
            SelectionMode::Domain => !self.domains.is_empty(),
        }
    }
}
