//! HUC6 → HUC10 resolution against a watershed feature service.
//!
//! Services disagree on what the HUC10 attribute is called, so the resolver
//! tries each candidate field name with a `LIKE '<huc6>%'` filter and keeps
//! the first that yields units. When none does it falls back to geometry:
//! fetch the HUC6 boundary, ask for every HUC10 polygon intersecting it and
//! keep the ones whose code starts with the HUC6.
//!
//! Results are cached per normalized HUC6, concurrent lookups of the same
//! basin share one in-flight request, and [`HucResolver::resolve_latest`]
//! discards responses that a newer lookup has superseded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use geo_types::{Coord, Geometry};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use streamviz_core::geometry::geometry_contains;
use streamviz_core::huc::{detect_huc_field, normalize_huc, normalize_huc_value};
use streamviz_core::request::RequestGeneration;
use streamviz_core::{HucCode, HucLevel};

use crate::arcgis_client::{
    FeatureLayer, FeatureServiceClient, FeatureServiceOptions, WBD_HUC10_LAYER, WBD_HUC6_LAYER,
    WBD_SERVICE_URL,
};
use crate::arcgis_models::{EsriFeature, EsriPolygon, QueryParams, SpatialRel};
use crate::cache::{HucCache, DEFAULT_CAPACITY};
use crate::error::{CloudError, Result};

const NAME_FIELDS: &[&str] = &["name", "NAME", "Name"];

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// How a [`Huc10Set`] was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// Matched with `<field> LIKE '<huc6>%'`.
    AttributeField(String),
    /// Intersected with the HUC6 boundary and filtered by prefix.
    SpatialIntersect,
}

/// One HUC10 watershed.
#[derive(Debug, Clone)]
pub struct Huc10Unit {
    pub code: HucCode,
    pub name: Option<String>,
    /// Boundary as a `MultiPolygon`, when the service returned one.
    pub geometry: Option<Geometry<f64>>,
    pub attributes: Map<String, Value>,
}

impl Huc10Unit {
    pub fn contains(&self, point: Coord<f64>) -> bool {
        self.geometry
            .as_ref()
            .is_some_and(|g| geometry_contains(g, point))
    }
}

/// All HUC10 units of one HUC6, sorted by code.
#[derive(Debug, Clone)]
pub struct Huc10Set {
    pub huc6: HucCode,
    pub units: Vec<Huc10Unit>,
    pub strategy: ResolveStrategy,
}

impl Huc10Set {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &HucCode> {
        self.units.iter().map(|u| &u.code)
    }

    pub fn get(&self, code: &str) -> Option<&Huc10Unit> {
        self.units.iter().find(|u| u.code.as_str() == code)
    }

    /// The unit whose boundary contains `point`.
    pub fn containing(&self, point: Coord<f64>) -> Option<&Huc10Unit> {
        self.units.iter().find(|u| u.contains(point))
    }

    /// `(code, geometry)` pairs for units that carry a boundary.
    pub fn domains(&self) -> impl Iterator<Item = (&str, &Geometry<f64>)> {
        self.units
            .iter()
            .filter_map(|u| u.geometry.as_ref().map(|g| (u.code.as_str(), g)))
    }
}

/// Outcome of [`HucResolver::resolve_latest`].
#[derive(Debug, Clone)]
pub enum Resolution {
    Current(Arc<Huc10Set>),
    /// A newer lookup started before this one finished.
    Stale,
}

impl Resolution {
    pub fn current(self) -> Option<Arc<Huc10Set>> {
        match self {
            Resolution::Current(set) => Some(set),
            Resolution::Stale => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`HucResolver`].
#[derive(Debug, Clone)]
pub struct HucResolverOptions {
    /// MapServer/FeatureServer root (default: USGS WBD).
    pub service_url: String,
    pub huc6_layer: u32,
    pub huc10_layer: u32,
    /// Field names tried in order; `None` uses the standard HUC10 spellings.
    pub huc10_fields: Option<Vec<String>>,
    /// Ask for HUC10 boundaries with attribute matches.
    pub return_geometry: bool,
    /// Number of HUC6 basins kept in the cache.
    pub cache_capacity: usize,
    pub service: FeatureServiceOptions,
}

impl Default for HucResolverOptions {
    fn default() -> Self {
        Self {
            service_url: WBD_SERVICE_URL.to_string(),
            huc6_layer: WBD_HUC6_LAYER,
            huc10_layer: WBD_HUC10_LAYER,
            huc10_fields: None,
            return_geometry: true,
            cache_capacity: DEFAULT_CAPACITY,
            service: FeatureServiceOptions::default(),
        }
    }
}

impl HucResolverOptions {
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    fn huc10_candidates(&self) -> Vec<String> {
        self.huc10_fields
            .clone()
            .unwrap_or_else(|| HucLevel::Huc10.field_candidates())
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

type SharedResolve = Shared<BoxFuture<'static, std::result::Result<Arc<Huc10Set>, Arc<CloudError>>>>;

struct Inner {
    client: FeatureServiceClient,
    options: HucResolverOptions,
    cache: Mutex<HucCache>,
    in_flight: Mutex<HashMap<HucCode, SharedResolve>>,
    generation: RequestGeneration,
}

/// Cached, coalescing HUC6 → HUC10 resolver. Cheap to clone.
#[derive(Clone)]
pub struct HucResolver {
    inner: Arc<Inner>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // state stays consistent across a panicking holder
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HucResolver {
    pub fn new(options: HucResolverOptions) -> Result<Self> {
        let client = FeatureServiceClient::new(options.service.clone())?;
        let cache = HucCache::new(options.cache_capacity);
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                options,
                cache: Mutex::new(cache),
                in_flight: Mutex::new(HashMap::new()),
                generation: RequestGeneration::new(),
            }),
        })
    }

    pub fn options(&self) -> &HucResolverOptions {
        &self.inner.options
    }

    /// HUC10 units of `huc6`, from cache when possible.
    ///
    /// `huc6` is normalized first (`"20700"`, `"020700.0"` and
    /// `"0207000101"` all mean `020700`).
    pub async fn resolve(&self, huc6: &str) -> Result<Arc<Huc10Set>> {
        let code = normalize_huc(huc6, HucLevel::Huc6)
            .ok_or_else(|| CloudError::InvalidHuc(huc6.to_string()))?;

        if let Some(hit) = lock(&self.inner.cache).get(&code) {
            debug!(huc6 = %code, "cache hit");
            return Ok(hit);
        }

        let pending = {
            let mut in_flight = lock(&self.inner.in_flight);
            // a lookup may have finished since the first check
            if let Some(hit) = lock(&self.inner.cache).get(&code) {
                return Ok(hit);
            }
            match in_flight.get(&code) {
                Some(pending) => {
                    debug!(huc6 = %code, "joining in-flight lookup");
                    pending.clone()
                }
                None => {
                    let pending = Arc::clone(&self.inner).spawn_lookup(code.clone());
                    in_flight.insert(code, pending.clone());
                    pending
                }
            }
        };

        pending
            .await
            .map_err(CloudError::from_shared)
    }

    /// Like [`resolve`](Self::resolve), but only the most recently started
    /// call returns [`Resolution::Current`]; earlier ones that finish after
    /// it was started return [`Resolution::Stale`], errors included.
    pub async fn resolve_latest(&self, huc6: &str) -> Result<Resolution> {
        let ticket = self.inner.generation.begin();
        let result = self.resolve(huc6).await;
        if !self.inner.generation.is_current(ticket) {
            warn!(huc6, ticket = ticket.id(), "discarding superseded lookup");
            return Ok(Resolution::Stale);
        }
        result.map(Resolution::Current)
    }

    /// Mark every outstanding [`resolve_latest`](Self::resolve_latest) stale.
    pub fn cancel_pending(&self) {
        self.inner.generation.invalidate();
    }

    /// Forget one basin. Returns whether it was cached.
    pub fn invalidate(&self, huc6: &str) -> bool {
        normalize_huc(huc6, HucLevel::Huc6).is_some_and(|code| lock(&self.inner.cache).remove(&code))
    }

    pub fn clear_cache(&self) {
        lock(&self.inner.cache).clear();
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.inner.cache).len()
    }

    pub fn is_cached(&self, huc6: &str) -> bool {
        normalize_huc(huc6, HucLevel::Huc6).is_some_and(|code| lock(&self.inner.cache).contains(&code))
    }
}

impl Inner {
    fn huc10_layer(&self) -> FeatureLayer {
        FeatureLayer::new(&self.options.service_url, self.options.huc10_layer)
    }

    fn huc6_layer(&self) -> FeatureLayer {
        FeatureLayer::new(&self.options.service_url, self.options.huc6_layer)
    }

    /// Start a shared lookup that caches its result and unregisters itself
    /// when done.
    fn spawn_lookup(self: Arc<Self>, code: HucCode) -> SharedResolve {
        async move {
            let result = self.lookup(&code).await.map(Arc::new);
            if let Ok(set) = &result {
                lock(&self.cache).insert(code.clone(), Arc::clone(set));
            }
            lock(&self.in_flight).remove(&code);
            result.map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    #[instrument(skip(self, huc6), fields(huc6 = %huc6))]
    async fn lookup(&self, huc6: &HucCode) -> Result<Huc10Set> {
        let layer = self.huc10_layer();

        for field in self.options.huc10_candidates() {
            let params = QueryParams::new()
                .where_starts_with(&field, huc6.as_str())
                .return_geometry(self.options.return_geometry);

            match self.client.query(&layer, &params).await {
                Ok(features) => {
                    let units = collect_units(&features, huc6, Some(&field));
                    if !units.is_empty() {
                        info!(field = %field, units = units.len(), "resolved by attribute");
                        return Ok(Huc10Set {
                            huc6: huc6.clone(),
                            units,
                            strategy: ResolveStrategy::AttributeField(field),
                        });
                    }
                    debug!(field = %field, returned = features.len(), "no usable features");
                }
                Err(CloudError::Service { code, message }) => {
                    debug!(field = %field, code, %message, "field rejected by service");
                }
                Err(e) => return Err(e),
            }
        }

        debug!("no attribute field matched, falling back to spatial intersection");
        let boundary = self.huc6_boundary(huc6).await?;
        let params = QueryParams::new()
            .geometry(boundary, SpatialRel::Intersects)
            .return_geometry(true);
        let features = self.client.query(&layer, &params).await?;
        let units = collect_units(&features, huc6, None);
        info!(intersecting = features.len(), units = units.len(), "resolved spatially");

        Ok(Huc10Set {
            huc6: huc6.clone(),
            units,
            strategy: ResolveStrategy::SpatialIntersect,
        })
    }

    /// Boundary polygon of `huc6` from the HUC6 layer.
    async fn huc6_boundary(&self, huc6: &HucCode) -> Result<EsriPolygon> {
        let layer = self.huc6_layer();

        for field in HucLevel::Huc6.field_candidates() {
            let params = QueryParams::new()
                .where_equals(&field, huc6.as_str())
                .return_geometry(true);

            match self.client.query(&layer, &params).await {
                Ok(features) => {
                    if let Some(polygon) = features.iter().find_map(EsriFeature::polygon) {
                        debug!(field = %field, rings = polygon.rings.len(), "HUC6 boundary");
                        return Ok(polygon.clone());
                    }
                }
                Err(CloudError::Service { code, message }) => {
                    debug!(field = %field, code, %message, "field rejected by service");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CloudError::NotFound {
            level: HucLevel::Huc6.to_string(),
            what: format!("boundary of {huc6}"),
        })
    }
}

/// Turn features into units within `huc6`, deduplicated and sorted.
///
/// With `field` set a feature reads its code from that attribute when it
/// carries it; otherwise the field is detected per feature.
fn collect_units(features: &[EsriFeature], huc6: &HucCode, field: Option<&str>) -> Vec<Huc10Unit> {
    let mut units: Vec<Huc10Unit> = Vec::with_capacity(features.len());

    for feature in features {
        // services match `where` fields case-insensitively but answer
        // with their own spelling
        let key = match field.filter(|f| feature.attributes.contains_key(*f)) {
            Some(f) => f.to_string(),
            None => match detect_huc_field(feature.attribute_keys(), HucLevel::Huc10) {
                Some(k) => k,
                None => continue,
            },
        };
        let Some(code) = feature
            .attributes
            .get(&key)
            .and_then(|v| normalize_huc_value(v, HucLevel::Huc10))
        else {
            continue;
        };
        if !code.is_within(huc6) || units.iter().any(|u| u.code == code) {
            continue;
        }

        units.push(Huc10Unit {
            code,
            name: feature.text_attribute(NAME_FIELDS),
            geometry: feature
                .polygon()
                .map(|p| Geometry::MultiPolygon(p.to_multipolygon())),
            attributes: feature.attributes.clone(),
        });
    }

    units.sort_by(|a, b| a.code.cmp(&b.code));
    units
}
