//! HUC lookup for a point via the Geoconnex reference features API.
//!
//! Geoconnex serves the WBD hierarchy as OGC API Features collections
//! (`hu02` … `hu12`). A point is resolved by asking for items in a tiny
//! bounding box around it; gauges sitting exactly on a boundary or just off
//! the coast return nothing, so the box is widened on each retry.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use streamviz_core::geometry::BoundingBox;
use streamviz_core::huc::{derive_levels, detect_huc_field, normalize_huc_value};
use streamviz_core::{HucCode, HucLevel};

use crate::error::{CloudError, Result};
use crate::http::HttpClient;

pub const GEOCONNEX_COLLECTIONS_URL: &str = "https://reference.geoconnex.us/collections";

/// Configuration for [`GeoconnexClient`].
#[derive(Debug, Clone)]
pub struct GeoconnexOptions {
    /// Collections root (default: reference.geoconnex.us).
    pub base_url: String,
    /// Half-width of the first bbox, in degrees.
    pub buffer: f64,
    /// Added to the half-width on each retry.
    pub buffer_increment: f64,
    /// Widened queries after an empty first answer.
    pub retries: u32,
    pub request_timeout: Duration,
    /// HTTP-level retries on transient failures.
    pub max_retries: u32,
}

impl Default for GeoconnexOptions {
    fn default() -> Self {
        Self {
            base_url: GEOCONNEX_COLLECTIONS_URL.to_string(),
            buffer: 0.00001,
            buffer_increment: 0.0005,
            retries: 5,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

impl GeoconnexOptions {
    /// Bbox half-width for attempt `n` (0 is the first query).
    ///
    /// The first widened query already adds two increments, so retry `n`
    /// uses `buffer + (n + 1) * buffer_increment`.
    pub fn margin(&self, attempt: u32) -> f64 {
        if attempt == 0 {
            return self.buffer;
        }
        self.buffer + f64::from(attempt + 1) * self.buffer_increment
    }
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(rename = "numberReturned")]
    number_returned: Option<u64>,
    #[serde(default)]
    features: Vec<ItemFeature>,
}

impl ItemsResponse {
    fn returned(&self) -> u64 {
        self.number_returned.unwrap_or(self.features.len() as u64)
    }
}

#[derive(Debug, Deserialize)]
struct ItemFeature {
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Collection name for a level: `hu02`, `hu04`, … `hu12`.
pub fn collection_name(level: HucLevel) -> String {
    format!("hu{:02}", level.digits())
}

/// Async Geoconnex client.
#[derive(Debug, Clone)]
pub struct GeoconnexClient {
    http: HttpClient,
    options: GeoconnexOptions,
}

impl GeoconnexClient {
    pub fn new(options: GeoconnexOptions) -> Result<Self> {
        let http = HttpClient::new(options.request_timeout, options.max_retries)?;
        Ok(Self { http, options })
    }

    /// The `level` unit containing `(lat, lon)`.
    ///
    /// Fails with [`CloudError::NotFound`] when every widened query came back
    /// empty and [`CloudError::Ambiguous`] when more than one unit matched.
    #[instrument(skip(self))]
    pub async fn huc_for_point(&self, lat: f64, lon: f64, level: HucLevel) -> Result<HucCode> {
        let url = format!(
            "{}/{}/items",
            self.options.base_url.trim_end_matches('/'),
            collection_name(level)
        );

        let mut response = self.items(&url, lat, lon, 0).await?;
        let mut attempt = 0;
        while response.returned() == 0 && attempt < self.options.retries {
            attempt += 1;
            debug!(attempt, margin = self.options.margin(attempt), "no features, widening bbox");
            response = self.items(&url, lat, lon, attempt).await?;
        }

        match response.returned() {
            0 => {
                return Err(CloudError::NotFound {
                    level: level.to_string(),
                    what: format!("point ({lat}, {lon})"),
                })
            }
            1 => {}
            returned => return Err(CloudError::Ambiguous { returned }),
        }

        let properties = response
            .features
            .first()
            .map(|f| &f.properties)
            .ok_or_else(|| CloudError::InvalidResponse {
                url: url.clone(),
                reason: "numberReturned is 1 but features is empty".to_string(),
            })?;

        let key = detect_huc_field(properties.keys().map(String::as_str), level).ok_or_else(|| {
            CloudError::InvalidResponse {
                url: url.clone(),
                reason: format!("no {level} property"),
            }
        })?;

        properties
            .get(&key)
            .and_then(|v| normalize_huc_value(v, level))
            .ok_or_else(|| CloudError::InvalidResponse {
                url,
                reason: format!("unparseable {key} value"),
            })
    }

    /// HUC12 of the point plus every coarser code, HUC2 first.
    pub async fn huc_hierarchy(&self, lat: f64, lon: f64) -> Result<Vec<HucCode>> {
        let huc12 = self.huc_for_point(lat, lon, HucLevel::Huc12).await?;
        Ok(derive_levels(&huc12))
    }

    async fn items(&self, url: &str, lat: f64, lon: f64, attempt: u32) -> Result<ItemsResponse> {
        let bbox = BoundingBox::around(lon, lat, self.options.margin(attempt));
        let query = [("f", "json".to_string()), ("bbox", bbox.to_query_string())];
        self.http.get_json(url, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_collection_names() {
        assert_eq!(collection_name(HucLevel::Huc2), "hu02");
        assert_eq!(collection_name(HucLevel::Huc6), "hu06");
        assert_eq!(collection_name(HucLevel::Huc12), "hu12");
    }

    #[test]
    fn test_margin_skips_one_increment() {
        let opts = GeoconnexOptions::default();
        assert_relative_eq!(opts.margin(0), 0.00001);
        assert_relative_eq!(opts.margin(1), 0.00101);
        assert_relative_eq!(opts.margin(2), 0.00151);
        assert_relative_eq!(opts.margin(5), 0.00301);
    }

    #[test]
    fn test_items_count_falls_back_to_features() {
        let r: ItemsResponse =
            serde_json::from_str(r#"{"features": [{"properties": {"huc12": "020700010101"}}]}"#)
                .unwrap();
        assert_eq!(r.returned(), 1);
    }
}
