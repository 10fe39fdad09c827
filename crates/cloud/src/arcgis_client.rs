//! Async client for ArcGIS REST feature-service layers.
//!
//! Only the layer `/query` operation is used. Requests are POSTed as forms
//! so polygon filters don't hit URL length limits, and results are paged
//! with `resultOffset` while the service reports `exceededTransferLimit`.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::arcgis_models::{EsriFeature, QueryParams, QueryResponse};
use crate::error::{CloudError, Result};
use crate::http::HttpClient;

/// USGS Watershed Boundary Dataset map service.
pub const WBD_SERVICE_URL: &str = "https://hydro.nationalmap.gov/arcgis/rest/services/wbd/MapServer";

/// WBD layer holding HUC6 basins.
pub const WBD_HUC6_LAYER: u32 = 3;

/// WBD layer holding HUC10 watersheds.
pub const WBD_HUC10_LAYER: u32 = 5;

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// One layer of a MapServer or FeatureServer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayer {
    pub service_url: String,
    pub layer_id: u32,
}

impl FeatureLayer {
    pub fn new(service_url: impl Into<String>, layer_id: u32) -> Self {
        Self {
            service_url: service_url.into(),
            layer_id,
        }
    }

    /// Full `<service>/<layer>/query` URL.
    pub fn query_url(&self) -> String {
        format!("{}/{}/query", self.service_url.trim_end_matches('/'), self.layer_id)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`FeatureServiceClient`].
#[derive(Debug, Clone)]
pub struct FeatureServiceOptions {
    /// Per-request timeout (default 30 s).
    pub request_timeout: Duration,
    /// Maximum retries on transient failures (default 3).
    pub max_retries: u32,
    /// Maximum total features collected across pages (default 10 000).
    pub max_features: usize,
    /// `resultRecordCount` per page; `None` lets the service decide.
    pub page_size: Option<u64>,
}

impl Default for FeatureServiceOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_features: 10_000,
            page_size: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for feature-service queries.
#[derive(Debug, Clone)]
pub struct FeatureServiceClient {
    http: HttpClient,
    options: FeatureServiceOptions,
}

impl FeatureServiceClient {
    pub fn new(options: FeatureServiceOptions) -> Result<Self> {
        let http = HttpClient::new(options.request_timeout, options.max_retries)?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &FeatureServiceOptions {
        &self.options
    }

    // ── Single page ─────────────────────────────────────────────────

    /// Run one `/query` request. A service `error` body becomes
    /// [`CloudError::Service`].
    pub async fn query_page(
        &self,
        layer: &FeatureLayer,
        params: &QueryParams,
    ) -> Result<QueryResponse> {
        let url = layer.query_url();
        let response: QueryResponse = self.http.post_form_json(&url, &params.to_form()).await?;
        if let Some(err) = &response.error {
            return Err(CloudError::Service {
                code: err.code,
                message: err.full_message(),
            });
        }
        Ok(response)
    }

    // ── Paginated ───────────────────────────────────────────────────

    /// Query with automatic pagination, collecting up to `max_features`.
    #[instrument(skip(self, params), fields(url = %layer.query_url(), clause = %params.where_clause))]
    pub async fn query(&self, layer: &FeatureLayer, params: &QueryParams) -> Result<Vec<EsriFeature>> {
        let max = self.options.max_features;
        let mut features: Vec<EsriFeature> = Vec::new();
        let mut offset = params.result_offset.unwrap_or(0);

        loop {
            let page_params = if offset == 0 && self.options.page_size.is_none() {
                params.clone()
            } else {
                params.clone().page(offset, self.options.page_size)
            };

            let page = self.query_page(layer, &page_params).await?;
            let received = page.features.len();
            features.extend(page.features);
            debug!(
                received,
                total = features.len(),
                more = page.exceeded_transfer_limit,
                "query page"
            );

            if !page.exceeded_transfer_limit || received == 0 || features.len() >= max {
                break;
            }
            offset += received as u64;
        }

        features.truncate(max);
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url() {
        let layer = FeatureLayer::new(format!("{WBD_SERVICE_URL}/"), WBD_HUC10_LAYER);
        assert_eq!(
            layer.query_url(),
            "https://hydro.nationalmap.gov/arcgis/rest/services/wbd/MapServer/5/query"
        );
    }

    #[test]
    fn test_default_options() {
        let opts = FeatureServiceOptions::default();
        assert_eq!(opts.max_retries, 3);
        assert_eq!(opts.max_features, 10_000);
        assert!(opts.page_size.is_none());
    }
}
