//! # StreamViz Cloud
//!
//! Remote lookups behind the StreamViz viewer.
//!
//! This crate resolves the HUC10 watersheds of a HUC6 basin against an
//! ArcGIS REST feature service (the USGS Watershed Boundary Dataset by
//! default), with an LRU cache, coalescing of concurrent lookups and
//! "latest request wins" handling. It also finds the HUC containing a point
//! through the Geoconnex reference API.
//!
//! ## Features
//!
//! - `native` (default): Sync API via tokio `block_on`

pub mod arcgis_client;
pub mod arcgis_models;
pub mod cache;
pub mod error;
pub mod geoconnex;
pub mod http;
pub mod resolver;

pub mod sync_api;

pub use arcgis_client::{FeatureLayer, FeatureServiceClient, FeatureServiceOptions};
pub use arcgis_models::{EsriFeature, EsriPolygon, QueryParams, QueryResponse, SpatialRel};
pub use error::{CloudError, Result};
pub use geoconnex::{GeoconnexClient, GeoconnexOptions};
pub use resolver::{
    Huc10Set, Huc10Unit, HucResolver, HucResolverOptions, Resolution, ResolveStrategy,
};

/// Blocking API re-exported as `blocking` module (native only).
#[cfg(feature = "native")]
pub mod blocking {
    pub use crate::sync_api::*;
}
