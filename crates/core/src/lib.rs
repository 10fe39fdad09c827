//! # StreamViz Core
//!
//! Core types and algorithms for the StreamViz hydrology viewer.
//!
//! This crate provides:
//! - Point-in-polygon containment for watershed boundaries
//! - HUC code normalisation and attribute field detection
//! - Gauge catalogue loading, picking and spatial filtering
//! - Gauge/domain selection state with layer style sync
//! - Request generations for discarding stale responses
//! - The STREAMS dataset catalogue

pub mod dataset;
pub mod error;
pub mod gauge;
pub mod geometry;
pub mod huc;
pub mod request;
pub mod selection;
pub mod vector;

pub use error::{Error, Result};
pub use gauge::{Gauge, GaugeCatalog};
pub use huc::{HucCode, HucLevel};
pub use selection::{Cardinality, SelectionMode, SelectionState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::gauge::{Gauge, GaugeCatalog};
    pub use crate::geometry::{geometry_contains, BoundingBox};
    pub use crate::huc::{normalize_huc, HucCode, HucLevel};
    pub use crate::request::{RequestGeneration, RequestTicket};
    pub use crate::selection::{
        Cardinality, FeatureStyle, LayerKind, LayerStyler, SelectionDelta, SelectionMode,
        SelectionState,
    };
}
