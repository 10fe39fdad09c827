//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async [`HucResolver`](crate::resolver::HucResolver) and
//! [`GeoconnexClient`](crate::geoconnex::GeoconnexClient) with a Tokio
//! runtime so callers don't need to manage their own async runtime.

#[cfg(feature = "native")]
mod inner {
    use std::sync::Arc;

    use streamviz_core::{HucCode, HucLevel};

    use crate::error::{CloudError, Result};
    use crate::geoconnex::{GeoconnexClient, GeoconnexOptions};
    use crate::resolver::{Huc10Set, HucResolver, HucResolverOptions};

    fn runtime() -> Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))
    }

    /// Blocking wrapper around [`HucResolver`].
    ///
    /// Uses an internal single-threaded Tokio runtime. The cache lives as
    /// long as the wrapper.
    pub struct HucResolverBlocking {
        rt: tokio::runtime::Runtime,
        inner: HucResolver,
    }

    impl HucResolverBlocking {
        pub fn new(options: HucResolverOptions) -> Result<Self> {
            let rt = runtime()?;
            let inner = HucResolver::new(options)?;
            Ok(Self { rt, inner })
        }

        /// Resolve the HUC10 units of a HUC6 (blocking).
        pub fn resolve(&self, huc6: &str) -> Result<Arc<Huc10Set>> {
            self.rt.block_on(self.inner.resolve(huc6))
        }

        pub fn invalidate(&self, huc6: &str) -> bool {
            self.inner.invalidate(huc6)
        }

        pub fn cached_len(&self) -> usize {
            self.inner.cached_len()
        }

        /// The async resolver, sharing this wrapper's cache.
        pub fn async_resolver(&self) -> &HucResolver {
            &self.inner
        }
    }

    /// Blocking wrapper around [`GeoconnexClient`].
    pub struct GeoconnexBlocking {
        rt: tokio::runtime::Runtime,
        inner: GeoconnexClient,
    }

    impl GeoconnexBlocking {
        pub fn new(options: GeoconnexOptions) -> Result<Self> {
            let rt = runtime()?;
            let inner = GeoconnexClient::new(options)?;
            Ok(Self { rt, inner })
        }

        /// The `level` unit containing the point (blocking).
        pub fn huc_for_point(&self, lat: f64, lon: f64, level: HucLevel) -> Result<HucCode> {
            self.rt.block_on(self.inner.huc_for_point(lat, lon, level))
        }

        /// HUC12 of the point plus every coarser code (blocking).
        pub fn huc_hierarchy(&self, lat: f64, lon: f64) -> Result<Vec<HucCode>> {
            self.rt.block_on(self.inner.huc_hierarchy(lat, lon))
        }
    }

    /// One-shot: resolve a HUC6 against the default WBD service (blocking).
    pub fn resolve_huc10(huc6: &str) -> Result<Arc<Huc10Set>> {
        HucResolverBlocking::new(HucResolverOptions::default())?.resolve(huc6)
    }
}

#[cfg(feature = "native")]
pub use inner::*;
