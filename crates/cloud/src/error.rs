//! Error types for the feature-service clients.

use std::sync::Arc;

use thiserror::Error;

/// Errors produced by the ArcGIS and Geoconnex clients.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    /// An ArcGIS `error` object returned in place of results.
    #[error("feature service error {code}: {message}")]
    Service { code: i64, message: String },

    #[error("unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("invalid HUC code: {0}")]
    InvalidHuc(String),

    #[error("no {level} unit found for {what}")]
    NotFound { level: String, what: String },

    #[error("expected exactly one feature, service returned {returned}")]
    Ambiguous { returned: u64 },

    /// Failure of a request another caller was already waiting on.
    #[error(transparent)]
    Shared(Arc<CloudError>),

    #[error("core error: {0}")]
    Core(#[from] streamviz_core::Error),
}

impl CloudError {
    /// Recover the error behind a shared lookup, so a caller sees the same
    /// variant whether or not it joined another caller's request.
    ///
    /// `Http` and `Core` carry non-cloneable sources and stay wrapped.
    pub fn from_shared(shared: Arc<CloudError>) -> CloudError {
        let shared = match Arc::try_unwrap(shared) {
            Ok(owned) => return owned,
            Err(shared) => shared,
        };
        match &*shared {
            CloudError::Network(msg) => CloudError::Network(msg.clone()),
            CloudError::Service { code, message } => CloudError::Service {
                code: *code,
                message: message.clone(),
            },
            CloudError::InvalidResponse { url, reason } => CloudError::InvalidResponse {
                url: url.clone(),
                reason: reason.clone(),
            },
            CloudError::InvalidHuc(raw) => CloudError::InvalidHuc(raw.clone()),
            CloudError::NotFound { level, what } => CloudError::NotFound {
                level: level.clone(),
                what: what.clone(),
            },
            CloudError::Ambiguous { returned } => CloudError::Ambiguous { returned: *returned },
            CloudError::Shared(inner) => CloudError::from_shared(Arc::clone(inner)),
            CloudError::Http(_) | CloudError::Core(_) => CloudError::Shared(shared),
        }
    }

    /// The underlying error, looking through [`CloudError::Shared`].
    pub fn root(&self) -> &CloudError {
        match self {
            CloudError::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::Http(e) => e.is_timeout() || e.is_connect(),
            CloudError::Network(_) => true,
            CloudError::Shared(inner) => inner.is_transient(),
            _ => false,
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shared_rebuilds_plain_variants() {
        let shared = Arc::new(CloudError::NotFound {
            level: "HUC6".into(),
            what: "boundary of 999999".into(),
        });
        let _other_holder = Arc::clone(&shared);
        let err = CloudError::from_shared(shared);
        assert!(matches!(err, CloudError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_from_shared_keeps_core_wrapped() {
        let core = streamviz_core::Error::InvalidHuc { raw: "x".into(), level: 6 };
        let shared = Arc::new(CloudError::Core(core));
        let _other_holder = Arc::clone(&shared);
        let err = CloudError::from_shared(shared);
        assert!(matches!(err, CloudError::Shared(_)));
        assert!(matches!(err.root(), CloudError::Core(_)));
    }
}
