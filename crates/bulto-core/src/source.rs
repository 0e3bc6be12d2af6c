//! Data-fetching collaborators.
//!
//! The core never talks to the backend itself. Callers hand it snapshots
//! obtained through these traits; implementations own transport,
//! authentication, retries and backoff.

use crate::error::ErrorCode;
use crate::model::{ItemStatus, ShipmentSnapshot};

/// Failure of a fetch against the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("'{id}' not found")]
    NotFound { id: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("server error: {0}")]
    Server(String),
}

impl FetchError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::ShipmentNotFound,
            Self::Auth(_) => ErrorCode::AuthFailed,
            Self::Server(_) => ErrorCode::BackendFailure,
        }
    }
}

/// Shipment history lookup by tracking identifier.
pub trait ShipmentSource {
    /// Fetch the full history of one shipment.
    ///
    /// # Errors
    ///
    /// [`FetchError::NotFound`] for unknown tracking identifiers, otherwise
    /// [`FetchError::Auth`] or [`FetchError::Server`].
    fn fetch_shipment(&self, tracking_id: &str) -> Result<ShipmentSnapshot, FetchError>;
}

/// Per-item status lookup.
pub trait ItemStatusSource {
    /// Fetch the status record of one item.
    ///
    /// # Errors
    ///
    /// As [`ShipmentSource::fetch_shipment`].
    fn fetch_item_status(&self, item_code: &str) -> Result<ItemStatus, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_by_variant() {
        assert_eq!(
            FetchError::NotFound { id: "x".into() }.code(),
            ErrorCode::ShipmentNotFound
        );
        assert_eq!(FetchError::Auth("expired".into()).code(), ErrorCode::AuthFailed);
        assert_eq!(FetchError::Server("502".into()).code(), ErrorCode::BackendFailure);
    }

    #[test]
    fn display_names_the_id() {
        let err = FetchError::NotFound { id: "TRK1".into() };
        assert_eq!(err.to_string(), "'TRK1' not found");
    }
}
