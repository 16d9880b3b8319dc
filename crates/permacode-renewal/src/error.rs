//! # Renewal Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Upstream contract           Store                  Host boundary      │
//! │  ─────────────────           ─────                  ─────────────      │
//! │  MissingPayloadKey           Store(StoreError)      InvalidEvent       │
//! │  InvalidPayload              (criteria, conflict,   Config             │
//! │                               backend failures)                        │
//! │                                                                         │
//! │  A global or unknown code is NOT an error: the report says why the    │
//! │  order was left alone.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use permacode_core::{CoreError, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for renewal operations.
pub type RenewalResult<T> = Result<T, RenewalError>;

/// Errors surfaced by the renewal handler and dispatcher.
#[derive(Debug, Error)]
pub enum RenewalError {
    /// A promotion line item came without the code it redeemed.
    ///
    /// The checkout pipeline always sets it, so this is a defect upstream.
    #[error("Line item {line_item_id} has no '{key}' in its payload")]
    MissingPayloadKey { line_item_id: String, key: String },

    /// The payload entry exists but isn't usable.
    #[error("Line item {line_item_id} has an invalid '{key}': {reason}")]
    InvalidPayload {
        line_item_id: String,
        key: String,
        reason: String,
    },

    /// Store call failed (including rejected criteria).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event body could not be decoded.
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] serde_json::Error),

    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<CoreError> for RenewalError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MissingPayloadKey { line_item_id, key } => {
                RenewalError::MissingPayloadKey { line_item_id, key }
            }
            CoreError::InvalidPayload {
                line_item_id,
                key,
                reason,
            } => RenewalError::InvalidPayload {
                line_item_id,
                key,
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permacode_core::CriteriaError;

    #[test]
    fn test_missing_key_keeps_its_identity() {
        let err: RenewalError = CoreError::MissingPayloadKey {
            line_item_id: "li-1".to_string(),
            key: "code".to_string(),
        }
        .into();

        assert!(matches!(err, RenewalError::MissingPayloadKey { ref key, .. } if key == "code"));
    }

    #[test]
    fn test_criteria_error_surfaces_through_store() {
        let err: RenewalError = StoreError::from(CriteriaError::InvalidLimit).into();
        assert!(matches!(err, RenewalError::Store(StoreError::Criteria(_))));
        assert_eq!(err.to_string(), "Invalid criteria: Criteria limit must be greater than 0");
    }
}
