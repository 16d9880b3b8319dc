//! # Error Types
//!
//! Domain-specific error types for permacode-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  permacode-core errors (this file)                                     │
//! │  ├── CoreError        - Line item payload contract violations          │
//! │  ├── ValidationError  - Code string validation failures                │
//! │  ├── CriteriaError    - Structurally inconsistent search criteria      │
//! │  └── StoreError       - What every PromotionCodeStore returns          │
//! │                                                                         │
//! │  permacode-db errors (separate crate)                                  │
//! │  └── DbError          - SQLite failures, mapped into StoreError        │
//! │                                                                         │
//! │  permacode-renewal errors                                              │
//! │  └── RenewalError     - What the order-placed handler returns          │
//! │                                                                         │
//! │  Flow: CriteriaError → StoreError → RenewalError → host error layer    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Line item data contract violations.
///
/// The checkout pipeline promises every promotion line item carries a string
/// `code` in its payload. These errors surface when it doesn't.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required payload key is absent.
    #[error("Line item {line_item_id} has no '{key}' in its payload")]
    MissingPayloadKey { line_item_id: String, key: String },

    /// A payload key is present but holds the wrong kind of value.
    #[error("Line item {line_item_id} has an invalid '{key}': {reason}")]
    InvalidPayload {
        line_item_id: String,
        key: String,
        reason: String,
    },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Code string validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Criteria Error
// =============================================================================

/// Search criteria that cannot be executed as written.
///
/// These are programming-contract violations, not data problems: the caller
/// built a criteria object that no store can interpret. They are never
/// swallowed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    /// Filter on a field the code entity doesn't have.
    #[error("Unknown filter field: '{field}'")]
    UnknownField { field: String },

    /// Id list contains values that are not UUIDs.
    #[error("Inconsistent criteria ids: {ids:?}")]
    InconsistentIds { ids: Vec<String> },

    /// A limit of zero can never return anything.
    #[error("Criteria limit must be greater than 0")]
    InvalidLimit,
}

// =============================================================================
// Store Error
// =============================================================================

/// Errors returned by [`crate::PromotionCodeStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Criteria were rejected before reaching storage.
    #[error("Invalid criteria: {0}")]
    Criteria(#[from] CriteriaError),

    /// Update targeted a record that does not exist in the context's scope.
    #[error("Promotion code not found: {id}")]
    NotFound { id: String },

    /// Write would break code uniqueness, or lost an optimistic check.
    #[error("Promotion code conflict on '{code}'")]
    Conflict { code: String },

    /// Record failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Backend failure (connectivity, SQL errors, injected test failures).
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a NotFound error for a record id.
    pub fn not_found(id: impl Into<String>) -> Self {
        StoreError::NotFound { id: id.into() }
    }

    /// Creates a Conflict error for a code string.
    pub fn conflict(code: impl Into<String>) -> Self {
        StoreError::Conflict { code: code.into() }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
