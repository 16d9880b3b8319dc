//! # Validation Module
//!
//! Checks stores run before writing a code string.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Store implementation (THIS MODULE)                           │
//! │  ├── live codes: non-empty, at most MAX_CODE_LEN                       │
//! │  └── renames:    non-empty, room for the dead suffix                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE (tenant_id, code)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::dead_code::DEAD_CODE_SUFFIX_LEN;
use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest code a customer can enter.
pub const MAX_CODE_LEN: usize = 200;

/// Longest value the `code` column must hold (live code plus dead suffix).
pub const MAX_STORED_CODE_LEN: usize = MAX_CODE_LEN + 1 + DEAD_CODE_SUFFIX_LEN;

/// Validates a live code before it is inserted or upserted.
///
/// Any characters are allowed, whitespace included; only the length is
/// bounded, so every code a store accepts can later be renamed to its dead
/// value.
///
/// ## Example
/// ```rust
/// use permacode_core::validation::validate_code;
///
/// assert!(validate_code("SAVE10").is_ok());
/// assert!(validate_code("SAVE 10").is_ok());
/// assert!(validate_code("").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    check_length(code, MAX_CODE_LEN)
}

/// Validates the new value of a rename, which may carry a dead suffix.
pub fn validate_renamed_code(code: &str) -> ValidationResult<()> {
    check_length(code, MAX_STORED_CODE_LEN)
}

fn check_length(code: &str, max: usize) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max,
        });
    }

    Ok(())
}
