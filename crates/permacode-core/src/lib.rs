//! # permacode-core: Pure Domain Types for Permacode
//!
//! Everything the code renewal rule needs to talk about, without any way of
//! reaching a database: orders and their line items, promotion code records,
//! search criteria, the store contract and dead-code generation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Permacode Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host checkout pipeline                          │   │
//! │  │         order finalized ──► "order placed" event                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              permacode-renewal (CodeRenewalHandler)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ permacode-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ criteria  │  │   store   │  │ dead_code │  │   │
//! │  │   │  Order    │  │ Criteria  │  │ Promotion │  │ <code>_   │  │   │
//! │  │   │  LineItem │  │ Equals    │  │ CodeStore │  │ <32 hex>  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO FILES                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            permacode-db (SQLite PromotionCodeStore)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Orders, line items, context and promotion code records
//! - [`criteria`] - Search criteria with equality filters
//! - [`store`] - The persistence contract (`search` / `update` / `upsert`)
//! - [`dead_code`] - Unguessable replacement values for consumed codes
//! - [`validation`] - Code string validation shared by stores
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use permacode_core::dead_code::{dead_code, is_dead_code_of};
//!
//! let dead = dead_code("SAVE10");
//! assert!(is_dead_code_of(&dead, "SAVE10"));
//! assert_eq!(dead.len(), "SAVE10_".len() + 32);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod criteria;
pub mod dead_code;
pub mod error;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use criteria::{CodeField, Criteria, EqualsFilter};
pub use error::{CoreError, CoreResult, CriteriaError, StoreError, StoreResult, ValidationError};
pub use store::PromotionCodeStore;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID used when the host does not provide one.
///
/// The schema is tenant-scoped so a store can serve several shops; a single
/// shop simply runs everything under this id.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Line item type tag the checkout pipeline gives redeemed promotions.
pub const PROMOTION_LINE_ITEM_TYPE: &str = "promotion";

/// Payload key holding the code string the customer entered.
pub const CODE_PAYLOAD_KEY: &str = "code";
