//! # permacode-db: Database Layer for Permacode
//!
//! SQLite-backed [`permacode_core::PromotionCodeStore`] using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Permacode Data Flow                              │
//! │                                                                         │
//! │  CodeRenewalHandler (permacode-renewal)                                │
//! │       │  Arc<dyn PromotionCodeStore>                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   permacode-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌─────────────┐  │   │
//! │  │   │   Database    │    │   Repository     │   │ Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (promotion_code) │   │ (embedded)  │  │   │
//! │  │   │               │    │                  │   │             │  │   │
//! │  │   │ SqlitePool    │◄───│ search / update  │   │ 001_promo…  │  │   │
//! │  │   │               │    │ upsert / renew   │   │             │  │   │
//! │  │   └───────────────┘    └──────────────────┘   └─────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite: promotion_codes (UNIQUE tenant_id, code)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - The promotion code store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use permacode_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("permacode.db")).await?;
//! let store: Arc<dyn PromotionCodeStore> = Arc::new(db.codes());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::promotion_code::PromotionCodeRepository;
