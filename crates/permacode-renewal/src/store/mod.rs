//! # Store Implementations
//!
//! The handler only needs an `Arc<dyn PromotionCodeStore>`. This crate ships
//! an in-memory one; `permacode-db` provides SQLite.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┬────────────────────────┐
//! │ Store                │ renew()              │ Unique code per tenant │
//! ├──────────────────────┼──────────────────────┼────────────────────────┤
//! │ MemoryCodeStore      │ two calls (provided) │ checked under a Mutex  │
//! │ PromotionCodeRepo…   │ one transaction      │ UNIQUE index           │
//! └──────────────────────┴──────────────────────┴────────────────────────┘
//! ```

pub mod memory;
