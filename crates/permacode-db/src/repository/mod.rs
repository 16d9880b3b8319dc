//! # Repository Module
//!
//! Database repository implementations for Permacode.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  CodeRenewalHandler                                                    │
//! │       │                                                                 │
//! │       │  store.search(&criteria, &ctx)                                 │
//! │       │  store.renew(&record, &dead_code, &ctx)                        │
//! │       ▼                                                                 │
//! │  PromotionCodeRepository  (impl PromotionCodeStore)                    │
//! │  ├── search  → QueryBuilder over promotion_codes                       │
//! │  ├── update  → UPDATE … WHERE id AND tenant_id                         │
//! │  ├── upsert  → INSERT … ON CONFLICT(tenant_id, code) DO UPDATE         │
//! │  └── renew   → BEGIN; guarded rename; upsert; COMMIT                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`promotion_code::PromotionCodeRepository`] - Promotion code store

pub mod promotion_code;
