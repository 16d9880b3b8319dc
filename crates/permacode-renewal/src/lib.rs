//! # permacode-renewal: Order-Placed Code Renewal
//!
//! Keeps individually issued promotion codes redeemable. When an order is
//! placed, every individual code it consumed is renamed to a dead value and
//! its original string is reissued for the same promotion.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Placed                                      │
//! │                                                                         │
//! │  EventDispatcher.dispatch(CheckoutEvent::OrderPlaced { order, ctx })   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CodeRenewalHandler.on_order_placed(order, ctx)                        │
//! │       │                                                                 │
//! │       ├── collect promotion items, read payload.code                   │
//! │       ├── lock (tenant, code) for every code          (CodeLocks)      │
//! │       ├── PLAN: find_by_code for each code            (lookup)         │
//! │       │         global / unknown → stop or skip       (policy)         │
//! │       └── APPLY: store.renew(record, "<code>_<32 hex>")                │
//! │                                                                         │
//! │  Result: RenewalReport { renewed, skipped, stopped }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`handler`] - The renewal handler and its report
//! - [`lookup`] - Find a code record by its string
//! - [`locks`] - Per-code async locks
//! - [`events`] - Checkout events, subscribers and the dispatcher
//! - [`store`] - In-memory store implementation
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Renewal error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use permacode_renewal::{CodeRenewalHandler, EventDispatcher, RenewalConfig};
//!
//! let config = RenewalConfig::load(None)?;
//! let handler = CodeRenewalHandler::from_settings(store, &config.renewal);
//!
//! let mut dispatcher = EventDispatcher::new();
//! dispatcher.subscribe(Arc::new(handler));
//! dispatcher.dispatch(&CheckoutEvent::order_placed(order, ctx)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod locks;
pub mod lookup;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DatabaseSettings, NonIndividualPolicy, RenewalConfig, RenewalSettings};
pub use error::{RenewalError, RenewalResult};
pub use events::{CheckoutEvent, EventDispatcher, EventKind, EventSubscriber};
pub use handler::{CodeRenewalHandler, RenewalReport, SkipReason, SkippedCode};
pub use locks::{CodeLockSet, CodeLocks};
pub use lookup::find_by_code;
pub use store::memory::{MemoryCodeStore, StoreWrite};
