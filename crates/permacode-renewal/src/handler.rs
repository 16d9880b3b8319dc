//! # Code Renewal Handler
//!
//! Reacts to a placed order by renewing every individual code it consumed.
//!
//! ## Two Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    on_order_placed(order, ctx)                          │
//! │                                                                         │
//! │  LOCK     CodeLocks.lock_all(tenant, codes)   (if serialize_per_code)  │
//! │                │                                                        │
//! │  RESOLVE  one promotion item at a time, in order:                      │
//! │           read payload.code  → missing: MissingPayloadKey              │
//! │           code planned before → plan it again (reissued record)        │
//! │           find_by_code(code)                                           │
//! │           ├── individual  → planned                                    │
//! │           └── global/none → AbortOrder: return, later items unread     │
//! │                             SkipItem:   note it, continue              │
//! │                │                                                        │
//! │  APPLY    for each planned record:                                     │
//! │             store.renew(record, "<code>_<32 hex>")                     │
//! │               = rename consumed record, upsert live code               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written until every promotion item resolved, so an abort or a
//! malformed item never leaves part of an order renewed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permacode_core::dead_code::dead_code;
use permacode_core::{Context, Order, PromotionCode, PromotionCodeStore, Renewal};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{NonIndividualPolicy, RenewalSettings};
use crate::error::RenewalResult;
use crate::events::{CheckoutEvent, EventKind, EventSubscriber};
use crate::locks::CodeLocks;
use crate::lookup::find_by_code;

// =============================================================================
// Report
// =============================================================================

/// Why a redeemed code was not renewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No record holds the code.
    NotFound,
    /// The record is a shared (global) code.
    NotIndividual,
}

/// A redeemed code left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCode {
    pub line_item_id: String,
    pub code: String,
    pub reason: SkipReason,
}

/// What one `on_order_placed` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenewalReport {
    /// Order handled.
    pub order_id: String,

    /// Completed renewals, in line item order.
    pub renewed: Vec<Renewal>,

    /// Codes skipped under [`NonIndividualPolicy::SkipItem`].
    pub skipped: Vec<SkippedCode>,

    /// The code that stopped the order under [`NonIndividualPolicy::AbortOrder`].
    pub stopped: Option<SkippedCode>,
}

impl RenewalReport {
    fn new(order_id: &str) -> Self {
        RenewalReport {
            order_id: order_id.to_string(),
            ..Self::default()
        }
    }

    /// True when the order was left untouched because of a non-individual code.
    pub fn is_aborted(&self) -> bool {
        self.stopped.is_some()
    }

    /// Codes renewed.
    pub fn renewed_codes(&self) -> Vec<&str> {
        self.renewed.iter().map(|r| r.code.as_str()).collect()
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Renews individual promotion codes consumed by placed orders.
///
/// ## Usage
/// ```rust,ignore
/// let handler = CodeRenewalHandler::new(Arc::new(db.codes()))
///     .with_policy(NonIndividualPolicy::SkipItem);
///
/// let report = handler.on_order_placed(&order, &ctx).await?;
/// ```
#[derive(Clone)]
pub struct CodeRenewalHandler {
    store: Arc<dyn PromotionCodeStore>,
    policy: NonIndividualPolicy,
    locks: Option<CodeLocks>,
}

impl std::fmt::Debug for CodeRenewalHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRenewalHandler")
            .field("policy", &self.policy)
            .field("serialize_per_code", &self.locks.is_some())
            .finish()
    }
}

impl CodeRenewalHandler {
    /// Creates a handler with default settings (abort on non-individual codes,
    /// per-code locks on).
    pub fn new(store: Arc<dyn PromotionCodeStore>) -> Self {
        Self::from_settings(store, &RenewalSettings::default())
    }

    /// Creates a handler from configuration.
    pub fn from_settings(store: Arc<dyn PromotionCodeStore>, settings: &RenewalSettings) -> Self {
        CodeRenewalHandler {
            store,
            policy: settings.on_non_individual,
            locks: settings.serialize_per_code.then(CodeLocks::new),
        }
    }

    /// Sets the non-individual policy.
    pub fn with_policy(mut self, policy: NonIndividualPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Uses a shared lock registry (handlers sharing one coordinate).
    pub fn with_locks(mut self, locks: CodeLocks) -> Self {
        self.locks = Some(locks);
        self
    }

    /// Disables per-code locking.
    pub fn without_locks(mut self) -> Self {
        self.locks = None;
        self
    }

    /// Current policy.
    pub fn policy(&self) -> NonIndividualPolicy {
        self.policy
    }

    /// Renews the individual codes consumed by `order`.
    ///
    /// Every promotion item holding an individual code gets its own cycle, so
    /// a code redeemed on two items is renewed twice.
    ///
    /// ## Errors
    /// - `MissingPayloadKey` / `InvalidPayload` for a promotion item reached
    ///   without a usable code (nothing written)
    /// - `Store` for rejected criteria or failed writes; nothing is retried,
    ///   and renewals already applied for earlier items stay applied
    pub async fn on_order_placed(&self, order: &Order, context: &Context) -> RenewalResult<RenewalReport> {
        let mut report = RenewalReport::new(&order.id);

        if order.promotion_items().next().is_none() {
            debug!(order_id = %order.id, "No promotion items in order");
            return Ok(report);
        }

        // Items without a readable code are reported when resolving reaches them.
        let _guards = match &self.locks {
            Some(locks) => Some(
                locks
                    .lock_all(
                        &context.tenant_id,
                        order.promotion_items().filter_map(|item| item.redeemed_code().ok()),
                    )
                    .await,
            ),
            None => None,
        };

        let planned = match self.resolve(order, context, &mut report).await? {
            Some(planned) => planned,
            None => return Ok(report),
        };

        // Repeats of a code consume the record the previous cycle reissued.
        let mut reissued: HashMap<&str, String> = HashMap::new();
        for record in &planned {
            let mut consumed = record.clone();
            if let Some(id) = reissued.get(record.code.as_str()) {
                consumed.id = id.clone();
            }

            let dead = dead_code(&consumed.code);
            let renewal = self.store.renew(&consumed, &dead, context).await?;

            info!(
                order_id = %order.id,
                promotion_id = %renewal.promotion_id,
                consumed_id = %renewal.consumed_id,
                reissued_id = %renewal.reissued_id,
                "Promotion code renewed"
            );
            reissued.insert(record.code.as_str(), renewal.reissued_id.clone());
            report.renewed.push(renewal);
        }

        Ok(report)
    }

    /// Walks the promotion items in order and returns the records to renew,
    /// one per item, or `None` when the order is left alone.
    async fn resolve(
        &self,
        order: &Order,
        context: &Context,
        report: &mut RenewalReport,
    ) -> RenewalResult<Option<Vec<PromotionCode>>> {
        let mut planned: Vec<PromotionCode> = Vec::new();

        for item in order.promotion_items() {
            let code = item.redeemed_code()?;

            if let Some(earlier) = planned.iter().find(|record| record.code == code) {
                debug!(order_id = %order.id, line_item_id = %item.id, code = %code, "Code repeated in order");
                let again = earlier.clone();
                planned.push(again);
                continue;
            }

            let reason = match find_by_code(self.store.as_ref(), code, context).await? {
                Some(record) if record.is_individual() => {
                    planned.push(record);
                    continue;
                }
                Some(_) => SkipReason::NotIndividual,
                None => SkipReason::NotFound,
            };

            let skipped = SkippedCode {
                line_item_id: item.id.clone(),
                code: code.to_string(),
                reason,
            };

            match self.policy {
                NonIndividualPolicy::AbortOrder => {
                    warn!(
                        order_id = %order.id,
                        code = %code,
                        reason = ?reason,
                        "Order redeemed a non-individual code, leaving its codes untouched"
                    );
                    report.stopped = Some(skipped);
                    return Ok(None);
                }
                NonIndividualPolicy::SkipItem => {
                    debug!(order_id = %order.id, code = %code, reason = ?reason, "Skipping code");
                    report.skipped.push(skipped);
                }
            }
        }

        Ok(Some(planned))
    }
}

#[async_trait]
impl EventSubscriber for CodeRenewalHandler {
    fn name(&self) -> &str {
        "code_renewal"
    }

    fn subscribed_events(&self) -> &'static [EventKind] {
        &[EventKind::OrderPlaced]
    }

    async fn handle(&self, event: &CheckoutEvent) -> RenewalResult<()> {
        if let CheckoutEvent::OrderPlaced { order, context } = event {
            self.on_order_placed(order, context).await?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
