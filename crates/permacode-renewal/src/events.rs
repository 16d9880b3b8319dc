//! # Checkout Events
//!
//! How the host tells subscribers that something happened at checkout.
//!
//! ## Dispatch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  host: order finalized                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EventDispatcher.dispatch(&CheckoutEvent::OrderPlaced { … })           │
//! │       │                                                                 │
//! │       │  subscribers[EventKind::OrderPlaced]                            │
//! │       ▼                                                                 │
//! │  ┌──────────────────────┐   ┌──────────────────────┐                   │
//! │  │ CodeRenewalHandler   │──►│ other subscriber …   │   (in order)      │
//! │  └──────────────────────┘   └──────────────────────┘                   │
//! │       │                                                                 │
//! │       └── first error stops dispatch and is returned to the host       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! ```json
//! {
//!   "event": "order_placed",
//!   "order": { "id": "…", "lineItems": [ … ] },
//!   "context": { "tenantId": "…" }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permacode_core::{Context, Order};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::RenewalResult;

// =============================================================================
// Events
// =============================================================================

/// Kinds of checkout events, used for subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OrderPlaced,
    OrderCancelled,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::OrderPlaced => write!(f, "order_placed"),
            EventKind::OrderCancelled => write!(f, "order_cancelled"),
        }
    }
}

/// An event raised by the checkout pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CheckoutEvent {
    /// An order was finalized.
    OrderPlaced { order: Order, context: Context },

    /// An order was cancelled after placement.
    OrderCancelled { order_id: String, context: Context },
}

impl CheckoutEvent {
    /// Creates an order-placed event.
    pub fn order_placed(order: Order, context: Context) -> Self {
        CheckoutEvent::OrderPlaced { order, context }
    }

    /// Decodes an event from JSON.
    pub fn from_json(body: &str) -> RenewalResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// The event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            CheckoutEvent::OrderPlaced { .. } => EventKind::OrderPlaced,
            CheckoutEvent::OrderCancelled { .. } => EventKind::OrderCancelled,
        }
    }

    /// Execution context the event was raised in.
    pub fn context(&self) -> &Context {
        match self {
            CheckoutEvent::OrderPlaced { context, .. }
            | CheckoutEvent::OrderCancelled { context, .. } => context,
        }
    }
}

// =============================================================================
// Subscriber
// =============================================================================

/// Something that reacts to checkout events.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Event kinds this subscriber wants.
    fn subscribed_events(&self) -> &'static [EventKind];

    /// Handles one event. Only called for subscribed kinds.
    async fn handle(&self, event: &CheckoutEvent) -> RenewalResult<()>;
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes events to subscribers by kind, in registration order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscribers: HashMap<EventKind, Vec<Arc<dyn EventSubscriber>>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: HashMap<&EventKind, Vec<&str>> = self
            .subscribers
            .iter()
            .map(|(kind, subs)| (kind, subs.iter().map(|s| s.name()).collect()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("subscribers", &names)
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for every kind it asks for.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        for kind in subscriber.subscribed_events() {
            debug!(subscriber = %subscriber.name(), event = %kind, "Subscriber registered");
            self.subscribers
                .entry(*kind)
                .or_default()
                .push(Arc::clone(&subscriber));
        }
    }

    /// Number of subscribers for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }

    /// Delivers an event. Returns how many subscribers handled it.
    ///
    /// Stops at the first failing subscriber and returns its error.
    pub async fn dispatch(&self, event: &CheckoutEvent) -> RenewalResult<usize> {
        let Some(subscribers) = self.subscribers.get(&event.kind()) else {
            trace!(event = %event.kind(), "No subscribers");
            return Ok(0);
        };

        for subscriber in subscribers {
            debug!(subscriber = %subscriber.name(), event = %event.kind(), "Dispatching event");
            subscriber.handle(event).await?;
        }

        Ok(subscribers.len())
    }

    /// Decodes a JSON event and dispatches it.
    pub async fn dispatch_json(&self, body: &str) -> RenewalResult<usize> {
        let event = CheckoutEvent::from_json(body)?;
        self.dispatch(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenewalError;
    use crate::handler::CodeRenewalHandler;
    use crate::store::memory::MemoryCodeStore;
    use permacode_core::{CodeUpsert, PromotionCodeStore, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        kinds: &'static [EventKind],
        seen: AtomicUsize,
        fail: bool,
    }

    impl Counter {
        fn new(kinds: &'static [EventKind]) -> Arc<Self> {
            Arc::new(Counter {
                kinds,
                seen: AtomicUsize::new(0),
                fail: false,
            })
        }
    }

    #[async_trait]
    impl EventSubscriber for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn subscribed_events(&self) -> &'static [EventKind] {
            self.kinds
        }

        async fn handle(&self, _event: &CheckoutEvent) -> RenewalResult<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Backend("boom".into()).into());
            }
            Ok(())
        }
    }

    fn cancelled() -> CheckoutEvent {
        CheckoutEvent::OrderCancelled {
            order_id: "order-1".to_string(),
            context: Context::default(),
        }
    }

    #[test]
    fn test_event_from_json() {
        let event = CheckoutEvent::from_json(
            r#"{
                "event": "order_placed",
                "order": {
                    "id": "order-1",
                    "lineItems": [{ "id": "li-1", "type": "promotion", "payload": { "code": "SAVE10" } }]
                },
                "context": { "tenantId": "shop-1" }
            }"#,
        )
        .unwrap();

        assert_eq!(event.kind(), EventKind::OrderPlaced);
        assert_eq!(event.context().tenant_id, "shop-1");
    }

    #[test]
    fn test_bad_json_is_invalid_event() {
        let err = CheckoutEvent::from_json(r#"{"event":"order_exploded"}"#).unwrap_err();
        assert!(matches!(err, RenewalError::InvalidEvent(_)));
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let placed_only = Counter::new(&[EventKind::OrderPlaced]);
        let both = Counter::new(&[EventKind::OrderPlaced, EventKind::OrderCancelled]);

        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(placed_only.clone());
        dispatcher.subscribe(both.clone());

        assert_eq!(dispatcher.subscriber_count(EventKind::OrderPlaced), 2);
        assert_eq!(dispatcher.dispatch(&cancelled()).await.unwrap(), 1);
        assert_eq!(placed_only.seen.load(Ordering::SeqCst), 0);
        assert_eq!(both.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let dispatcher = EventDispatcher::new();
        assert_eq!(dispatcher.dispatch(&cancelled()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_error_stops_dispatch() {
        let failing = Arc::new(Counter {
            kinds: &[EventKind::OrderCancelled],
            seen: AtomicUsize::new(0),
            fail: true,
        });
        let after = Counter::new(&[EventKind::OrderCancelled]);

        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(failing.clone());
        dispatcher.subscribe(after.clone());

        let err = dispatcher.dispatch(&cancelled()).await.unwrap_err();
        assert!(matches!(err, RenewalError::Store(StoreError::Backend(_))));
        assert_eq!(after.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_json_order_renews_through_handler() {
        let store = Arc::new(MemoryCodeStore::new());
        let ctx = Context::system("shop-1");
        store
            .upsert(vec![CodeUpsert::individual("P1", "SAVE10")], &ctx)
            .await
            .unwrap();

        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(Arc::new(CodeRenewalHandler::new(store.clone())));

        let handled = dispatcher
            .dispatch_json(
                r#"{
                    "event": "order_placed",
                    "order": { "id": "o-1", "lineItems": [
                        { "id": "li-1", "type": "promotion", "payload": { "code": "SAVE10" } }
                    ]},
                    "context": { "tenantId": "shop-1" }
                }"#,
            )
            .await
            .unwrap();

        assert_eq!(handled, 1);
        assert_eq!(store.records(&ctx).await.len(), 2);
    }
}
