//! # Domain Types
//!
//! Core domain types used throughout Permacode.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │    LineItem     │   │ PromotionCode   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │──►│  id             │   │  id (UUID)      │       │
//! │  │  order_number   │   │  type (tag)     │   │  promotion_id   │       │
//! │  │  line_items     │   │  payload {code} │──►│  code (unique)  │       │
//! │  └─────────────────┘   └─────────────────┘   │  kind           │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Context      │   │    CodeKind     │   │    Renewal      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  tenant_id      │   │  Individual     │   │  consumed_id    │       │
//! │  │  source         │   │  Global         │   │  dead_code      │       │
//! │  └─────────────────┘   └─────────────────┘   │  reissued_id    │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! A promotion code record has:
//! - `id`: UUID v4 - immutable, survives the rename to a dead code
//! - `code`: the string customers type - unique per tenant, changes on renewal

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::{CODE_PAYLOAD_KEY, DEFAULT_TENANT_ID, PROMOTION_LINE_ITEM_TYPE};

// =============================================================================
// Context
// =============================================================================

/// Who is acting on the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum ContextSource {
    /// Platform-internal work such as event subscribers.
    #[default]
    System,
    /// A logged-in administrator or API user.
    User(String),
}

/// Execution scope for every store call.
///
/// Carries the identity, permissions and locale the host resolved for the
/// request that placed the order. Stores only ever see records whose
/// `tenant_id` matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Tenant (shop) the order belongs to.
    pub tenant_id: String,

    /// Acting identity.
    #[serde(default)]
    pub source: ContextSource,

    /// Language the order was placed in.
    #[serde(default)]
    pub language_id: Option<String>,

    /// Data version (live data when absent).
    #[serde(default)]
    pub version_id: Option<String>,
}

impl Context {
    /// Creates a system context for a tenant.
    pub fn system(tenant_id: impl Into<String>) -> Self {
        Context {
            tenant_id: tenant_id.into(),
            source: ContextSource::System,
            language_id: None,
            version_id: None,
        }
    }

    /// Sets the language.
    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = Some(language_id.into());
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::system(DEFAULT_TENANT_ID)
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// The type tag of an order line item.
///
/// Unknown tags are kept verbatim so events from newer hosts still parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LineItemType {
    /// A purchased product.
    Product,
    /// A redeemed promotion (carries `payload.code`).
    Promotion,
    /// A credit / voucher applied by staff.
    Credit,
    /// Custom line added by an integration.
    Custom,
    /// Anything else.
    Other(String),
}

impl LineItemType {
    /// Returns the wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            LineItemType::Product => "product",
            LineItemType::Promotion => PROMOTION_LINE_ITEM_TYPE,
            LineItemType::Credit => "credit",
            LineItemType::Custom => "custom",
            LineItemType::Other(tag) => tag,
        }
    }
}

impl From<String> for LineItemType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "product" => LineItemType::Product,
            PROMOTION_LINE_ITEM_TYPE => LineItemType::Promotion,
            "credit" => LineItemType::Credit,
            "custom" => LineItemType::Custom,
            _ => LineItemType::Other(tag),
        }
    }
}

impl From<LineItemType> for String {
    fn from(kind: LineItemType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for LineItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a completed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Line item id.
    pub id: String,

    /// Type tag.
    #[serde(rename = "type")]
    pub kind: LineItemType,

    /// Display label.
    #[serde(default)]
    pub label: Option<String>,

    /// Quantity ordered.
    #[serde(default = "default_quantity")]
    pub quantity: i64,

    /// Free-form data attached by the cart processor that created the line.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

fn default_quantity() -> i64 {
    1
}

impl LineItem {
    /// Creates a line item with an empty payload.
    pub fn new(id: impl Into<String>, kind: LineItemType) -> Self {
        LineItem {
            id: id.into(),
            kind,
            label: None,
            quantity: 1,
            payload: Map::new(),
        }
    }

    /// Creates a promotion line item redeeming `code`.
    pub fn promotion(id: impl Into<String>, code: impl Into<String>) -> Self {
        LineItem::new(id, LineItemType::Promotion).with_payload(CODE_PAYLOAD_KEY, code.into())
    }

    /// Adds a payload entry.
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Returns true for redeemed promotions.
    #[inline]
    pub fn is_promotion(&self) -> bool {
        self.kind == LineItemType::Promotion
    }

    /// Reads a string payload entry.
    ///
    /// ## Errors
    /// - `MissingPayloadKey` when the key is absent
    /// - `InvalidPayload` when the value is not a string
    pub fn payload_str(&self, key: &str) -> CoreResult<&str> {
        let value = self
            .payload
            .get(key)
            .ok_or_else(|| CoreError::MissingPayloadKey {
                line_item_id: self.id.clone(),
                key: key.to_string(),
            })?;

        value.as_str().ok_or_else(|| CoreError::InvalidPayload {
            line_item_id: self.id.clone(),
            key: key.to_string(),
            reason: format!("expected a string, got {value}"),
        })
    }

    /// The code a promotion line item redeemed.
    pub fn redeemed_code(&self) -> CoreResult<&str> {
        self.payload_str(CODE_PAYLOAD_KEY)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A completed checkout order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id.
    pub id: String,

    /// Human-readable order number.
    #[serde(default)]
    pub order_number: Option<String>,

    /// Line items in checkout order.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Order {
    /// Creates an order.
    pub fn new(id: impl Into<String>, line_items: Vec<LineItem>) -> Self {
        Order {
            id: id.into(),
            order_number: None,
            line_items,
        }
    }

    /// Iterates over promotion line items, keeping their order.
    pub fn promotion_items(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|item| item.is_promotion())
    }
}

// =============================================================================
// Code Kind
// =============================================================================

/// Whether a code was issued to one customer or is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    /// One of a generated batch, redeemable once.
    Individual,
    /// The promotion's shared code, redeemable by anyone.
    Global,
}

impl CodeKind {
    /// Returns the stored tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeKind::Individual => "individual",
            CodeKind::Global => "global",
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Promotion Code
// =============================================================================

/// A stored promotion code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PromotionCode {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this code belongs to.
    pub tenant_id: String,

    /// Promotion the code redeems.
    pub promotion_id: String,

    /// The string customers enter. Unique per tenant.
    pub code: String,

    /// Individual or global.
    pub kind: CodeKind,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl PromotionCode {
    /// Returns true for individually issued codes.
    #[inline]
    pub fn is_individual(&self) -> bool {
        self.kind == CodeKind::Individual
    }
}

// =============================================================================
// Write Payloads
// =============================================================================

/// Partial update of an existing record: rename its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUpdate {
    /// Record to change.
    pub id: String,
    /// New code value.
    pub code: String,
}

impl CodeUpdate {
    /// Creates an update.
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        CodeUpdate {
            id: id.into(),
            code: code.into(),
        }
    }
}

/// Insert-or-update keyed by the code string.
///
/// When a record already holds `code` in the context's tenant it is updated in
/// place (promotion and kind); otherwise a new record is created, using `id`
/// if given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUpsert {
    /// Id for a newly created record.
    pub id: Option<String>,
    /// Promotion the code redeems.
    pub promotion_id: String,
    /// Natural key.
    pub code: String,
    /// Kind of the written record.
    pub kind: CodeKind,
}

impl CodeUpsert {
    /// An individual code for `promotion_id`.
    pub fn individual(promotion_id: impl Into<String>, code: impl Into<String>) -> Self {
        CodeUpsert {
            id: None,
            promotion_id: promotion_id.into(),
            code: code.into(),
            kind: CodeKind::Individual,
        }
    }

    /// A global code for `promotion_id`.
    pub fn global(promotion_id: impl Into<String>, code: impl Into<String>) -> Self {
        CodeUpsert {
            kind: CodeKind::Global,
            ..CodeUpsert::individual(promotion_id, code)
        }
    }
}

// =============================================================================
// Renewal
// =============================================================================

/// Outcome of one invalidate-and-reissue cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renewal {
    /// Record that was consumed and now holds the dead code.
    pub consumed_id: String,
    /// Promotion both records point at.
    pub promotion_id: String,
    /// The code string that is live again.
    pub code: String,
    /// Value the consumed record was renamed to.
    pub dead_code: String,
    /// Record holding the live code after the cycle.
    pub reissued_id: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_item_type_tags() {
        assert_eq!(LineItemType::from("promotion".to_string()), LineItemType::Promotion);
        assert_eq!(LineItemType::from("product".to_string()), LineItemType::Product);
        assert_eq!(
            LineItemType::from("giftcard".to_string()),
            LineItemType::Other("giftcard".to_string())
        );
        assert_eq!(LineItemType::Other("giftcard".to_string()).as_str(), "giftcard");
    }

    #[test]
    fn test_order_from_json() {
        let order: Order = serde_json::from_value(json!({
            "id": "order-1",
            "orderNumber": "10001",
            "lineItems": [
                { "id": "li-1", "type": "product", "quantity": 2 },
                { "id": "li-2", "type": "promotion", "payload": { "code": "SAVE10" } }
            ]
        }))
        .unwrap();

        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].quantity, 2);
        assert_eq!(order.promotion_items().count(), 1);
        assert_eq!(order.line_items[1].redeemed_code().unwrap(), "SAVE10");
    }

    #[test]
    fn test_missing_code_is_contract_violation() {
        let item = LineItem::new("li-9", LineItemType::Promotion);
        let err = item.redeemed_code().unwrap_err();
        assert!(matches!(err, CoreError::MissingPayloadKey { ref key, .. } if key == "code"));
    }

    #[test]
    fn test_non_string_code_is_invalid() {
        let item = LineItem::new("li-9", LineItemType::Promotion).with_payload("code", 42);
        assert!(matches!(
            item.redeemed_code().unwrap_err(),
            CoreError::InvalidPayload { .. }
        ));
    }

    #[test]
    fn test_default_context_is_system() {
        let ctx = Context::default();
        assert_eq!(ctx.tenant_id, DEFAULT_TENANT_ID);
        assert_eq!(ctx.source, ContextSource::System);
    }
}
