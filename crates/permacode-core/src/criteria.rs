//! # Search Criteria
//!
//! The narrow query language stores must understand: an optional id list,
//! equality filters on named fields, and a limit.
//!
//! ```text
//! Criteria::new()
//!     .filter(EqualsFilter::new("code", "SAVE10"))
//!     .limit(1)
//!         │
//!         ▼ validate()        ← unknown field / malformed ids rejected here
//!         │
//!         ▼ store.search(&criteria, &context)
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CriteriaError;
use crate::types::PromotionCode;

// =============================================================================
// Code Field
// =============================================================================

/// Filterable fields of a promotion code record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeField {
    Id,
    PromotionId,
    Code,
    Kind,
}

impl CodeField {
    /// Resolves a field name as used in criteria.
    pub fn from_name(name: &str) -> Result<Self, CriteriaError> {
        match name {
            "id" => Ok(CodeField::Id),
            "promotion_id" | "promotionId" => Ok(CodeField::PromotionId),
            "code" => Ok(CodeField::Code),
            "kind" => Ok(CodeField::Kind),
            other => Err(CriteriaError::UnknownField {
                field: other.to_string(),
            }),
        }
    }

    /// Column name in the `promotion_codes` table.
    pub fn column(&self) -> &'static str {
        match self {
            CodeField::Id => "id",
            CodeField::PromotionId => "promotion_id",
            CodeField::Code => "code",
            CodeField::Kind => "kind",
        }
    }

    /// Reads the field from a record.
    pub fn value_of<'a>(&self, record: &'a PromotionCode) -> &'a str {
        match self {
            CodeField::Id => &record.id,
            CodeField::PromotionId => &record.promotion_id,
            CodeField::Code => &record.code,
            CodeField::Kind => record.kind.as_str(),
        }
    }
}

// =============================================================================
// Equals Filter
// =============================================================================

/// `field == value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualsFilter {
    pub field: String,
    pub value: String,
}

impl EqualsFilter {
    /// Creates an equality filter.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        EqualsFilter {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Resolves the field name.
    pub fn resolve(&self) -> Result<CodeField, CriteriaError> {
        CodeField::from_name(&self.field)
    }
}

// =============================================================================
// Criteria
// =============================================================================

/// A search request against a [`crate::PromotionCodeStore`].
///
/// All filters are AND-ed. An empty id list means "any id".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    ids: Vec<String>,
    filters: Vec<EqualsFilter>,
    limit: Option<usize>,
}

impl Criteria {
    /// Creates an empty criteria (matches everything in scope).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the search to these record ids.
    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Criteria {
            ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds an equality filter.
    pub fn filter(mut self, filter: EqualsFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Caps the number of returned records.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Id restriction.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Equality filters.
    pub fn filters(&self) -> &[EqualsFilter] {
        &self.filters
    }

    /// Limit, if any.
    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Checks the criteria are structurally sound.
    ///
    /// ## Errors
    /// - `UnknownField` for a filter on a field records don't have
    /// - `InconsistentIds` when any id is not a UUID
    /// - `InvalidLimit` for `limit(0)`
    pub fn validate(&self) -> Result<(), CriteriaError> {
        for filter in &self.filters {
            filter.resolve()?;
        }

        let invalid: Vec<String> = self
            .ids
            .iter()
            .filter(|id| Uuid::parse_str(id).is_err())
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(CriteriaError::InconsistentIds { ids: invalid });
        }

        if self.limit == Some(0) {
            return Err(CriteriaError::InvalidLimit);
        }

        Ok(())
    }

    /// Evaluates the criteria against a record (for stores without a query
    /// engine). Ignores the limit.
    pub fn matches(&self, record: &PromotionCode) -> Result<bool, CriteriaError> {
        if !self.ids.is_empty() && !self.ids.iter().any(|id| *id == record.id) {
            return Ok(false);
        }

        for filter in &self.filters {
            if filter.resolve()?.value_of(record) != filter.value {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeKind;
    use chrono::Utc;

    fn record(code: &str) -> PromotionCode {
        PromotionCode {
            id: Uuid::new_v4().to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            promotion_id: "P1".to_string(),
            code: code.to_string(),
            kind: CodeKind::Individual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_code_filter_matches() {
        let criteria = Criteria::new().filter(EqualsFilter::new("code", "SAVE10"));
        assert!(criteria.validate().is_ok());
        assert!(criteria.matches(&record("SAVE10")).unwrap());
        assert!(!criteria.matches(&record("SAVE20")).unwrap());
    }

    #[test]
    fn test_kind_filter() {
        let criteria = Criteria::new().filter(EqualsFilter::new("kind", "global"));
        assert!(!criteria.matches(&record("SAVE10")).unwrap());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let criteria = Criteria::new().filter(EqualsFilter::new("colour", "red"));
        assert_eq!(
            criteria.validate(),
            Err(CriteriaError::UnknownField {
                field: "colour".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_ids_rejected() {
        let good = Uuid::new_v4().to_string();
        let criteria = Criteria::with_ids([good.as_str(), "not-a-uuid"]);
        assert_eq!(
            criteria.validate(),
            Err(CriteriaError::InconsistentIds {
                ids: vec!["not-a-uuid".to_string()]
            })
        );
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert_eq!(Criteria::new().limit(0).validate(), Err(CriteriaError::InvalidLimit));
    }

    #[test]
    fn test_id_restriction() {
        let r = record("SAVE10");
        assert!(Criteria::with_ids([r.id.clone()]).matches(&r).unwrap());
        assert!(!Criteria::with_ids([Uuid::new_v4().to_string()]).matches(&r).unwrap());
    }
}
