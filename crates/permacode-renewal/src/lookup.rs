//! # Code Lookup
//!
//! Resolves a code string to its stored record.

use permacode_core::{
    CodeField, Context, Criteria, EqualsFilter, PromotionCode, PromotionCodeStore, StoreResult,
};
use tracing::debug;

/// Finds the record currently holding `code` in the context's tenant.
///
/// Returns the first match, or `None`. Duplicates are not detected; the store
/// keeps codes unique.
///
/// ## Errors
/// Criteria the store rejects come back as `StoreError::Criteria` untouched.
pub async fn find_by_code(
    store: &dyn PromotionCodeStore,
    code: &str,
    context: &Context,
) -> StoreResult<Option<PromotionCode>> {
    let criteria = Criteria::new()
        .filter(EqualsFilter::new(CodeField::Code.column(), code))
        .limit(1);

    let record = store.search(&criteria, context).await?.into_iter().next();

    debug!(
        code = %code,
        found = record.is_some(),
        kind = record.as_ref().map(|r| r.kind.as_str()),
        "Promotion code lookup"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCodeStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use permacode_core::{CodeKind, CodeUpdate, CodeUpsert, StoreError};

    /// Ignores the limit and answers every search with two holders of the code.
    struct DuplicatingStore;

    fn holder(id: &str, code: &str) -> PromotionCode {
        PromotionCode {
            id: id.to_string(),
            tenant_id: permacode_core::DEFAULT_TENANT_ID.to_string(),
            promotion_id: "P1".to_string(),
            code: code.to_string(),
            kind: CodeKind::Individual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[async_trait]
    impl PromotionCodeStore for DuplicatingStore {
        async fn search(&self, criteria: &Criteria, _: &Context) -> StoreResult<Vec<PromotionCode>> {
            assert_eq!(criteria.max_results(), Some(1));
            Ok(vec![holder("first", "SAVE10"), holder("second", "SAVE10")])
        }

        async fn update(&self, _: Vec<CodeUpdate>, _: &Context) -> StoreResult<()> {
            Err(StoreError::Backend("read only".to_string()))
        }

        async fn upsert(&self, _: Vec<CodeUpsert>, _: &Context) -> StoreResult<Vec<PromotionCode>> {
            Err(StoreError::Backend("read only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_found_and_missing() {
        let store = MemoryCodeStore::new();
        let ctx = Context::default();
        store
            .upsert(vec![CodeUpsert::global("P1", "WELCOME")], &ctx)
            .await
            .unwrap();

        let hit = find_by_code(&store, "WELCOME", &ctx).await.unwrap().unwrap();
        assert_eq!(hit.kind, CodeKind::Global);

        assert!(find_by_code(&store, "NOPE", &ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scoped_to_tenant() {
        let store = MemoryCodeStore::new();
        store
            .upsert(vec![CodeUpsert::individual("P1", "SAVE10")], &Context::system("a"))
            .await
            .unwrap();

        let other = find_by_code(&store, "SAVE10", &Context::system("b")).await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let store = MemoryCodeStore::new();
        let ctx = Context::default();
        store
            .upsert(vec![CodeUpsert::individual("P1", "SAVE10")], &ctx)
            .await
            .unwrap();

        assert!(find_by_code(&store, "save10", &ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_of_several_matches_wins() {
        let found = find_by_code(&DuplicatingStore, "SAVE10", &Context::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "first");
    }
}
