//! # Promotion Code Store
//!
//! The persistence boundary. The renewal handler depends on this trait and
//! nothing else; the host (or `permacode-db`, or an in-memory map in tests)
//! provides the implementation.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  search(criteria, ctx)  → records in ctx's tenant matching criteria     │
//! │  update(changes, ctx)   → rename codes of existing records              │
//! │  upsert(records, ctx)   → insert, or update in place keyed by code      │
//! │  renew(record, dead)    → update + upsert (provided)                    │
//! │                                                                         │
//! │  The provided renew() issues two separate calls, so a failure between   │
//! │  them leaves the code renamed but not reissued. Stores with             │
//! │  transactions override it to make the swap atomic.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;

use crate::criteria::Criteria;
use crate::error::{StoreError, StoreResult};
use crate::types::{CodeUpdate, CodeUpsert, Context, PromotionCode, Renewal};

/// Storage for promotion codes, scoped per call by a [`Context`].
#[async_trait]
pub trait PromotionCodeStore: Send + Sync {
    /// Returns records matching `criteria` in the context's tenant.
    ///
    /// Implementations must reject invalid criteria with
    /// [`StoreError::Criteria`] instead of guessing.
    async fn search(&self, criteria: &Criteria, context: &Context) -> StoreResult<Vec<PromotionCode>>;

    /// Renames the code of existing records.
    ///
    /// Fails with `NotFound` for unknown ids and `Conflict` if a new code is
    /// already held by another record.
    async fn update(&self, changes: Vec<CodeUpdate>, context: &Context) -> StoreResult<()>;

    /// Inserts records, or updates the record already holding each code.
    ///
    /// Returns the written records in input order.
    async fn upsert(&self, records: Vec<CodeUpsert>, context: &Context) -> StoreResult<Vec<PromotionCode>>;

    /// Invalidates `consumed` by renaming it to `dead_code`, then reissues its
    /// original code for the same promotion.
    async fn renew(
        &self,
        consumed: &PromotionCode,
        dead_code: &str,
        context: &Context,
    ) -> StoreResult<Renewal> {
        self.update(vec![CodeUpdate::new(&consumed.id, dead_code)], context)
            .await?;

        let reissued = self
            .upsert(
                vec![CodeUpsert::individual(&consumed.promotion_id, &consumed.code)],
                context,
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("upsert returned no record".to_string()))?;

        Ok(Renewal {
            consumed_id: consumed.id.clone(),
            promotion_id: consumed.promotion_id.clone(),
            code: consumed.code.clone(),
            dead_code: dead_code.to_string(),
            reissued_id: reissued.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeKind;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Records calls; `upsert` echoes back records unless `empty_upsert`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        empty_upsert: bool,
    }

    #[async_trait]
    impl PromotionCodeStore for Recorder {
        async fn search(&self, _: &Criteria, _: &Context) -> StoreResult<Vec<PromotionCode>> {
            Ok(Vec::new())
        }

        async fn update(&self, changes: Vec<CodeUpdate>, _: &Context) -> StoreResult<()> {
            let mut calls = self.calls.lock().unwrap();
            for change in changes {
                calls.push(format!("update {} -> {}", change.id, change.code));
            }
            Ok(())
        }

        async fn upsert(&self, records: Vec<CodeUpsert>, context: &Context) -> StoreResult<Vec<PromotionCode>> {
            let mut calls = self.calls.lock().unwrap();
            let mut written = Vec::new();
            for record in records {
                calls.push(format!("upsert {} {}", record.code, record.kind));
                if !self.empty_upsert {
                    written.push(PromotionCode {
                        id: "new-id".to_string(),
                        tenant_id: context.tenant_id.clone(),
                        promotion_id: record.promotion_id,
                        code: record.code,
                        kind: record.kind,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    });
                }
            }
            Ok(written)
        }
    }

    fn consumed() -> PromotionCode {
        PromotionCode {
            id: "old-id".to_string(),
            tenant_id: crate::DEFAULT_TENANT_ID.to_string(),
            promotion_id: "P1".to_string(),
            code: "SAVE10".to_string(),
            kind: CodeKind::Individual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_provided_renew_updates_then_upserts() {
        let store = Recorder::default();

        let renewal = store
            .renew(&consumed(), "SAVE10_dead", &Context::default())
            .await
            .unwrap();

        assert_eq!(
            *store.calls.lock().unwrap(),
            vec![
                "update old-id -> SAVE10_dead".to_string(),
                "upsert SAVE10 individual".to_string(),
            ]
        );
        assert_eq!(renewal.consumed_id, "old-id");
        assert_eq!(renewal.reissued_id, "new-id");
        assert_eq!(renewal.promotion_id, "P1");
    }

    #[tokio::test]
    async fn test_provided_renew_needs_a_written_record() {
        let store = Recorder {
            empty_upsert: true,
            ..Recorder::default()
        };

        let err = store
            .renew(&consumed(), "SAVE10_dead", &Context::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
