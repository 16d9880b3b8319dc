//! # In-Memory Store
//!
//! A [`PromotionCodeStore`] backed by a `Vec` behind an async mutex.
//!
//! It keeps the provided two-call `renew`, so a failure between the rename and
//! the reissue is observable, and it journals every write so tests can count
//! mutations.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use permacode_core::validation::{validate_code, validate_renamed_code};
use permacode_core::{
    CodeUpdate, CodeUpsert, Context, Criteria, PromotionCode, PromotionCodeStore, StoreError,
    StoreResult,
};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// One persisted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    /// A record's code was renamed.
    Update { id: String, code: String },
    /// A code was inserted (`created`) or updated in place.
    Upsert { id: String, code: String, created: bool },
}

impl StoreWrite {
    /// Code written.
    pub fn code(&self) -> &str {
        match self {
            StoreWrite::Update { code, .. } | StoreWrite::Upsert { code, .. } => code,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    records: Vec<PromotionCode>,
    journal: Vec<StoreWrite>,
}

/// In-memory promotion code store.
#[derive(Debug, Default)]
pub struct MemoryCodeStore {
    state: Mutex<State>,
    fail_upserts: AtomicBool,
}

impl MemoryCodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `upsert` fail with a backend error.
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the context tenant's records, oldest first.
    pub async fn records(&self, context: &Context) -> Vec<PromotionCode> {
        self.state
            .lock()
            .await
            .records
            .iter()
            .filter(|r| r.tenant_id == context.tenant_id)
            .cloned()
            .collect()
    }

    /// Every write so far, in order.
    pub async fn journal(&self) -> Vec<StoreWrite> {
        self.state.lock().await.journal.clone()
    }

    /// Number of writes so far.
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.journal.len()
    }
}

#[async_trait]
impl PromotionCodeStore for MemoryCodeStore {
    async fn search(&self, criteria: &Criteria, context: &Context) -> StoreResult<Vec<PromotionCode>> {
        criteria.validate()?;

        let state = self.state.lock().await;
        let mut found = Vec::new();
        for record in state.records.iter().filter(|r| r.tenant_id == context.tenant_id) {
            if criteria.matches(record)? {
                found.push(record.clone());
            }
        }

        if let Some(limit) = criteria.max_results() {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn update(&self, changes: Vec<CodeUpdate>, context: &Context) -> StoreResult<()> {
        for change in &changes {
            validate_renamed_code(&change.code)?;
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let tenant = &context.tenant_id;

        for change in &changes {
            if !state.records.iter().any(|r| &r.tenant_id == tenant && r.id == change.id) {
                return Err(StoreError::not_found(&change.id));
            }
            if state
                .records
                .iter()
                .any(|r| &r.tenant_id == tenant && r.code == change.code && r.id != change.id)
            {
                return Err(StoreError::conflict(&change.code));
            }
        }

        let now = Utc::now();
        for change in changes {
            if let Some(record) = state
                .records
                .iter_mut()
                .find(|r| &r.tenant_id == tenant && r.id == change.id)
            {
                record.code = change.code.clone();
                record.updated_at = now;
            }
            debug!(id = %change.id, code = %change.code, "Memory store rename");
            state.journal.push(StoreWrite::Update {
                id: change.id,
                code: change.code,
            });
        }

        Ok(())
    }

    async fn upsert(&self, records: Vec<CodeUpsert>, context: &Context) -> StoreResult<Vec<PromotionCode>> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("upsert failed (injected)".to_string()));
        }
        for record in &records {
            validate_code(&record.code)?;
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let tenant = &context.tenant_id;
        let mut written = Vec::with_capacity(records.len());

        for upsert in records {
            let now = Utc::now();

            let existing = state
                .records
                .iter_mut()
                .find(|r| &r.tenant_id == tenant && r.code == upsert.code);

            let (record, created) = match existing {
                Some(record) => {
                    record.promotion_id = upsert.promotion_id;
                    record.kind = upsert.kind;
                    record.updated_at = now;
                    (record.clone(), false)
                }
                None => {
                    let id = upsert.id.unwrap_or_else(|| Uuid::new_v4().to_string());
                    if state.records.iter().any(|r| r.id == id) {
                        return Err(StoreError::conflict(&upsert.code));
                    }
                    let record = PromotionCode {
                        id,
                        tenant_id: tenant.clone(),
                        promotion_id: upsert.promotion_id,
                        code: upsert.code,
                        kind: upsert.kind,
                        created_at: now,
                        updated_at: now,
                    };
                    state.records.push(record.clone());
                    (record, true)
                }
            };

            debug!(id = %record.id, code = %record.code, created, "Memory store upsert");
            state.journal.push(StoreWrite::Upsert {
                id: record.id.clone(),
                code: record.code.clone(),
                created,
            });
            written.push(record);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permacode_core::{CodeKind, EqualsFilter};

    #[tokio::test]
    async fn test_upsert_is_keyed_by_code() {
        let store = MemoryCodeStore::new();
        let ctx = Context::default();

        let first = store
            .upsert(vec![CodeUpsert::individual("P1", "SAVE10")], &ctx)
            .await
            .unwrap();
        let second = store
            .upsert(vec![CodeUpsert::global("P2", "SAVE10")], &ctx)
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].kind, CodeKind::Global);
        assert_eq!(store.records(&ctx).await.len(), 1);
        assert_eq!(
            store.journal().await,
            vec![
                StoreWrite::Upsert {
                    id: first[0].id.clone(),
                    code: "SAVE10".to_string(),
                    created: true
                },
                StoreWrite::Upsert {
                    id: first[0].id.clone(),
                    code: "SAVE10".to_string(),
                    created: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_update_rejects_taken_code() {
        let store = MemoryCodeStore::new();
        let ctx = Context::default();
        let written = store
            .upsert(
                vec![
                    CodeUpsert::individual("P1", "A"),
                    CodeUpsert::individual("P1", "B"),
                ],
                &ctx,
            )
            .await
            .unwrap();

        let err = store
            .update(vec![CodeUpdate::new(&written[0].id, "B")], &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MemoryCodeStore::new();
        let err = store
            .update(vec![CodeUpdate::new("missing", "X")], &Context::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_field() {
        let store = MemoryCodeStore::new();
        let err = store
            .search(
                &Criteria::new().filter(EqualsFilter::new("nonexistent", "x")),
                &Context::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Criteria(_)));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryCodeStore::new();
        store.fail_upserts(true);
        let err = store
            .upsert(vec![CodeUpsert::individual("P1", "A")], &Context::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.write_count().await, 0);
    }
}
