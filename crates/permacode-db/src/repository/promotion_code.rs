//! # Promotion Code Repository
//!
//! SQLite implementation of [`PromotionCodeStore`].
//!
//! ## Key Operations
//! - Criteria search (tenant-scoped, equality filters, limit)
//! - Batch rename and upsert, each in one transaction
//! - Atomic renewal with an optimistic guard on the old code
//!
//! ## Atomic Renewal
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    renew(consumed, dead_code)                           │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    UPDATE promotion_codes SET code = 'SAVE10_9f…'                       │
//! │     WHERE id = consumed.id AND code = 'SAVE10'   ← guard                │
//! │       │                                                                 │
//! │       ├── 0 rows → ROLLBACK, StaleRecord (another order got there)      │
//! │       ▼                                                                 │
//! │    INSERT (…, 'SAVE10', 'individual')                                   │
//! │     ON CONFLICT(tenant_id, code) DO UPDATE …                            │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Either both writes land or neither does: no orphaned dead code.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use permacode_core::validation::{validate_code, validate_renamed_code};
use permacode_core::{
    CodeUpdate, CodeUpsert, Context, Criteria, PromotionCode, PromotionCodeStore, Renewal,
    StoreResult,
};

const SELECT_COLUMNS: &str =
    "SELECT id, tenant_id, promotion_id, code, kind, created_at, updated_at FROM promotion_codes";

const RENAME_SQL: &str = r#"
    UPDATE promotion_codes
    SET code = ?1, updated_at = ?2
    WHERE id = ?3
      AND tenant_id = ?4
      AND (?5 IS NULL OR code = ?5)
"#;

const UPSERT_SQL: &str = r#"
    INSERT INTO promotion_codes (
        id, tenant_id, promotion_id, code, kind, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (tenant_id, code) DO UPDATE SET
        promotion_id = excluded.promotion_id,
        kind = excluded.kind,
        updated_at = excluded.updated_at
    RETURNING id, tenant_id, promotion_id, code, kind, created_at, updated_at
"#;

/// Repository for promotion code database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.codes();
///
/// let found = repo
///     .search(&Criteria::new().filter(EqualsFilter::new("code", "SAVE10")), &ctx)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct PromotionCodeRepository {
    pool: SqlitePool,
}

impl PromotionCodeRepository {
    /// Creates a new PromotionCodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionCodeRepository { pool }
    }

    /// Runs a criteria search in the context's tenant.
    ///
    /// Results come back oldest first so `limit(1)` is deterministic.
    pub async fn find(&self, criteria: &Criteria, context: &Context) -> DbResult<Vec<PromotionCode>> {
        criteria.validate()?;

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        qb.push(" WHERE tenant_id = ");
        qb.push_bind(context.tenant_id.clone());

        if !criteria.ids().is_empty() {
            qb.push(" AND id IN (");
            let mut ids = qb.separated(", ");
            for id in criteria.ids() {
                ids.push_bind(id.clone());
            }
            ids.push_unseparated(")");
        }

        for filter in criteria.filters() {
            let field = filter.resolve()?;
            qb.push(" AND ")
                .push(field.column())
                .push(" = ")
                .push_bind(filter.value.clone());
        }

        qb.push(" ORDER BY created_at, rowid");

        if let Some(limit) = criteria.max_results() {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }

        let records = qb
            .build_query_as::<PromotionCode>()
            .fetch_all(&self.pool)
            .await?;

        debug!(
            tenant_id = %context.tenant_id,
            count = records.len(),
            "Promotion code search"
        );
        Ok(records)
    }

    /// Gets a record by id within the context's tenant.
    pub async fn get_by_id(&self, id: &str, context: &Context) -> DbResult<Option<PromotionCode>> {
        let record = sqlx::query_as::<_, PromotionCode>(&format!(
            "{SELECT_COLUMNS} WHERE id = ?1 AND tenant_id = ?2"
        ))
        .bind(id)
        .bind(&context.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Counts records in the context's tenant (for diagnostics).
    pub async fn count(&self, context: &Context) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM promotion_codes WHERE tenant_id = ?1")
                .bind(&context.tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Renames the codes of existing records, all or nothing.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - an id doesn't exist in this tenant
    /// * `Err(DbError::CodeTaken)` - a new code is already taken
    pub async fn rename(&self, changes: &[CodeUpdate], context: &Context) -> DbResult<()> {
        for change in changes {
            validate_renamed_code(&change.code)?;
        }

        let mut tx = self.pool.begin().await?;

        for change in changes {
            let affected =
                rename_code(&mut tx, &context.tenant_id, &change.id, &change.code, None).await?;
            if affected == 0 {
                return Err(DbError::NotFound {
                    id: change.id.clone(),
                });
            }
        }

        tx.commit().await?;

        debug!(count = changes.len(), "Renamed promotion codes");
        Ok(())
    }

    /// Inserts records or updates the record already holding each code.
    pub async fn save(&self, records: &[CodeUpsert], context: &Context) -> DbResult<Vec<PromotionCode>> {
        for record in records {
            validate_code(&record.code)?;
        }

        let mut tx = self.pool.begin().await?;

        let mut written = Vec::with_capacity(records.len());
        for record in records {
            written.push(upsert_code(&mut tx, &context.tenant_id, record).await?);
        }

        tx.commit().await?;

        debug!(count = written.len(), "Upserted promotion codes");
        Ok(written)
    }

    /// Renames `consumed` to `dead_code` and reissues its code in one
    /// transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::StaleRecord)` - the record no longer holds `consumed.code`
    pub async fn renew_in_transaction(
        &self,
        consumed: &PromotionCode,
        dead_code: &str,
        context: &Context,
    ) -> DbResult<Renewal> {
        validate_renamed_code(dead_code)?;

        let mut tx = self.pool.begin().await?;

        let affected = rename_code(
            &mut tx,
            &context.tenant_id,
            &consumed.id,
            dead_code,
            Some(&consumed.code),
        )
        .await?;

        if affected == 0 {
            tx.rollback().await?;
            warn!(
                id = %consumed.id,
                code = %consumed.code,
                "Promotion code changed since lookup, renewal skipped"
            );
            return Err(DbError::StaleRecord {
                id: consumed.id.clone(),
                code: consumed.code.clone(),
            });
        }

        let reissued = upsert_code(
            &mut tx,
            &context.tenant_id,
            &CodeUpsert::individual(&consumed.promotion_id, &consumed.code),
        )
        .await?;

        tx.commit().await?;

        debug!(
            consumed_id = %consumed.id,
            reissued_id = %reissued.id,
            "Promotion code renewed"
        );

        Ok(Renewal {
            consumed_id: consumed.id.clone(),
            promotion_id: consumed.promotion_id.clone(),
            code: consumed.code.clone(),
            dead_code: dead_code.to_string(),
            reissued_id: reissued.id,
        })
    }
}

#[async_trait]
impl PromotionCodeStore for PromotionCodeRepository {
    async fn search(&self, criteria: &Criteria, context: &Context) -> StoreResult<Vec<PromotionCode>> {
        Ok(self.find(criteria, context).await?)
    }

    async fn update(&self, changes: Vec<CodeUpdate>, context: &Context) -> StoreResult<()> {
        Ok(self.rename(&changes, context).await?)
    }

    async fn upsert(&self, records: Vec<CodeUpsert>, context: &Context) -> StoreResult<Vec<PromotionCode>> {
        Ok(self.save(&records, context).await?)
    }

    async fn renew(
        &self,
        consumed: &PromotionCode,
        dead_code: &str,
        context: &Context,
    ) -> StoreResult<Renewal> {
        Ok(self.renew_in_transaction(consumed, dead_code, context).await?)
    }
}

// =============================================================================
// Statement Helpers
// =============================================================================

/// Sets a record's code; with `expected`, only if it still holds that code.
async fn rename_code(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    new_code: &str,
    expected: Option<&str>,
) -> DbResult<u64> {
    let result = sqlx::query(RENAME_SQL)
        .bind(new_code)
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .bind(expected)
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::on_write(e, new_code))?;

    Ok(result.rows_affected())
}

async fn upsert_code(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    record: &CodeUpsert,
) -> DbResult<PromotionCode> {
    let id = record.id.clone().unwrap_or_else(generate_code_id);
    let now = Utc::now();

    let written = sqlx::query_as::<_, PromotionCode>(UPSERT_SQL)
        .bind(id)
        .bind(tenant_id)
        .bind(&record.promotion_id)
        .bind(&record.code)
        .bind(record.kind.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DbError::on_write(e, &record.code))?;

    Ok(written)
}

/// Generates a new promotion code record id.
pub fn generate_code_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
