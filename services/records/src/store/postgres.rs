//! Postgres-backed implementation of the record store.
//!
//! # What this module is
//! A durable [`RecordStore`] using one `records` table. Module-specific
//! payloads live in JSONB columns so every record kind shares the schema.
//!
//! # Key invariants
//! - `(module, id)` is the primary key.
//! - Conditional writes are single statements whose `WHERE` clause carries
//!   the expected `status` and `version`; zero affected rows means the
//!   precondition failed (or the record is gone, which a follow-up existence
//!   check distinguishes).
//! - Expiry reconciliation runs both directions of one module inside a single
//!   transaction, filtered to `active`/`expired` rows only, so pending
//!   proposals are never touched.
//!
//! # Date handling
//! Expiry fields are read through `records_field_date` (see
//! `migrations/0002_expiry_dates.sql`). It trims the value, accepts the same
//! `YYYY-MM-DD[T...]` shapes as the in-memory store, and returns NULL for
//! anything else, so one bad value cannot fail a module's update.
//!
//! # Operational notes
//! - Migrations are executed at startup via `sqlx::migrate!("./migrations")`.
//! - Pool timeouts are explicit so a wedged database fails requests instead
//!   of hanging them.
//! - Database URLs may contain credentials; never log them.
use super::{ExpiryTransitions, RecordStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{ActorRef, Fields, Module, Precondition, Record, RecordKey, RecordStatus};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

const RECORD_COLUMNS: &str = "module, id, status, version, fields, pending_changes, \
     deletion_reason, rejection_reason, prior_status, created_by, updated_by, created_at, \
     updated_at";

/// Durable record store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use records::config::PostgresConfig;
/// use records::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape of the `records` table.
#[derive(Debug, Clone, FromRow)]
struct DbRecord {
    module: String,
    id: String,
    status: String,
    version: i64,
    fields: Json<Fields>,
    pending_changes: Option<Json<Fields>>,
    deletion_reason: Option<String>,
    rejection_reason: Option<String>,
    prior_status: Option<String>,
    created_by: Json<ActorRef>,
    updated_by: Json<ActorRef>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(anyhow!(err))
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(anyhow!(err))
    }
}

fn record_from_db(row: DbRecord) -> StoreResult<Record> {
    let module = Module::from_slug(&row.module)
        .ok_or_else(|| anyhow!("unknown module in records table: {}", row.module))?;
    let status = RecordStatus::parse(&row.status)
        .ok_or_else(|| anyhow!("unknown record status: {}", row.status))?;
    let prior_status = row
        .prior_status
        .map(|raw| {
            RecordStatus::parse(&raw).ok_or_else(|| anyhow!("unknown prior status: {raw}"))
        })
        .transpose()?;
    Ok(Record {
        id: row.id,
        module,
        fields: row.fields.0,
        status,
        version: row.version as u64,
        created_by: row.created_by.0,
        updated_by: row.updated_by.0,
        pending_changes: row.pending_changes.map(|changes| changes.0),
        deletion_reason: row.deletion_reason,
        rejection_reason: row.rejection_reason,
        prior_status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn records_from_db(rows: Vec<DbRecord>) -> StoreResult<Vec<Record>> {
    rows.into_iter().map(record_from_db).collect()
}

impl PostgresStore {
    /// Connect to Postgres and apply embedded migrations.
    ///
    /// # Errors
    /// - Invalid URL, connection or pool setup failures.
    /// - Migration failures (startup should abort).
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    async fn exists(&self, key: &RecordKey) -> StoreResult<bool> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM records WHERE module = $1 AND id = $2")
                .bind(key.module.slug())
                .bind(&key.id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    async fn precondition_error(&self, key: &RecordKey, expected: Precondition) -> StoreError {
        match self.exists(key).await {
            Ok(true) => StoreError::PreconditionFailed(format!(
                "expected {} v{}",
                expected.status.as_str(),
                expected.version
            )),
            Ok(false) => StoreError::NotFound("record".into()),
            Err(err) => err,
        }
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn insert(&self, record: Record) -> StoreResult<Record> {
        let row = sqlx::query_as::<_, DbRecord>(&format!(
            "INSERT INTO records ({RECORD_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT (module, id) DO NOTHING
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record.module.slug())
        .bind(&record.id)
        .bind(record.status.as_str())
        .bind(record.version as i64)
        .bind(Json(&record.fields))
        .bind(record.pending_changes.as_ref().map(Json))
        .bind(&record.deletion_reason)
        .bind(&record.rejection_reason)
        .bind(record.prior_status.map(RecordStatus::as_str))
        .bind(Json(&record.created_by))
        .bind(Json(&record.updated_by))
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => record_from_db(row),
            None => Err(StoreError::Conflict("record exists".into())),
        }
    }

    async fn get(&self, key: &RecordKey) -> StoreResult<Record> {
        let row = sqlx::query_as::<_, DbRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE module = $1 AND id = $2"
        ))
        .bind(key.module.slug())
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => record_from_db(row),
            None => Err(StoreError::NotFound("record".into())),
        }
    }

    async fn list(&self, module: Module) -> StoreResult<Vec<Record>> {
        let rows = sqlx::query_as::<_, DbRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE module = $1 ORDER BY created_at, id"
        ))
        .bind(module.slug())
        .fetch_all(&self.pool)
        .await?;
        records_from_db(rows)
    }

    async fn list_by_status(
        &self,
        module: Module,
        statuses: &[RecordStatus],
    ) -> StoreResult<Vec<Record>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, DbRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM records
             WHERE module = $1 AND status = ANY($2)
             ORDER BY created_at, id"
        ))
        .bind(module.slug())
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;
        records_from_db(rows)
    }

    async fn replace(&self, record: Record, expected: Precondition) -> StoreResult<Record> {
        let row = sqlx::query_as::<_, DbRecord>(&format!(
            "UPDATE records
             SET fields = $1, status = $2, version = version + 1, updated_by = $3,
                 pending_changes = $4, deletion_reason = $5, rejection_reason = $6,
                 prior_status = $7, updated_at = $8
             WHERE module = $9 AND id = $10 AND status = $11 AND version = $12
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(Json(&record.fields))
        .bind(record.status.as_str())
        .bind(Json(&record.updated_by))
        .bind(record.pending_changes.as_ref().map(Json))
        .bind(&record.deletion_reason)
        .bind(&record.rejection_reason)
        .bind(record.prior_status.map(RecordStatus::as_str))
        .bind(record.updated_at)
        .bind(record.module.slug())
        .bind(&record.id)
        .bind(expected.status.as_str())
        .bind(expected.version as i64)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => record_from_db(row),
            None => Err(self.precondition_error(&record.key(), expected).await),
        }
    }

    async fn remove(&self, key: &RecordKey, expected: Precondition) -> StoreResult<Record> {
        let row = sqlx::query_as::<_, DbRecord>(&format!(
            "DELETE FROM records
             WHERE module = $1 AND id = $2 AND status = $3 AND version = $4
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(key.module.slug())
        .bind(&key.id)
        .bind(expected.status.as_str())
        .bind(expected.version as i64)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => record_from_db(row),
            None => Err(self.precondition_error(key, expected).await),
        }
    }

    async fn reconcile_expiry(
        &self,
        module: Module,
        field: &str,
        today: NaiveDate,
    ) -> StoreResult<ExpiryTransitions> {
        let mut tx = self.pool.begin().await?;
        let expired = sqlx::query(
            "UPDATE records
             SET status = 'expired', version = version + 1, updated_at = now()
             WHERE module = $1 AND status = 'active'
               AND records_field_date(fields, $2) < $3",
        )
        .bind(module.slug())
        .bind(field)
        .bind(today)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let reactivated = sqlx::query(
            "UPDATE records
             SET status = 'active', version = version + 1, updated_at = now()
             WHERE module = $1 AND status = 'expired'
               AND (records_field_blank(fields, $2) OR records_field_date(fields, $2) >= $3)",
        )
        .bind(module.slug())
        .bind(field)
        .bind(today)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        tx.commit().await?;
        Ok(ExpiryTransitions {
            expired,
            reactivated,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
