//! libSQL backend — async [`PaymentStore`] implementation.
//!
//! Supports local file and in-memory databases. The in-memory form backs
//! tests; the file form is the production store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::extract::TimestampField;
use crate::record::{PaymentCandidate, PaymentRecord, Provider};
use crate::store::{PaymentStore, migrations};

/// libSQL dedup store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async
/// use. Fingerprint and display-message uniqueness live in the schema,
/// so a racing duplicate insert is rejected by the database itself.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Payment store opened");

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string (our canonical write format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Split a record's timestamp into its two nullable columns:
/// `(paid_at, paid_at_text)`. Both NULL means absent.
fn timestamp_columns(ts: &TimestampField) -> (Option<String>, Option<String>) {
    match ts {
        TimestampField::Matched(instant) => (Some(instant.to_rfc3339()), None),
        TimestampField::Unparsed(raw) => (None, Some(raw.clone())),
        TimestampField::Absent => (None, None),
    }
}

fn timestamp_from_columns(paid_at: Option<String>, paid_at_text: Option<String>) -> TimestampField {
    match (paid_at, paid_at_text) {
        (Some(s), _) => TimestampField::Matched(parse_datetime(&s)),
        (None, Some(raw)) => TimestampField::Unparsed(raw),
        (None, None) => TimestampField::Absent,
    }
}

/// Convert `Option<String>` to a libsql Value (NULL when absent).
fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

/// Whether a libsql error is a uniqueness-constraint rejection.
fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint")
}

#[async_trait]
impl PaymentStore for LibSqlStore {
    async fn has_seen(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM payments WHERE fingerprint = ?1 LIMIT 1",
                params![fingerprint],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Fingerprint lookup failed: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Fingerprint lookup failed: {e}")))?;

        Ok(row.is_some())
    }

    async fn record(&self, candidate: &PaymentCandidate) -> Result<PaymentRecord, StoreError> {
        let record = PaymentRecord::from_candidate(candidate, Utc::now());
        let (paid_at, paid_at_text) = timestamp_columns(&record.timestamp);

        let result = self
            .conn
            .execute(
                "INSERT INTO payments
                    (id, fingerprint, provider, sender, amount, paid_at, paid_at_text,
                     display_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.to_string(),
                    record.fingerprint.clone(),
                    record.provider.name(),
                    record.sender.clone(),
                    opt_text(record.amount.clone()),
                    opt_text(paid_at),
                    opt_text(paid_at_text),
                    record.display_message.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
                fingerprint: record.fingerprint,
            }),
            Err(e) => Err(StoreError::Query(format!("Payment insert failed: {e}"))),
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM payments", ())
            .await
            .map_err(|e| StoreError::Query(format!("Count failed: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Count failed: {e}")))?;

        match row {
            Some(row) => {
                let n: i64 = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("Count failed: {e}")))?;
                Ok(n as u64)
            }
            None => Ok(0),
        }
    }
}

impl LibSqlStore {
    /// Read back one payment by fingerprint. Used by tests and ops
    /// tooling; the pipeline itself only needs `has_seen`/`record`.
    pub async fn get_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, fingerprint, provider, sender, amount, paid_at, paid_at_text,
                        display_message, created_at
                 FROM payments WHERE fingerprint = ?1",
                params![fingerprint],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Payment lookup failed: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Payment lookup failed: {e}")))?
        else {
            return Ok(None);
        };

        let id_str: String = row
            .get(0)
            .map_err(|e| StoreError::Query(format!("Row read failed: {e}")))?;
        let fingerprint: String = row
            .get(1)
            .map_err(|e| StoreError::Query(format!("Row read failed: {e}")))?;
        let provider: String = row
            .get(2)
            .map_err(|e| StoreError::Query(format!("Row read failed: {e}")))?;
        let sender: String = row
            .get(3)
            .map_err(|e| StoreError::Query(format!("Row read failed: {e}")))?;
        // Nullable columns: a NULL read surfaces as Err, so fold to None.
        let amount: Option<String> = row.get(4).ok();
        let paid_at: Option<String> = row.get(5).ok();
        let paid_at_text: Option<String> = row.get(6).ok();
        let display_message: String = row
            .get(7)
            .map_err(|e| StoreError::Query(format!("Row read failed: {e}")))?;
        let created_at: String = row
            .get(8)
            .map_err(|e| StoreError::Query(format!("Row read failed: {e}")))?;

        Ok(Some(PaymentRecord {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
            fingerprint,
            provider: Provider::from_name(&provider),
            amount,
            sender,
            timestamp: timestamp_from_columns(paid_at, paid_at_text),
            display_message,
            created_at: parse_datetime(&created_at),
        }))
    }
}
