//! Dedup & persistence layer — durable record of every payment seen.

pub mod libsql_backend;
pub mod migrations;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{PaymentCandidate, PaymentRecord};

/// Backend-agnostic dedup store.
///
/// Rows are append-only: nothing here updates or deletes a payment.
/// Fingerprint uniqueness is enforced at the storage layer, not by a
/// preceding `has_seen` check — check-then-insert is not atomic, so a
/// losing writer gets [`StoreError::Conflict`] from `record` instead.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Whether a payment with this fingerprint already exists.
    async fn has_seen(&self, fingerprint: &str) -> Result<bool, StoreError>;

    /// Insert the canonical record for a candidate. Fails with
    /// [`StoreError::Conflict`] when a concurrent writer inserted the
    /// same fingerprint (or an identical display message) first.
    async fn record(&self, candidate: &PaymentCandidate) -> Result<PaymentRecord, StoreError>;

    /// Total number of persisted payments.
    async fn count(&self) -> Result<u64, StoreError>;
}

pub use libsql_backend::LibSqlStore;
