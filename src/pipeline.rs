//! Import pipeline — pull, classify, dedup, persist.
//!
//! One invocation is one poll cycle's worth of work: fetch a bounded
//! batch from the source, run each body through the parser dispatcher,
//! and keep only payments the process and the store have never seen.
//! A single message's failure never aborts the batch.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::RecentDeliveryCache;
use crate::error::StoreError;
use crate::parsers::classify;
use crate::record::PaymentRecord;
use crate::source::{FetchWindow, MessageSource};
use crate::store::PaymentStore;

/// Per-cycle counters, surfaced to the driver for the summary log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Handles listed by the source.
    pub fetched: usize,
    /// Bodies a provider parser claimed.
    pub parsed: usize,
    /// Genuinely new payments persisted this cycle.
    pub new: usize,
    /// Parsed payments skipped as already seen (cache, store, or lost
    /// insert race).
    pub duplicates: usize,
    /// Messages that hit a store failure and will be retried next cycle.
    pub errors: usize,
}

/// Result of one import cycle.
#[derive(Debug)]
pub struct ImportOutcome {
    /// New records in batch order, ready for delivery.
    pub new_payments: Vec<PaymentRecord>,
    pub summary: CycleSummary,
}

/// Orchestrates the parse-and-dedup pipeline over a message source.
///
/// Owns the process-lifetime recent-delivery cache; the durable store is
/// shared. All fingerprint uniqueness decisions are serialized inside
/// the store — parsing is pure-function work and free to run anywhere.
pub struct PaymentImporter {
    store: Arc<dyn PaymentStore>,
    delivered: RecentDeliveryCache,
    window: FetchWindow,
}

impl PaymentImporter {
    pub fn new(store: Arc<dyn PaymentStore>, window: FetchWindow) -> Self {
        Self {
            store,
            delivered: RecentDeliveryCache::new(),
            window,
        }
    }

    /// Run one import cycle and return the genuinely new payments.
    ///
    /// Skips are silent by design: no provider match, a known
    /// fingerprint, and a lost insert race are all normal outcomes. Only
    /// store unavailability counts as an error, and the affected message
    /// stays eligible for the next cycle since it was never recorded.
    pub async fn import_new_payments(&self, source: &dyn MessageSource) -> ImportOutcome {
        let mut summary = CycleSummary::default();
        let mut new_payments = Vec::new();

        let handles = source.list_candidates(&self.window).await;
        summary.fetched = handles.len();

        for handle in handles {
            let Some(body) = source.fetch_body(&handle.id).await else {
                debug!(id = %handle.id, "No body for message; skipping");
                continue;
            };
            if body.trim().is_empty() {
                continue;
            }

            let Some(candidate) = classify(&body) else {
                debug!(id = %handle.id, "Not a payment notification; dropping");
                continue;
            };
            summary.parsed += 1;

            let fingerprint = candidate.fingerprint();

            if self.delivered.contains(&fingerprint) {
                debug!(%fingerprint, "Already handled in this process; skipping");
                summary.duplicates += 1;
                continue;
            }

            match self.store.has_seen(&fingerprint).await {
                Ok(true) => {
                    debug!(%fingerprint, "Already recorded; skipping");
                    summary.duplicates += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(id = %handle.id, error = %e, "Dedup lookup failed; message will retry next cycle");
                    summary.errors += 1;
                    continue;
                }
            }

            match self.store.record(&candidate).await {
                Ok(record) => {
                    self.delivered.insert(&fingerprint);
                    info!(
                        provider = %record.provider,
                        sender = %record.sender,
                        amount = record.amount.as_deref().unwrap_or("Unknown"),
                        "New payment recorded"
                    );
                    summary.new += 1;
                    new_payments.push(record);
                }
                Err(StoreError::Conflict { .. }) => {
                    // Lost the insert race to a concurrent writer — a
                    // duplicate, not a failure.
                    warn!(%fingerprint, "Insert race lost; treating as duplicate");
                    self.delivered.insert(&fingerprint);
                    summary.duplicates += 1;
                }
                Err(e) => {
                    error!(id = %handle.id, error = %e, "Persist failed; message will retry next cycle");
                    summary.errors += 1;
                }
            }
        }

        info!(
            fetched = summary.fetched,
            parsed = summary.parsed,
            new = summary.new,
            duplicates = summary.duplicates,
            errors = summary.errors,
            "Import cycle complete"
        );

        ImportOutcome {
            new_payments,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::error::StoreError;
    use crate::record::{PaymentCandidate, Provider};
    use crate::source::MessageHandle;
    use crate::store::LibSqlStore;

    /// In-memory message source fed from a fixed list of bodies.
    struct FixedSource {
        bodies: Vec<(String, Option<String>)>,
    }

    impl FixedSource {
        fn new<I: IntoIterator<Item = &'static str>>(bodies: I) -> Self {
            Self {
                bodies: bodies
                    .into_iter()
                    .enumerate()
                    .map(|(i, b)| (format!("msg-{i}"), Some(b.to_string())))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl MessageSource for FixedSource {
        async fn list_candidates(&self, _window: &FetchWindow) -> Vec<MessageHandle> {
            self.bodies
                .iter()
                .map(|(id, _)| MessageHandle {
                    id: id.clone(),
                    received_at: Some(Utc::now()),
                })
                .collect()
        }

        async fn fetch_body(&self, message_id: &str) -> Option<String> {
            self.bodies
                .iter()
                .find(|(id, _)| id == message_id)
                .and_then(|(_, body)| body.clone())
        }
    }

    /// Store that fails every call, for unavailability-path tests.
    struct DownStore;

    #[async_trait]
    impl crate::store::PaymentStore for DownStore {
        async fn has_seen(&self, _fingerprint: &str) -> Result<bool, StoreError> {
            Err(StoreError::Query("connection refused".into()))
        }

        async fn record(&self, _candidate: &PaymentCandidate) -> Result<PaymentRecord, StoreError> {
            Err(StoreError::Query("connection refused".into()))
        }

        async fn count(&self) -> Result<u64, StoreError> {
            Err(StoreError::Query("connection refused".into()))
        }
    }

    /// Store whose lookups always miss, so racing inserts reach the
    /// uniqueness constraint.
    struct BlindStore {
        inner: LibSqlStore,
    }

    #[async_trait]
    impl crate::store::PaymentStore for BlindStore {
        async fn has_seen(&self, _fingerprint: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn record(&self, candidate: &PaymentCandidate) -> Result<PaymentRecord, StoreError> {
            self.inner.record(candidate).await
        }

        async fn count(&self) -> Result<u64, StoreError> {
            self.inner.count().await
        }
    }

    const ZELLE_BODY: &str =
        "You received $45.00 from John Doe via Zelle on February 3, 2024 1:14 PM.";
    const VENMO_BODY: &str = "John Smith paid you $27.50 on February 4, 2024 9:32 AM.";

    async fn memory_store() -> Arc<dyn PaymentStore> {
        Arc::new(LibSqlStore::new_memory().await.unwrap())
    }

    #[tokio::test]
    async fn imports_new_payments_in_batch_order() {
        let store = memory_store().await;
        let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        let source = FixedSource::new([ZELLE_BODY, VENMO_BODY]);

        let outcome = importer.import_new_payments(&source).await;

        assert_eq!(outcome.summary.fetched, 2);
        assert_eq!(outcome.summary.new, 2);
        assert_eq!(outcome.summary.duplicates, 0);
        assert_eq!(outcome.new_payments.len(), 2);
        assert_eq!(outcome.new_payments[0].provider, Provider::Zelle);
        assert_eq!(outcome.new_payments[1].provider, Provider::Venmo);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn repeats_within_one_batch_collapse() {
        let store = memory_store().await;
        let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        let source = FixedSource::new([ZELLE_BODY, ZELLE_BODY, ZELLE_BODY]);

        let outcome = importer.import_new_payments(&source).await;

        assert_eq!(outcome.summary.new, 1);
        assert_eq!(outcome.summary.duplicates, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn repeats_across_cycles_collapse() {
        let store = memory_store().await;
        let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        let source = FixedSource::new([ZELLE_BODY]);

        let first = importer.import_new_payments(&source).await;
        let second = importer.import_new_payments(&source).await;

        assert_eq!(first.summary.new, 1);
        assert_eq!(second.summary.new, 0);
        assert_eq!(second.summary.duplicates, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fresh_importer_sharing_store_still_dedups() {
        // Simulates a process restart: empty cache, same durable store.
        let store = memory_store().await;
        let source = FixedSource::new([ZELLE_BODY]);

        let first = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        assert_eq!(first.import_new_payments(&source).await.summary.new, 1);

        let second = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        let outcome = second.import_new_payments(&source).await;
        assert_eq!(outcome.summary.new, 0);
        assert_eq!(outcome.summary.duplicates, 1);
    }

    #[tokio::test]
    async fn non_payment_messages_are_dropped_quietly() {
        let store = memory_store().await;
        let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        let source = FixedSource::new(["Lunch at noon tomorrow?", ZELLE_BODY, ""]);

        let outcome = importer.import_new_payments(&source).await;

        assert_eq!(outcome.summary.fetched, 3);
        assert_eq!(outcome.summary.parsed, 1);
        assert_eq!(outcome.summary.new, 1);
        assert_eq!(outcome.summary.errors, 0);
    }

    #[tokio::test]
    async fn partial_extraction_still_recorded() {
        let store = memory_store().await;
        let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
        let source = FixedSource::new(["Riley Chen sent you money using Cash App."]);

        let outcome = importer.import_new_payments(&source).await;

        assert_eq!(outcome.summary.new, 1);
        let record = &outcome.new_payments[0];
        assert_eq!(record.provider, Provider::CashApp);
        assert_eq!(record.amount, None);
    }

    #[tokio::test]
    async fn store_outage_counts_errors_and_continues() {
        let importer = PaymentImporter::new(Arc::new(DownStore), FetchWindow::default());
        let source = FixedSource::new([ZELLE_BODY, VENMO_BODY]);

        let outcome = importer.import_new_payments(&source).await;

        assert_eq!(outcome.summary.errors, 2);
        assert_eq!(outcome.summary.new, 0);
        assert!(outcome.new_payments.is_empty());
        // Nothing was recorded, so nothing may enter the recent cache —
        // both messages must be retried next cycle.
        let retry = importer.import_new_payments(&source).await;
        assert_eq!(retry.summary.errors, 2);
        assert_eq!(retry.summary.duplicates, 0);
    }

    #[tokio::test]
    async fn cache_holds_the_line_when_store_lookups_go_blind() {
        // First cycle records normally; second cycle's store can no
        // longer answer has_seen, and the in-process cache must still
        // prevent a double-send.
        let inner = LibSqlStore::new_memory().await.unwrap();
        let store: Arc<dyn PaymentStore> = Arc::new(BlindStore { inner });
        let importer = PaymentImporter::new(store, FetchWindow::default());
        let source = FixedSource::new([ZELLE_BODY]);

        let first = importer.import_new_payments(&source).await;
        assert_eq!(first.summary.new, 1);

        let second = importer.import_new_payments(&source).await;
        assert_eq!(second.summary.new, 0);
        assert_eq!(second.summary.duplicates, 1);
    }

    #[tokio::test]
    async fn insert_race_is_reported_as_duplicate() {
        // A second importer over the same store with blinded lookups:
        // its insert loses to the uniqueness constraint.
        let shared = tempfile::tempdir().unwrap();
        let path = shared.path().join("payments.db");

        let store_a: Arc<dyn PaymentStore> =
            Arc::new(LibSqlStore::new_local(&path).await.unwrap());
        let importer_a = PaymentImporter::new(store_a, FetchWindow::default());
        let source = FixedSource::new([ZELLE_BODY]);
        assert_eq!(importer_a.import_new_payments(&source).await.summary.new, 1);

        let inner = LibSqlStore::new_local(&path).await.unwrap();
        let store_b: Arc<dyn PaymentStore> = Arc::new(BlindStore { inner });
        let importer_b = PaymentImporter::new(store_b, FetchWindow::default());

        let outcome = importer_b.import_new_payments(&source).await;
        assert_eq!(outcome.summary.new, 0);
        assert_eq!(outcome.summary.duplicates, 1);
        assert_eq!(outcome.summary.errors, 0);
    }
}
