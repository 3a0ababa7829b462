//! End-to-end idempotence: the same notification fed through the
//! pipeline across separate invocations — and across separate process
//! lifetimes sharing one store file — yields exactly one record.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use paywatch::pipeline::PaymentImporter;
use paywatch::record::Provider;
use paywatch::source::{FetchWindow, MessageHandle, MessageSource};
use paywatch::store::{LibSqlStore, PaymentStore};

struct FixedSource {
    bodies: Vec<&'static str>,
}

#[async_trait]
impl MessageSource for FixedSource {
    async fn list_candidates(&self, _window: &FetchWindow) -> Vec<MessageHandle> {
        (0..self.bodies.len())
            .map(|i| MessageHandle {
                id: format!("msg-{i}"),
                received_at: Some(Utc::now()),
            })
            .collect()
    }

    async fn fetch_body(&self, message_id: &str) -> Option<String> {
        let idx: usize = message_id.strip_prefix("msg-")?.parse().ok()?;
        self.bodies.get(idx).map(|b| b.to_string())
    }
}

const ZELLE_BODY: &str =
    "You received $45.00 from John Doe via Zelle on February 3, 2024 1:14 PM.";

#[tokio::test]
async fn second_invocation_sharing_a_store_finds_nothing_new() {
    let store: Arc<dyn PaymentStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
    let source = FixedSource {
        bodies: vec![ZELLE_BODY],
    };

    let first = importer.import_new_payments(&source).await;
    assert_eq!(first.summary.new, 1);
    assert_eq!(first.new_payments[0].provider, Provider::Zelle);
    assert_eq!(first.new_payments[0].sender, "John Doe");
    assert_eq!(first.new_payments[0].amount.as_deref(), Some("$45.00"));

    let second = importer.import_new_payments(&source).await;
    assert_eq!(second.summary.new, 0);
    assert_eq!(second.summary.duplicates, 1);
    assert!(second.new_payments.is_empty());

    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn fresh_process_sharing_the_store_file_still_dedups() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payments.db");
    let source = FixedSource {
        bodies: vec![ZELLE_BODY],
    };

    // First process lifetime.
    {
        let store: Arc<dyn PaymentStore> =
            Arc::new(LibSqlStore::new_local(&path).await.unwrap());
        let importer = PaymentImporter::new(store, FetchWindow::default());
        let outcome = importer.import_new_payments(&source).await;
        assert_eq!(outcome.summary.new, 1);
    }

    // Second process lifetime: empty recent-delivery cache, same file.
    let store: Arc<dyn PaymentStore> = Arc::new(LibSqlStore::new_local(&path).await.unwrap());
    let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
    let outcome = importer.import_new_payments(&source).await;

    assert_eq!(outcome.summary.new, 0);
    assert_eq!(outcome.summary.duplicates, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn redundant_channels_for_one_payment_collapse() {
    // The same real-world payment arriving via two notification
    // channels produces identical fields, hence one record.
    let store: Arc<dyn PaymentStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
    let importer = PaymentImporter::new(Arc::clone(&store), FetchWindow::default());
    let source = FixedSource {
        bodies: vec![
            "You received $45.00 from John Doe via Zelle on February 3, 2024 1:14 PM.",
            "Zelle notice: you received $45.00 from John Doe on February 3, 2024 1:14 PM.",
        ],
    };

    let outcome = importer.import_new_payments(&source).await;
    assert_eq!(outcome.summary.new, 1);
    assert_eq!(outcome.summary.duplicates, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}
