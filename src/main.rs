use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use paywatch::config::Config;
use paywatch::driver::{Driver, Shutdown};
use paywatch::pipeline::PaymentImporter;
use paywatch::sink::{NotificationSink, SlackSink};
use paywatch::source::{GmailSource, MessageSource};
use paywatch::store::{LibSqlStore, PaymentStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("configuration error")?;

    // ── Store ────────────────────────────────────────────────────────
    // An unusable store location is the one fatal startup condition;
    // everything later degrades per-cycle instead.
    let store: Arc<dyn PaymentStore> = Arc::new(
        LibSqlStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open store at {}", config.db_path.display()))?,
    );

    // ── Collaborators ───────────────────────────────────────────────
    let source: Arc<dyn MessageSource> = Arc::new(
        GmailSource::new(config.gmail_token, config.gmail_query)
            .context("failed to build message source")?,
    );
    let sink: Arc<dyn NotificationSink> = Arc::new(
        SlackSink::new(config.slack_token, config.slack_channel)
            .context("failed to build notification sink")?,
    );

    let importer = PaymentImporter::new(store, config.window);

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    shutdown.trigger();
                }
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
        });
    }

    let driver = Driver::new(
        importer,
        source,
        sink,
        config.poll_interval,
        config.quiet_hours,
        shutdown,
    );
    driver.run().await;

    Ok(())
}
