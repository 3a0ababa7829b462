//! Polling driver — owns the loop, the collaborators, and shutdown.
//!
//! One cycle: wait out quiet hours → import new payments → deliver each
//! in order → sleep. The shutdown signal is observed before every
//! blocking step, so an operator never waits out a long sleep or a
//! quiet-hours window.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::pipeline::{CycleSummary, PaymentImporter};
use crate::schedule::QuietHours;
use crate::sink::NotificationSink;
use crate::source::MessageSource;

/// Bounded interval between quiet-hours re-checks, so disabling the
/// window or shutting down is observed promptly.
const QUIET_RECHECK: Duration = Duration::from_secs(60);

/// Cooperative shutdown signal shared between the loop and signal
/// handlers. Once triggered it stays triggered.
#[derive(Clone, Default)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

#[derive(Default)]
struct ShutdownInner {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the signal fires. Returns immediately if it already
    /// has.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

/// Delivery counters for one cycle, folded into the summary log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// The polling driver. Collaborator instances are constructed by the
/// caller and passed in; there is no process-wide client state.
pub struct Driver {
    importer: PaymentImporter,
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn NotificationSink>,
    poll_interval: Duration,
    quiet_hours: QuietHours,
    shutdown: Shutdown,
}

impl Driver {
    pub fn new(
        importer: PaymentImporter,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn NotificationSink>,
        poll_interval: Duration,
        quiet_hours: QuietHours,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            importer,
            source,
            sink,
            poll_interval,
            quiet_hours,
            shutdown,
        }
    }

    /// Run cycles until shutdown. Never terminates on a cycle's failure.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            quiet_hours = self.quiet_hours.enabled,
            "Watcher started"
        );

        loop {
            self.wait_while_quiet().await;
            if self.shutdown.is_triggered() {
                break;
            }

            let (summary, report) = self.run_cycle().await;
            info!(
                new = summary.new,
                duplicates = summary.duplicates,
                errors = summary.errors,
                delivered = report.delivered,
                delivery_failures = report.failed,
                "Cycle summary"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.shutdown.wait() => break,
            }
        }

        info!("Watcher stopped");
    }

    /// One import-and-deliver cycle.
    pub async fn run_cycle(&self) -> (CycleSummary, DeliveryReport) {
        let outcome = self.importer.import_new_payments(self.source.as_ref()).await;
        let mut report = DeliveryReport::default();

        for record in &outcome.new_payments {
            if self.shutdown.is_triggered() {
                warn!("Shutdown during delivery; remaining records stay persisted");
                break;
            }
            match self.sink.deliver(&record.display_message).await {
                Ok(()) => {
                    info!(provider = %record.provider, "Posted new payment");
                    report.delivered += 1;
                }
                Err(e) => {
                    // The record is already committed; redelivery is an
                    // external concern, so keep going with the rest.
                    error!(provider = %record.provider, error = %e, "Delivery failed");
                    report.failed += 1;
                }
            }
        }

        (outcome.summary, report)
    }

    /// Suspend while the quiet-hours window is active, re-checking at a
    /// bounded interval instead of sleeping the window out in one step.
    async fn wait_while_quiet(&self) {
        while self.quiet_hours.is_active_now() && !self.shutdown.is_triggered() {
            info!("Quiet hours active — polling suspended");
            tokio::select! {
                _ = tokio::time::sleep(QUIET_RECHECK) => {}
                _ = self.shutdown.wait() => return,
            }
        }
    }
}
