//! Trial-expiry sweep reporting and the background sweeper.

use super::engine::LifecycleEngine;
use crate::events::EventStore;
use crate::store::SubscriptionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Trialing records inside the lookahead window.
    pub examined: usize,
    /// Moved from trialing to past_due by this pass.
    pub transitioned: Vec<String>,
    /// Still inside their trial, expiring within the lookahead.
    pub upcoming: Vec<String>,
    /// No longer trialing (or extended) when re-read.
    pub skipped: usize,
    /// Records whose transition failed; retried on the next pass.
    pub failed: Vec<String>,
}

impl SweepReport {
    /// Whether every examined record was handled.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Background task running the trial sweep on a fixed interval.
///
/// The first pass runs immediately after spawning.
pub struct TrialSweeper {
    handle: JoinHandle<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl TrialSweeper {
    /// Spawn the sweeper on the current tokio runtime.
    pub fn spawn<S, E>(engine: Arc<LifecycleEngine<S, E>>) -> Self
    where
        S: SubscriptionStore + 'static,
        E: EventStore + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let period = engine
            .config()
            .sweep
            .interval()
            .max(std::time::Duration::from_secs(1));

        let handle = tokio::spawn(async move {
            tracing::info!(interval_secs = period.as_secs(), "Trial sweeper started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Shutdown signal received, stopping trial sweeper");
                        break;
                    }
                    _ = ticker.tick() => {
                        match engine.sweep_expiring_trials().await {
                            Ok(report) => tracing::info!(
                                examined = report.examined,
                                transitioned = report.transitioned.len(),
                                upcoming = report.upcoming.len(),
                                skipped = report.skipped,
                                failed = report.failed.len(),
                                "Trial sweep completed"
                            ),
                            Err(e) => tracing::error!(error = %e, "Trial sweep failed"),
                        }
                    }
                }
            }

            tracing::info!("Trial sweeper stopped");
        });

        Self {
            handle,
            shutdown_tx,
        }
    }

    /// Stop the sweeper and wait for an in-flight pass to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
