/*!
 * GC Task - Periodic Sweeping
 *
 * Background tokio task that sweeps the block table on a fixed period.
 * Between ticks it waits on the timer, never on the table lock.
 *
 * # Shutdown
 *
 * 1. **Preferred:** `shutdown().await` sends `Shutdown` and awaits the join
 *    handle. A sweep already running always finishes first, since commands
 *    are only handled between ticks.
 * 2. **Fallback:** dropping the task without `shutdown()` aborts it and logs
 *    a warning. The abort can only land between sweeps, at an await point.
 */

use super::super::traits::GarbageCollector;
use super::super::types::SweepStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Control messages for the GC task
#[derive(Debug)]
pub enum GcCommand {
    /// Sweep now, outside the regular schedule
    Trigger(Option<oneshot::Sender<SweepStats>>),
    /// Stop the loop
    Shutdown,
}

/// Handle to the GC background task
pub struct GcTask {
    command_tx: mpsc::UnboundedSender<GcCommand>,
    handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_initiated: Arc<AtomicBool>,
    interval: Duration,
}

impl GcTask {
    /// Spawn the sweep loop on the current tokio runtime
    pub fn spawn<G>(collector: G, interval: Duration) -> Self
    where
        G: GarbageCollector + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_gc_loop(collector, interval, command_rx));

        info!(interval_ms = interval.as_millis() as u64, "GC task spawned");

        Self {
            command_tx,
            handle: Some(handle),
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Request an immediate sweep without waiting for its result
    pub fn trigger(&self) {
        let _ = self.command_tx.send(GcCommand::Trigger(None));
    }

    /// Sweep now and wait for the outcome
    ///
    /// Returns `None` if the task has already stopped.
    pub async fn sweep_now(&self) -> Option<SweepStats> {
        let (tx, rx) = oneshot::channel();
        self.command_tx.send(GcCommand::Trigger(Some(tx))).ok()?;
        rx.await.ok()
    }

    /// Stop the loop and wait for it to finish
    pub async fn shutdown(mut self) {
        self.shutdown_initiated.store(true, Ordering::SeqCst);
        let _ = self.command_tx.send(GcCommand::Shutdown);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "GC task shutdown error");
            } else {
                info!("GC task shutdown complete");
            }
        }
    }
}

async fn run_gc_loop<G: GarbageCollector>(
    collector: G,
    period: Duration,
    mut command_rx: mpsc::UnboundedReceiver<GcCommand>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the first sweep waits one period
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let stats = collector.sweep();
                debug!(
                    reclaimed = stats.reclaimed_blocks,
                    merged = stats.merged_blocks,
                    "GC tick"
                );
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(GcCommand::Trigger(reply)) => {
                        let stats = collector.sweep();
                        debug!(reclaimed = stats.reclaimed_blocks, "Manual GC trigger");
                        if let Some(reply) = reply {
                            let _ = reply.send(stats);
                        }
                    }
                    Some(GcCommand::Shutdown) | None => {
                        info!("GC task shutting down");
                        break;
                    }
                }
            }
        }
    }
}

impl Drop for GcTask {
    fn drop(&mut self) {
        if self.shutdown_initiated.load(Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self.handle.take() {
            warn!(
                "GcTask dropped without calling shutdown() - aborting task. \
                 Use `task.shutdown().await` for graceful cleanup."
            );
            handle.abort();
        }
    }
}
