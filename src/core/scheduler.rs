//! Recurring completion scheduler.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::completion::{BatchSummary, CompletionEngine};
use crate::core::registry::BuildRegistry;
use crate::util::clock::now_ms;

const STATE_IDLE: u8 = 0;
const STATE_TICKING: u8 = 1;

/// Holds the Ticking token for the duration of one tick and restores Idle on
/// drop, so the scheduler cannot wedge even if the tick future is cancelled
/// mid-sweep.
struct TickToken<'a> {
    state: &'a AtomicU8,
}

impl Drop for TickToken<'_> {
    fn drop(&mut self) {
        self.state.store(STATE_IDLE, Ordering::Release);
    }
}

/// Contract for the recurring-callback collaborator. Any timer facility that
/// can fire a callback at a fixed interval and be stopped satisfies it.
pub trait RecurringTimer: Send + Sync {
    /// Begin firing `callback` every `interval`.
    fn start<F>(&self, interval: Duration, callback: F)
    where
        F: Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static;

    /// Stop firing. Idempotent.
    fn stop(&self);
}

/// Outcome of one scheduler fire.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    /// Due records this tick observed.
    pub due: usize,
    /// Batch counters from the completion engine.
    pub batch: BatchSummary,
    /// True when the fire was skipped because the previous tick was still
    /// processing.
    pub skipped: bool,
}

/// Finds and completes all due records on a fixed interval.
///
/// Non-reentrant: the Idle/Ticking token is an `AtomicU8` flipped with
/// compare-and-swap, so a fire that arrives while a batch is still processing
/// is skipped outright rather than queued. The guard holds under genuine
/// parallel execution, not just a single cooperative loop.
pub struct CompletionScheduler {
    registry: Arc<dyn BuildRegistry>,
    engine: Arc<CompletionEngine>,
    state: AtomicU8,
    interval: Duration,
}

impl CompletionScheduler {
    /// Default tick interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    /// Create a scheduler ticking at `interval`.
    pub fn new(
        registry: Arc<dyn BuildRegistry>,
        engine: Arc<CompletionEngine>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            engine,
            state: AtomicU8::new(STATE_IDLE),
            interval,
        }
    }

    /// Configured tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick: reserve the Ticking token, sweep due records, return to
    /// Idle. Per-record failures stay inside the batch; a tick has no caller
    /// to report to synchronously, so it only returns aggregate counts.
    pub async fn tick(&self) -> TickSummary {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_TICKING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("previous tick still processing, skipping this fire");
            return TickSummary {
                skipped: true,
                ..TickSummary::default()
            };
        }

        let _token = TickToken { state: &self.state };
        let now = now_ms();
        self.sweep(now).await
    }

    /// Wire this scheduler onto a recurring timer at its configured interval.
    pub fn run<T>(self: &Arc<Self>, timer: &T)
    where
        T: RecurringTimer,
    {
        let scheduler = Arc::clone(self);
        timer.start(self.interval, move || {
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move {
                scheduler.tick().await;
            })
        });
    }

    async fn sweep(&self, now: u128) -> TickSummary {
        let due = match self.registry.find_due(now).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!("due query failed, tick abandoned: {err}");
                return TickSummary::default();
            }
        };

        if due.is_empty() {
            return TickSummary::default();
        }

        tracing::debug!(due = due.len(), "processing due builds");
        let batch = self.engine.complete_batch(&due, now).await;
        if batch.completed > 0 || batch.failed > 0 {
            tracing::info!(
                completed = batch.completed,
                failed = batch.failed,
                already_terminal = batch.already_terminal,
                "tick finished"
            );
        }
        TickSummary {
            due: due.len(),
            batch,
            skipped: false,
        }
    }
}
