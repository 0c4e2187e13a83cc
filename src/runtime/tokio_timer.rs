//! Tokio recurring timer implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::core::scheduler::RecurringTimer;

/// Tokio-based recurring timer that fires a callback at a fixed interval on
/// a tokio runtime.
#[derive(Clone)]
pub struct TokioTicker {
    handle: Arc<tokio::runtime::Handle>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
}

impl TokioTicker {
    /// Create a ticker from a tokio runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a ticker on the current runtime.
    ///
    /// # Panics
    /// Panics outside a tokio runtime context.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl RecurringTimer for TokioTicker {
    fn start<F>(&self, interval: Duration, callback: F)
    where
        F: Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::warn!("ticker already started, ignoring");
            return;
        }
        let shutdown = Arc::clone(&self.shutdown);
        self.handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first interval tick resolves immediately; consume it so the
            // first callback fires one full interval after start.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => callback().await,
                    _ = shutdown.notified() => {
                        tracing::info!("ticker stopped");
                        break;
                    }
                }
            }
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.shutdown.notify_one();
    }
}
