//! Main loop: run the modem engine, then sleep until its budget expires or
//! something wakes it early.

use crate::app::ModemApp;
use crate::hal::ModemPersistence;
use crate::modem::ModemStack;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct WakeInner {
    raised: AtomicBool,
    notify: Notify,
}

/// Binary semaphore waking the main loop.
///
/// Raising it any number of times before the loop waits produces a single
/// wakeup. Safe to raise from any thread.
#[derive(Clone, Default)]
pub struct WakeSignal {
    inner: Arc<WakeInner>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.inner.raised.store(true, Ordering::Release);
        self.inner.notify.notify_one();
    }

    /// True if raised and not yet consumed by [`wait`](Self::wait).
    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::Acquire)
    }

    /// Wait until raised, consuming the signal.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.inner.raised.swap(false, Ordering::AcqRel) {
                return;
            }
            notified.await;
        }
    }
}

impl<M: ModemStack, S: ModemPersistence + 'static> ModemApp<M, S> {
    /// Drive the modem until `cancel` fires.
    ///
    /// The first engine run reports the modem reset, which is where
    /// applications configure credentials and join.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let wake = self.wake_signal().clone();
        info!("Modem main loop started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let sleep_ms = self.step();
            if sleep_ms == 0 {
                // Handlers queued work; yield and run the engine again.
                tokio::task::yield_now().await;
                continue;
            }
            debug!("Sleeping for {} ms", sleep_ms);

            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                _ = wake.wait() => {
                    debug!("Woken early");
                }
                _ = tokio::time::sleep(Duration::from_millis(sleep_ms as u64)) => {}
            }
        }

        info!("Modem main loop stopped");
    }
}
