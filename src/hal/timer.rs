//! One-shot modem timer bridged onto a platform timer and work queue.
//!
//! The expiry handler runs in interrupt context, so it only submits a job;
//! the modem callback runs from the work queue because it may perform SPI
//! transactions with the LR11xx.

use super::platform::{Job, OneShotTimer, WorkQueue};
use super::HalCallback;
use log::{debug, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Callback slot plus the modem IRQ gate shared with expiry handlers.
#[derive(Default)]
struct TimerState {
    callback: Mutex<Option<HalCallback>>,
    irq_enabled: AtomicBool,
    /// An expiry job sits in the work queue.
    queued: AtomicBool,
}

/// Modem HAL timer.
///
/// Holds at most one armed callback. The modem IRQ gate starts disabled;
/// the modem library enables it once it is ready to take timer callbacks.
pub struct TimerBridge {
    timer: Arc<dyn OneShotTimer>,
    work_queue: Arc<dyn WorkQueue>,
    state: Arc<TimerState>,
}

impl TimerBridge {
    pub fn new(timer: Arc<dyn OneShotTimer>, work_queue: Arc<dyn WorkQueue>) -> Self {
        Self {
            timer,
            work_queue,
            state: Arc::new(TimerState::default()),
        }
    }

    /// Arm the timer for `milliseconds`, replacing any previous callback.
    pub fn start(&self, milliseconds: u32, callback: HalCallback) {
        *lock(&self.state.callback) = Some(callback);

        let state = self.state.clone();
        let work_queue = self.work_queue.clone();
        let on_expiry: Job = Box::new(move || {
            if state.irq_enabled.load(Ordering::Acquire) {
                state.queued.store(true, Ordering::Release);
                let state = state.clone();
                work_queue.submit(Box::new(move || run_callback(&state)));
            } else {
                debug!("Modem timer expired with modem IRQ disabled");
            }
        });

        self.timer
            .start(Duration::from_millis(milliseconds as u64), on_expiry);
        trace!("Modem timer armed for {} ms", milliseconds);
    }

    /// Disarm the timer and drop the callback. An expiry already queued
    /// keeps its callback and still runs.
    pub fn stop(&self) {
        self.timer.stop();
        let mut slot = lock(&self.state.callback);
        if !self.state.queued.load(Ordering::Acquire) {
            slot.take();
        }
    }

    /// Gate expiry handling without touching the hardware timer.
    pub fn set_irq_enabled(&self, enabled: bool) {
        self.state.irq_enabled.store(enabled, Ordering::Release);
    }

    pub fn irq_enabled(&self) -> bool {
        self.state.irq_enabled.load(Ordering::Acquire)
    }

    /// True while a callback is armed or queued and has not run yet.
    pub fn is_armed(&self) -> bool {
        lock(&self.state.callback).is_some()
    }
}

/// Fire the armed callback once. The slot is released before the call so the
/// callback may re-arm the timer.
///
/// Takes whatever callback is armed when the job runs: an expiry queued
/// before a re-arm fires the new callback early.
fn run_callback(state: &TimerState) {
    let callback = {
        let mut slot = lock(&state.callback);
        state.queued.store(false, Ordering::Release);
        slot.take()
    };
    match callback {
        Some(mut callback) => callback(),
        None => trace!("Modem timer work ran with no callback armed"),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
