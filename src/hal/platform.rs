//! Platform primitives the HAL bridge is built on.
//!
//! These traits stand in for the RTOS services the modem HAL needs: a
//! monotonic clock, a one-shot timer whose expiry runs in interrupt context,
//! a cooperative work queue, the radio's interrupt line, and a way to reboot.
//! The [`host`](crate::host) module implements them on top of tokio and std
//! threads; tests use manual doubles.

use crate::runner::WakeSignal;
use rand_core::RngCore;
use std::sync::Arc;
use std::time::Duration;

/// Deferred unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handler attached to the radio interrupt line. May run many times.
pub type IrqHandler = Arc<dyn Fn() + Send + Sync + 'static>;

/// Monotonic uptime source.
pub trait Clock: Send + Sync {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;
}

/// Single hardware one-shot timer.
///
/// `on_expiry` runs in interrupt context and must not touch the radio bus.
pub trait OneShotTimer: Send + Sync {
    /// Arm the timer, replacing any previous arming.
    fn start(&self, after: Duration, on_expiry: Job);

    /// Disarm the timer. An expiry that already ran is not undone.
    fn stop(&self);
}

/// Cooperative work context. Jobs run one at a time, in submission order.
pub trait WorkQueue: Send + Sync {
    fn submit(&self, job: Job);
}

/// The LR11xx board: interrupt line plus board level radio configuration.
pub trait RadioBoard: Send + Sync {
    /// Route the radio event pin to `handler`, replacing any previous handler.
    fn attach_interrupt(&self, handler: IrqHandler);

    fn enable_interrupt(&self);

    fn disable_interrupt(&self);

    /// TCXO startup timeout configured in the radio BSP, in milliseconds.
    fn tcxo_startup_delay_ms(&self) -> u32;
}

/// System level control.
pub trait SystemControl: Send + Sync {
    /// Cold reboot. Never returns.
    fn reboot_cold(&self) -> !;
}

/// Bundle of platform services handed to [`HalContext`](super::HalContext).
pub struct Platform {
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<dyn OneShotTimer>,
    pub work_queue: Arc<dyn WorkQueue>,
    pub board: Arc<dyn RadioBoard>,
    pub system: Arc<dyn SystemControl>,
    pub rng: Box<dyn RngCore + Send>,
    /// Raised whenever the modem engine should run before its sleep budget ends.
    pub wake: WakeSignal,
}
