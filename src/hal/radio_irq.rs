//! Radio interrupt forwarding with one-shot suppression.
//!
//! The LR11xx event line is edge triggered. When the modem library has
//! already consumed an interrupt condition that may still be electrically
//! pending it calls `radio_irq_clear_pending`, and the next edge is swallowed.

use super::platform::{IrqHandler, RadioBoard};
use super::HalCallback;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct IrqState {
    callback: Mutex<Option<HalCallback>>,
    skip_next: AtomicBool,
}

impl IrqState {
    /// Radio event pin handler.
    fn on_radio_event(&self) {
        if self.skip_next.swap(false, Ordering::AcqRel) {
            warn!("Skipping radio irq");
            return;
        }

        let callback = self.callback.lock().unwrap_or_else(|p| p.into_inner()).take();
        let Some(mut callback) = callback else {
            debug!("Radio irq with no handler registered");
            return;
        };

        callback();

        // Put the handler back unless it was replaced while running.
        let mut slot = self.callback.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

/// Single radio IRQ registration on top of a [`RadioBoard`].
pub struct RadioIrqBridge {
    board: Arc<dyn RadioBoard>,
    state: Arc<IrqState>,
}

impl RadioIrqBridge {
    pub fn new(board: Arc<dyn RadioBoard>) -> Self {
        Self {
            board,
            state: Arc::new(IrqState::default()),
        }
    }

    /// Register `callback` for radio interrupts and enable the line.
    pub fn configure(&self, callback: HalCallback) {
        *self.state.callback.lock().unwrap_or_else(|p| p.into_inner()) = Some(callback);
        self.board.attach_interrupt(self.handler());
        self.board.enable_interrupt();
    }

    /// Detach and reattach the handler to resynchronize with the line.
    pub fn reset(&self) {
        self.board.disable_interrupt();
        self.board.attach_interrupt(self.handler());
        self.board.enable_interrupt();
    }

    /// Swallow the next radio interrupt.
    pub fn clear_pending(&self) {
        debug!("Clear pending radio irq");
        self.state.skip_next.store(true, Ordering::Release);
    }

    pub fn skip_pending(&self) -> bool {
        self.state.skip_next.load(Ordering::Acquire)
    }

    fn handler(&self) -> IrqHandler {
        let state = self.state.clone();
        Arc::new(move || state.on_radio_event())
    }
}
