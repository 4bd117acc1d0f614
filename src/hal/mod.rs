//! HAL bridge between the modem library and the platform.
//!
//! The modem library calls back into its host through a fixed set of
//! functions: time, timers, interrupts, persistence, randomness, TCXO
//! control, panics and environment sensing. [`ModemHal`] is that contract;
//! [`HalContext`] implements it on top of the [`Platform`] services, a
//! [`ModemPersistence`] backend and optional [`EnvironmentSensors`].
//!
//! All adapter state lives in the context. Share it with `Arc` between the
//! modem library and the work queue.

pub mod panic;
pub mod platform;
pub mod radio_irq;
pub mod random;
pub mod sensors;
pub mod settings_host;
pub mod storage;
pub mod timer;

pub use panic::{CrashLog, CRASH_LOG_SIZE};
pub use platform::{Clock, IrqHandler, Job, OneShotTimer, Platform, RadioBoard, SystemControl, WorkQueue};
pub use radio_irq::RadioIrqBridge;
pub use sensors::{EnvironmentSensors, NoSensors, SensorError};
pub use settings_host::FileSettings;
pub use storage::{
    ContextDelegate, ContextId, ContextType, DelegateStorage, LoadSlot, MemorySettings,
    ModemPersistence, SettingsBackend, SettingsError, SettingsStorage, StorageError, ValueReader,
};
pub use timer::TimerBridge;

use crate::runner::WakeSignal;
use log::{error, info, warn};
use rand_core::RngCore;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Callback handed to the HAL by the modem library. Runs on the work queue.
pub type HalCallback = Box<dyn FnMut() + Send + 'static>;

/// Delay between the end of a radio operation and the MCU noticing it.
const BOARD_DELAY_MS: i8 = 1;

/// Log target for modem library traces.
pub const TRACE_TARGET: &str = "lbm";

/// Callback contract the modem library requires from its host.
pub trait ModemHal: Send + Sync {
    /// Cold reboot of the MCU.
    fn reset_mcu(&self) -> !;

    fn reload_wdog(&self);

    /// Uptime in seconds.
    fn get_time_in_s(&self) -> u32;

    /// Uptime in milliseconds, wrapping at 32 bits.
    fn get_time_in_ms(&self) -> u32;

    /// Arm the single modem timer, replacing any previous arming.
    fn start_timer(&self, milliseconds: u32, callback: HalCallback);

    fn stop_timer(&self);

    /// Mask timer expiries and the radio interrupt line.
    fn disable_modem_irq(&self);

    fn enable_modem_irq(&self);

    fn context_store(&self, ctx: ContextId, offset: u32, data: &[u8]);

    fn context_restore(&self, ctx: ContextId, offset: u32, buffer: &mut [u8]);

    fn crashlog_store(&self, log: &[u8]);

    /// Returns the number of bytes restored.
    fn crashlog_restore(&self, buffer: &mut [u8]) -> usize;

    fn crashlog_set_status(&self, available: bool);

    fn crashlog_get_status(&self) -> bool;

    /// Fatal modem condition. Stores a crash log and reboots.
    fn on_panic(&self, func: &str, line: u32, args: fmt::Arguments<'_>) -> !;

    fn get_random_nb(&self) -> u32;

    fn get_random_nb_in_range(&self, a: u32, b: u32) -> u32;

    fn get_signed_random_nb_in_range(&self, a: i32, b: i32) -> i32;

    fn irq_config_radio_irq(&self, callback: HalCallback);

    fn irq_reset_radio_irq(&self);

    fn radio_irq_clear_pending(&self);

    fn start_radio_tcxo(&self);

    fn stop_radio_tcxo(&self);

    fn get_radio_tcxo_startup_delay_ms(&self) -> u32;

    fn set_ant_switch(&self, is_tx_on: bool);

    /// Battery level, 0 (empty) to 255 (full).
    fn get_battery_level(&self) -> u8;

    /// Temperature in degrees Celsius.
    fn get_temperature(&self) -> i8;

    /// Supply voltage in 20 mV steps.
    fn get_voltage(&self) -> u8;

    fn get_board_delay_ms(&self) -> i8;

    /// The modem library has work to do outside of `run_engine`.
    fn user_lbm_irq(&self);

    fn print_trace(&self, text: &str);
}

/// Owned adapter state behind [`ModemHal`].
pub struct HalContext<S: ModemPersistence> {
    clock: Arc<dyn platform::Clock>,
    timer: TimerBridge,
    radio_irq: RadioIrqBridge,
    board: Arc<dyn RadioBoard>,
    system: Arc<dyn SystemControl>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    wake: WakeSignal,
    storage: S,
    sensors: Mutex<Box<dyn EnvironmentSensors>>,
}

impl<S: ModemPersistence> HalContext<S> {
    /// Build the context. Without `sensors` every environment getter returns
    /// its sentinel.
    pub fn new(
        platform: Platform,
        storage: S,
        sensors: Option<Box<dyn EnvironmentSensors>>,
    ) -> Self {
        let Platform {
            clock,
            timer,
            work_queue,
            board,
            system,
            rng,
            wake,
        } = platform;

        if sensors.is_none() {
            info!("No environment sensors, battery/temperature/voltage report sentinels");
        }

        Self {
            clock,
            timer: TimerBridge::new(timer, work_queue),
            radio_irq: RadioIrqBridge::new(board.clone()),
            board,
            system,
            rng: Mutex::new(rng),
            wake,
            storage,
            sensors: Mutex::new(sensors.unwrap_or_else(|| Box::new(NoSensors))),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn wake_signal(&self) -> &WakeSignal {
        &self.wake
    }

    pub fn timer(&self) -> &TimerBridge {
        &self.timer
    }

    pub fn radio_irq(&self) -> &RadioIrqBridge {
        &self.radio_irq
    }

    fn sensors(&self) -> std::sync::MutexGuard<'_, Box<dyn EnvironmentSensors>> {
        self.sensors.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn next_random(&self) -> u32 {
        self.rng.lock().unwrap_or_else(|p| p.into_inner()).next_u32()
    }
}

impl<S: ModemPersistence> ModemHal for HalContext<S> {
    fn reset_mcu(&self) -> ! {
        warn!("Modem requested MCU reset");
        self.system.reboot_cold()
    }

    fn reload_wdog(&self) {}

    fn get_time_in_s(&self) -> u32 {
        (self.clock.uptime_ms() / 1000) as u32
    }

    fn get_time_in_ms(&self) -> u32 {
        self.clock.uptime_ms() as u32
    }

    fn start_timer(&self, milliseconds: u32, callback: HalCallback) {
        self.timer.start(milliseconds, callback);
    }

    fn stop_timer(&self) {
        self.timer.stop();
    }

    fn disable_modem_irq(&self) {
        self.timer.set_irq_enabled(false);
        self.board.disable_interrupt();
    }

    fn enable_modem_irq(&self) {
        self.timer.set_irq_enabled(true);
        self.board.enable_interrupt();
    }

    fn context_store(&self, ctx: ContextId, offset: u32, data: &[u8]) {
        if let Err(e) = self.storage.context_store(ctx, offset, data) {
            error!("Failed to store context {} at offset {}: {}", ctx, offset, e);
        }
    }

    fn context_restore(&self, ctx: ContextId, offset: u32, buffer: &mut [u8]) {
        if let Err(e) = self.storage.context_restore(ctx, offset, buffer) {
            error!("Failed to restore context {} at offset {}: {}", ctx, offset, e);
        }
    }

    fn crashlog_store(&self, log: &[u8]) {
        if let Err(e) = self.storage.crashlog_store(log) {
            error!("Failed to store crash log: {}", e);
        }
    }

    fn crashlog_restore(&self, buffer: &mut [u8]) -> usize {
        self.storage.crashlog_restore(buffer).unwrap_or_else(|e| {
            error!("Failed to restore crash log: {}", e);
            0
        })
    }

    fn crashlog_set_status(&self, available: bool) {
        if let Err(e) = self.storage.crashlog_set_status(available) {
            error!("Failed to store crash log status: {}", e);
        }
    }

    fn crashlog_get_status(&self) -> bool {
        self.storage.crashlog_get_status().unwrap_or_else(|e| {
            error!("Failed to load crash log status: {}", e);
            false
        })
    }

    fn on_panic(&self, func: &str, line: u32, args: fmt::Arguments<'_>) -> ! {
        let log = CrashLog::format(func, line, args);
        self.crashlog_store(log.as_bytes());
        self.crashlog_set_status(true);
        error!("Modem panic: {}", log.as_str());

        if cfg!(feature = "assert-on-panic") {
            panic!("modem panic: {}", log.as_str());
        }
        self.system.reboot_cold()
    }

    fn get_random_nb(&self) -> u32 {
        self.next_random()
    }

    fn get_random_nb_in_range(&self, a: u32, b: u32) -> u32 {
        random::in_range(self.next_random(), a, b)
    }

    fn get_signed_random_nb_in_range(&self, a: i32, b: i32) -> i32 {
        random::signed_in_range(self.next_random(), a, b)
    }

    fn irq_config_radio_irq(&self, callback: HalCallback) {
        self.radio_irq.configure(callback);
    }

    fn irq_reset_radio_irq(&self) {
        self.radio_irq.reset();
    }

    fn radio_irq_clear_pending(&self) {
        self.radio_irq.clear_pending();
    }

    // The TCXO is driven by the LR11xx itself.
    fn start_radio_tcxo(&self) {}

    fn stop_radio_tcxo(&self) {}

    fn get_radio_tcxo_startup_delay_ms(&self) -> u32 {
        self.board.tcxo_startup_delay_ms()
    }

    // Antenna switching is handled by the LR11xx RF switch configuration.
    fn set_ant_switch(&self, _is_tx_on: bool) {}

    fn get_battery_level(&self) -> u8 {
        sensors::battery_or_sentinel(self.sensors().battery_level())
    }

    fn get_temperature(&self) -> i8 {
        sensors::temperature_or_sentinel(self.sensors().temperature())
    }

    fn get_voltage(&self) -> u8 {
        sensors::voltage_or_sentinel(self.sensors().voltage_mv())
    }

    fn get_board_delay_ms(&self) -> i8 {
        BOARD_DELAY_MS
    }

    fn user_lbm_irq(&self) {
        self.wake.signal();
    }

    fn print_trace(&self, text: &str) {
        info!(target: TRACE_TARGET, "{}", text.trim_end());
    }
}
