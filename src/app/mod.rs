//! Application glue around the modem library.
//!
//! [`ModemApp`] owns the modem and its HAL context, turns the library's
//! single "events pending" notification into calls on [`EventCallbacks`],
//! and stages downlink payloads. The free functions cover credential setup,
//! version display and time queries shared by all samples.
//!
//! # Example
//!
//! ```ignore
//! use lora_modem_hal::app::{ModemApp, LorawanConfig};
//!
//! let mut app = ModemApp::init(modem, platform, storage, Some(Box::new(handlers)), None);
//! app.run(cancel).await;
//! ```

pub mod callbacks;
pub mod config;
pub mod time;

pub use callbacks::{Downlink, EventCallbacks};
pub use config::{AppKey, ConfigError, LorawanConfig};
pub use time::gps_to_utc;

use crate::hal::{EnvironmentSensors, HalContext, ModemHal, ModemPersistence, Platform};
use crate::modem::{
    DownlinkMetadata, EventNotifier, ModemError, ModemEvent, ModemStack,
    MAX_LORAWAN_PAYLOAD_LENGTH,
};
use crate::runner::WakeSignal;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stack used by the samples. The modem runs a single LoRaWAN stack.
pub const STACK_ID: u8 = 0;

/// Staging area for the most recent downlink.
pub struct DownlinkBuffer {
    payload: [u8; MAX_LORAWAN_PAYLOAD_LENGTH],
    size: u8,
    metadata: DownlinkMetadata,
    remaining: u8,
}

impl DownlinkBuffer {
    fn new() -> Self {
        Self {
            payload: [0; MAX_LORAWAN_PAYLOAD_LENGTH],
            size: 0,
            metadata: DownlinkMetadata::default(),
            remaining: 0,
        }
    }

    /// Fetch the pending downlink from the modem, overwriting the buffer.
    fn fetch(&mut self, modem: &mut dyn ModemStack) -> Result<(), ModemError> {
        let info = modem.get_downlink_data(&mut self.payload)?;
        self.size = info.size.min(MAX_LORAWAN_PAYLOAD_LENGTH as u8);
        self.metadata = info.metadata;
        self.remaining = info.remaining;

        debug!(
            "Rx window: {} ({})",
            self.metadata.window.as_str(),
            self.metadata.window.raw()
        );
        debug!("Rx port: {}", self.metadata.fport);
        debug!("Rx RSSI: {}", self.metadata.rssi_dbm());
        debug!("Rx SNR: {}", self.metadata.snr_db());
        Ok(())
    }

    fn view(&self) -> Downlink<'_> {
        Downlink {
            metadata: self.metadata,
            payload: &self.payload[..self.size as usize],
            remaining: self.remaining,
        }
    }
}

/// Modem library instance plus everything it calls back into.
pub struct ModemApp<M: ModemStack, S: ModemPersistence + 'static> {
    modem: M,
    hal: Arc<HalContext<S>>,
    callbacks: Option<Box<dyn EventCallbacks>>,
    downlink: DownlinkBuffer,
    events_pending: Arc<AtomicBool>,
    /// Event fetched by an aborted pass, with its pending count.
    held: Option<(ModemEvent, u8)>,
    wake: WakeSignal,
}

impl<M: ModemStack, S: ModemPersistence + 'static> ModemApp<M, S> {
    /// Build the HAL context and initialize the modem library with it.
    ///
    /// Without `callbacks` events are drained and dropped. Without `env` the
    /// environment getters report their sentinels.
    pub fn init(
        mut modem: M,
        platform: Platform,
        storage: S,
        callbacks: Option<Box<dyn EventCallbacks>>,
        env: Option<Box<dyn EnvironmentSensors>>,
    ) -> Self {
        let wake = platform.wake.clone();
        let hal = Arc::new(HalContext::new(platform, storage, env));

        let events_pending = Arc::new(AtomicBool::new(false));
        let notifier: EventNotifier = {
            let pending = events_pending.clone();
            let wake = wake.clone();
            Arc::new(move || {
                pending.store(true, Ordering::Release);
                wake.signal();
            })
        };

        let hal_dyn: Arc<dyn ModemHal> = hal.clone();
        modem.init(hal_dyn, notifier);
        info!("Modem initialized");

        Self {
            modem,
            hal,
            callbacks,
            downlink: DownlinkBuffer::new(),
            events_pending,
            held: None,
            wake,
        }
    }

    pub fn hal(&self) -> &Arc<HalContext<S>> {
        &self.hal
    }

    pub fn modem(&mut self) -> &mut M {
        &mut self.modem
    }

    pub fn wake_signal(&self) -> &WakeSignal {
        &self.wake
    }

    /// True when the modem announced events that were not drained yet.
    pub fn events_pending(&self) -> bool {
        self.events_pending.load(Ordering::Acquire)
    }

    /// Run the modem engine once, draining events it announced.
    ///
    /// Returns the sleep budget in milliseconds. After a drain the budget is
    /// 0 since handlers may have queued requests for the engine.
    pub fn step(&mut self) -> u32 {
        let sleep_ms = self.modem.run_engine();
        if self.events_pending() && self.process_events() > 0 {
            return 0;
        }
        sleep_ms
    }

    /// Drain the modem event queue, dispatching in FIFO order.
    ///
    /// Stops at the first failed fetch and leaves the drain pending, so the
    /// next [`step`](Self::step) retries it. An event whose downlink could
    /// not be fetched is held and dispatched first on that retry. Returns
    /// the number of events dispatched.
    pub fn process_events(&mut self) -> usize {
        self.events_pending.store(false, Ordering::Release);

        let mut dispatched = 0;
        loop {
            let (event, pending) = match self.held.take() {
                Some(held) => held,
                None => match self.modem.get_event() {
                    Ok(next) => next,
                    Err(ModemError::NoEvent) => {
                        debug!("Event queue empty");
                        break;
                    }
                    Err(e) => {
                        error!("smtc_modem_get_event, err: {} ({})", e, e.code());
                        self.retry_next_step();
                        break;
                    }
                },
            };
            debug!("{} EVENT ({} pending)", event.name(), pending);

            if let Err(e) = self.dispatch(event) {
                error!("smtc_modem_get_downlink_data, err: {} ({})", e, e.code());
                self.held = Some((event, pending));
                self.retry_next_step();
                break;
            }
            dispatched += 1;

            if pending == 0 {
                break;
            }
        }
        dispatched
    }

    /// Keep the drain pending without waking the loop early.
    fn retry_next_step(&self) {
        self.events_pending.store(true, Ordering::Release);
    }

    fn dispatch(&mut self, event: ModemEvent) -> Result<(), ModemError> {
        let Self {
            modem,
            callbacks,
            downlink,
            ..
        } = self;

        if event == ModemEvent::DownData {
            downlink.fetch(modem)?;
        }

        let Some(cb) = callbacks.as_mut() else {
            return Ok(());
        };

        match event {
            ModemEvent::Reset { count } => {
                debug!("Reset count: {}", count);
                cb.reset(modem, count);
            }
            ModemEvent::Alarm => cb.alarm(modem),
            ModemEvent::Joined => cb.joined(modem),
            ModemEvent::JoinFail => cb.join_fail(modem),
            ModemEvent::TxDone { status } => {
                debug!("TX DONE status: {:?}", status);
                cb.tx_done(modem, status);
            }
            ModemEvent::DownData => cb.down_data(modem, downlink.view()),
            ModemEvent::UploadDone { status } => {
                debug!("Upload status: {}", status.as_str());
                cb.upload_done(modem, status);
            }
            ModemEvent::SetConf { opcode } => {
                debug!("Opcode: {}", opcode);
                cb.set_conf(modem, opcode);
            }
            ModemEvent::Mute { status } => {
                debug!("Mute: {}", status.as_str());
                cb.mute(modem, status);
            }
            ModemEvent::StreamDone => cb.stream_done(modem),
            ModemEvent::TimeSync { status } => cb.time_sync(modem, status),
            ModemEvent::LinkCheck { status } => cb.link_check(modem, status),
            ModemEvent::ClassBPingSlotInfo { status } => cb.class_b_ping_slot_info(modem, status),
            ModemEvent::ClassBStatus { status } => {
                debug!("Class B status: {}", status.as_str());
                cb.class_b_status(modem, status);
            }
            ModemEvent::Unknown { event_type } => debug!("Unknown event type {}", event_type),
        }
        Ok(())
    }
}

/// Fail-fast check for one configuration call.
fn check(call: &str, result: Result<(), ModemError>) -> Result<(), ModemError> {
    result.map_err(|e| {
        error!("{}, err: {} ({})", call, e, e.code());
        e
    })
}

/// Hand the credential set to the modem.
///
/// Stops at the first failing call and returns its error; later calls are
/// not made. Region and class are only logged: the modem starts in the
/// region it was built for and applications switch class themselves.
pub fn configure_lorawan_params(
    modem: &mut dyn ModemStack,
    stack_id: u8,
    cfg: &LorawanConfig,
) -> Result<(), ModemError> {
    let mut dev_eui = cfg.dev_eui;
    if cfg.use_chip_eui_as_dev_eui {
        dev_eui = modem.get_chip_eui(stack_id).map_err(|e| {
            error!("smtc_modem_get_chip_eui, err: {} ({})", e, e.code());
            e
        })?;
    }

    check("smtc_modem_set_deveui", modem.set_deveui(stack_id, &dev_eui))?;
    check("smtc_modem_set_joineui", modem.set_joineui(stack_id, &cfg.join_eui))?;
    check(
        "smtc_modem_set_nwkkey",
        modem.set_nwkkey(stack_id, cfg.app_key.expose()),
    )?;

    info!("Configured LoRaWAN parameters:");
    info!("Region: {} ({})", cfg.region.as_str(), cfg.region.raw());
    info!("Class: {} ({})", cfg.class.as_str(), cfg.class.raw());
    info!("DevEui: {}", config::to_hex(&dev_eui));
    info!("JoinEui: {}", config::to_hex(&cfg.join_eui));
    Ok(())
}

/// Log the modem library version.
pub fn display_versions(modem: &mut dyn ModemStack) {
    match modem.get_modem_version() {
        Ok(version) => info!("LoRa Basics Modem version: {}", version),
        Err(e) => debug!("Modem version unavailable: {}", e),
    }
}

/// GPS time in seconds, from the last ALC sync.
pub fn gps_time(modem: &mut dyn ModemStack) -> Result<u32, ModemError> {
    modem.get_alcsync_time(STACK_ID)
}

/// UTC (Unix) time in seconds.
pub fn utc_time(modem: &mut dyn ModemStack) -> Result<u32, ModemError> {
    gps_time(modem).map(gps_to_utc)
}
