//! Periodic uplink: join, then send a counter and the radio charge every
//! minute.

use super::{configure_and_join, log_downlink};
use crate::app::{Downlink, EventCallbacks, LorawanConfig, STACK_ID};
use crate::modem::{AdrProfile, ModemError, ModemStack, TxDoneStatus};
use log::{error, info, warn};

/// Seconds between uplinks.
pub const APP_TX_DUTYCYCLE_S: u32 = 60;

/// Port uplinks are sent on.
pub const LORAWAN_APP_PORT: u8 = 2;

/// Whether uplinks are confirmed.
pub const LORAWAN_CONFIRMED_MSG_ON: bool = false;

/// What [`send_frame`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Uplink requested with the payload.
    Requested,
    /// Payload too large for the current datarate; an empty uplink was
    /// requested to flush MAC commands.
    EmptyUplink,
    /// Duty cycle forbids sending for this many more milliseconds.
    DutyCycleLimited { wait_ms: u32 },
}

/// Send `payload` on [`LORAWAN_APP_PORT`] if duty cycle and the current
/// maximum payload allow it.
pub fn send_frame(
    modem: &mut dyn ModemStack,
    payload: &[u8],
    confirmed: bool,
) -> Result<FrameOutcome, ModemError> {
    let duty_cycle = modem.get_duty_cycle_status()?;
    if duty_cycle < 0 {
        let wait_ms = duty_cycle.unsigned_abs();
        warn!("Duty-cycle limitation - next possible uplink in {} ms", wait_ms);
        return Ok(FrameOutcome::DutyCycleLimited { wait_ms });
    }

    let max_payload = modem.get_next_tx_max_payload(STACK_ID)?;
    if payload.len() > max_payload as usize {
        warn!("Not enough space in buffer - requesting empty uplink to flush MAC commands");
        modem.request_empty_uplink(STACK_ID, true, LORAWAN_APP_PORT, confirmed)?;
        return Ok(FrameOutcome::EmptyUplink);
    }

    info!("Requesting uplink");
    modem.request_uplink(STACK_ID, LORAWAN_APP_PORT, confirmed, payload)?;
    Ok(FrameOutcome::Requested)
}

/// Periodic uplink sample handlers.
pub struct PeriodicUplink {
    config: LorawanConfig,
    tx_count: u8,
}

impl PeriodicUplink {
    pub fn new(config: LorawanConfig) -> Self {
        Self {
            config,
            tx_count: 0,
        }
    }

    /// Number of frames built so far.
    pub fn tx_count(&self) -> u8 {
        self.tx_count
    }

    /// Build the next application payload: `[counter, charge (LE u32)]`.
    fn next_payload(&mut self, charge_mah: u32) -> [u8; 5] {
        self.tx_count = self.tx_count.wrapping_add(1);
        let c = charge_mah.to_le_bytes();
        [self.tx_count, c[0], c[1], c[2], c[3]]
    }

    fn schedule_next(modem: &mut dyn ModemStack) {
        match modem.alarm_start_timer(APP_TX_DUTYCYCLE_S) {
            Ok(()) => info!("Next transmission in: {} s", APP_TX_DUTYCYCLE_S),
            Err(e) => error!("smtc_modem_alarm_start_timer, err: {}", e),
        }
    }
}

impl EventCallbacks for PeriodicUplink {
    fn reset(&mut self, modem: &mut dyn ModemStack, count: u16) {
        info!("Modem reset (count {})", count);
        configure_and_join(modem, &self.config);
    }

    fn joined(&mut self, modem: &mut dyn ModemStack) {
        info!("Joined");
        Self::schedule_next(modem);

        // ADR profile must be set after joining
        if let Err(e) = modem.adr_set_profile(STACK_ID, AdrProfile::NetworkControlled) {
            error!("smtc_modem_adr_set_profile, err: {}", e);
        }
    }

    fn alarm(&mut self, modem: &mut dyn ModemStack) {
        Self::schedule_next(modem);

        let charge = modem.get_charge().unwrap_or_else(|e| {
            warn!("smtc_modem_get_charge, err: {}", e);
            0
        });
        let payload = self.next_payload(charge);

        if let Err(e) = send_frame(modem, &payload, LORAWAN_CONFIRMED_MSG_ON) {
            error!("Uplink request failed: {}", e);
        }
    }

    fn tx_done(&mut self, _modem: &mut dyn ModemStack, status: TxDoneStatus) {
        match status {
            TxDoneStatus::NotSent => error!("Uplink was not sent"),
            TxDoneStatus::Sent => info!("Uplink sent (not confirmed)"),
            TxDoneStatus::Confirmed => info!("Uplink sent (confirmed)"),
        }
    }

    fn down_data(&mut self, _modem: &mut dyn ModemStack, downlink: Downlink<'_>) {
        log_downlink(&downlink);
    }
}
