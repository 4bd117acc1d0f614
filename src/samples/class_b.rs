//! Class B: join as class A, negotiate a ping slot and network time, then
//! switch to class B once both are in place.

use super::{configure_and_join, log_downlink, TIME_SYNC_INTERVAL_S};
use crate::app::{self, Downlink, EventCallbacks, LorawanConfig, STACK_ID};
use crate::modem::{
    AdrProfile, ClassBStatus, DeviceClass, ModemStack, PingSlotPeriodicity, PingSlotStatus,
    TimeSyncService, TimeSyncStatus,
};
use crate::runner::WakeSignal;
use log::{error, info, warn};

/// Ping slot periodicity requested after joining.
pub const LORAWAN_CLASS_B_PING_SLOT: PingSlotPeriodicity = PingSlotPeriodicity::S16;

/// Time sync service used to obtain network time.
pub const APP_TIME_SYNC_SERVICE: TimeSyncService = TimeSyncService::MacSync;

/// Class B sample handlers.
pub struct ClassBSample {
    config: LorawanConfig,
    wake: WakeSignal,
    time_synced: bool,
    ping_slot_set: bool,
}

impl ClassBSample {
    /// `wake` is raised on downlinks so the main loop runs the engine
    /// right away.
    pub fn new(config: LorawanConfig, wake: WakeSignal) -> Self {
        Self {
            config,
            wake,
            time_synced: false,
            ping_slot_set: false,
        }
    }

    pub fn time_synced(&self) -> bool {
        self.time_synced
    }

    pub fn ping_slot_set(&self) -> bool {
        self.ping_slot_set
    }

    fn switch_to_class_b_if_ready(&self, modem: &mut dyn ModemStack) {
        if !(self.time_synced && self.ping_slot_set) {
            return;
        }
        warn!("Switching to class B");
        if let Err(e) = modem.set_class(STACK_ID, DeviceClass::B) {
            error!("smtc_modem_set_class, err: {}", e);
        }
    }
}

impl EventCallbacks for ClassBSample {
    fn reset(&mut self, modem: &mut dyn ModemStack, count: u16) {
        info!("EVENT: RESET");
        info!("Count: {}", count);
        configure_and_join(modem, &self.config);
    }

    fn joined(&mut self, modem: &mut dyn ModemStack) {
        warn!("JOINED!");

        if let Err(e) = modem.adr_set_profile(STACK_ID, AdrProfile::NetworkControlled) {
            error!("smtc_modem_adr_set_profile, err: {}", e);
        }

        if let Err(e) = modem.class_b_set_ping_slot_periodicity(STACK_ID, LORAWAN_CLASS_B_PING_SLOT)
        {
            error!("smtc_modem_class_b_set_ping_slot_periodicity, err: {}", e);
        }
        if let Err(e) = modem.class_b_request_ping_slot_info(STACK_ID) {
            error!("smtc_modem_lorawan_class_b_request_ping_slot_info, err: {}", e);
        }

        if let Err(e) = modem.time_set_sync_interval_s(TIME_SYNC_INTERVAL_S) {
            // Fail usually means the region or time service is not set up
            error!("Unable to initialize time sync, err: {}", e);
        }
        if let Err(e) = modem.time_start_sync_service(STACK_ID, APP_TIME_SYNC_SERVICE) {
            error!("smtc_modem_time_start_sync_service, err: {}", e);
        }
    }

    fn time_sync(&mut self, modem: &mut dyn ModemStack, status: TimeSyncStatus) {
        if status != TimeSyncStatus::Valid {
            warn!("Invalid or unsynced time received");
            return;
        }

        match app::utc_time(modem) {
            Ok(utc) => warn!("Current utc time: {}", utc),
            Err(e) => warn!("UTC time unavailable: {}", e),
        }
        self.time_synced = true;
        self.switch_to_class_b_if_ready(modem);
    }

    fn class_b_ping_slot_info(&mut self, modem: &mut dyn ModemStack, status: PingSlotStatus) {
        match status {
            PingSlotStatus::Answered => {
                self.ping_slot_set = true;
                self.switch_to_class_b_if_ready(modem);
            }
            PingSlotStatus::NotAnswered => {
                info!("Ping slot not answered, trying again");
                if let Err(e) = modem.class_b_request_ping_slot_info(STACK_ID) {
                    error!("smtc_modem_lorawan_class_b_request_ping_slot_info, err: {}", e);
                }
            }
        }
    }

    fn class_b_status(&mut self, _modem: &mut dyn ModemStack, status: ClassBStatus) {
        info!("Class B status event: {}", status.as_str());
    }

    fn down_data(&mut self, _modem: &mut dyn ModemStack, downlink: Downlink<'_>) {
        log_downlink(&downlink);
        self.wake.signal();
    }
}
