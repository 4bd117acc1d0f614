//! Time sync: join and keep the modem clock synchronized with the network.

use super::{configure_and_join, TIME_SYNC_INTERVAL_S};
use crate::app::{self, EventCallbacks, LorawanConfig, STACK_ID};
use crate::modem::{ModemStack, TimeSyncService, TimeSyncStatus};
use log::{error, info, warn};

pub const APP_TIME_SYNC_SERVICE: TimeSyncService = TimeSyncService::MacSync;

/// Time sync sample handlers.
pub struct TimeSyncSample {
    config: LorawanConfig,
    last_utc: Option<u32>,
}

impl TimeSyncSample {
    pub fn new(config: LorawanConfig) -> Self {
        Self {
            config,
            last_utc: None,
        }
    }

    /// UTC time seen on the last valid sync event.
    pub fn last_utc(&self) -> Option<u32> {
        self.last_utc
    }
}

impl EventCallbacks for TimeSyncSample {
    fn reset(&mut self, modem: &mut dyn ModemStack, _count: u16) {
        configure_and_join(modem, &self.config);
    }

    fn joined(&mut self, modem: &mut dyn ModemStack) {
        match app::utc_time(modem) {
            Ok(utc) => info!("Joined. Modem time is: {}", utc),
            Err(e) => info!("Joined. Modem time not available yet ({})", e),
        }

        if let Err(e) = modem.time_set_sync_interval_s(TIME_SYNC_INTERVAL_S) {
            error!("Unable to initialize time sync, err: {}", e);
        }
        if let Err(e) = modem.time_start_sync_service(STACK_ID, APP_TIME_SYNC_SERVICE) {
            error!("smtc_modem_time_start_sync_service, err: {}", e);
        }
    }

    fn time_sync(&mut self, modem: &mut dyn ModemStack, status: TimeSyncStatus) {
        info!("Time sync event: {}", status.as_str());
        if status != TimeSyncStatus::Valid {
            return;
        }
        match app::utc_time(modem) {
            Ok(utc) => {
                info!("Valid time sync event. Modem time is: {}", utc);
                self.last_utc = Some(utc);
            }
            Err(e) => warn!("Valid time sync but UTC time unavailable: {}", e),
        }
    }
}
