//! Interface to the external LoRa Basics Modem library.
//!
//! The library itself is closed and not part of this crate. [`ModemStack`]
//! is the subset of its public API the app layer and samples drive; the
//! `lbm` feature provides the binding to the real library, and the test
//! suite drives a scripted double.

mod event;
mod types;

pub use event::{
    ClassBStatus, LinkCheckStatus, ModemEvent, MuteStatus, PingSlotStatus, TimeSyncStatus,
    TxDoneStatus, UploadDoneStatus,
};
pub use types::{
    AdrProfile, DeviceClass, DownlinkInfo, DownlinkMetadata, DownlinkWindow, Eui, Key,
    ModemError, ModemVersion, PingSlotPeriodicity, Region, TimeSyncService,
    MAX_LORAWAN_PAYLOAD_LENGTH,
};

use crate::hal::ModemHal;
use std::sync::Arc;

/// Called by the modem library when events are waiting in its queue.
pub type EventNotifier = Arc<dyn Fn() + Send + Sync>;

/// Public API of the modem library.
///
/// Every method maps one-to-one onto a `smtc_modem_*` call. The library is
/// single-threaded: callers must not drive it from two contexts at once.
pub trait ModemStack: Send {
    /// Initialize the library with its HAL and event notifier.
    fn init(&mut self, hal: Arc<dyn ModemHal>, on_event: EventNotifier);

    /// Run the engine. Returns the number of milliseconds after which it must
    /// be called again at the latest.
    fn run_engine(&mut self) -> u32;

    /// Pop the next event. Returns the event and the number still pending.
    fn get_event(&mut self) -> Result<(ModemEvent, u8), ModemError>;

    /// Copy the last downlink payload into `payload`.
    fn get_downlink_data(&mut self, payload: &mut [u8]) -> Result<DownlinkInfo, ModemError>;

    fn get_modem_version(&mut self) -> Result<ModemVersion, ModemError>;

    fn get_chip_eui(&mut self, stack_id: u8) -> Result<Eui, ModemError>;

    fn set_deveui(&mut self, stack_id: u8, dev_eui: &Eui) -> Result<(), ModemError>;

    fn set_joineui(&mut self, stack_id: u8, join_eui: &Eui) -> Result<(), ModemError>;

    fn set_nwkkey(&mut self, stack_id: u8, key: &Key) -> Result<(), ModemError>;

    fn set_class(&mut self, stack_id: u8, class: DeviceClass) -> Result<(), ModemError>;

    fn set_region(&mut self, stack_id: u8, region: Region) -> Result<(), ModemError>;

    fn join_network(&mut self, stack_id: u8) -> Result<(), ModemError>;

    /// GPS time in seconds from the last ALC sync.
    fn get_alcsync_time(&mut self, stack_id: u8) -> Result<u32, ModemError>;

    fn alarm_start_timer(&mut self, seconds: u32) -> Result<(), ModemError>;

    fn adr_set_profile(&mut self, stack_id: u8, profile: AdrProfile) -> Result<(), ModemError>;

    /// Accumulated radio charge in mAh.
    fn get_charge(&mut self) -> Result<u32, ModemError>;

    /// Negative value: milliseconds until duty cycle allows the next uplink.
    fn get_duty_cycle_status(&mut self) -> Result<i32, ModemError>;

    fn get_next_tx_max_payload(&mut self, stack_id: u8) -> Result<u8, ModemError>;

    fn request_uplink(
        &mut self,
        stack_id: u8,
        fport: u8,
        confirmed: bool,
        payload: &[u8],
    ) -> Result<(), ModemError>;

    fn request_empty_uplink(
        &mut self,
        stack_id: u8,
        send_fport: bool,
        fport: u8,
        confirmed: bool,
    ) -> Result<(), ModemError>;

    fn class_b_set_ping_slot_periodicity(
        &mut self,
        stack_id: u8,
        periodicity: PingSlotPeriodicity,
    ) -> Result<(), ModemError>;

    fn class_b_request_ping_slot_info(&mut self, stack_id: u8) -> Result<(), ModemError>;

    fn time_set_sync_interval_s(&mut self, seconds: u32) -> Result<(), ModemError>;

    fn time_start_sync_service(
        &mut self,
        stack_id: u8,
        service: TimeSyncService,
    ) -> Result<(), ModemError>;
}
