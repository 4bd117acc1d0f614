//! Typed event callbacks fanned out from the event drain.

use crate::modem::{
    ClassBStatus, DownlinkMetadata, LinkCheckStatus, ModemStack, MuteStatus, PingSlotStatus,
    TimeSyncStatus, TxDoneStatus, UploadDoneStatus,
};

/// A received downlink, borrowed from the staging buffer.
///
/// Only valid for the duration of [`EventCallbacks::down_data`]; copy the
/// payload out if it is needed later.
#[derive(Debug, Clone, Copy)]
pub struct Downlink<'a> {
    pub metadata: DownlinkMetadata,
    pub payload: &'a [u8],
    /// Downlinks still held by the modem.
    pub remaining: u8,
}

/// Application handlers for modem events.
///
/// Every handler defaults to doing nothing. Handlers receive the modem so
/// they can issue follow-up requests; they run on the main task, between
/// engine runs.
#[allow(unused_variables)]
pub trait EventCallbacks: Send {
    /// The modem has (re)started. Configure credentials and join here.
    fn reset(&mut self, modem: &mut dyn ModemStack, count: u16) {}

    fn alarm(&mut self, modem: &mut dyn ModemStack) {}

    fn joined(&mut self, modem: &mut dyn ModemStack) {}

    fn join_fail(&mut self, modem: &mut dyn ModemStack) {}

    fn tx_done(&mut self, modem: &mut dyn ModemStack, status: TxDoneStatus) {}

    fn down_data(&mut self, modem: &mut dyn ModemStack, downlink: Downlink<'_>) {}

    fn upload_done(&mut self, modem: &mut dyn ModemStack, status: UploadDoneStatus) {}

    fn set_conf(&mut self, modem: &mut dyn ModemStack, opcode: u8) {}

    fn mute(&mut self, modem: &mut dyn ModemStack, status: MuteStatus) {}

    fn stream_done(&mut self, modem: &mut dyn ModemStack) {}

    fn time_sync(&mut self, modem: &mut dyn ModemStack, status: TimeSyncStatus) {}

    fn link_check(&mut self, modem: &mut dyn ModemStack, status: LinkCheckStatus) {}

    fn class_b_ping_slot_info(&mut self, modem: &mut dyn ModemStack, status: PingSlotStatus) {}

    fn class_b_status(&mut self, modem: &mut dyn ModemStack, status: ClassBStatus) {}
}
