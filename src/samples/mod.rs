//! Sample applications driving the modem through its public API.
//!
//! Each sample is an [`EventCallbacks`](crate::app::EventCallbacks)
//! implementation; the binaries under `src/bin` wire one into a
//! [`ModemApp`](crate::app::ModemApp).

pub mod class_b;
pub mod periodic_uplink;
pub mod time_sync;

pub use class_b::ClassBSample;
pub use periodic_uplink::PeriodicUplink;
pub use time_sync::TimeSyncSample;

use crate::app::{self, Downlink, LorawanConfig, STACK_ID};
use crate::modem::ModemStack;
use log::{error, info};

/// Time sync interval requested by the samples.
pub const TIME_SYNC_INTERVAL_S: u32 = 900;

/// Configure credentials after a modem reset and start joining.
pub(crate) fn configure_and_join(modem: &mut dyn ModemStack, config: &LorawanConfig) {
    if app::configure_lorawan_params(modem, STACK_ID, config).is_err() {
        // Already logged with the failing call
        return;
    }
    if let Err(e) = modem.join_network(STACK_ID) {
        error!("smtc_modem_join_network, err: {}", e);
    }
}

/// Log a received downlink.
pub(crate) fn log_downlink(downlink: &Downlink<'_>) {
    info!("EVENT: DOWNDATA");
    info!("RSSI: {}", downlink.metadata.rssi_dbm());
    info!("SNR: {}", downlink.metadata.snr_db());
    info!(
        "RX window: {} ({})",
        downlink.metadata.window.as_str(),
        downlink.metadata.window.raw()
    );
    info!("PORT: {}", downlink.metadata.fport);
    info!("Payload len: {}", downlink.payload.len());
    info!("Payload buffer: {}", app::config::to_hex(downlink.payload));
}
