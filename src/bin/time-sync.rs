//! Time sync sample.
//!
//! Joins the network and keeps the modem clock synchronized, logging UTC
//! time on every valid sync.
//!
//! # Usage
//!
//! ```bash
//! LBM_LIB_DIR=/path/to/lbm/build cargo run --bin time-sync --features lbm
//! ```
//!
//! Credentials are read from `~/.lora-modem-hal/lorawan.json` (or the file
//! named by `LORA_MODEM_CONFIG`); the built-in sample credentials are used
//! when no file exists.

#[cfg(feature = "lbm")]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    use log::{error, info};
    use lora_modem_hal::app::{self, LorawanConfig, ModemApp};
    use lora_modem_hal::ffi::{self, LbmModem};
    use lora_modem_hal::hal::{FileSettings, SettingsStorage};
    use lora_modem_hal::host::{HostPlatform, DEFAULT_TCXO_STARTUP_DELAY_MS};
    use lora_modem_hal::samples::TimeSyncSample;
    use tokio_util::sync::CancellationToken;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== Time sync sample starting ===");

    let config = match LorawanConfig::load_or_sample() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid LoRaWAN configuration: {}", e);
            std::process::exit(1);
        }
    };

    let settings = match FileSettings::open_default() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open settings directory: {}", e);
            std::process::exit(1);
        }
    };
    info!("Settings stored in {}", settings.root().display());

    let host = match HostPlatform::new(DEFAULT_TCXO_STARTUP_DELAY_MS) {
        Ok(h) => h,
        Err(e) => {
            error!("Failed to start host platform: {}", e);
            std::process::exit(1);
        }
    };
    ffi::install_geolocation(host.geolocation);

    let mut modem_app = ModemApp::init(
        LbmModem::new(),
        host.platform,
        SettingsStorage::new(settings),
        Some(Box::new(TimeSyncSample::new(config))),
        None,
    );
    app::display_versions(modem_app.modem());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down");
            shutdown.cancel();
        }
    });

    modem_app.run(cancel).await;
    host.work_queue.shutdown();
    info!("Stopped");
}

#[cfg(not(feature = "lbm"))]
fn main() {
    eprintln!("This binary needs the modem library.");
    eprintln!("Build with: LBM_LIB_DIR=<dir> cargo build --bin time-sync --features lbm");
}
