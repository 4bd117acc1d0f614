//! LoRa Basics Modem host adapter.
//!
//! The modem library needs a small hardware abstraction from its host
//! (time, timers, interrupts, persistence, randomness, panics) and an
//! application that drains its event queue. This crate provides both:
//!
//! - [`hal`]: the HAL contract and its implementation over platform traits
//! - [`app`]: event dispatch, downlink staging and credential setup
//! - [`runner`]: the async main loop
//! - [`host`]: platform services for running on a desktop OS
//! - [`geolocation`]: LR11xx board configuration for GNSS and Wi-Fi scans
//! - [`samples`]: periodic uplink, class B and time sync applications
//!
//! With the `lbm` feature the crate links the vendor library and exports
//! the C HAL table it expects.

pub mod app;
#[cfg(feature = "lbm")]
pub mod ffi;
pub mod geolocation;
pub mod hal;
pub mod host;
pub mod modem;
pub mod runner;
pub mod samples;

pub use app::{EventCallbacks, LorawanConfig, ModemApp};
pub use hal::{HalContext, ModemHal, Platform};
pub use modem::{ModemError, ModemEvent, ModemStack};
pub use runner::WakeSignal;
