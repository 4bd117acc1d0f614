//! Binding to the vendor LoRa Basics Modem static library.
//!
//! Three directions:
//!
//! - [`LbmModem`] implements [`ModemStack`] by calling the library's
//!   `smtc_modem_*` API.
//! - The `smtc_modem_hal_*` functions the library links against are
//!   exported here and routed to the HAL context installed by
//!   [`ModemStack::init`].
//! - The `geolocation_bsp_*` board hooks are routed to the BSP installed
//!   with [`install_geolocation`].
//!
//! The library has a single global instance and plain C callbacks without
//! user data, so the installed HAL and event notifier live in one
//! process-wide slot.
//!
//! Layouts mirror `smtc_modem_api.h` / `smtc_modem_hal.h` of LoRa Basics
//! Modem v4.

use crate::geolocation::{GeolocationBsp, GnssPowerConsumption};
use crate::hal::{ContextId, HalCallback, ModemHal, CRASH_LOG_SIZE};
use crate::modem::{
    AdrProfile, ClassBStatus, DeviceClass, DownlinkInfo, DownlinkMetadata, DownlinkWindow, Eui,
    EventNotifier, Key, LinkCheckStatus, ModemError, ModemEvent, ModemStack, ModemVersion,
    MuteStatus, PingSlotPeriodicity, PingSlotStatus, Region, TimeSyncService, TimeSyncStatus,
    TxDoneStatus, UploadDoneStatus,
};
use libc::{c_char, c_int, c_void};
use log::{error, warn};
use std::ffi::CStr;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Modem library API
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy)]
struct RawReset {
    count: u16,
}

#[repr(C)]
#[derive(Clone, Copy)]
union RawEventData {
    reset: RawReset,
    status: c_int,
    opcode: c_int,
    raw: [u32; 4],
}

#[repr(C)]
struct RawEvent {
    event_type: c_int,
    missed_events: u8,
    event_data: RawEventData,
}

#[repr(C)]
struct RawDownlinkMetadata {
    stack_id: u8,
    timestamp: u32,
    window: c_int,
    fport: u8,
    rssi: i16,
    snr: i8,
    frequency_hz: u32,
    datarate: u8,
    fpending: bool,
}

#[repr(C)]
struct RawVersion {
    major: u8,
    minor: u8,
    patch: u8,
}

type ModemCallback = unsafe extern "C" fn();
type ContextCallback = unsafe extern "C" fn(*mut c_void);

extern "C" {
    fn smtc_modem_init(callback: Option<ModemCallback>);
    fn smtc_modem_run_engine() -> u32;
    fn smtc_modem_get_event(event: *mut RawEvent, pending: *mut u8) -> c_int;
    fn smtc_modem_get_downlink_data(
        buff: *mut u8,
        length: *mut u8,
        metadata: *mut RawDownlinkMetadata,
        remaining: *mut u8,
    ) -> c_int;
    fn smtc_modem_get_modem_version(version: *mut RawVersion) -> c_int;
    fn smtc_modem_get_chip_eui(stack_id: u8, chip_eui: *mut u8) -> c_int;
    fn smtc_modem_set_deveui(stack_id: u8, dev_eui: *const u8) -> c_int;
    fn smtc_modem_set_joineui(stack_id: u8, join_eui: *const u8) -> c_int;
    fn smtc_modem_set_nwkkey(stack_id: u8, nwk_key: *const u8) -> c_int;
    fn smtc_modem_set_class(stack_id: u8, class: c_int) -> c_int;
    fn smtc_modem_set_region(stack_id: u8, region: c_int) -> c_int;
    fn smtc_modem_join_network(stack_id: u8) -> c_int;
    fn smtc_modem_get_alcsync_time(stack_id: u8, gps_time_s: *mut u32) -> c_int;
    fn smtc_modem_alarm_start_timer(alarm_timer_in_s: u32) -> c_int;
    fn smtc_modem_adr_set_profile(stack_id: u8, profile: c_int, custom: *const u8) -> c_int;
    fn smtc_modem_get_charge(charge_mah: *mut u32) -> c_int;
    fn smtc_modem_get_duty_cycle_status(duty_cycle_status_ms: *mut i32) -> c_int;
    fn smtc_modem_get_next_tx_max_payload(stack_id: u8, tx_max_payload: *mut u8) -> c_int;
    fn smtc_modem_request_uplink(
        stack_id: u8,
        fport: u8,
        confirmed: bool,
        payload: *const u8,
        payload_length: u8,
    ) -> c_int;
    fn smtc_modem_request_empty_uplink(
        stack_id: u8,
        send_fport: bool,
        fport: u8,
        confirmed: bool,
    ) -> c_int;
    fn smtc_modem_class_b_set_ping_slot_periodicity(stack_id: u8, periodicity: c_int) -> c_int;
    fn smtc_modem_lorawan_class_b_request_ping_slot_info(stack_id: u8) -> c_int;
    fn smtc_modem_time_set_sync_interval_s(sync_interval_s: u32) -> c_int;
    fn smtc_modem_time_start_sync_service(stack_id: u8, sync_service: c_int) -> c_int;
}

fn rc(code: c_int) -> Result<(), ModemError> {
    ModemError::check(code as u8)
}

const EVENT_RESET: c_int = 0x00;
const EVENT_ALARM: c_int = 0x01;
const EVENT_JOINED: c_int = 0x02;
const EVENT_TXDONE: c_int = 0x03;
const EVENT_DOWNDATA: c_int = 0x04;
const EVENT_UPLOADDONE: c_int = 0x05;
const EVENT_SETCONF: c_int = 0x06;
const EVENT_MUTE: c_int = 0x07;
const EVENT_STREAMDONE: c_int = 0x08;
const EVENT_JOINFAIL: c_int = 0x0A;
const EVENT_TIME: c_int = 0x0D;
const EVENT_LINK_CHECK: c_int = 0x10;
const EVENT_CLASS_B_PING_SLOT_INFO: c_int = 0x13;
const EVENT_CLASS_B_STATUS: c_int = 0x14;

fn decode_event(event: &RawEvent) -> ModemEvent {
    // SAFETY: every union member is plain data; the event type selects the
    // member the library wrote.
    unsafe {
        let data = event.event_data;
        let status = data.status as u8;
        match event.event_type {
            EVENT_RESET => ModemEvent::Reset {
                count: data.reset.count,
            },
            EVENT_ALARM => ModemEvent::Alarm,
            EVENT_JOINED => ModemEvent::Joined,
            EVENT_TXDONE => ModemEvent::TxDone {
                status: TxDoneStatus::from_raw(status),
            },
            EVENT_DOWNDATA => ModemEvent::DownData,
            EVENT_UPLOADDONE => ModemEvent::UploadDone {
                status: UploadDoneStatus::from_raw(status),
            },
            EVENT_SETCONF => ModemEvent::SetConf {
                opcode: data.opcode as u8,
            },
            EVENT_MUTE => ModemEvent::Mute {
                status: MuteStatus::from_raw(status),
            },
            EVENT_STREAMDONE => ModemEvent::StreamDone,
            EVENT_JOINFAIL => ModemEvent::JoinFail,
            EVENT_TIME => ModemEvent::TimeSync {
                status: TimeSyncStatus::from_raw(status),
            },
            EVENT_LINK_CHECK => ModemEvent::LinkCheck {
                status: LinkCheckStatus::from_raw(status),
            },
            EVENT_CLASS_B_PING_SLOT_INFO => ModemEvent::ClassBPingSlotInfo {
                status: PingSlotStatus::from_raw(status),
            },
            EVENT_CLASS_B_STATUS => ModemEvent::ClassBStatus {
                status: ClassBStatus::from_raw(status),
            },
            other => ModemEvent::Unknown {
                event_type: other as u8,
            },
        }
    }
}

/// The linked LoRa Basics Modem library.
///
/// Only one instance may be initialized per process.
#[derive(Debug, Default)]
pub struct LbmModem {
    _private: (),
}

impl LbmModem {
    pub fn new() -> Self {
        Self::default()
    }
}

unsafe extern "C" fn on_modem_event() {
    if let Some(notifier) = installed_notifier() {
        notifier();
    }
}

impl ModemStack for LbmModem {
    fn init(&mut self, hal: Arc<dyn ModemHal>, on_event: EventNotifier) {
        install(hal, on_event);
        // SAFETY: the callback is a plain function with static lifetime.
        unsafe { smtc_modem_init(Some(on_modem_event)) }
    }

    fn run_engine(&mut self) -> u32 {
        unsafe { smtc_modem_run_engine() }
    }

    fn get_event(&mut self) -> Result<(ModemEvent, u8), ModemError> {
        let mut event = RawEvent {
            event_type: 0,
            missed_events: 0,
            event_data: RawEventData { raw: [0; 4] },
        };
        let mut pending = 0u8;
        rc(unsafe { smtc_modem_get_event(&mut event, &mut pending) })?;
        if event.missed_events > 0 {
            warn!("Modem dropped {} events", event.missed_events);
        }
        Ok((decode_event(&event), pending))
    }

    fn get_downlink_data(&mut self, payload: &mut [u8]) -> Result<DownlinkInfo, ModemError> {
        // The library writes up to the maximum LoRaWAN payload.
        if payload.len() < crate::modem::MAX_LORAWAN_PAYLOAD_LENGTH {
            return Err(ModemError::Invalid);
        }
        let mut length = 0u8;
        let mut remaining = 0u8;
        let mut raw = RawDownlinkMetadata {
            stack_id: 0,
            timestamp: 0,
            window: 0,
            fport: 0,
            rssi: 0,
            snr: 0,
            frequency_hz: 0,
            datarate: 0,
            fpending: false,
        };
        rc(unsafe {
            smtc_modem_get_downlink_data(payload.as_mut_ptr(), &mut length, &mut raw, &mut remaining)
        })?;
        Ok(DownlinkInfo {
            size: length,
            metadata: DownlinkMetadata {
                stack_id: raw.stack_id,
                window: DownlinkWindow::from_raw(raw.window as u8),
                fport: raw.fport,
                rssi: raw.rssi,
                snr: raw.snr,
                frequency_hz: raw.frequency_hz,
                datarate: raw.datarate,
                fpending: raw.fpending,
            },
            remaining,
        })
    }

    fn get_modem_version(&mut self) -> Result<ModemVersion, ModemError> {
        let mut raw = RawVersion {
            major: 0,
            minor: 0,
            patch: 0,
        };
        rc(unsafe { smtc_modem_get_modem_version(&mut raw) })?;
        Ok(ModemVersion {
            major: raw.major,
            minor: raw.minor,
            patch: raw.patch,
        })
    }

    fn get_chip_eui(&mut self, stack_id: u8) -> Result<Eui, ModemError> {
        let mut eui = [0u8; 8];
        rc(unsafe { smtc_modem_get_chip_eui(stack_id, eui.as_mut_ptr()) })?;
        Ok(eui)
    }

    fn set_deveui(&mut self, stack_id: u8, dev_eui: &Eui) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_set_deveui(stack_id, dev_eui.as_ptr()) })
    }

    fn set_joineui(&mut self, stack_id: u8, join_eui: &Eui) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_set_joineui(stack_id, join_eui.as_ptr()) })
    }

    fn set_nwkkey(&mut self, stack_id: u8, key: &Key) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_set_nwkkey(stack_id, key.as_ptr()) })
    }

    fn set_class(&mut self, stack_id: u8, class: DeviceClass) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_set_class(stack_id, class.raw() as c_int) })
    }

    fn set_region(&mut self, stack_id: u8, region: Region) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_set_region(stack_id, region.raw() as c_int) })
    }

    fn join_network(&mut self, stack_id: u8) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_join_network(stack_id) })
    }

    fn get_alcsync_time(&mut self, stack_id: u8) -> Result<u32, ModemError> {
        let mut gps_time_s = 0u32;
        rc(unsafe { smtc_modem_get_alcsync_time(stack_id, &mut gps_time_s) })?;
        Ok(gps_time_s)
    }

    fn alarm_start_timer(&mut self, seconds: u32) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_alarm_start_timer(seconds) })
    }

    fn adr_set_profile(&mut self, stack_id: u8, profile: AdrProfile) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_adr_set_profile(stack_id, profile.raw() as c_int, std::ptr::null()) })
    }

    fn get_charge(&mut self) -> Result<u32, ModemError> {
        let mut charge = 0u32;
        rc(unsafe { smtc_modem_get_charge(&mut charge) })?;
        Ok(charge)
    }

    fn get_duty_cycle_status(&mut self) -> Result<i32, ModemError> {
        let mut status = 0i32;
        rc(unsafe { smtc_modem_get_duty_cycle_status(&mut status) })?;
        Ok(status)
    }

    fn get_next_tx_max_payload(&mut self, stack_id: u8) -> Result<u8, ModemError> {
        let mut max = 0u8;
        rc(unsafe { smtc_modem_get_next_tx_max_payload(stack_id, &mut max) })?;
        Ok(max)
    }

    fn request_uplink(
        &mut self,
        stack_id: u8,
        fport: u8,
        confirmed: bool,
        payload: &[u8],
    ) -> Result<(), ModemError> {
        let length = u8::try_from(payload.len()).map_err(|_| ModemError::Invalid)?;
        rc(unsafe { smtc_modem_request_uplink(stack_id, fport, confirmed, payload.as_ptr(), length) })
    }

    fn request_empty_uplink(
        &mut self,
        stack_id: u8,
        send_fport: bool,
        fport: u8,
        confirmed: bool,
    ) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_request_empty_uplink(stack_id, send_fport, fport, confirmed) })
    }

    fn class_b_set_ping_slot_periodicity(
        &mut self,
        stack_id: u8,
        periodicity: PingSlotPeriodicity,
    ) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_class_b_set_ping_slot_periodicity(stack_id, periodicity.raw() as c_int) })
    }

    fn class_b_request_ping_slot_info(&mut self, stack_id: u8) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_lorawan_class_b_request_ping_slot_info(stack_id) })
    }

    fn time_set_sync_interval_s(&mut self, seconds: u32) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_time_set_sync_interval_s(seconds) })
    }

    fn time_start_sync_service(
        &mut self,
        stack_id: u8,
        service: TimeSyncService,
    ) -> Result<(), ModemError> {
        rc(unsafe { smtc_modem_time_start_sync_service(stack_id, service.raw() as c_int) })
    }
}

// ---------------------------------------------------------------------------
// HAL exports
// ---------------------------------------------------------------------------

struct Installation {
    hal: Arc<dyn ModemHal>,
    notifier: EventNotifier,
}

static INSTALLED: Mutex<Option<Installation>> = Mutex::new(None);

fn install(hal: Arc<dyn ModemHal>, notifier: EventNotifier) {
    let mut slot = INSTALLED.lock().unwrap_or_else(|p| p.into_inner());
    if slot.is_some() {
        warn!("Replacing installed modem HAL");
    }
    *slot = Some(Installation { hal, notifier });
}

fn installed_hal() -> Option<Arc<dyn ModemHal>> {
    let slot = INSTALLED.lock().unwrap_or_else(|p| p.into_inner());
    let hal = slot.as_ref().map(|i| i.hal.clone());
    if hal.is_none() {
        error!("Modem HAL called before installation");
    }
    hal
}

fn installed_notifier() -> Option<EventNotifier> {
    let slot = INSTALLED.lock().unwrap_or_else(|p| p.into_inner());
    slot.as_ref().map(|i| i.notifier.clone())
}

/// C callback plus its context pointer.
struct ContextCall {
    func: ContextCallback,
    context: *mut c_void,
}

// SAFETY: the modem library registers static functions with contexts that
// stay valid for the library's lifetime, and it expects the call from a
// different context than the one that registered it.
unsafe impl Send for ContextCall {}

impl ContextCall {
    fn call(&self) {
        unsafe { (self.func)(self.context) }
    }

    fn into_hal_callback(self) -> HalCallback {
        Box::new(move || self.call())
    }
}

fn wrap(func: Option<ContextCallback>, context: *mut c_void) -> Option<HalCallback> {
    let func = func?;
    Some(ContextCall { func, context }.into_hal_callback())
}

/// Lossy conversion of a C string for logging.
unsafe fn c_text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_reset_mcu() {
    match installed_hal() {
        Some(hal) => hal.reset_mcu(),
        None => std::process::abort(),
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_reload_wdog() {
    if let Some(hal) = installed_hal() {
        hal.reload_wdog();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_time_in_s() -> u32 {
    installed_hal().map_or(0, |hal| hal.get_time_in_s())
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_time_in_ms() -> u32 {
    installed_hal().map_or(0, |hal| hal.get_time_in_ms())
}

#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_start_timer(
    milliseconds: u32,
    callback: Option<ContextCallback>,
    context: *mut c_void,
) {
    let (Some(hal), Some(callback)) = (installed_hal(), wrap(callback, context)) else {
        return;
    };
    hal.start_timer(milliseconds, callback);
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_stop_timer() {
    if let Some(hal) = installed_hal() {
        hal.stop_timer();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_disable_modem_irq() {
    if let Some(hal) = installed_hal() {
        hal.disable_modem_irq();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_enable_modem_irq() {
    if let Some(hal) = installed_hal() {
        hal.enable_modem_irq();
    }
}

#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_context_restore(
    ctx_type: c_int,
    offset: u32,
    buffer: *mut u8,
    size: u32,
) {
    let Some(hal) = installed_hal() else { return };
    if buffer.is_null() {
        return;
    }
    let buffer = std::slice::from_raw_parts_mut(buffer, size as usize);
    hal.context_restore(ContextId(ctx_type as u8), offset, buffer);
}

#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_context_store(
    ctx_type: c_int,
    offset: u32,
    buffer: *const u8,
    size: u32,
) {
    let Some(hal) = installed_hal() else { return };
    if buffer.is_null() {
        return;
    }
    let buffer = std::slice::from_raw_parts(buffer, size as usize);
    hal.context_store(ContextId(ctx_type as u8), offset, buffer);
}

#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_crashlog_store(crashlog: *const u8, length: u8) {
    let Some(hal) = installed_hal() else { return };
    if crashlog.is_null() {
        return;
    }
    hal.crashlog_store(std::slice::from_raw_parts(crashlog, length as usize));
}

/// `crashlog` must hold `CRASH_LOG_SIZE` bytes. `length` is output only.
#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_crashlog_restore(crashlog: *mut u8, length: *mut u8) {
    if crashlog.is_null() || length.is_null() {
        return;
    }
    *length = 0;
    let Some(hal) = installed_hal() else { return };
    let buffer = std::slice::from_raw_parts_mut(crashlog, CRASH_LOG_SIZE);
    *length = hal.crashlog_restore(buffer) as u8;
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_crashlog_set_status(available: bool) {
    if let Some(hal) = installed_hal() {
        hal.crashlog_set_status(available);
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_crashlog_get_status() -> bool {
    installed_hal().is_some_and(|hal| hal.crashlog_get_status())
}

/// Declared variadic in C. The format arguments are not expanded; the
/// format string is stored as the message.
#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_on_panic(func: *const c_char, line: u32, fmt: *const c_char) {
    let func = c_text(func);
    let message = c_text(fmt);
    match installed_hal() {
        Some(hal) => hal.on_panic(&func, line, format_args!("{}", message)),
        None => std::process::abort(),
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_random_nb() -> u32 {
    installed_hal().map_or(0, |hal| hal.get_random_nb())
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_random_nb_in_range(val_1: u32, val_2: u32) -> u32 {
    installed_hal().map_or(val_1.min(val_2), |hal| hal.get_random_nb_in_range(val_1, val_2))
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_signed_random_nb_in_range(val_1: i32, val_2: i32) -> i32 {
    installed_hal().map_or(val_1.min(val_2), |hal| {
        hal.get_signed_random_nb_in_range(val_1, val_2)
    })
}

#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_irq_config_radio_irq(
    callback: Option<ContextCallback>,
    context: *mut c_void,
) {
    let (Some(hal), Some(callback)) = (installed_hal(), wrap(callback, context)) else {
        return;
    };
    hal.irq_config_radio_irq(callback);
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_irq_reset_radio_irq() {
    if let Some(hal) = installed_hal() {
        hal.irq_reset_radio_irq();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_radio_irq_clear_pending() {
    if let Some(hal) = installed_hal() {
        hal.radio_irq_clear_pending();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_start_radio_tcxo() {
    if let Some(hal) = installed_hal() {
        hal.start_radio_tcxo();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_stop_radio_tcxo() {
    if let Some(hal) = installed_hal() {
        hal.stop_radio_tcxo();
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_radio_tcxo_startup_delay_ms() -> u32 {
    installed_hal().map_or(0, |hal| hal.get_radio_tcxo_startup_delay_ms())
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_set_ant_switch(is_tx_on: bool) {
    if let Some(hal) = installed_hal() {
        hal.set_ant_switch(is_tx_on);
    }
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_battery_level() -> u8 {
    installed_hal().map_or(crate::hal::sensors::BATTERY_UNKNOWN, |hal| hal.get_battery_level())
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_temperature() -> i8 {
    installed_hal().map_or(crate::hal::sensors::TEMPERATURE_UNKNOWN, |hal| {
        hal.get_temperature()
    })
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_voltage() -> u8 {
    installed_hal().map_or(crate::hal::sensors::VOLTAGE_UNKNOWN, |hal| hal.get_voltage())
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_get_board_delay_ms() -> i8 {
    installed_hal().map_or(1, |hal| hal.get_board_delay_ms())
}

#[no_mangle]
pub extern "C" fn smtc_modem_hal_user_lbm_irq() {
    if let Some(hal) = installed_hal() {
        hal.user_lbm_irq();
    }
}

/// Declared variadic in C; only the format string is printed.
#[no_mangle]
pub unsafe extern "C" fn smtc_modem_hal_print_trace(fmt: *const c_char) {
    let text = c_text(fmt);
    if let Some(hal) = installed_hal() {
        hal.print_trace(&text);
    }
}

// ---------------------------------------------------------------------------
// Geolocation BSP exports
// ---------------------------------------------------------------------------

/// `lr11xx_gnss_instantaneous_power_consumption_ua_t`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawGnssConsumption {
    pub board_voltage_mv: u16,
    pub init_ua: u16,
    pub phase1_gps_capture_ua: u16,
    pub phase1_gps_process_ua: u16,
    pub multiscan_gps_capture_ua: u16,
    pub multiscan_gps_process_ua: u16,
    pub phase1_beidou_capture_ua: u16,
    pub phase1_beidou_process_ua: u16,
    pub multiscan_beidou_capture_ua: u16,
    pub multiscan_beidou_process_ua: u16,
    pub sleep_32k_ua: u16,
    pub demod_sleep_32m_ua: u16,
}

impl From<GnssPowerConsumption> for RawGnssConsumption {
    fn from(c: GnssPowerConsumption) -> Self {
        Self {
            board_voltage_mv: c.board_voltage_mv,
            init_ua: c.init_ua,
            phase1_gps_capture_ua: c.phase1_gps_capture_ua,
            phase1_gps_process_ua: c.phase1_gps_process_ua,
            multiscan_gps_capture_ua: c.multiscan_gps_capture_ua,
            multiscan_gps_process_ua: c.multiscan_gps_process_ua,
            phase1_beidou_capture_ua: c.phase1_beidou_capture_ua,
            phase1_beidou_process_ua: c.phase1_beidou_process_ua,
            multiscan_beidou_capture_ua: c.multiscan_beidou_capture_ua,
            multiscan_beidou_process_ua: c.multiscan_beidou_process_ua,
            sleep_32k_ua: c.sleep_32k_ua,
            demod_sleep_32m_ua: c.demod_sleep_32m_ua,
        }
    }
}

static GEOLOCATION: Mutex<Option<Arc<GeolocationBsp>>> = Mutex::new(None);

/// Route the `geolocation_bsp_*` hooks to `bsp`.
pub fn install_geolocation(bsp: GeolocationBsp) {
    let mut slot = GEOLOCATION.lock().unwrap_or_else(|p| p.into_inner());
    if slot.is_some() {
        warn!("Replacing installed geolocation BSP");
    }
    *slot = Some(Arc::new(bsp));
}

fn installed_geolocation() -> Option<Arc<GeolocationBsp>> {
    let slot = GEOLOCATION.lock().unwrap_or_else(|p| p.into_inner());
    let bsp = slot.clone();
    if bsp.is_none() {
        warn!("Geolocation BSP called before installation");
    }
    bsp
}

#[no_mangle]
pub extern "C" fn geolocation_bsp_gnss_prescan_actions() {
    if let Some(bsp) = installed_geolocation() {
        bsp.gnss_prescan_actions();
    }
}

#[no_mangle]
pub extern "C" fn geolocation_bsp_gnss_postscan_actions() {
    if let Some(bsp) = installed_geolocation() {
        bsp.gnss_postscan_actions();
    }
}

#[no_mangle]
pub extern "C" fn geolocation_bsp_wifi_prescan_actions() {
    if let Some(bsp) = installed_geolocation() {
        bsp.wifi_prescan_actions();
    }
}

#[no_mangle]
pub extern "C" fn geolocation_bsp_wifi_postscan_actions() {
    if let Some(bsp) = installed_geolocation() {
        bsp.wifi_postscan_actions();
    }
}

#[no_mangle]
pub extern "C" fn geolocation_bsp_get_lr11xx_lf_clock_cfg() -> c_int {
    let lf_clock = installed_geolocation()
        .map(|bsp| bsp.lf_clock_config())
        .unwrap_or_default();
    lf_clock.raw() as c_int
}

/// The radio context is ignored: the board has a single LR11xx.
#[no_mangle]
pub unsafe extern "C" fn geolocation_bsp_get_lr11xx_reg_mode(
    _context: *const c_void,
    reg_mode: *mut c_int,
) {
    if reg_mode.is_null() {
        return;
    }
    let mode = installed_geolocation()
        .map(|bsp| bsp.reg_mode())
        .unwrap_or_default();
    *reg_mode = mode.raw() as c_int;
}

#[no_mangle]
pub unsafe extern "C" fn geolocation_bsp_gnss_get_consumption(
    consumption: *mut RawGnssConsumption,
) {
    if consumption.is_null() {
        return;
    }
    let table = installed_geolocation()
        .map(|bsp| bsp.gnss_consumption())
        .unwrap_or(GnssPowerConsumption::EVK_DCDC);
    *consumption = table.into();
}
