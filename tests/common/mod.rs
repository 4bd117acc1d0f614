//! Shared test doubles: a scripted modem library and an in-process
//! platform.

#![allow(dead_code)]

use lora_modem_hal::hal::{
    Clock, IrqHandler, Job, MemorySettings, ModemHal, OneShotTimer, Platform, RadioBoard,
    SettingsStorage, SystemControl, WorkQueue,
};
use lora_modem_hal::modem::{
    AdrProfile, DeviceClass, DownlinkInfo, DownlinkMetadata, Eui, EventNotifier, Key, ModemError,
    ModemEvent, ModemStack, ModemVersion, PingSlotPeriodicity, Region, TimeSyncService,
};
use lora_modem_hal::WakeSignal;
use rand_core::OsRng;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Uplink recorded by [`ScriptedModem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uplink {
    pub fport: u8,
    pub confirmed: bool,
    pub payload: Vec<u8>,
}

/// Modem library double.
///
/// Events queued with [`queue`](Self::queue) are returned by `get_event`
/// in order. Events staged with [`on_next_engine_run`](Self::on_next_engine_run)
/// are queued and announced through the notifier the next time the engine
/// runs, the way the real library reports them.
pub struct ScriptedModem {
    /// Names of every API call, in order.
    pub calls: Vec<&'static str>,
    pub events: VecDeque<ModemEvent>,
    pub staged: Vec<ModemEvent>,
    /// Calls that fail with the given error.
    pub failures: HashMap<&'static str, ModemError>,
    pub downlink: Vec<u8>,
    pub downlink_metadata: DownlinkMetadata,
    pub downlink_remaining: u8,
    pub sleep_ms: u32,
    pub engine_runs: u32,
    pub chip_eui: Eui,
    pub dev_eui: Option<Eui>,
    pub join_eui: Option<Eui>,
    pub nwk_key: Option<Key>,
    pub class: Option<DeviceClass>,
    pub duty_cycle_ms: i32,
    pub max_payload: u8,
    pub charge_mah: u32,
    pub gps_time_s: u32,
    pub alarms: Vec<u32>,
    pub uplinks: Vec<Uplink>,
    pub empty_uplinks: u32,
    pub ping_slot_requests: u32,
    pub hal: Option<Arc<dyn ModemHal>>,
    pub notifier: Option<EventNotifier>,
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            events: VecDeque::new(),
            staged: Vec::new(),
            failures: HashMap::new(),
            downlink: Vec::new(),
            downlink_metadata: DownlinkMetadata::default(),
            downlink_remaining: 0,
            sleep_ms: 1_000,
            engine_runs: 0,
            chip_eui: [0x00, 0x16, 0xc0, 0x01, 0xff, 0xfe, 0x00, 0x01],
            dev_eui: None,
            join_eui: None,
            nwk_key: None,
            class: None,
            duty_cycle_ms: 0,
            max_payload: 51,
            charge_mah: 0,
            gps_time_s: 0,
            alarms: Vec::new(),
            uplinks: Vec::new(),
            empty_uplinks: 0,
            ping_slot_requests: 0,
            hal: None,
            notifier: None,
        }
    }

    pub fn queue(&mut self, event: ModemEvent) {
        self.events.push_back(event);
    }

    pub fn on_next_engine_run(&mut self, event: ModemEvent) {
        self.staged.push(event);
    }

    pub fn fail(&mut self, call: &'static str, error: ModemError) {
        self.failures.insert(call, error);
    }

    /// Invoke the event notifier the app registered.
    pub fn notify(&self) {
        if let Some(notifier) = &self.notifier {
            notifier();
        }
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls.iter().any(|c| *c == call)
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    fn record(&mut self, call: &'static str) -> Result<(), ModemError> {
        self.calls.push(call);
        match self.failures.get(call) {
            Some(e) => Err(*e),
            None => Ok(()),
        }
    }
}

impl ModemStack for ScriptedModem {
    fn init(&mut self, hal: Arc<dyn ModemHal>, on_event: EventNotifier) {
        self.calls.push("init");
        self.hal = Some(hal);
        self.notifier = Some(on_event);
    }

    fn run_engine(&mut self) -> u32 {
        self.calls.push("run_engine");
        self.engine_runs += 1;
        if !self.staged.is_empty() {
            let staged = std::mem::take(&mut self.staged);
            self.events.extend(staged);
            self.notify();
        }
        self.sleep_ms
    }

    fn get_event(&mut self) -> Result<(ModemEvent, u8), ModemError> {
        self.record("get_event")?;
        let event = self.events.pop_front().ok_or(ModemError::NoEvent)?;
        Ok((event, self.events.len() as u8))
    }

    fn get_downlink_data(&mut self, payload: &mut [u8]) -> Result<DownlinkInfo, ModemError> {
        self.record("get_downlink_data")?;
        payload[..self.downlink.len()].copy_from_slice(&self.downlink);
        Ok(DownlinkInfo {
            size: self.downlink.len() as u8,
            metadata: self.downlink_metadata,
            remaining: self.downlink_remaining,
        })
    }

    fn get_modem_version(&mut self) -> Result<ModemVersion, ModemError> {
        self.record("get_modem_version")?;
        Ok(ModemVersion {
            major: 4,
            minor: 5,
            patch: 0,
        })
    }

    fn get_chip_eui(&mut self, _stack_id: u8) -> Result<Eui, ModemError> {
        self.record("get_chip_eui")?;
        Ok(self.chip_eui)
    }

    fn set_deveui(&mut self, _stack_id: u8, dev_eui: &Eui) -> Result<(), ModemError> {
        self.record("set_deveui")?;
        self.dev_eui = Some(*dev_eui);
        Ok(())
    }

    fn set_joineui(&mut self, _stack_id: u8, join_eui: &Eui) -> Result<(), ModemError> {
        self.record("set_joineui")?;
        self.join_eui = Some(*join_eui);
        Ok(())
    }

    fn set_nwkkey(&mut self, _stack_id: u8, key: &Key) -> Result<(), ModemError> {
        self.record("set_nwkkey")?;
        self.nwk_key = Some(*key);
        Ok(())
    }

    fn set_class(&mut self, _stack_id: u8, class: DeviceClass) -> Result<(), ModemError> {
        self.record("set_class")?;
        self.class = Some(class);
        Ok(())
    }

    fn set_region(&mut self, _stack_id: u8, _region: Region) -> Result<(), ModemError> {
        self.record("set_region")
    }

    fn join_network(&mut self, _stack_id: u8) -> Result<(), ModemError> {
        self.record("join_network")
    }

    fn get_alcsync_time(&mut self, _stack_id: u8) -> Result<u32, ModemError> {
        self.record("get_alcsync_time")?;
        Ok(self.gps_time_s)
    }

    fn alarm_start_timer(&mut self, seconds: u32) -> Result<(), ModemError> {
        self.record("alarm_start_timer")?;
        self.alarms.push(seconds);
        Ok(())
    }

    fn adr_set_profile(&mut self, _stack_id: u8, _profile: AdrProfile) -> Result<(), ModemError> {
        self.record("adr_set_profile")
    }

    fn get_charge(&mut self) -> Result<u32, ModemError> {
        self.record("get_charge")?;
        Ok(self.charge_mah)
    }

    fn get_duty_cycle_status(&mut self) -> Result<i32, ModemError> {
        self.record("get_duty_cycle_status")?;
        Ok(self.duty_cycle_ms)
    }

    fn get_next_tx_max_payload(&mut self, _stack_id: u8) -> Result<u8, ModemError> {
        self.record("get_next_tx_max_payload")?;
        Ok(self.max_payload)
    }

    fn request_uplink(
        &mut self,
        _stack_id: u8,
        fport: u8,
        confirmed: bool,
        payload: &[u8],
    ) -> Result<(), ModemError> {
        self.record("request_uplink")?;
        self.uplinks.push(Uplink {
            fport,
            confirmed,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn request_empty_uplink(
        &mut self,
        _stack_id: u8,
        _send_fport: bool,
        _fport: u8,
        _confirmed: bool,
    ) -> Result<(), ModemError> {
        self.record("request_empty_uplink")?;
        self.empty_uplinks += 1;
        Ok(())
    }

    fn class_b_set_ping_slot_periodicity(
        &mut self,
        _stack_id: u8,
        _periodicity: PingSlotPeriodicity,
    ) -> Result<(), ModemError> {
        self.record("class_b_set_ping_slot_periodicity")
    }

    fn class_b_request_ping_slot_info(&mut self, _stack_id: u8) -> Result<(), ModemError> {
        self.record("class_b_request_ping_slot_info")?;
        self.ping_slot_requests += 1;
        Ok(())
    }

    fn time_set_sync_interval_s(&mut self, _seconds: u32) -> Result<(), ModemError> {
        self.record("time_set_sync_interval_s")
    }

    fn time_start_sync_service(
        &mut self,
        _stack_id: u8,
        _service: TimeSyncService,
    ) -> Result<(), ModemError> {
        self.record("time_start_sync_service")
    }
}

/// Clock the test advances by hand.
#[derive(Default)]
pub struct TestClock {
    pub now_ms: AtomicU64,
}

impl Clock for TestClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Timer that only records its arming.
#[derive(Default)]
pub struct RecordingTimer {
    pub armed: Mutex<Option<(Duration, Job)>>,
}

impl RecordingTimer {
    /// Run the armed expiry, if any.
    pub fn fire(&self) {
        let armed = self.armed.lock().unwrap().take();
        if let Some((_, job)) = armed {
            job();
        }
    }
}

impl OneShotTimer for RecordingTimer {
    fn start(&self, after: Duration, on_expiry: Job) {
        *self.armed.lock().unwrap() = Some((after, on_expiry));
    }

    fn stop(&self) {
        self.armed.lock().unwrap().take();
    }
}

/// Work queue running each job immediately on the submitting thread.
pub struct InlineQueue;

impl WorkQueue for InlineQueue {
    fn submit(&self, job: Job) {
        job();
    }
}

/// Board whose interrupt line the test triggers.
#[derive(Default)]
pub struct TestBoard {
    pub handler: Mutex<Option<IrqHandler>>,
}

impl RadioBoard for TestBoard {
    fn attach_interrupt(&self, handler: IrqHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    fn enable_interrupt(&self) {}

    fn disable_interrupt(&self) {}

    fn tcxo_startup_delay_ms(&self) -> u32 {
        5
    }
}

/// Reboot turns into a test panic.
pub struct PanicOnReboot;

impl SystemControl for PanicOnReboot {
    fn reboot_cold(&self) -> ! {
        panic!("cold reboot requested");
    }
}

/// Handles on the pieces of a [`test_platform`].
pub struct TestHandles {
    pub clock: Arc<TestClock>,
    pub timer: Arc<RecordingTimer>,
    pub wake: WakeSignal,
}

/// In-process platform: manual clock and timer, inline work queue.
pub fn test_platform() -> (Platform, TestHandles) {
    let clock = Arc::new(TestClock::default());
    let timer = Arc::new(RecordingTimer::default());
    let wake = WakeSignal::new();
    let platform = Platform {
        clock: clock.clone(),
        timer: timer.clone(),
        work_queue: Arc::new(InlineQueue),
        board: Arc::new(TestBoard::default()),
        system: Arc::new(PanicOnReboot),
        rng: Box::new(OsRng),
        wake: wake.clone(),
    };
    (platform, TestHandles { clock, timer, wake })
}

pub fn test_storage() -> SettingsStorage<MemorySettings> {
    SettingsStorage::new(MemorySettings::new())
}
