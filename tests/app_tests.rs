//! Event drain, downlink staging and credential setup against a scripted
//! modem library.

mod common;

use common::{test_platform, test_storage, ScriptedModem, TestHandles};
use lora_modem_hal::app::{self, Downlink, EventCallbacks, LorawanConfig, ModemApp};
use lora_modem_hal::hal::{MemorySettings, ModemHal, SettingsStorage};
use lora_modem_hal::modem::{
    DownlinkMetadata, DownlinkWindow, ModemError, ModemEvent, ModemStack, TimeSyncStatus,
    TxDoneStatus,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type TestApp = ModemApp<ScriptedModem, SettingsStorage<MemorySettings>>;

/// Callbacks that record what they saw.
#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.seen.lock().unwrap().push(entry);
    }
}

impl EventCallbacks for Recorder {
    fn reset(&mut self, _modem: &mut dyn ModemStack, count: u16) {
        self.push(format!("reset {}", count));
    }

    fn alarm(&mut self, _modem: &mut dyn ModemStack) {
        self.push("alarm".into());
    }

    fn joined(&mut self, _modem: &mut dyn ModemStack) {
        self.push("joined".into());
    }

    fn tx_done(&mut self, _modem: &mut dyn ModemStack, status: TxDoneStatus) {
        self.push(format!("tx_done {:?}", status));
    }

    fn down_data(&mut self, _modem: &mut dyn ModemStack, downlink: Downlink<'_>) {
        self.push(format!(
            "down_data port={} payload={:?} remaining={}",
            downlink.metadata.fport, downlink.payload, downlink.remaining
        ));
    }

    fn time_sync(&mut self, _modem: &mut dyn ModemStack, status: TimeSyncStatus) {
        self.push(format!("time_sync {:?}", status));
    }
}

fn app_with(
    modem: ScriptedModem,
    callbacks: Option<Box<dyn EventCallbacks>>,
) -> (TestApp, TestHandles) {
    let (platform, handles) = test_platform();
    let app = ModemApp::init(modem, platform, test_storage(), callbacks, None);
    (app, handles)
}

fn recorded_app(modem: ScriptedModem) -> (TestApp, Recorder) {
    let recorder = Recorder::default();
    let (app, _) = app_with(modem, Some(Box::new(recorder.clone())));
    (app, recorder)
}

#[test]
fn test_init_hands_hal_and_notifier_to_modem() {
    let (mut app, _) = recorded_app(ScriptedModem::new());
    assert_eq!(app.modem().calls, vec!["init"]);
    assert!(app.modem().hal.is_some());
    assert!(app.modem().notifier.is_some());
    assert!(!app.events_pending());
}

#[test]
fn test_notifier_sets_pending_and_wakes() {
    let (mut app, _) = recorded_app(ScriptedModem::new());
    assert!(!app.wake_signal().is_raised());

    app.modem().notify();
    assert!(app.events_pending());
    assert!(app.wake_signal().is_raised());

    // Empty queue ends the drain without a retry
    assert_eq!(app.process_events(), 0);
    assert!(!app.events_pending());
}

#[test]
fn test_drain_dispatches_in_fifo_order() {
    let mut modem = ScriptedModem::new();
    modem.queue(ModemEvent::Reset { count: 3 });
    modem.queue(ModemEvent::Joined);
    modem.queue(ModemEvent::TxDone {
        status: TxDoneStatus::Sent,
    });
    let (mut app, recorder) = recorded_app(modem);

    app.modem().notify();
    assert_eq!(app.step(), 0);

    assert_eq!(
        recorder.seen(),
        vec!["reset 3", "joined", "tx_done Sent"]
    );
    assert_eq!(app.modem().count("get_event"), 3);
    assert!(!app.events_pending());
}

#[test]
fn test_step_without_notification_skips_drain() {
    let mut modem = ScriptedModem::new();
    modem.sleep_ms = 1_234;
    modem.queue(ModemEvent::Alarm);
    let (mut app, recorder) = recorded_app(modem);

    assert_eq!(app.step(), 1_234);
    assert!(recorder.seen().is_empty());
    assert!(!app.modem().called("get_event"));
}

#[test]
fn test_events_announced_during_engine_run_are_drained() {
    let mut modem = ScriptedModem::new();
    modem.on_next_engine_run(ModemEvent::Reset { count: 1 });
    let (mut app, recorder) = recorded_app(modem);

    assert_eq!(app.step(), 0);
    assert_eq!(recorder.seen(), vec!["reset 1"]);

    // Nothing new: the engine's sleep budget is returned
    assert_eq!(app.step(), 1_000);
}

#[test]
fn test_get_event_error_aborts_drain() {
    let mut modem = ScriptedModem::new();
    modem.queue(ModemEvent::Alarm);
    modem.queue(ModemEvent::Joined);
    modem.fail("get_event", ModemError::Fail);
    let (mut app, recorder) = recorded_app(modem);

    app.modem().notify();
    assert_eq!(app.process_events(), 0);
    assert!(recorder.seen().is_empty());
    assert_eq!(app.modem().count("get_event"), 1);
    assert_eq!(app.modem().events.len(), 2);

    // Retried on the next step without a new notification
    assert!(app.events_pending());
    app.modem().failures.clear();
    assert_eq!(app.step(), 0);
    assert_eq!(recorder.seen(), vec!["alarm", "joined"]);
    assert!(app.modem().events.is_empty());
    assert!(!app.events_pending());
}

#[test]
fn test_downlink_staged_before_callback() {
    let mut modem = ScriptedModem::new();
    modem.downlink = vec![0xca, 0xfe, 0x01];
    modem.downlink_metadata = DownlinkMetadata {
        window: DownlinkWindow::Rx2,
        fport: 10,
        rssi: 20,
        snr: 28,
        ..DownlinkMetadata::default()
    };
    modem.downlink_remaining = 2;
    modem.queue(ModemEvent::DownData);
    let (mut app, recorder) = recorded_app(modem);

    app.modem().notify();
    assert_eq!(app.process_events(), 1);

    assert_eq!(
        recorder.seen(),
        vec!["down_data port=10 payload=[202, 254, 1] remaining=2"]
    );
    let calls = &app.modem().calls;
    let fetch = calls.iter().position(|c| *c == "get_downlink_data");
    assert!(fetch.is_some());
}

#[test]
fn test_empty_downlink_is_dispatched() {
    let mut modem = ScriptedModem::new();
    modem.queue(ModemEvent::DownData);
    let (mut app, recorder) = recorded_app(modem);

    app.modem().notify();
    app.process_events();
    assert_eq!(
        recorder.seen(),
        vec!["down_data port=0 payload=[] remaining=0"]
    );
}

#[test]
fn test_downlink_fetch_failure_aborts_drain() {
    let mut modem = ScriptedModem::new();
    modem.queue(ModemEvent::DownData);
    modem.queue(ModemEvent::Alarm);
    modem.fail("get_downlink_data", ModemError::Fail);
    let (mut app, recorder) = recorded_app(modem);

    app.modem().notify();
    assert_eq!(app.process_events(), 0);
    assert!(recorder.seen().is_empty());

    // The alarm is left for the next drain
    assert_eq!(app.modem().events.len(), 1);

    // The downlink event is held and dispatched first on the next step
    app.modem().failures.clear();
    app.modem().downlink = vec![0x42];
    assert_eq!(app.step(), 0);
    assert_eq!(
        recorder.seen(),
        vec!["down_data port=0 payload=[66] remaining=0", "alarm"]
    );
    assert_eq!(app.modem().count("get_downlink_data"), 2);
    assert!(!app.events_pending());
}

#[test]
fn test_events_dropped_without_callbacks() {
    let mut modem = ScriptedModem::new();
    modem.queue(ModemEvent::Alarm);
    modem.queue(ModemEvent::Joined);
    let (mut app, _) = app_with(modem, None);

    app.modem().notify();
    assert_eq!(app.process_events(), 2);
    assert!(app.modem().events.is_empty());
}

#[test]
fn test_unknown_event_counts_as_dispatched() {
    let mut modem = ScriptedModem::new();
    modem.queue(ModemEvent::Unknown { event_type: 0x42 });
    modem.queue(ModemEvent::Alarm);
    let (mut app, recorder) = recorded_app(modem);

    app.modem().notify();
    assert_eq!(app.process_events(), 2);
    assert_eq!(recorder.seen(), vec!["alarm"]);
}

#[test]
fn test_configure_lorawan_params_sets_credentials() {
    let config = LorawanConfig::sample();
    let mut modem = ScriptedModem::new();

    app::configure_lorawan_params(&mut modem, app::STACK_ID, &config).unwrap();

    assert_eq!(modem.calls, vec!["set_deveui", "set_joineui", "set_nwkkey"]);
    assert_eq!(modem.dev_eui, Some(config.dev_eui));
    assert_eq!(modem.join_eui, Some(config.join_eui));
    assert_eq!(modem.nwk_key.as_ref(), Some(config.app_key.expose()));
}

#[test]
fn test_configure_lorawan_params_stops_at_first_failure() {
    let config = LorawanConfig::sample();
    let mut modem = ScriptedModem::new();
    modem.fail("set_joineui", ModemError::Busy);

    let result = app::configure_lorawan_params(&mut modem, app::STACK_ID, &config);

    assert_eq!(result, Err(ModemError::Busy));
    assert_eq!(modem.calls, vec!["set_deveui", "set_joineui"]);
    assert!(modem.nwk_key.is_none());
}

#[test]
fn test_configure_lorawan_params_uses_chip_eui() {
    let mut config = LorawanConfig::sample();
    config.use_chip_eui_as_dev_eui = true;
    let mut modem = ScriptedModem::new();

    app::configure_lorawan_params(&mut modem, app::STACK_ID, &config).unwrap();

    assert_eq!(modem.calls[0], "get_chip_eui");
    assert_eq!(modem.dev_eui, Some(modem.chip_eui));
}

#[test]
fn test_configure_lorawan_params_chip_eui_failure() {
    let mut config = LorawanConfig::sample();
    config.use_chip_eui_as_dev_eui = true;
    let mut modem = ScriptedModem::new();
    modem.fail("get_chip_eui", ModemError::NotInit);

    let result = app::configure_lorawan_params(&mut modem, app::STACK_ID, &config);

    assert_eq!(result, Err(ModemError::NotInit));
    assert!(!modem.called("set_deveui"));
}

#[test]
fn test_utc_time_from_gps() {
    let mut modem = ScriptedModem::new();
    modem.gps_time_s = 1_000_000_000;
    assert_eq!(app::gps_time(&mut modem), Ok(1_000_000_000));
    assert_eq!(app::utc_time(&mut modem), Ok(1_000_000_000 + 315_964_800 - 18));

    modem.fail("get_alcsync_time", ModemError::NoTime);
    assert_eq!(app::utc_time(&mut modem), Err(ModemError::NoTime));
}

#[test]
fn test_hal_reaches_platform_through_modem() {
    let (mut app, handles) = app_with(ScriptedModem::new(), None);
    let hal: Arc<dyn ModemHal> = app.modem().hal.clone().unwrap();

    handles.clock.now_ms.store(7_250, Ordering::SeqCst);
    assert_eq!(hal.get_time_in_ms(), 7_250);
    assert_eq!(hal.get_time_in_s(), 7);

    // The notifier raises the platform's wake signal
    app.modem().notify();
    assert!(handles.wake.is_raised());
}

#[test]
fn test_modem_timer_fires_through_work_queue() {
    let (mut app, handles) = app_with(ScriptedModem::new(), None);
    let hal = app.modem().hal.clone().unwrap();
    let fired = Arc::new(AtomicU32::new(0));

    let counter = fired.clone();
    hal.start_timer(
        250,
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    assert_eq!(
        handles.timer.armed.lock().unwrap().as_ref().map(|(d, _)| *d),
        Some(Duration::from_millis(250))
    );

    hal.enable_modem_irq();
    handles.timer.fire();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_context_persists_through_hal() {
    let (mut app, _) = app_with(ScriptedModem::new(), None);
    let hal = app.modem().hal.clone().unwrap();

    hal.context_store(lora_modem_hal::hal::ContextId(0), 0, &[1, 2, 3, 4]);
    let mut buffer = [0u8; 4];
    hal.context_restore(lora_modem_hal::hal::ContextId(0), 0, &mut buffer);
    assert_eq!(buffer, [1, 2, 3, 4]);
}
