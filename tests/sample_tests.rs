//! Sample applications driven through the app layer.

mod common;

use common::{test_platform, test_storage, ScriptedModem, Uplink};
use lora_modem_hal::app::{EventCallbacks, LorawanConfig, ModemApp};
use lora_modem_hal::hal::{MemorySettings, SettingsStorage};
use lora_modem_hal::modem::{
    DeviceClass, ModemError, ModemEvent, PingSlotStatus, TimeSyncStatus,
};
use lora_modem_hal::samples::periodic_uplink::{
    send_frame, FrameOutcome, APP_TX_DUTYCYCLE_S, LORAWAN_APP_PORT,
};
use lora_modem_hal::samples::{ClassBSample, PeriodicUplink, TimeSyncSample};
use lora_modem_hal::WakeSignal;

type TestApp = ModemApp<ScriptedModem, SettingsStorage<MemorySettings>>;

fn sample_app(modem: ScriptedModem, sample: Box<dyn EventCallbacks>) -> TestApp {
    let (platform, _) = test_platform();
    ModemApp::init(modem, platform, test_storage(), Some(sample), None)
}

/// Queue `events`, announce them and drain.
fn deliver(app: &mut TestApp, events: &[ModemEvent]) {
    for event in events {
        app.modem().queue(*event);
    }
    app.modem().notify();
    app.process_events();
}

fn periodic_app() -> TestApp {
    sample_app(
        ScriptedModem::new(),
        Box::new(PeriodicUplink::new(LorawanConfig::sample())),
    )
}

#[test]
fn test_reset_configures_and_joins() {
    let mut app = periodic_app();
    deliver(&mut app, &[ModemEvent::Reset { count: 1 }]);

    let modem = app.modem();
    assert!(modem.called("set_deveui"));
    assert!(modem.called("set_joineui"));
    assert!(modem.called("set_nwkkey"));
    assert_eq!(modem.count("join_network"), 1);
    assert_eq!(modem.dev_eui, Some(LorawanConfig::sample().dev_eui));
}

#[test]
fn test_reset_does_not_join_when_credentials_fail() {
    let mut modem = ScriptedModem::new();
    modem.fail("set_nwkkey", ModemError::Invalid);
    let mut app = sample_app(modem, Box::new(PeriodicUplink::new(LorawanConfig::sample())));

    deliver(&mut app, &[ModemEvent::Reset { count: 1 }]);
    assert!(!app.modem().called("join_network"));
}

#[test]
fn test_joined_schedules_first_uplink() {
    let mut app = periodic_app();
    deliver(&mut app, &[ModemEvent::Joined]);

    assert_eq!(app.modem().alarms, vec![APP_TX_DUTYCYCLE_S]);
    assert!(app.modem().called("adr_set_profile"));
}

#[test]
fn test_alarm_sends_counter_and_charge() {
    let mut app = periodic_app();
    app.modem().charge_mah = 0x0102_0304;

    deliver(&mut app, &[ModemEvent::Alarm]);
    deliver(&mut app, &[ModemEvent::Alarm]);

    let modem = app.modem();
    assert_eq!(modem.alarms, vec![APP_TX_DUTYCYCLE_S, APP_TX_DUTYCYCLE_S]);
    assert_eq!(
        modem.uplinks,
        vec![
            Uplink {
                fport: LORAWAN_APP_PORT,
                confirmed: false,
                payload: vec![1, 0x04, 0x03, 0x02, 0x01],
            },
            Uplink {
                fport: LORAWAN_APP_PORT,
                confirmed: false,
                payload: vec![2, 0x04, 0x03, 0x02, 0x01],
            },
        ]
    );
}

#[test]
fn test_alarm_respects_duty_cycle() {
    let mut app = periodic_app();
    app.modem().duty_cycle_ms = -5_000;

    deliver(&mut app, &[ModemEvent::Alarm]);

    let modem = app.modem();
    assert!(modem.uplinks.is_empty());
    assert_eq!(modem.empty_uplinks, 0);
    // Still re-armed for the next period
    assert_eq!(modem.alarms, vec![APP_TX_DUTYCYCLE_S]);
}

#[test]
fn test_send_frame_outcomes() {
    let mut modem = ScriptedModem::new();

    modem.duty_cycle_ms = -250;
    assert_eq!(
        send_frame(&mut modem, &[1, 2, 3], false),
        Ok(FrameOutcome::DutyCycleLimited { wait_ms: 250 })
    );

    modem.duty_cycle_ms = 0;
    modem.max_payload = 2;
    assert_eq!(
        send_frame(&mut modem, &[1, 2, 3], true),
        Ok(FrameOutcome::EmptyUplink)
    );
    assert_eq!(modem.empty_uplinks, 1);
    assert!(modem.uplinks.is_empty());

    modem.max_payload = 3;
    assert_eq!(
        send_frame(&mut modem, &[1, 2, 3], true),
        Ok(FrameOutcome::Requested)
    );
    assert_eq!(modem.uplinks.len(), 1);
    assert!(modem.uplinks[0].confirmed);
}

#[test]
fn test_send_frame_propagates_modem_errors() {
    let mut modem = ScriptedModem::new();
    modem.fail("request_uplink", ModemError::Busy);
    assert_eq!(send_frame(&mut modem, &[0], false), Err(ModemError::Busy));
}

#[test]
fn test_class_b_joined_requests_ping_slot_and_time() {
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(ClassBSample::new(LorawanConfig::sample(), WakeSignal::new())),
    );
    deliver(&mut app, &[ModemEvent::Joined]);

    let modem = app.modem();
    assert!(modem.called("class_b_set_ping_slot_periodicity"));
    assert_eq!(modem.ping_slot_requests, 1);
    assert!(modem.called("time_set_sync_interval_s"));
    assert!(modem.called("time_start_sync_service"));
    assert!(modem.class.is_none());
}

#[test]
fn test_class_b_switches_after_time_and_ping_slot() {
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(ClassBSample::new(LorawanConfig::sample(), WakeSignal::new())),
    );

    deliver(
        &mut app,
        &[ModemEvent::TimeSync {
            status: TimeSyncStatus::Valid,
        }],
    );
    assert!(app.modem().class.is_none());

    deliver(
        &mut app,
        &[ModemEvent::ClassBPingSlotInfo {
            status: PingSlotStatus::Answered,
        }],
    );
    assert_eq!(app.modem().class, Some(DeviceClass::B));
}

#[test]
fn test_class_b_waits_for_valid_time() {
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(ClassBSample::new(LorawanConfig::sample(), WakeSignal::new())),
    );

    deliver(
        &mut app,
        &[
            ModemEvent::ClassBPingSlotInfo {
                status: PingSlotStatus::Answered,
            },
            ModemEvent::TimeSync {
                status: TimeSyncStatus::NotValid,
            },
        ],
    );
    assert!(app.modem().class.is_none());
}

#[test]
fn test_class_b_retries_unanswered_ping_slot() {
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(ClassBSample::new(LorawanConfig::sample(), WakeSignal::new())),
    );

    deliver(
        &mut app,
        &[ModemEvent::ClassBPingSlotInfo {
            status: PingSlotStatus::NotAnswered,
        }],
    );
    assert_eq!(app.modem().ping_slot_requests, 1);
    assert!(app.modem().class.is_none());
}

#[test]
fn test_class_b_downlink_wakes_loop() {
    let wake = WakeSignal::new();
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(ClassBSample::new(LorawanConfig::sample(), wake.clone())),
    );

    deliver(&mut app, &[ModemEvent::DownData]);
    assert!(wake.is_raised());
}

#[test]
fn test_time_sync_starts_service_on_join() {
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(TimeSyncSample::new(LorawanConfig::sample())),
    );
    deliver(&mut app, &[ModemEvent::Joined]);

    let modem = app.modem();
    assert!(modem.called("time_set_sync_interval_s"));
    assert!(modem.called("time_start_sync_service"));
}

#[test]
fn test_time_sync_reads_time_only_when_valid() {
    let mut app = sample_app(
        ScriptedModem::new(),
        Box::new(TimeSyncSample::new(LorawanConfig::sample())),
    );

    deliver(
        &mut app,
        &[ModemEvent::TimeSync {
            status: TimeSyncStatus::ValidButNotSynced,
        }],
    );
    assert!(!app.modem().called("get_alcsync_time"));

    deliver(
        &mut app,
        &[ModemEvent::TimeSync {
            status: TimeSyncStatus::Valid,
        }],
    );
    assert_eq!(app.modem().count("get_alcsync_time"), 1);
}
