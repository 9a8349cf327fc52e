mod common;
use common::*;

use sun2000_control::coordinator::{Coordinator, Mode, State, Target};
use sun2000_control::prelude::*;
use sun2000_control::register::{
    CATALOG, GRID_VOLTAGE, STORAGE_CHARGE_DISCHARGE_POWER, STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE,
    STORAGE_STATE_OF_CAPACITY,
};

use std::time::Duration;

const STOP_PLAN: [(&str, i64); 4] = [
    ("storage_forced_charging_and_discharging_period", 0),
    ("storage_forcible_charge_power", 0),
    ("storage_forcible_discharge_power", 0),
    ("storage_forcible_charge_discharge_write", 0),
];

fn coordinator(device: &Arc<MockDevice>, extra: &str) -> Coordinator {
    Coordinator::new(Factory::config_with(extra), device.clone(), Channels::new())
}

#[tokio::test(start_paused = true)]
async fn charge_for_duration() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    let result = subject
        .force_charge(500, Target::Duration { minutes: 2 })
        .await
        .unwrap();

    assert_eq!(result.validated(), 4);
    assert_eq!(
        result.steps.iter().map(|s| s.step.value).collect::<Vec<_>>(),
        vec![100, 2, 500, 1]
    );
    assert_eq!(subject.state(), State::Charging);
    assert!(subject.has_poller());

    subject.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_poller_and_zeroes_registers() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject
        .force_discharge(750, Target::Soc(20))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(device.reads_of(&STORAGE_CHARGE_DISCHARGE_POWER) > 0);

    device.clear_calls();
    let result = subject.stop().await.unwrap();

    assert!(result.all_validated());
    assert_eq!(device.writes(), STOP_PLAN.to_vec());
    assert_eq!(subject.state(), State::Idle);
    assert!(!subject.has_poller());

    // poller is gone: no more battery reads
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(device.reads_of(&STORAGE_CHARGE_DISCHARGE_POWER), 0);
}

#[tokio::test]
async fn stop_while_idle_still_zeroes() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject.stop().await.unwrap();

    assert_eq!(device.writes(), STOP_PLAN.to_vec());
    assert_eq!(subject.state(), State::Idle);
}

#[tokio::test(start_paused = true)]
async fn switching_modes_is_rejected_by_default() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject
        .force_charge(500, Target::Duration { minutes: 30 })
        .await
        .unwrap();
    device.clear_calls();

    assert!(subject
        .force_discharge(500, Target::Duration { minutes: 30 })
        .await
        .is_err());
    assert!(subject
        .force_charge(800, Target::Duration { minutes: 30 })
        .await
        .is_err());

    assert!(device.writes().is_empty());
    assert_eq!(subject.state(), State::Charging);

    subject.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_first_policy_goes_through_idle() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "switch_policy: stop_first\n");

    subject
        .force_charge(500, Target::Duration { minutes: 30 })
        .await
        .unwrap();
    device.clear_calls();

    subject
        .force_discharge(500, Target::Duration { minutes: 30 })
        .await
        .unwrap();

    let writes = device.writes();
    assert_eq!(writes[..4], STOP_PLAN);
    assert_eq!(writes.last(), Some(&("storage_forcible_charge_discharge_write", 2)));
    assert_eq!(subject.state(), State::Discharging);
    assert!(subject.has_poller());

    subject.close().await.unwrap();
}

#[tokio::test]
async fn invalid_targets_are_rejected_before_any_write() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    assert!(subject.force_charge(500, Target::Soc(101)).await.is_err());
    assert!(subject
        .force_discharge(500, Target::Duration { minutes: 0 })
        .await
        .is_err());

    assert!(device.calls().is_empty());
    assert_eq!(subject.state(), State::Idle);
}

#[tokio::test(start_paused = true)]
async fn restore_defaults_requires_idle() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    let result = subject.restore_defaults().await.unwrap();
    assert_eq!(result.validated(), 5);
    assert_eq!(
        device.writes(),
        vec![
            ("storage_charging_cutoff_capacity", 1000),
            ("storage_discharging_cutoff_capacity", 100),
            ("storage_maximum_charging_power", 3000),
            ("storage_maximum_discharging_power", 3000),
            ("storage_charge_from_grid_function", 1),
        ]
    );

    subject
        .force_charge(500, Target::Duration { minutes: 30 })
        .await
        .unwrap();
    assert!(subject.restore_defaults().await.is_err());

    subject.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn close_returns_to_idle_then_closes_device() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject
        .force_charge(500, Target::Duration { minutes: 30 })
        .await
        .unwrap();
    device.clear_calls();

    subject.close().await.unwrap();

    assert_eq!(device.writes(), STOP_PLAN.to_vec());
    assert_eq!(subject.state(), State::Idle);
    assert_eq!(device.closes(), 1);
}

#[tokio::test]
async fn close_while_idle_writes_nothing() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject.close().await.unwrap();

    assert!(device.writes().is_empty());
    assert_eq!(device.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_for_soc_charge() {
    common_setup();

    let device = MockDevice::new();
    device.queue_raw(&STORAGE_STATE_OF_CAPACITY, &[500, 700, 805]);
    let subject = coordinator(&device, "");

    assert!(subject.wait_for_soc(Mode::Charge, 80).await.unwrap());
    assert_eq!(device.reads_of(&STORAGE_STATE_OF_CAPACITY), 3);
}

#[tokio::test(start_paused = true)]
async fn wait_for_soc_gives_up() {
    common_setup();

    let device = MockDevice::new();
    device.set_raw(&STORAGE_STATE_OF_CAPACITY, 500);
    let subject = coordinator(&device, "soc_wait_attempts: 3\n");

    let started = tokio::time::Instant::now();
    assert!(!subject.wait_for_soc(Mode::Discharge, 20).await.unwrap());

    assert_eq!(device.reads_of(&STORAGE_STATE_OF_CAPACITY), 3);
    // two pauses between three attempts
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert!(started.elapsed() < Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn cycle_charges_then_discharges() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject.cycle(500, 2).await.unwrap();

    let triggers: Vec<i64> = device
        .writes()
        .into_iter()
        .filter(|(name, _)| *name == STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE.name)
        .map(|(_, raw)| raw)
        .collect();
    assert_eq!(triggers, vec![1, 0, 2, 0]);
    assert_eq!(subject.state(), State::Idle);
    assert!(!subject.has_poller());
}

#[tokio::test]
async fn dump_reads_every_register() {
    common_setup();

    let device = MockDevice::new();
    device.fail_reads_from(&STORAGE_STATE_OF_CAPACITY);
    let subject = coordinator(&device, "");

    let summary = subject.dump().await;

    assert_eq!(device.reads(), CATALOG.len());
    assert_eq!(summary.read, CATALOG.len() - 1);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn read_by_name() {
    common_setup();

    let device = MockDevice::new();
    let subject = coordinator(&device, "");

    subject
        .read(&["storage_state_of_capacity".to_string(), "active_power".to_string()])
        .await
        .unwrap();
    assert_eq!(device.reads(), 2);

    assert!(subject.read(&["nope".to_string()]).await.is_err());
    assert_eq!(device.reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn telemetry_only_from_idle() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject.start_telemetry().unwrap();
    assert!(subject.start_telemetry().is_err());
    tokio::time::sleep(Duration::from_secs(1)).await;
    subject.stop_telemetry().await;
    assert!(!subject.has_poller());
    assert_eq!(device.reads(), 7);

    subject
        .force_charge(500, Target::Duration { minutes: 30 })
        .await
        .unwrap();
    assert!(subject.start_telemetry().is_err());

    subject.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn force_replaces_running_telemetry() {
    common_setup();

    let device = MockDevice::new();
    let mut subject = coordinator(&device, "");

    subject.start_telemetry().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    subject
        .force_charge(500, Target::Duration { minutes: 2 })
        .await
        .unwrap();
    assert_eq!(subject.state(), State::Charging);
    assert!(subject.has_poller());

    device.clear_calls();
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(device.reads_of(&GRID_VOLTAGE), 0);
    assert!(device.reads_of(&STORAGE_CHARGE_DISCHARGE_POWER) > 0);

    subject.close().await.unwrap();
    assert_eq!(subject.state(), State::Idle);
}
