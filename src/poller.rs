use crate::prelude::*;

use crate::coordinator::commands::read_param::ReadParam;
use crate::register::{
    ACTIVE_POWER, DEVICE_STATUS, GRID_FREQUENCY, GRID_VOLTAGE, INPUT_POWER,
    STORAGE_CHARGE_DISCHARGE_POWER, STORAGE_STATE_OF_CAPACITY,
};

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct TelemetryPoint {
    pub register: &'static Register,
    pub label: &'static str,
}

impl TelemetryPoint {
    pub const fn new(register: &'static Register, label: &'static str) -> Self {
        Self { register, label }
    }
}

/// Read while a forced charge or discharge is running.
pub static BATTERY_MONITOR: &[TelemetryPoint] = &[
    TelemetryPoint::new(&STORAGE_STATE_OF_CAPACITY, "Battery SoC"),
    TelemetryPoint::new(&STORAGE_CHARGE_DISCHARGE_POWER, "Battery Power"),
];

pub static INVERTER_TELEMETRY: &[TelemetryPoint] = &[
    TelemetryPoint::new(&ACTIVE_POWER, "Active Power"),
    TelemetryPoint::new(&INPUT_POWER, "PV Input Power"),
    TelemetryPoint::new(&GRID_VOLTAGE, "Grid Voltage"),
    TelemetryPoint::new(&GRID_FREQUENCY, "Grid Frequency"),
    TelemetryPoint::new(&STORAGE_STATE_OF_CAPACITY, "Battery SoC"),
    TelemetryPoint::new(&STORAGE_CHARGE_DISCHARGE_POWER, "Battery Power"),
    TelemetryPoint::new(&DEVICE_STATUS, "Device Status"),
];

/// Background loop reading a fixed set of registers on an interval.
pub struct TelemetryPoller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TelemetryPoller {
    pub fn start(
        device: Arc<dyn Device>,
        points: &'static [TelemetryPoint],
        interval: Duration,
        channels: Channels,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::run(device, points, interval, channels, cancel.clone()));

        Self { cancel, handle }
    }

    /// Returns once the loop has exited. A read already on the wire is
    /// allowed to finish first.
    pub async fn stop(self) {
        self.cancel.cancel();

        if let Err(e) = self.handle.await {
            error!("telemetry task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    async fn run(
        device: Arc<dyn Device>,
        points: &'static [TelemetryPoint],
        interval: Duration,
        channels: Channels,
        cancel: CancellationToken,
    ) {
        info!(
            "[TELEMETRY] polling {} point(s) every {}s",
            points.len(),
            interval.as_secs()
        );

        'outer: loop {
            for point in points {
                if cancel.is_cancelled() {
                    break 'outer;
                }

                // errors are logged and reported by ReadParam
                let _ = ReadParam::new(device.clone(), channels.clone(), point.register, point.label)
                    .tag("TELEMETRY")
                    .run()
                    .await;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("[TELEMETRY] polling stopped");
    }
}
