use crate::prelude::*;

use super::read_param::ReadParam;
use crate::coordinator::Mode;
use crate::register::STORAGE_STATE_OF_CAPACITY;

use std::time::Duration;

/// Polls battery SoC until a charge reaches or a discharge falls to `target`.
pub struct WaitForSoc {
    device: Arc<dyn Device>,
    channels: Channels,
    mode: Mode,
    target: u8,
    attempts: u32,
    interval: Duration,
}

impl WaitForSoc {
    pub fn new(
        device: Arc<dyn Device>,
        channels: Channels,
        mode: Mode,
        target: u8,
        attempts: u32,
        interval: Duration,
    ) -> Self {
        Self {
            device,
            channels,
            mode,
            target,
            attempts,
            interval,
        }
    }

    /// `Ok(true)` once the target is met, `Ok(false)` when attempts run out.
    /// Failed reads use up an attempt.
    pub async fn run(&self) -> Result<bool> {
        let target = Value::from_units(&STORAGE_STATE_OF_CAPACITY, self.target as i64);

        for attempt in 1..=self.attempts {
            let read = ReadParam::new(
                self.device.clone(),
                self.channels.clone(),
                &STORAGE_STATE_OF_CAPACITY,
                "Battery SoC",
            )
            .tag("SOC")
            .run()
            .await;

            if let Ok(soc) = read {
                if self.reached(soc, target) {
                    info!("[SOC] target {}% reached after {} attempt(s)", self.target, attempt);
                    return Ok(true);
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!(
            "[SOC] target {}% not reached after {} attempt(s)",
            self.target, self.attempts
        );

        Ok(false)
    }

    fn reached(&self, soc: Value, target: Value) -> bool {
        match self.mode {
            Mode::Charge => soc.raw() >= target.raw(),
            Mode::Discharge => soc.raw() <= target.raw(),
        }
    }
}
