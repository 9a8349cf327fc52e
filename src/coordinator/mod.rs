use crate::prelude::*;

pub mod commands;

use crate::config::SwitchPolicy;
use crate::poller::{TelemetryPoint, TelemetryPoller, BATTERY_MONITOR, INVERTER_TELEMETRY};
use commands::battery_info::BatteryInfo;
use commands::dump_registers::{DumpRegisters, DumpSummary};
use commands::plan::Plan;
use commands::sequencer::{SequenceResult, Sequencer};
use commands::wait_for_soc::WaitForSoc;

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Charging,
    Discharging,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Charging => write!(f, "charging"),
            Self::Discharging => write!(f, "discharging"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Charge,
    Discharge,
}

impl Mode {
    pub fn state(self) -> State {
        match self {
            Self::Charge => State::Charging,
            Self::Discharge => State::Discharging,
        }
    }
}

/// What bounds a forced charge or discharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Duration { minutes: u16 },
    Soc(u8),
}

impl Target {
    fn validate(self) -> Result<()> {
        match self {
            Self::Duration { minutes: 0 } => bail!("duration must be at least one minute"),
            Self::Soc(soc) if soc > 100 => bail!("target SoC {}% is outside 0..=100", soc),
            _ => Ok(()),
        }
    }
}

// SessionHandle {{{
/// A device session plus at most one running telemetry poller.
pub struct SessionHandle {
    device: Arc<dyn Device>,
    poller: Option<TelemetryPoller>,
}

impl SessionHandle {
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self {
            device,
            poller: None,
        }
    }

    pub fn device(&self) -> Arc<dyn Device> {
        self.device.clone()
    }

    pub fn has_poller(&self) -> bool {
        self.poller.is_some()
    }

    pub fn start_poller(
        &mut self,
        points: &'static [TelemetryPoint],
        interval: Duration,
        channels: Channels,
    ) -> Result<()> {
        if self.poller.is_some() {
            bail!("a telemetry poller is already running on this session");
        }

        self.poller = Some(TelemetryPoller::start(
            self.device.clone(),
            points,
            interval,
            channels,
        ));

        Ok(())
    }

    /// Returns whether a poller was running.
    pub async fn stop_poller(&mut self) -> bool {
        match self.poller.take() {
            Some(poller) => {
                poller.stop().await;
                true
            }
            None => false,
        }
    }
} // }}}

// Coordinator {{{
/// Drives one device through idle, forced charge and forced discharge.
pub struct Coordinator {
    config: Config,
    channels: Channels,
    handle: SessionHandle,
    sequencer: Sequencer,
    state: State,
}

impl Coordinator {
    pub fn new(config: Config, device: Arc<dyn Device>, channels: Channels) -> Self {
        let sequencer = Sequencer::new(device.clone(), config.failure_policy());

        Self {
            config,
            channels,
            handle: SessionHandle::new(device),
            sequencer,
            state: State::Idle,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn has_poller(&self) -> bool {
        self.handle.has_poller()
    }

    pub async fn force_charge(&mut self, power: u32, target: Target) -> Result<SequenceResult> {
        self.force(Mode::Charge, power, target).await
    }

    pub async fn force_discharge(&mut self, power: u32, target: Target) -> Result<SequenceResult> {
        self.force(Mode::Discharge, power, target).await
    }

    pub async fn force(&mut self, mode: Mode, power: u32, target: Target) -> Result<SequenceResult> {
        target.validate()?;

        if self.state != State::Idle {
            match self.config.switch_policy() {
                SwitchPolicy::Reject => bail!(
                    "cannot go from {} to {} without stopping first",
                    self.state,
                    mode.state()
                ),
                SwitchPolicy::StopFirst => {
                    info!("{} requested while {}, stopping first", mode.state(), self.state);
                    self.stop().await?;
                }
            }
        } else if self.handle.stop_poller().await {
            info!("telemetry stopped before {}", mode.state());
        }

        let plan = match (mode, target) {
            (Mode::Charge, Target::Duration { minutes }) => Plan::charge_for(power, minutes),
            (Mode::Discharge, Target::Duration { minutes }) => Plan::discharge_for(power, minutes),
            (Mode::Charge, Target::Soc(soc)) => Plan::charge_to(power, soc),
            (Mode::Discharge, Target::Soc(soc)) => Plan::discharge_to(power, soc),
        };

        // Set before the plan runs so an interrupted plan is still zeroed on close.
        self.state = mode.state();

        let result = self.sequencer.execute(&plan).await;
        if !result.all_validated() {
            warn!("{} started with {} unvalidated step(s)", self.state, plan.len() - result.validated());
        }

        self.handle
            .start_poller(BATTERY_MONITOR, self.config.poll_interval(), self.channels.clone())?;

        info!("state: {}", self.state);

        Ok(result)
    }

    /// Cancels any poller and zeroes the forced-mode registers. Runs from
    /// any state, idle included.
    pub async fn stop(&mut self) -> Result<SequenceResult> {
        if self.handle.stop_poller().await {
            debug!("poller stopped");
        }

        let result = self.sequencer.execute(&Plan::stop()).await;
        self.state = State::Idle;
        info!("state: {}", self.state);

        Ok(result)
    }

    pub async fn restore_defaults(&mut self) -> Result<SequenceResult> {
        if self.state != State::Idle {
            bail!("restore defaults requires idle, currently {}", self.state);
        }

        Ok(self.sequencer.execute(&Plan::restore_defaults()).await)
    }

    pub async fn wait_for_soc(&self, mode: Mode, target: u8) -> Result<bool> {
        Target::Soc(target).validate()?;

        WaitForSoc::new(
            self.handle.device(),
            self.channels.clone(),
            mode,
            target,
            self.config.soc_wait_attempts(),
            self.config.soc_wait_interval(),
        )
        .run()
        .await
    }

    /// Charge for `minutes`, stop, discharge for `minutes`, stop.
    pub async fn cycle(&mut self, power: u32, minutes: u16) -> Result<()> {
        let hold = Duration::from_secs(minutes as u64 * 60);

        for mode in [Mode::Charge, Mode::Discharge] {
            self.force(mode, power, Target::Duration { minutes }).await?;
            tokio::time::sleep(hold).await;
            self.stop().await?;
        }

        Ok(())
    }

    /// Starts the inverter-wide poller. Only valid while idle.
    pub fn start_telemetry(&mut self) -> Result<()> {
        if self.state != State::Idle {
            bail!("telemetry requires idle, currently {}", self.state);
        }

        self.handle
            .start_poller(INVERTER_TELEMETRY, self.config.poll_interval(), self.channels.clone())
    }

    pub async fn stop_telemetry(&mut self) {
        self.handle.stop_poller().await;
    }

    pub async fn dump(&self) -> DumpSummary {
        DumpRegisters::new(self.handle.device(), self.channels.clone())
            .run()
            .await
    }

    pub async fn battery_info(&self) -> Result<()> {
        BatteryInfo::new(self.handle.device(), self.channels.clone())
            .run()
            .await
    }

    /// Reads the named catalog registers.
    pub async fn read(&self, names: &[String]) -> Result<()> {
        let registers = names
            .iter()
            .map(|name| register::get(name))
            .collect::<Result<Vec<_>>>()?;

        for register in registers {
            let _ = commands::read_param::ReadParam::new(
                self.handle.device(),
                self.channels.clone(),
                register,
                register.name,
            )
            .run()
            .await;
        }

        Ok(())
    }

    /// Returns to idle if needed, then closes the device session.
    pub async fn close(&mut self) -> Result<()> {
        let result = if self.state != State::Idle {
            self.stop().await.map(|_| ())
        } else {
            self.handle.stop_poller().await;
            Ok(())
        };

        self.handle.device().close().await;

        result
    }
} // }}}
