use crate::prelude::*;

use crate::coordinator::{Coordinator, Mode, Target};
use crate::options::{ForceArgs, Operation};

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Force {
        mode: Mode,
        power: u32,
        target: Target,
        hold: Option<Duration>,
    },
    Stop,
    Telemetry(Option<Duration>),
    Dump,
    BatteryInfo,
    RestoreDefaults,
    Cycle { power: u32, minutes: u16 },
    Read(Vec<String>),
}

impl TryFrom<Operation> for Command {
    type Error = anyhow::Error;

    fn try_from(operation: Operation) -> Result<Self> {
        use Operation::*;

        Ok(match operation {
            Charge(args) => Self::force(Mode::Charge, args)?,
            Discharge(args) => Self::force(Mode::Discharge, args)?,
            Stop => Self::Stop,
            Telemetry { run_for } => Self::Telemetry(run_for.map(Duration::from_secs)),
            Dump => Self::Dump,
            BatteryInfo => Self::BatteryInfo,
            RestoreDefaults => Self::RestoreDefaults,
            Cycle { power, minutes } => {
                if minutes == 0 {
                    bail!("--minutes must be at least 1");
                }
                Self::Cycle { power, minutes }
            }
            Read { names } => {
                for name in &names {
                    register::get(name)?;
                }
                Self::Read(names)
            }
        })
    }
}

impl Command {
    fn force(mode: Mode, args: ForceArgs) -> Result<Self> {
        let target = match (args.minutes, args.soc) {
            (Some(minutes), None) => Target::Duration { minutes },
            (None, Some(soc)) => Target::Soc(soc),
            _ => bail!("exactly one of --minutes or --soc is required"),
        };

        match target {
            Target::Duration { minutes: 0 } => bail!("--minutes must be at least 1"),
            Target::Soc(soc) if soc > 100 => bail!("--soc must be between 0 and 100"),
            _ => {}
        }

        Ok(Self::Force {
            mode,
            power: args.power,
            target,
            hold: args.hold.map(Duration::from_secs),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Force { mode: Mode::Charge, .. } => "charge",
            Self::Force { mode: Mode::Discharge, .. } => "discharge",
            Self::Stop => "stop",
            Self::Telemetry(_) => "telemetry",
            Self::Dump => "dump",
            Self::BatteryInfo => "battery-info",
            Self::RestoreDefaults => "restore-defaults",
            Self::Cycle { .. } => "cycle",
            Self::Read(_) => "read",
        }
    }

    /// Leaves the coordinator idle on success. If the future is dropped
    /// part way, `Coordinator::close` does the cleanup.
    pub async fn run(&self, coordinator: &mut Coordinator) -> Result<()> {
        match self {
            Self::Force {
                mode,
                power,
                target,
                hold,
            } => {
                coordinator.force(*mode, *power, *target).await?;

                match (hold, target) {
                    (Some(hold), _) => {
                        info!("holding for {}s", hold.as_secs());
                        tokio::time::sleep(*hold).await;
                    }
                    (None, Target::Duration { minutes }) => {
                        info!("holding for {} min", minutes);
                        tokio::time::sleep(Duration::from_secs(*minutes as u64 * 60)).await;
                    }
                    (None, Target::Soc(soc)) => {
                        coordinator.wait_for_soc(*mode, *soc).await?;
                    }
                }

                coordinator.stop().await?;
            }
            Self::Stop => {
                coordinator.stop().await?;
            }
            Self::Telemetry(run_for) => {
                coordinator.start_telemetry()?;
                match run_for {
                    Some(run_for) => tokio::time::sleep(*run_for).await,
                    None => std::future::pending::<()>().await,
                }
                coordinator.stop_telemetry().await;
            }
            Self::Dump => {
                coordinator.dump().await;
            }
            Self::BatteryInfo => {
                coordinator.battery_info().await?;
            }
            Self::RestoreDefaults => {
                let result = coordinator.restore_defaults().await?;
                if !result.all_validated() {
                    warn!("restore defaults: not every value was confirmed");
                }
            }
            Self::Cycle { power, minutes } => {
                coordinator.cycle(*power, *minutes).await?;
            }
            Self::Read(names) => {
                coordinator.read(names).await?;
            }
        }

        Ok(())
    }
}
