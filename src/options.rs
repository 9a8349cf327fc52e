use clap::{Args, Parser, Subcommand};

/// Battery and telemetry control for Huawei SUN2000 inverters over Modbus
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Options {
    /// Config file to read
    #[clap(short = 'c', long = "config", default_value = "config.yaml")]
    pub config_file: String,

    #[clap(subcommand)]
    pub operation: Operation,
}

#[derive(Debug, Subcommand)]
pub enum Operation {
    /// Force the battery to charge from the grid
    Charge(ForceArgs),
    /// Force the battery to discharge
    Discharge(ForceArgs),
    /// Cancel any forced charge or discharge
    Stop,
    /// Poll inverter telemetry until interrupted
    Telemetry {
        /// Stop after this many seconds
        #[clap(long)]
        run_for: Option<u64>,
    },
    /// Read every known register once
    Dump,
    /// Show the forced-mode registers and their current values
    BatteryInfo,
    /// Write the default battery limits
    RestoreDefaults,
    /// Charge, stop, discharge, stop
    Cycle {
        #[clap(long)]
        power: u32,
        #[clap(long)]
        minutes: u16,
    },
    /// Read registers by name
    Read {
        #[clap(required = true)]
        names: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct ForceArgs {
    /// Power in watts
    #[clap(long)]
    pub power: u32,

    /// Run for this many minutes
    #[clap(long, conflicts_with = "soc", required_unless_present = "soc")]
    pub minutes: Option<u16>,

    /// Run until the battery reaches this SoC (%)
    #[clap(long)]
    pub soc: Option<u8>,

    /// Seconds to hold the mode before stopping. Defaults to the duration, or
    /// waiting for the SoC target.
    #[clap(long)]
    pub hold: Option<u64>,
}

impl Options {
    pub fn new() -> Self {
        Self::parse()
    }
}
