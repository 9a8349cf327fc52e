use crate::prelude::*;

use crate::register::{
    STORAGE_CHARGE_FROM_GRID_FUNCTION, STORAGE_CHARGING_CUTOFF_CAPACITY,
    STORAGE_DISCHARGING_CUTOFF_CAPACITY, STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD,
    STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC, STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE,
    STORAGE_FORCIBLE_CHARGE_POWER, STORAGE_FORCIBLE_DISCHARGE_POWER,
    STORAGE_MAXIMUM_CHARGING_POWER, STORAGE_MAXIMUM_DISCHARGING_POWER,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Value latched by the trigger register. The device applies the other
/// forced-mode registers when this one is written, so it always goes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum ForcibleMode {
    Stop = 0,
    Charge = 1,
    Discharge = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub register: &'static Register,
    /// engineering units, before the register's gain is applied
    pub value: i64,
    pub label: String,
}

impl CommandStep {
    pub fn new(register: &'static Register, value: i64, label: &str) -> Self {
        Self {
            register,
            value,
            label: label.to_string(),
        }
    }

    pub fn expected(&self) -> Value {
        Value::from_units(self.register, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: &'static str,
    pub steps: Vec<CommandStep>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn trigger(mode: ForcibleMode, label: &str) -> CommandStep {
        CommandStep::new(
            &STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE,
            u16::from(mode) as i64,
            label,
        )
    }

    pub fn charge_for(power: u32, minutes: u16) -> Self {
        Self {
            name: "charge_for",
            steps: vec![
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC, 100, "Target SoC for Charge"),
                CommandStep::new(
                    &STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD,
                    minutes as i64,
                    "Charge Duration (min)",
                ),
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_POWER, power as i64, "Charge Power (W)"),
                Self::trigger(ForcibleMode::Charge, "Trigger Charge"),
            ],
        }
    }

    pub fn discharge_for(power: u32, minutes: u16) -> Self {
        Self {
            name: "discharge_for",
            steps: vec![
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC, 0, "Target SoC for Discharge"),
                CommandStep::new(
                    &STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD,
                    minutes as i64,
                    "Discharge Duration (min)",
                ),
                CommandStep::new(&STORAGE_FORCIBLE_DISCHARGE_POWER, power as i64, "Discharge Power (W)"),
                Self::trigger(ForcibleMode::Discharge, "Trigger Discharge"),
            ],
        }
    }

    pub fn charge_to(power: u32, soc: u8) -> Self {
        Self {
            name: "charge_to",
            steps: vec![
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC, soc as i64, "Target SoC for Charge"),
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_POWER, power as i64, "Charge Power (W)"),
                Self::trigger(ForcibleMode::Charge, "Trigger Charge"),
            ],
        }
    }

    pub fn discharge_to(power: u32, soc: u8) -> Self {
        Self {
            name: "discharge_to",
            steps: vec![
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC, soc as i64, "Target SoC for Discharge"),
                CommandStep::new(&STORAGE_FORCIBLE_DISCHARGE_POWER, power as i64, "Discharge Power (W)"),
                Self::trigger(ForcibleMode::Discharge, "Trigger Discharge"),
            ],
        }
    }

    pub fn stop() -> Self {
        Self {
            name: "stop",
            steps: vec![
                CommandStep::new(&STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD, 0, "Clear Duration (min)"),
                CommandStep::new(&STORAGE_FORCIBLE_CHARGE_POWER, 0, "Clear Charge Power"),
                CommandStep::new(&STORAGE_FORCIBLE_DISCHARGE_POWER, 0, "Clear Discharge Power"),
                Self::trigger(ForcibleMode::Stop, "Stop Charge/Discharge"),
            ],
        }
    }

    pub fn restore_defaults() -> Self {
        Self {
            name: "restore_defaults",
            steps: vec![
                CommandStep::new(&STORAGE_CHARGING_CUTOFF_CAPACITY, 100, "Max SoC (%)"),
                CommandStep::new(&STORAGE_DISCHARGING_CUTOFF_CAPACITY, 10, "Min SoC (%)"),
                CommandStep::new(&STORAGE_MAXIMUM_CHARGING_POWER, 3000, "Max Charging Power (W)"),
                CommandStep::new(&STORAGE_MAXIMUM_DISCHARGING_POWER, 3000, "Max Discharging Power (W)"),
                CommandStep::new(&STORAGE_CHARGE_FROM_GRID_FUNCTION, 1, "Charge From Grid Enable"),
            ],
        }
    }
}
