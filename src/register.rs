use crate::prelude::*;

// DataType {{{
/// Register layout on the wire. Multi-word values are big-endian word order
/// (high word at the lower address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    U16,
    I16,
    U32,
    I32,
}

impl DataType {
    pub fn words(self) -> u16 {
        match self {
            DataType::U16 | DataType::I16 => 1,
            DataType::U32 | DataType::I32 => 2,
        }
    }

    fn range(self) -> (i64, i64) {
        match self {
            DataType::U16 => (0, u16::MAX as i64),
            DataType::I16 => (i16::MIN as i64, i16::MAX as i64),
            DataType::U32 => (0, u32::MAX as i64),
            DataType::I32 => (i32::MIN as i64, i32::MAX as i64),
        }
    }

    pub fn encode(self, raw: i64) -> Result<Vec<u16>> {
        let (min, max) = self.range();
        if raw < min || raw > max {
            bail!("value {} out of range for {:?} ({}..={})", raw, self, min, max);
        }

        Ok(match self {
            DataType::U16 => vec![raw as u16],
            DataType::I16 => vec![raw as i16 as u16],
            DataType::U32 => {
                let v = raw as u32;
                vec![(v >> 16) as u16, v as u16]
            }
            DataType::I32 => {
                let v = raw as i32 as u32;
                vec![(v >> 16) as u16, v as u16]
            }
        })
    }

    pub fn decode(self, words: &[u16]) -> Result<i64> {
        if words.len() != self.words() as usize {
            bail!(
                "expected {} word(s) for {:?}, got {}",
                self.words(),
                self,
                words.len()
            );
        }

        Ok(match self {
            DataType::U16 => words[0] as i64,
            DataType::I16 => words[0] as i16 as i64,
            DataType::U32 => (((words[0] as u32) << 16) | words[1] as u32) as i64,
            DataType::I32 => ((((words[0] as u32) << 16) | words[1] as u32) as i32) as i64,
        })
    }
} // }}}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

// Register {{{
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Register {
    pub name: &'static str,
    pub address: u16,
    pub data_type: DataType,
    /// engineering value * gain = raw register value
    pub gain: u32,
    pub unit: Option<&'static str>,
    pub kind: Kind,
    pub access: Access,
}

impl Register {
    pub const fn new(name: &'static str, address: u16, data_type: DataType) -> Self {
        Self {
            name,
            address,
            data_type,
            gain: 1,
            unit: None,
            kind: Kind::Integer,
            access: Access::ReadOnly,
        }
    }

    const fn gain(mut self, gain: u32) -> Self {
        self.gain = gain;
        self
    }

    const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    const fn enumeration(mut self) -> Self {
        self.kind = Kind::Enum;
        self
    }

    const fn writable(mut self) -> Self {
        self.access = Access::ReadWrite;
        self
    }

    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    pub fn encode(&self, value: Value) -> Result<Vec<u16>> {
        self.data_type.encode(value.raw())
    }

    pub fn decode(&self, words: &[u16]) -> Result<Value> {
        Ok(Value::from_raw(self, self.data_type.decode(words)?))
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
} // }}}

// Value {{{
/// Canonical content of a register: the raw integer stored on the device,
/// carried with the register's gain so it can be shown in engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    raw: i64,
    gain: u32,
}

impl Value {
    pub fn from_raw(register: &Register, raw: i64) -> Self {
        Self {
            raw,
            gain: register.gain,
        }
    }

    pub fn from_units(register: &Register, units: i64) -> Self {
        Self {
            raw: units * register.gain as i64,
            gain: register.gain,
        }
    }

    pub fn raw(&self) -> i64 {
        self.raw
    }

    pub fn as_f64(&self) -> f64 {
        self.raw as f64 / self.gain as f64
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.gain <= 1 {
            write!(f, "{}", self.raw)
        } else {
            let precision = (self.gain as f64).log10().ceil() as usize;
            write!(f, "{:.*}", precision, self.as_f64())
        }
    }
} // }}}

// Catalog {{{
pub static RATED_POWER: Register = Register::new("rated_power", 30073, DataType::U32).unit("W");
pub static INPUT_POWER: Register = Register::new("input_power", 32064, DataType::I32).unit("W");
pub static GRID_VOLTAGE: Register =
    Register::new("grid_voltage", 32069, DataType::U16).gain(10).unit("V");
pub static ACTIVE_POWER: Register = Register::new("active_power", 32080, DataType::I32).unit("W");
pub static REACTIVE_POWER: Register =
    Register::new("reactive_power", 32082, DataType::I32).unit("var");
pub static POWER_FACTOR: Register = Register::new("power_factor", 32084, DataType::I16).gain(1000);
pub static GRID_FREQUENCY: Register =
    Register::new("grid_frequency", 32085, DataType::U16).gain(100).unit("Hz");
pub static INTERNAL_TEMPERATURE: Register =
    Register::new("internal_temperature", 32087, DataType::I16).gain(10).unit("°C");
pub static DEVICE_STATUS: Register =
    Register::new("device_status", 32089, DataType::U16).enumeration();
pub static ACCUMULATED_YIELD_ENERGY: Register =
    Register::new("accumulated_yield_energy", 32106, DataType::U32).gain(100).unit("kWh");
pub static DAILY_YIELD_ENERGY: Register =
    Register::new("daily_yield_energy", 32114, DataType::U32).gain(100).unit("kWh");

pub static STORAGE_CURRENT_DAY_CHARGE_CAPACITY: Register =
    Register::new("storage_current_day_charge_capacity", 37015, DataType::U32).gain(100).unit("kWh");
pub static STORAGE_CURRENT_DAY_DISCHARGE_CAPACITY: Register =
    Register::new("storage_current_day_discharge_capacity", 37017, DataType::U32).gain(100).unit("kWh");
pub static STORAGE_STATE_OF_CAPACITY: Register =
    Register::new("storage_state_of_capacity", 37760, DataType::U16).gain(10).unit("%");
pub static STORAGE_RUNNING_STATUS: Register =
    Register::new("storage_running_status", 37762, DataType::U16).enumeration();
pub static STORAGE_BUS_VOLTAGE: Register =
    Register::new("storage_bus_voltage", 37763, DataType::U16).gain(10).unit("V");
pub static STORAGE_CHARGE_DISCHARGE_POWER: Register =
    Register::new("storage_charge_discharge_power", 37765, DataType::I32).unit("W");

pub static STORAGE_MAXIMUM_CHARGING_POWER: Register =
    Register::new("storage_maximum_charging_power", 47075, DataType::U32).unit("W").writable();
pub static STORAGE_MAXIMUM_DISCHARGING_POWER: Register =
    Register::new("storage_maximum_discharging_power", 47077, DataType::U32).unit("W").writable();
pub static STORAGE_CHARGING_CUTOFF_CAPACITY: Register =
    Register::new("storage_charging_cutoff_capacity", 47081, DataType::U16).gain(10).unit("%").writable();
pub static STORAGE_DISCHARGING_CUTOFF_CAPACITY: Register =
    Register::new("storage_discharging_cutoff_capacity", 47082, DataType::U16).gain(10).unit("%").writable();
pub static STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD: Register =
    Register::new("storage_forced_charging_and_discharging_period", 47083, DataType::U16).unit("min").writable();
pub static STORAGE_WORKING_MODE_SETTINGS: Register =
    Register::new("storage_working_mode_settings", 47086, DataType::U16).enumeration().writable();
pub static STORAGE_CHARGE_FROM_GRID_FUNCTION: Register =
    Register::new("storage_charge_from_grid_function", 47087, DataType::U16).enumeration().writable();
pub static STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE: Register =
    Register::new("storage_forcible_charge_discharge_write", 47100, DataType::U16).enumeration().writable();
pub static STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC: Register =
    Register::new("storage_forcible_charge_discharge_soc", 47101, DataType::U16).gain(10).unit("%").writable();
pub static STORAGE_FORCIBLE_CHARGE_POWER: Register =
    Register::new("storage_forcible_charge_power", 47247, DataType::U32).unit("W").writable();
pub static STORAGE_FORCIBLE_DISCHARGE_POWER: Register =
    Register::new("storage_forcible_discharge_power", 47249, DataType::U32).unit("W").writable();

pub static CATALOG: &[&Register] = &[
    &RATED_POWER,
    &INPUT_POWER,
    &GRID_VOLTAGE,
    &ACTIVE_POWER,
    &REACTIVE_POWER,
    &POWER_FACTOR,
    &GRID_FREQUENCY,
    &INTERNAL_TEMPERATURE,
    &DEVICE_STATUS,
    &ACCUMULATED_YIELD_ENERGY,
    &DAILY_YIELD_ENERGY,
    &STORAGE_CURRENT_DAY_CHARGE_CAPACITY,
    &STORAGE_CURRENT_DAY_DISCHARGE_CAPACITY,
    &STORAGE_STATE_OF_CAPACITY,
    &STORAGE_RUNNING_STATUS,
    &STORAGE_BUS_VOLTAGE,
    &STORAGE_CHARGE_DISCHARGE_POWER,
    &STORAGE_MAXIMUM_CHARGING_POWER,
    &STORAGE_MAXIMUM_DISCHARGING_POWER,
    &STORAGE_CHARGING_CUTOFF_CAPACITY,
    &STORAGE_DISCHARGING_CUTOFF_CAPACITY,
    &STORAGE_FORCED_CHARGING_AND_DISCHARGING_PERIOD,
    &STORAGE_WORKING_MODE_SETTINGS,
    &STORAGE_CHARGE_FROM_GRID_FUNCTION,
    &STORAGE_FORCIBLE_CHARGE_DISCHARGE_WRITE,
    &STORAGE_FORCIBLE_CHARGE_DISCHARGE_SOC,
    &STORAGE_FORCIBLE_CHARGE_POWER,
    &STORAGE_FORCIBLE_DISCHARGE_POWER,
];

pub fn lookup(name: &str) -> Option<&'static Register> {
    CATALOG.iter().copied().find(|r| r.name == name)
}

pub fn get(name: &str) -> Result<&'static Register> {
    lookup(name).ok_or_else(|| anyhow!("unknown register {}", name))
} // }}}
