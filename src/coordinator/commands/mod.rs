pub mod battery_info;
pub mod dump_registers;
pub mod plan;
pub mod read_param;
pub mod sequencer;
pub mod wait_for_soc;
