use crate::prelude::*;

use super::plan::Plan;
use super::read_param::ReadParam;

/// Describes which registers each forced-mode plan touches, then reads their
/// current values.
pub struct BatteryInfo {
    device: Arc<dyn Device>,
    channels: Channels,
}

impl BatteryInfo {
    pub fn new(device: Arc<dyn Device>, channels: Channels) -> Self {
        Self { device, channels }
    }

    /// Plans built with placeholder arguments; only their registers matter.
    pub fn layouts() -> Vec<Plan> {
        vec![
            Plan::charge_for(0, 0),
            Plan::discharge_for(0, 0),
            Plan::charge_to(0, 0),
            Plan::discharge_to(0, 0),
            Plan::stop(),
        ]
    }

    /// Distinct registers across all layouts, in first-seen order.
    pub fn registers() -> Vec<&'static Register> {
        let mut registers: Vec<&'static Register> = Vec::new();

        for plan in Self::layouts() {
            for step in plan.steps {
                if !registers.contains(&step.register) {
                    registers.push(step.register);
                }
            }
        }

        registers
    }

    pub async fn run(&self) -> Result<()> {
        for plan in Self::layouts() {
            info!("--- {} ---", plan.name);
            for step in &plan.steps {
                info!(
                    "  {:<48} {:>5}  {:<4} {}",
                    step.register.name,
                    step.register.address,
                    step.register.unit.unwrap_or("-"),
                    step.label
                );
            }
        }

        let mut failed = 0;
        for register in Self::registers() {
            if ReadParam::new(self.device.clone(), self.channels.clone(), register, register.name)
                .run()
                .await
                .is_err()
            {
                failed += 1;
            }
        }

        if failed > 0 {
            warn!("{} forced-mode register(s) could not be read", failed);
        }

        Ok(())
    }
}
