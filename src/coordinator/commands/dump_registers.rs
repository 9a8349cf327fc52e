use crate::prelude::*;

use super::read_param::ReadParam;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub read: usize,
    pub failed: usize,
}

/// Reads every register in the catalog once.
pub struct DumpRegisters {
    device: Arc<dyn Device>,
    channels: Channels,
}

impl DumpRegisters {
    pub fn new(device: Arc<dyn Device>, channels: Channels) -> Self {
        Self { device, channels }
    }

    pub async fn run(&self) -> DumpSummary {
        let mut summary = DumpSummary::default();

        for register in register::CATALOG {
            let label = format!("{} ({})", register.name, register.address);

            match ReadParam::new(self.device.clone(), self.channels.clone(), register, &label)
                .tag("DUMP")
                .run()
                .await
            {
                Ok(_) => summary.read += 1,
                Err(_) => summary.failed += 1,
            }
        }

        info!(
            "[DUMP] {} register(s) read, {} failed",
            summary.read, summary.failed
        );

        summary
    }
}
