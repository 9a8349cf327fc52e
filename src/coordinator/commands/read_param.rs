use crate::prelude::*;

use crate::channels::Report;

/// Reads one register, logs it under `label` and publishes a [`Report`].
pub struct ReadParam {
    device: Arc<dyn Device>,
    channels: Channels,
    register: &'static Register,
    label: String,
    tag: &'static str,
}

impl ReadParam {
    pub fn new(device: Arc<dyn Device>, channels: Channels, register: &'static Register, label: &str) -> Self {
        Self {
            device,
            channels,
            register,
            label: label.to_string(),
            tag: "READ",
        }
    }

    /// Log tag, `READ` unless overridden.
    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }

    pub async fn run(&self) -> Result<Value, DeviceError> {
        let result = self.device.read(self.register).await;

        match &result {
            Ok(value) => info!(
                "[{}] {} = {}{}",
                self.tag,
                self.label,
                value,
                self.register.unit.map(|u| format!(" {}", u)).unwrap_or_default()
            ),
            Err(e) => error!("Failed to read {}: {}", self.label, e),
        }

        self.channels.report(Report::new(self.register, &self.label, &result));

        result
    }
}
