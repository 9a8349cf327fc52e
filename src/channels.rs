use crate::prelude::*;

use chrono::{DateTime, Utc};

/// One register observation, fanned out to whichever sinks are listening.
#[derive(Debug, Clone)]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub register: &'static str,
    pub address: u16,
    pub unit: Option<&'static str>,
    pub value: Result<Value, String>,
}

impl Report {
    pub fn new(register: &'static Register, label: &str, value: &Result<Value, DeviceError>) -> Self {
        Self {
            timestamp: Utc::now(),
            label: label.to_string(),
            register: register.name,
            address: register.address,
            unit: register.unit,
            value: value.as_ref().map(|v| *v).map_err(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChannelData {
    Report(Report),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct Channels {
    pub reports: broadcast::Sender<ChannelData>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            reports: Self::channel(),
        }
    }

    /// Nobody listening is fine; reports are also logged at the source.
    pub fn report(&self, report: Report) {
        let _ = self.reports.send(ChannelData::Report(report));
    }

    pub fn shutdown(&self) {
        let _ = self.reports.send(ChannelData::Shutdown);
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
