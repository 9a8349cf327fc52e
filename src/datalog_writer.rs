use crate::prelude::*;

use crate::channels::{ChannelData, Report};

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Appends every [`Report`] to a file as one JSON object per line.
#[derive(Debug, Clone)]
pub struct DatalogWriter {
    file: Arc<Mutex<std::fs::File>>,
    path: String,
    values_written: Arc<Mutex<u64>>,
}

impl DatalogWriter {
    pub fn new(path: &str) -> Result<Self> {
        info!("Opening datalog file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open datalog file {}", path))?;

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_string(),
            values_written: Arc::new(Mutex::new(0)),
        })
    }

    /// Consumes reports until shutdown or until every sender is gone.
    pub async fn run(&self, mut receiver: broadcast::Receiver<ChannelData>) -> Result<()> {
        loop {
            match receiver.recv().await {
                Ok(ChannelData::Report(report)) => {
                    if let Err(e) = self.write_report(&report) {
                        error!("{}", e);
                    }
                }
                Ok(ChannelData::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("datalog writer lagged, {} report(s) dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("datalog writer stopped after {} value(s)", self.values_written());

        Ok(())
    }

    pub fn write_report(&self, report: &Report) -> Result<()> {
        let mut json = serde_json::json!({
            "utc_timestamp": report.timestamp.timestamp(),
            "label": report.label,
            "register": report.register,
            "address": report.address,
        });

        match &report.value {
            Ok(value) => {
                json["raw"] = value.raw().into();
                json["value"] = value.as_f64().into();
                if let Some(unit) = report.unit {
                    json["unit"] = unit.into();
                }
            }
            Err(e) => json["error"] = e.as_str().into(),
        }

        let line = serde_json::to_string(&json)?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("failed to lock datalog file"))?;
        writeln!(file, "{}", line)
            .and_then(|_| file.flush())
            .with_context(|| format!("failed to write datalog file {}", self.path))?;

        let mut values_written = self
            .values_written
            .lock()
            .map_err(|_| anyhow!("failed to lock values counter"))?;
        *values_written += 1;
        debug!("{} value(s) written to {}", *values_written, self.path);

        Ok(())
    }

    pub fn values_written(&self) -> u64 {
        self.values_written.lock().map(|v| *v).unwrap_or(0)
    }
}
