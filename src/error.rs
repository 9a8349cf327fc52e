use thiserror::Error;

/// Failures surfaced by a device session.
///
/// Connection and authentication failures abort whatever operation asked for
/// them. Read and write failures are per-register and callers generally log
/// them and carry on.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("login as {username} rejected: {reason}")]
    Auth { username: String, reason: String },

    #[error("failed to read {register}: {reason}")]
    Read { register: &'static str, reason: String },

    #[error("failed to write {register}: {reason}")]
    Write { register: &'static str, reason: String },
}

impl DeviceError {
    pub fn read(register: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Read {
            register,
            reason: reason.to_string(),
        }
    }

    pub fn write(register: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Write {
            register,
            reason: reason.to_string(),
        }
    }
}
