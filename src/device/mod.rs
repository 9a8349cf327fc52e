pub mod login;
pub mod modbus;
pub mod session;

use crate::prelude::*;

use async_trait::async_trait;
use std::time::Duration;

pub use modbus::ModbusTransport;
pub use session::{AuthState, Session};

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// Transport {{{
/// Raw register access provided by a Modbus client library.
///
/// Errors are whatever the provider produces; the session turns them into
/// [`DeviceError`]s.
#[async_trait]
pub trait Transport: Send {
    async fn login(&mut self, credential: &Credential) -> Result<()>;

    async fn get(&mut self, register: &Register) -> Result<Vec<u16>>;

    async fn set(&mut self, register: &Register, words: &[u16]) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    /// How long a login stays valid without traffic, if logins expire at all.
    fn session_timeout(&self) -> Option<Duration> {
        None
    }
} // }}}

// Device {{{
/// Register-level access to one device, shared between the sequencer and the
/// telemetry poller.
#[async_trait]
pub trait Device: Send + Sync {
    async fn read(&self, register: &'static Register) -> Result<Value, DeviceError>;

    async fn write(&self, register: &'static Register, value: Value) -> Result<(), DeviceError>;

    /// Idempotent, never fails.
    async fn close(&self);
} // }}}
