use crate::prelude::*;

use super::{Credential, Device, ModbusTransport, Transport};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated { credential: Credential, since: Instant },
}

struct Inner<T> {
    // None once closed
    transport: Option<T>,
    auth: AuthState,
    last_activity: Instant,
}

/// One logical connection to one device endpoint.
///
/// Every transport call goes through a single async mutex, so the telemetry
/// poller and the command sequencer never have two requests on the wire.
pub struct Session<T: Transport> {
    endpoint: config::Endpoint,
    io_timeout: Duration,
    inner: Mutex<Inner<T>>,
}

impl Session<ModbusTransport> {
    pub async fn connect(config: &Config) -> Result<Self, DeviceError> {
        let endpoint = config.endpoint();
        info!("connecting to {}", endpoint);

        let transport = match tokio::time::timeout(
            config.io_timeout(),
            ModbusTransport::connect(endpoint, config.session_timeout()),
        )
        .await
        {
            Ok(Ok(transport)) => transport,
            Ok(Err(err)) => {
                return Err(DeviceError::Connection {
                    endpoint: endpoint.to_string(),
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                return Err(DeviceError::Connection {
                    endpoint: endpoint.to_string(),
                    reason: format!("timeout after {}s", config.io_timeout().as_secs()),
                })
            }
        };

        info!("connected to {}", endpoint);

        if !config.connect_delay().is_zero() {
            info!("waiting {}s for the inverter to settle", config.connect_delay().as_secs());
            tokio::time::sleep(config.connect_delay()).await;
        }

        Ok(Self::new(endpoint.clone(), transport, config.io_timeout()))
    }
}

impl<T: Transport> Session<T> {
    pub fn new(endpoint: config::Endpoint, transport: T, io_timeout: Duration) -> Self {
        Self {
            endpoint,
            io_timeout,
            inner: Mutex::new(Inner {
                transport: Some(transport),
                auth: AuthState::Unauthenticated,
                last_activity: Instant::now(),
            }),
        }
    }

    pub fn endpoint(&self) -> &config::Endpoint {
        &self.endpoint
    }

    pub async fn auth_state(&self) -> AuthState {
        self.inner.lock().await.auth.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.transport.is_none()
    }

    /// Logs in over network transports. Serial links have no login and this
    /// is a no-op for them.
    pub async fn authenticate(&self, credential: &Credential) -> Result<(), DeviceError> {
        if self.endpoint.is_serial() {
            info!("{}: serial transport, skipping login", self.endpoint);
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        self.login(&mut inner, credential).await?;
        info!("{}: logged in as {}", self.endpoint, credential.username);

        Ok(())
    }

    async fn login(&self, inner: &mut Inner<T>, credential: &Credential) -> Result<(), DeviceError> {
        let auth_error = |reason: String| DeviceError::Auth {
            username: credential.username.clone(),
            reason,
        };

        let transport = inner
            .transport
            .as_mut()
            .ok_or_else(|| auth_error("session closed".to_string()))?;

        bounded(self.io_timeout, transport.login(credential))
            .await
            .map_err(|err| auth_error(err.to_string()))?;

        let now = Instant::now();
        inner.auth = AuthState::Authenticated {
            credential: credential.clone(),
            since: now,
        };
        inner.last_activity = now;

        Ok(())
    }

    // write path only: logins expire after the transport's idle timeout
    async fn ensure_authenticated(&self, inner: &mut Inner<T>) -> Result<()> {
        let AuthState::Authenticated { credential, .. } = &inner.auth else {
            return Ok(());
        };

        let Some(timeout) = inner.transport.as_ref().and_then(|t| t.session_timeout()) else {
            return Ok(());
        };

        if inner.last_activity.elapsed() < timeout {
            return Ok(());
        }

        let credential = credential.clone();
        debug!(
            "{}: idle for {}s, logging in again",
            self.endpoint,
            inner.last_activity.elapsed().as_secs()
        );
        self.login(inner, &credential).await?;

        Ok(())
    }
}

#[async_trait]
impl<T: Transport + Send> Device for Session<T> {
    async fn read(&self, register: &'static Register) -> Result<Value, DeviceError> {
        let mut inner = self.inner.lock().await;
        let transport = inner
            .transport
            .as_mut()
            .ok_or_else(|| DeviceError::read(register.name, "session closed"))?;

        let words = bounded(self.io_timeout, transport.get(register))
            .await
            .map_err(|err| DeviceError::read(register.name, err))?;
        inner.last_activity = Instant::now();

        register
            .decode(&words)
            .map_err(|err| DeviceError::read(register.name, err))
    }

    async fn write(&self, register: &'static Register, value: Value) -> Result<(), DeviceError> {
        if !register.is_writable() {
            return Err(DeviceError::write(register.name, "register is read-only"));
        }

        let words = register
            .encode(value)
            .map_err(|err| DeviceError::write(register.name, err))?;

        let mut inner = self.inner.lock().await;
        if inner.transport.is_none() {
            return Err(DeviceError::write(register.name, "session closed"));
        }

        self.ensure_authenticated(&mut inner)
            .await
            .map_err(|err| DeviceError::write(register.name, err))?;

        let transport = inner
            .transport
            .as_mut()
            .ok_or_else(|| DeviceError::write(register.name, "session closed"))?;

        bounded(self.io_timeout, transport.set(register, &words))
            .await
            .map_err(|err| DeviceError::write(register.name, err))?;
        inner.last_activity = Instant::now();

        Ok(())
    }

    async fn close(&self) {
        let mut inner = self.inner.lock().await;
        let Some(mut transport) = inner.transport.take() else {
            debug!("{}: already closed", self.endpoint);
            return;
        };
        inner.auth = AuthState::Unauthenticated;

        match bounded(self.io_timeout, transport.stop()).await {
            Ok(()) => info!("{}: connection closed", self.endpoint),
            Err(err) => error!("{}: error closing connection: {}", self.endpoint, err),
        }
    }
}

async fn bounded<F, R>(limit: Duration, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(r) => r,
        Err(_) => bail!("timeout after {}s", limit.as_secs()),
    }
}
