use crate::prelude::*;

use super::{login, Credential, Transport};

use async_trait::async_trait;
use std::time::Duration;
use tokio_modbus::client::{rtu, tcp, Context};
use tokio_modbus::prelude::{Client, Reader, Request, Response, Slave, Writer};
use tokio_serial::SerialPortBuilderExt;

/// [`Transport`] backed by tokio-modbus, over TCP or a serial RTU link.
pub struct ModbusTransport {
    ctx: Context,
    session_timeout: Option<Duration>,
}

impl ModbusTransport {
    pub async fn connect(endpoint: &config::Endpoint, session_timeout: Duration) -> Result<Self> {
        match endpoint {
            config::Endpoint::Tcp(cfg) => {
                let addr = tokio::net::lookup_host((cfg.host(), cfg.port()))
                    .await?
                    .next()
                    .ok_or_else(|| anyhow!("could not resolve {}", cfg.host()))?;

                let ctx = tcp::connect_slave(addr, Slave(cfg.slave_id())).await?;

                Ok(Self {
                    ctx,
                    session_timeout: Some(session_timeout),
                })
            }
            config::Endpoint::Rtu(cfg) => {
                let port = tokio_serial::new(cfg.port(), cfg.baud_rate()).open_native_async()?;
                let ctx = rtu::attach_slave(port, Slave(cfg.slave_id()));

                Ok(Self {
                    ctx,
                    session_timeout: None,
                })
            }
        }
    }

    async fn custom(&mut self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let request = Request::Custom(login::FUNCTION_CODE, payload.into());

        match self.ctx.call(request).await {
            Ok(Ok(Response::Custom(function, data))) if function == login::FUNCTION_CODE => {
                Ok(data[..].to_vec())
            }
            Ok(Ok(other)) => bail!("unexpected response {:?}", other),
            Ok(Err(exception)) => bail!("modbus exception {:?}", exception),
            Err(err) => bail!("{}", err),
        }
    }
}

#[async_trait]
impl Transport for ModbusTransport {
    async fn login(&mut self, credential: &Credential) -> Result<()> {
        let reply = self.custom(login::challenge_request()).await?;
        let inverter_challenge = login::parse_challenge(&reply)?;

        let client_challenge: [u8; login::CHALLENGE_LEN] = rand::random();
        let request = login::login_request(
            &credential.username,
            &credential.password,
            &inverter_challenge,
            &client_challenge,
        )?;

        let reply = self.custom(request).await?;
        login::parse_login_reply(&reply)
    }

    async fn get(&mut self, register: &Register) -> Result<Vec<u16>> {
        match self
            .ctx
            .read_holding_registers(register.address, register.data_type.words())
            .await
        {
            Ok(Ok(words)) => Ok(words),
            Ok(Err(exception)) => bail!("modbus exception {:?}", exception),
            Err(err) => bail!("{}", err),
        }
    }

    async fn set(&mut self, register: &Register, words: &[u16]) -> Result<()> {
        match self.ctx.write_multiple_registers(register.address, words).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(exception)) => bail!("modbus exception {:?}", exception),
            Err(err) => bail!("{}", err),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.ctx
            .disconnect()
            .await
            .map_err(|err| anyhow!("disconnect failed: {}", err))?;
        Ok(())
    }

    fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout
    }
}
