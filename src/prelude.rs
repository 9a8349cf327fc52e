pub use anyhow::{anyhow, bail, Context, Error, Result};
pub use log::{debug, error, info, trace, warn};
pub use std::sync::Arc;
pub use tokio::sync::broadcast;

pub use crate::{
    channels::Channels,
    command::Command,
    config::{self, Config},
    device::{Credential, Device},
    error::DeviceError,
    options::Options,
    register::{self, Register, Value},
};
