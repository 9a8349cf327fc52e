#![allow(dead_code)]

use sun2000_control::device::Transport;
use sun2000_control::prelude::*;

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory();
impl Factory {
    pub fn config() -> Config {
        Self::config_with("")
    }

    /// TCP config with no settle delay, plus any extra top-level YAML.
    pub fn config_with(extra: &str) -> Config {
        let yaml = format!(
            "endpoint:\n  tcp:\n    host: 127.0.0.1\n    password: \"00000a\"\nconnect_delay_secs: 0\n{}",
            extra
        );
        Config::from_yaml(&yaml).unwrap()
    }

    pub fn tcp_endpoint() -> config::Endpoint {
        Self::config().endpoint().clone()
    }

    pub fn rtu_endpoint() -> config::Endpoint {
        Config::from_yaml("endpoint:\n  rtu:\n    port: /dev/ttyUSB0\n")
            .unwrap()
            .endpoint()
            .clone()
    }

    pub fn credential() -> Credential {
        Credential::new("installer", "00000a")
    }
}

// MockDevice {{{
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Read(&'static str),
    Write(&'static str, i64),
}

/// In-memory register store. Reads echo the last written raw value unless
/// told otherwise.
#[derive(Default)]
pub struct MockDevice {
    values: Mutex<HashMap<&'static str, i64>>,
    queued: Mutex<HashMap<&'static str, VecDeque<i64>>>,
    mismatches: Mutex<HashMap<&'static str, i64>>,
    failing_reads: Mutex<HashSet<&'static str>>,
    failing_writes: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<Call>>,
    closes: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_raw(&self, register: &'static Register, raw: i64) {
        self.values.lock().unwrap().insert(register.name, raw);
    }

    /// Successive reads return these raw values; the last one sticks.
    pub fn queue_raw(&self, register: &'static Register, raws: &[i64]) {
        self.queued
            .lock()
            .unwrap()
            .insert(register.name, raws.iter().copied().collect());
    }

    pub fn mismatch_on(&self, register: &'static Register, raw: i64) {
        self.mismatches.lock().unwrap().insert(register.name, raw);
    }

    pub fn fail_reads_from(&self, register: &'static Register) {
        self.failing_reads.lock().unwrap().insert(register.name);
    }

    pub fn fail_writes_to(&self, register: &'static Register) {
        self.failing_writes.lock().unwrap().insert(register.name);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn writes(&self) -> Vec<(&'static str, i64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Write(name, raw) => Some((name, raw)),
                Call::Read(_) => None,
            })
            .collect()
    }

    pub fn reads_of(&self, register: &'static Register) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == Call::Read(register.name))
            .count()
    }

    pub fn reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Read(_)))
            .count()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Device for MockDevice {
    async fn read(&self, register: &'static Register) -> Result<Value, DeviceError> {
        self.calls.lock().unwrap().push(Call::Read(register.name));

        if self.failing_reads.lock().unwrap().contains(register.name) {
            return Err(DeviceError::read(register.name, "mock read failure"));
        }

        if let Some(raw) = self.mismatches.lock().unwrap().get(register.name) {
            return Ok(Value::from_raw(register, *raw));
        }

        if let Some(queue) = self.queued.lock().unwrap().get_mut(register.name) {
            let raw = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().copied()
            };
            if let Some(raw) = raw {
                return Ok(Value::from_raw(register, raw));
            }
        }

        let raw = self
            .values
            .lock()
            .unwrap()
            .get(register.name)
            .copied()
            .unwrap_or(0);

        Ok(Value::from_raw(register, raw))
    }

    async fn write(&self, register: &'static Register, value: Value) -> Result<(), DeviceError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Write(register.name, value.raw()));

        if self.failing_writes.lock().unwrap().contains(register.name) {
            return Err(DeviceError::write(register.name, "mock write failure"));
        }

        self.values.lock().unwrap().insert(register.name, value.raw());

        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
} // }}}

// MockTransport {{{
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Login(String),
    Get(u16),
    Set(u16, Vec<u16>),
    Stop,
}

/// Word-level transport. The call log is shared so it can be inspected after
/// the transport has been moved into a session.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub log: Arc<Mutex<Vec<TransportCall>>>,
    pub words: Arc<Mutex<HashMap<u16, Vec<u16>>>>,
    pub session_timeout: Option<Duration>,
    pub reject_login: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            session_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        }
    }

    pub fn reject_logins(&self, reject: bool) {
        self.reject_login.store(reject, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.log.lock().unwrap().clone()
    }

    pub fn logins(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Login(_)))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn login(&mut self, credential: &Credential) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(TransportCall::Login(credential.username.clone()));

        if self.reject_login.load(Ordering::SeqCst) {
            bail!("login rejected by inverter");
        }

        Ok(())
    }

    async fn get(&mut self, register: &Register) -> Result<Vec<u16>> {
        self.log.lock().unwrap().push(TransportCall::Get(register.address));

        Ok(self
            .words
            .lock()
            .unwrap()
            .get(&register.address)
            .cloned()
            .unwrap_or_else(|| vec![0; register.data_type.words() as usize]))
    }

    async fn set(&mut self, register: &Register, words: &[u16]) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(TransportCall::Set(register.address, words.to_vec()));
        self.words
            .lock()
            .unwrap()
            .insert(register.address, words.to_vec());

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(TransportCall::Stop);
        Ok(())
    }

    fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout
    }
} // }}}
