//! Installer login over the vendor-specific Modbus function 0x41.
//!
//! The inverter hands out a 16 byte challenge (sub-function 0x24). The client
//! answers (sub-function 0x25) with its own random challenge, the username
//! and HMAC-SHA256 of the inverter challenge keyed with SHA-256(password).
//! Only the payload encoding lives here; sending it is the transport's job.

use crate::prelude::*;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const FUNCTION_CODE: u8 = 0x41;

const CHALLENGE: u8 = 0x24;
const LOGIN: u8 = 0x25;

pub const CHALLENGE_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

pub fn challenge_request() -> Vec<u8> {
    vec![CHALLENGE, 0x01, 0x00]
}

/// `data` is the custom response body, starting with the echoed sub-function.
pub fn parse_challenge(data: &[u8]) -> Result<[u8; CHALLENGE_LEN]> {
    match data.first() {
        Some(&CHALLENGE) => {}
        other => bail!("unexpected challenge reply sub-function {:?}", other),
    }

    // sub-function, length byte, then the challenge itself
    let challenge = data
        .get(2..2 + CHALLENGE_LEN)
        .ok_or_else(|| anyhow!("challenge reply too short ({} bytes)", data.len()))?;

    let mut r = [0u8; CHALLENGE_LEN];
    r.copy_from_slice(challenge);
    Ok(r)
}

pub fn digest(password: &str, seed: &[u8]) -> Result<Vec<u8>> {
    let key = Sha256::digest(password.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|err| anyhow!("invalid hmac key: {}", err))?;
    mac.update(seed);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn login_request(
    username: &str,
    password: &str,
    inverter_challenge: &[u8; CHALLENGE_LEN],
    client_challenge: &[u8; CHALLENGE_LEN],
) -> Result<Vec<u8>> {
    let username = username.as_bytes();
    let hashed = digest(password, inverter_challenge)?;

    let body_len = CHALLENGE_LEN + 1 + username.len() + 1 + hashed.len();
    if body_len > u8::MAX as usize {
        bail!("username too long for login request");
    }

    let mut r = Vec::with_capacity(2 + body_len);
    r.push(LOGIN);
    r.push(body_len as u8);
    r.extend_from_slice(client_challenge);
    r.push(username.len() as u8);
    r.extend_from_slice(username);
    r.push(hashed.len() as u8);
    r.extend_from_slice(&hashed);

    Ok(r)
}

pub fn parse_login_reply(data: &[u8]) -> Result<()> {
    match data {
        [LOGIN, 0, ..] => Ok(()),
        [LOGIN, status, ..] => bail!("inverter refused login (status {})", status),
        _ => bail!("malformed login reply {:?}", data),
    }
}
