//! Challenge-response login against the router's management API.
//!
//! The device hands out a session token (`stok`) in exchange for a
//! double-hashed password: `H(nonce + H(password + SHARED_KEY))`, where `H`
//! is SHA-1 or SHA-256 depending on the model's firmware generation. The
//! nonce is minted client-side and sent along with the digest.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Error;

/// Encryption key baked into the firmware's image-packing tool. Shared by
/// all devices; not a user secret.
pub const SHARED_KEY: &str = "a2ffa5c9be07488bbb04a3a47d3c5f6a";

/// Hash algorithm used by the login handshake. A per-model policy, not a
/// runtime negotiation — newer firmware generations moved to SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Sha1,
    Sha256,
}

/// Single-use login nonce of the form `0_<epoch-seconds>_<random 0..9999>`.
pub struct Nonce(String);

impl Nonce {
    /// Mint a fresh nonce from the wall clock and a random draw.
    pub fn generate() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        Self::from_parts(epoch, rand::thread_rng().gen_range(0..10_000))
    }

    /// Build a nonce from explicit parts. Lets tests pin the exact value.
    pub fn from_parts(epoch_secs: u64, random: u16) -> Self {
        Nonce(format!("0_{}_{}", epoch_secs, random))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hash_hex(kind: HashKind, data: &str) -> String {
    match kind {
        HashKind::Sha1 => hex::encode(Sha1::digest(data.as_bytes())),
        HashKind::Sha256 => hex::encode(Sha256::digest(data.as_bytes())),
    }
}

/// Compute the login digest: `H(nonce + H(password + SHARED_KEY))`.
pub fn encrypt_password(password: &str, nonce: &str, kind: HashKind) -> String {
    let inner = hash_hex(kind, &format!("{}{}", password, SHARED_KEY));
    hash_hex(kind, &format!("{}{}", nonce, inner))
}

/// Login response. A non-zero `code` means failure, with the diagnostic
/// text riding in `url`.
#[derive(Deserialize)]
struct LoginResponse {
    code: i64,
    token: Option<String>,
    url: Option<String>,
}

/// Perform the nonce-challenge login and return the session token.
///
/// The token is obtained once per process invocation and never refreshed;
/// if it expires mid-run, subsequent requests simply fail.
pub async fn login(host: &str, password: &str, kind: HashKind) -> Result<String, Error> {
    let nonce = Nonce::generate();
    let encrypted = encrypt_password(password, nonce.as_str(), kind);

    let url = format!("http://{}/cgi-bin/luci/api/xqsystem/login", host);
    debug!("login request to {} with nonce {}", url, nonce.as_str());

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client");

    let body = http
        .post(url)
        .form(&[
            ("username", "admin"),
            ("password", encrypted.as_str()),
            ("logtype", "2"),
            ("nonce", nonce.as_str()),
        ])
        .send()
        .await?
        .text()
        .await?;

    debug!("login response: {}", body);

    let resp: LoginResponse = serde_json::from_str(&body)
        .map_err(|e| Error::Protocol(format!("invalid login response: {}", e)))?;

    if resp.code != 0 {
        return Err(Error::Auth {
            code: resp.code,
            message: resp.url.unwrap_or_default(),
        });
    }

    match resp.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(Error::Protocol(
            "login succeeded but response carried no token".into(),
        )),
    }
}
