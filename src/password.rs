//! Factory-default SSH password derivation.
//!
//! Xiaomi derives the root password from the device serial number and a
//! fixed salt extracted from `/bin/mkxqimage` in the firmware image. The
//! password is the first 8 hex characters of `md5(serial + salt)`.

use md5::{Digest, Md5};

/// Salt for R1D devices (serial numbers without a `/`). Used verbatim.
const SALT_R1D: &str = "A2E371B0-B34B-48A5-8C40-A7133F3B5D88";

/// Salt for every other device family. The dash-delimited segments must be
/// reversed before use (segment order, not characters).
const SALT_OTHERS: &str = "d44fb0960aa0-a5e6-4a30-250f-6d2df50a";

/// Derive the factory-default SSH password from a serial number.
///
/// Returns an empty string for an empty serial — callers decide whether
/// that is an error.
pub fn derive_ssh_password(serial: &str) -> String {
    if serial.is_empty() {
        return String::new();
    }

    let salt = select_salt(serial);
    let digest = Md5::digest(format!("{}{}", serial, salt).as_bytes());
    hex::encode(digest)[..8].to_string()
}

fn select_salt(serial: &str) -> String {
    if serial.contains('/') {
        swap_salt(SALT_OTHERS)
    } else {
        SALT_R1D.to_string()
    }
}

fn swap_salt(salt: &str) -> String {
    let mut parts: Vec<&str> = salt.split('-').collect();
    parts.reverse();
    parts.join("-")
}
