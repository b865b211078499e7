//! HTTP Basic auth, realm `supervisor`. The stored password is either
//! clear, or prefixed `{SHA}` followed by the lowercase hex SHA-1 of the
//! plaintext.

use base64::Engine;
use sha1::{Digest, Sha1};

pub const REALM_HEADER: &str = r#"Basic realm="supervisor""#;

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// No credentials configured disables auth entirely.
pub fn auth_required(configured: &Option<Credentials>) -> bool {
    match configured {
        None => false,
        Some(c) => !(c.username.is_empty() && c.password.is_empty()),
    }
}

/// Verifies a presented `user:pass` pair against the configured
/// credentials. `{SHA}`-prefixed stored passwords are compared as hex
/// SHA-1 digests; anything else is compared as plaintext.
pub fn verify(configured: &Credentials, username: &str, password: &str) -> bool {
    if username != configured.username {
        return false;
    }
    match configured.password.strip_prefix("{SHA}") {
        Some(hex_digest) => to_hex(&Sha1::digest(password.as_bytes())) == hex_digest,
        None => password == configured.password,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Decodes a `Basic <base64>` Authorization header value.
pub fn decode_basic_header(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
