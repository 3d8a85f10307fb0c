//! Case-encoding of module paths and versions.
//!
//! The wire form of a module path replaces every upper-case ASCII letter
//! `X` with `!x` so that case-insensitive file systems cannot alias two
//! modules. Versions use the same escaping.

use crate::error::{ProxyError, Result};

/// Encodes a module path or version for the wire: `BurntSushi` → `!burnt!sushi`.
pub fn encode(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 8);
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Decodes the wire form back. Any upper-case ASCII letter and any `!` not
/// followed by a lower-case ASCII letter are malformed.
pub fn decode(encoded: &str) -> Result<String> {
    let mut out = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        if c.is_ascii_uppercase() {
            return Err(ProxyError::BadRequest(format!(
                "unexpected upper-case letter in encoded path {encoded}"
            )));
        }
        if c == '!' {
            match chars.next() {
                Some(e) if e.is_ascii_lowercase() => out.push(e.to_ascii_uppercase()),
                _ => {
                    return Err(ProxyError::BadRequest(format!(
                        "invalid escape in encoded path {encoded}"
                    )));
                }
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
