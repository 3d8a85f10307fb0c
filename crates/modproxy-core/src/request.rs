//! Incoming URL parsing.
//!
//! A module protocol URL looks like `<prefix>/<enc-module>/@v/<suffix>` or
//! `<prefix>/<enc-module>/@latest`, where both the module path and any
//! version inside the suffix use the `!x` case-encoding.

use crate::encoding;
use crate::error::{ProxyError, Result};

const VERSIONS_INFIX: &str = "/@v/";
const LATEST_SUFFIX: &str = "/@latest";

/// Operation requested for a module, decoded from the URL suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suffix {
    List,
    Latest,
    /// `<version>.<ext>`; `ext` is validated by the dispatcher so unknown
    /// operations fall into its default branch.
    Versioned { version: String, ext: String },
}

/// Parsed module request: decoded module path plus the operation suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
    pub module_path: String,
    pub suffix: Suffix,
}

/// Splits a request URL path into module path and operation.
pub fn parse_url_path(url_path: &str, prefix: &str) -> Result<ModInfo> {
    let rest = url_path.strip_prefix(prefix).ok_or_else(|| {
        ProxyError::BadRequest(format!(
            "request URL path expected to be {prefix}*, got {url_path}"
        ))
    })?;
    let rest = rest.strip_prefix('/').ok_or_else(|| {
        ProxyError::BadRequest(format!("/<module> expected after prefix, got {rest}"))
    })?;

    if let Some(module) = rest.strip_suffix(LATEST_SUFFIX) {
        return Ok(ModInfo {
            module_path: encoding::decode(module)?,
            suffix: Suffix::Latest,
        });
    }

    let pos = rest.find(VERSIONS_INFIX).ok_or_else(|| {
        ProxyError::BadRequest(format!("/@v/ was not found in {rest}"))
    })?;
    let module = &rest[..pos];
    let suffix = &rest[pos + VERSIONS_INFIX.len()..];

    let suffix = if suffix == "list" {
        Suffix::List
    } else {
        match suffix.rfind('.') {
            Some(dot) => Suffix::Versioned {
                version: encoding::decode(&suffix[..dot])?,
                ext: suffix[dot + 1..].to_string(),
            },
            // no extension at all; the dispatcher answers 400
            None => Suffix::Versioned {
                version: String::new(),
                ext: suffix.to_string(),
            },
        }
    };

    Ok(ModInfo {
        module_path: encoding::decode(module)?,
        suffix,
    })
}
