//! Minimal go.mod reading: only the `module` directive matters to the
//! proxy, which compares it against the requested module path.

use crate::error::{ProxyError, Result};

/// The declared module identity of a go.mod file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoMod {
    pub name: String,
}

/// Extracts the `module` directive. Comments are stripped; both bare and
/// quoted module paths are accepted.
pub fn parse(data: &[u8]) -> Result<GoMod> {
    let text = std::str::from_utf8(data)
        .map_err(|e| ProxyError::BadRequest(format!("go.mod is not valid UTF-8: {e}")))?;

    for line in text.lines() {
        let line = match line.split_once("//") {
            Some((code, _)) => code,
            None => line,
        }
        .trim();

        if let Some(rest) = line.strip_prefix("module") {
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let raw = rest.trim();
            let name = raw
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(raw);
            if name.is_empty() {
                return Err(ProxyError::BadRequest("empty module directive".into()));
            }
            return Ok(GoMod {
                name: name.to_string(),
            });
        }
    }

    Err(ProxyError::BadRequest("no module directive found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_directive() {
        let gomod = parse(b"module gitlab.com/user/mod\n\ngo 1.13\n").unwrap();
        assert_eq!(gomod.name, "gitlab.com/user/mod");
    }

    #[test]
    fn test_parse_quoted_directive() {
        let gomod = parse(b"module \"gitlab.com/user/mod\"\n").unwrap();
        assert_eq!(gomod.name, "gitlab.com/user/mod");
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let data = b"// the proxy only reads the module line\n\nmodule example.com/m // trailing\nrequire other.org/x v1.0.0\n";
        assert_eq!(parse(data).unwrap().name, "example.com/m");
    }

    #[test]
    fn test_parse_ignores_module_prefixed_words() {
        let data = b"modules are great\nmodule example.com/m\n";
        assert_eq!(parse(data).unwrap().name, "example.com/m");
    }

    #[test]
    fn test_parse_missing_directive() {
        assert!(parse(b"go 1.21\n").is_err());
        assert!(parse(b"").is_err());
    }
}
