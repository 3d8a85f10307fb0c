//! Go-flavored version handling.
//!
//! Module versions carry a leading `v` and may be pseudo-versions of the
//! form `vX.Y.Z-[pre-|0.]YYYYMMDDHHMMSS-<sha>` identifying an untagged
//! commit. This module layers those rules over the `semver` crate; build
//! metadata (`+incompatible` and friends) never takes part in ordering.

use std::cmp::Ordering;

/// Decomposed pseudo-version: `base` is everything before the moment,
/// including its trailing separator, so `format!("{base}{moment}-{sha}")`
/// rebuilds the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoParts<'a> {
    pub base: &'a str,
    pub moment: &'a str,
    pub sha: &'a str,
}

fn parse(v: &str) -> Option<semver::Version> {
    let rest = v.strip_prefix('v')?;
    semver::Version::parse(rest).ok()
}

/// Whether `v` is a well-formed `vX.Y.Z[-pre][+meta]` version.
pub fn is_valid(v: &str) -> bool {
    parse(v).is_some()
}

/// Semver precedence order; invalid versions sort below valid ones.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp_precedence(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Major component of `v`, or -1 when `v` is not a valid version.
pub fn major(v: &str) -> i32 {
    parse(v).map_or(-1, |ver| ver.major as i32)
}

/// (major, minor, patch) of a valid version.
pub fn major_minor_patch(v: &str) -> Option<(u64, u64, u64)> {
    parse(v).map(|ver| (ver.major, ver.minor, ver.patch))
}

/// Canonical form: `vX.Y.Z[-pre]`, build metadata dropped.
pub fn canonical(v: &str) -> Option<String> {
    let ver = parse(v)?;
    if ver.pre.is_empty() {
        Some(format!("v{}.{}.{}", ver.major, ver.minor, ver.patch))
    } else {
        Some(format!(
            "v{}.{}.{}-{}",
            ver.major, ver.minor, ver.patch, ver.pre
        ))
    }
}

/// The larger of two versions under [`compare`].
pub fn max_version<'a>(a: &'a str, b: &'a str) -> &'a str {
    if compare(a, b) >= Ordering::Equal {
        a
    } else {
        b
    }
}

/// Commit SHA of a pseudo-version, or `None` for regular versions.
pub fn pseudo_sha(v: &str) -> Option<&str> {
    pseudo_parts(v).map(|p| p.sha)
}

/// Splits a pseudo-version into (base, moment, sha).
///
/// Accepted shapes after the `vX.Y.Z` head: `-<moment>-<sha>`,
/// `-pre-<moment>-<sha>` and the patch-bump form `-0.<moment>-<sha>`.
pub fn pseudo_parts(v: &str) -> Option<PseudoParts<'_>> {
    let dash = v.find('-')?;
    let head = &v[..dash];
    if !is_valid(head) {
        return None;
    }

    let mut tail_start = dash + 1;
    let tail = &v[tail_start..];
    if let Some(rest) = tail.strip_prefix("pre-") {
        tail_start += tail.len() - rest.len();
    } else if let Some(rest) = tail.strip_prefix("0.") {
        tail_start += tail.len() - rest.len();
    }

    let tail = &v[tail_start..];
    if tail.len() < 15 || tail.as_bytes()[14] != b'-' {
        return None;
    }
    let (moment, sha) = (&tail[..14], &tail[15..]);
    if !moment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if sha.len() < 7 || !sha.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        return None;
    }

    Some(PseudoParts {
        base: &v[..tail_start],
        moment,
        sha,
    })
}

/// Assembles a pseudo-version from a base (trailing separator included),
/// a 14-digit UTC moment and a short commit id.
pub fn build_pseudo(base: &str, moment: &str, sha: &str) -> String {
    format!("{base}{moment}-{sha}")
}

/// True for custom pre-release pseudo-versions (`vX.Y.Z-pre-...`).
pub fn is_prerelease(v: &str) -> bool {
    match v.find('-') {
        Some(dash) if is_valid(&v[..dash]) => v[dash..].starts_with("-pre-"),
        _ => false,
    }
}

/// Filters out invalid entries, deduplicates and sorts ascending.
pub fn sort_versions(mut versions: Vec<String>) -> Vec<String> {
    versions.retain(|v| is_valid(v));
    versions.sort_by(|a, b| compare(a, b));
    versions.dedup();
    versions
}
