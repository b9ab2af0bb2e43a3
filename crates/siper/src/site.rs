//! Blocked site normalization
//!
//! A blocked site is a bare domain: no scheme, no `www.` prefix, no path,
//! lower-cased. `https://www.Example.com/page` becomes `example.com`.

use crate::error::{BlockingError, Result};

/// Normalize user input into a bare domain
///
/// Returns `None` when nothing is left after stripping.
pub fn normalize(raw: &str) -> Option<String> {
    let mut host = raw.trim();

    for scheme in ["https://", "http://"] {
        if let Some(prefix) = host.get(..scheme.len()) {
            if prefix.eq_ignore_ascii_case(scheme) {
                host = &host[scheme.len()..];
                break;
            }
        }
    }

    // Drop path, query and fragment
    if let Some(end) = host.find(['/', '?', '#']) {
        host = &host[..end];
    }

    let mut host = host.trim().to_lowercase();
    if let Some(bare) = host.strip_prefix("www.") {
        host = bare.to_string();
    }
    let host = host.trim_end_matches('.');

    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }

    Some(host.to_string())
}

/// Like [`normalize`], but empty input is an error
pub fn parse(raw: &str) -> Result<String> {
    normalize(raw).ok_or_else(|| BlockingError::InvalidInput(format!("not a domain: {:?}", raw)))
}
