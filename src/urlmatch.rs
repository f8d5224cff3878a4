//! Wildcard URL patterns for scoping settings to sites.
//!
//! Patterns follow the Chromium match-pattern shape: `<scheme>://<host>/<path>`
//! where the scheme may be `*`, the host may be exact, `*.suffix` (the suffix
//! and any subdomain), or a bare `*`, and the path is a glob. A pattern
//! without a scheme (`example.com`) matches any scheme.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Errors produced while parsing a URL pattern.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("pattern has no host: {0}")]
    NoHost(String),
    #[error("invalid port in pattern: {0}")]
    InvalidPort(String),
    #[error("invalid scheme in pattern: {0}")]
    InvalidScheme(String),
    #[error("host wildcard must be a leading '*.' component: {0}")]
    InvalidHostWildcard(String),
}

/// The host component of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPart {
    /// Matches any host.
    Any,
    /// `*.suffix` — matches the suffix itself and any subdomain of it.
    Subdomain(String),
    /// Exact host match.
    Exact(String),
}

/// A parsed wildcard URL pattern.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    raw: String,
    /// `None` means any scheme.
    scheme: Option<String>,
    host: HostPart,
    port: Option<u16>,
    path_glob: String,
    path_re: Regex,
}

impl UrlPattern {
    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> Result<Self, ParseError> {
        let raw = pattern.trim();

        let (scheme, rest) = match raw.split_once("://") {
            Some(("*", rest)) => (None, rest),
            Some((scheme, rest)) => {
                let scheme = scheme.to_ascii_lowercase();
                if scheme.is_empty()
                    || !scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                {
                    return Err(ParseError::InvalidScheme(raw.to_string()));
                }
                (Some(scheme), rest)
            }
            // Schemeless patterns ("example.com/foo") match any scheme.
            None => (None, raw),
        };

        let (host_port, path) = match rest.split_once('/') {
            Some((hp, p)) => (hp, format!("/{p}")),
            None => (rest, "/*".to_string()),
        };

        let (host, port) = split_host_port(host_port, raw)?;
        if host.is_empty() {
            return Err(ParseError::NoHost(raw.to_string()));
        }

        let host = host.to_ascii_lowercase();
        let host = if host == "*" {
            HostPart::Any
        } else if let Some(suffix) = host.strip_prefix("*.") {
            if suffix.is_empty() || suffix.contains('*') {
                return Err(ParseError::InvalidHostWildcard(raw.to_string()));
            }
            HostPart::Subdomain(suffix.to_string())
        } else if host.contains('*') {
            return Err(ParseError::InvalidHostWildcard(raw.to_string()));
        } else {
            HostPart::Exact(host)
        };

        let path_re = glob_to_regex(&path);

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            host,
            port,
            path_glob: path,
            path_re,
        })
    }

    /// Check whether a URL matches this pattern.
    pub fn matches(&self, url: &Url) -> bool {
        if let Some(scheme) = &self.scheme {
            if url.scheme() != scheme {
                return false;
            }
        }

        let host = match url.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        };
        let host_ok = match &self.host {
            HostPart::Any => true,
            HostPart::Exact(h) => host == *h,
            HostPart::Subdomain(suffix) => {
                host == *suffix || host.ends_with(&format!(".{suffix}"))
            }
        };
        if !host_ok {
            return false;
        }

        if let Some(port) = self.port {
            if url.port_or_known_default() != Some(port) {
                return false;
            }
        }

        self.path_re.is_match(url.path())
    }

    /// Ranking key for resolving overlapping patterns: higher is more
    /// specific. A concrete scheme beats a wildcard, an exact host beats a
    /// subdomain wildcard beats a bare `*`, longer hosts and paths beat
    /// shorter ones.
    pub fn specificity(&self) -> u32 {
        let scheme = if self.scheme.is_some() { 100_000 } else { 0 };
        let host = match &self.host {
            HostPart::Exact(h) => 50_000 + h.len() as u32 * 16,
            HostPart::Subdomain(s) => 25_000 + s.len() as u32 * 16,
            HostPart::Any => 0,
        };
        let port = if self.port.is_some() { 10_000 } else { 0 };
        let path = self.path_glob.trim_end_matches('*').len() as u32;
        scheme + host + port + path
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn split_host_port<'a>(host_port: &'a str, raw: &str) -> Result<(&'a str, Option<u16>), ParseError> {
    match host_port.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            let port: u16 = port
                .parse()
                .map_err(|_| ParseError::InvalidPort(raw.to_string()))?;
            if port == 0 {
                return Err(ParseError::InvalidPort(raw.to_string()));
            }
            Ok((host, Some(port)))
        }
        Some((_, port)) if port.chars().any(|c| c.is_ascii_digit()) => {
            Err(ParseError::InvalidPort(raw.to_string()))
        }
        _ => Ok((host_port, None)),
    }
}

/// Compile a path glob (`*` wildcards) into an anchored regex.
fn glob_to_regex(glob: &str) -> Regex {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    for c in glob.chars() {
        match c {
            '*' => re.push_str(".*"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    // The escaped source can only fail to compile if it exceeds the size
    // limit, which a settings pattern never does.
    Regex::new(&re).unwrap_or_else(|_| Regex::new("^/.*$").unwrap())
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for UrlPattern {}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for UrlPattern {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for UrlPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for UrlPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_exact_host() {
        let pattern = UrlPattern::parse("*://hcaptcha.com/*").unwrap();
        assert!(pattern.matches(&url("https://hcaptcha.com")));
        assert!(pattern.matches(&url("http://hcaptcha.com/challenge")));
        assert!(!pattern.matches(&url("https://accounts.hcaptcha.com")));
        assert!(!pattern.matches(&url("https://example.com")));
    }

    #[test]
    fn test_subdomain_wildcard() {
        let pattern = UrlPattern::parse("*://*.hcaptcha.com/*").unwrap();
        assert!(pattern.matches(&url("https://hcaptcha.com")));
        assert!(pattern.matches(&url("https://accounts.hcaptcha.com")));
        assert!(pattern.matches(&url("https://a.b.hcaptcha.com")));
        assert!(!pattern.matches(&url("https://nothcaptcha.com")));
    }

    #[test]
    fn test_scheme() {
        let pattern = UrlPattern::parse("https://example.com/*").unwrap();
        assert!(pattern.matches(&url("https://example.com")));
        assert!(!pattern.matches(&url("http://example.com")));
    }

    #[test]
    fn test_schemeless_pattern() {
        let pattern = UrlPattern::parse("example.com").unwrap();
        assert!(pattern.matches(&url("https://example.com/anything")));
        assert!(pattern.matches(&url("ftp://example.com")));
    }

    #[test]
    fn test_path_glob() {
        let pattern = UrlPattern::parse("*://example.com/api/*").unwrap();
        assert!(pattern.matches(&url("https://example.com/api/v1/users")));
        assert!(!pattern.matches(&url("https://example.com/about")));
    }

    #[test]
    fn test_port() {
        let pattern = UrlPattern::parse("*://example.com:8080/*").unwrap();
        assert!(pattern.matches(&url("https://example.com:8080/")));
        assert!(!pattern.matches(&url("https://example.com/")));

        // Default ports count as the explicit port.
        let pattern = UrlPattern::parse("*://example.com:443/*").unwrap();
        assert!(pattern.matches(&url("https://example.com/")));
    }

    #[test]
    fn test_any_host() {
        let pattern = UrlPattern::parse("*://*/*").unwrap();
        assert!(pattern.matches(&url("https://anything.example/x")));
    }

    #[test]
    fn test_case_insensitive_host() {
        let pattern = UrlPattern::parse("*://Example.COM/*").unwrap();
        assert!(pattern.matches(&url("https://example.com")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            UrlPattern::parse("*://"),
            Err(ParseError::NoHost(_))
        ));
        assert!(matches!(
            UrlPattern::parse("*://ex*ample.com/*"),
            Err(ParseError::InvalidHostWildcard(_))
        ));
        assert!(matches!(
            UrlPattern::parse("*://example.com:0/*"),
            Err(ParseError::InvalidPort(_))
        ));
        assert!(matches!(
            UrlPattern::parse("*://example.com:999999/*"),
            Err(ParseError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_specificity_ordering() {
        let exact = UrlPattern::parse("https://sub.example.com/login/*").unwrap();
        let subdomain = UrlPattern::parse("*://*.example.com/*").unwrap();
        let any = UrlPattern::parse("*://*/*").unwrap();
        assert!(exact.specificity() > subdomain.specificity());
        assert!(subdomain.specificity() > any.specificity());
    }

    #[test]
    fn test_serde_roundtrip() {
        let pattern: UrlPattern = serde_json::from_str("\"*://*.example.com/*\"").unwrap();
        assert_eq!(pattern.as_str(), "*://*.example.com/*");
        assert_eq!(
            serde_json::to_string(&pattern).unwrap(),
            "\"*://*.example.com/*\""
        );
    }
}
