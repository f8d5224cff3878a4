//! Settings surface for the content-policy layer.
//!
//! Settings are read from a JSON file (default `~/.prism/config.json`) and
//! shared across the session behind a read-mostly lock; the cookie filter
//! reads them on every request so edits take effect live.

use crate::urlmatch::UrlPattern;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use url::Url;

/// Live-shareable settings handle.
pub type SharedSettings = Arc<RwLock<Settings>>;

/// Global cookie accept mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CookieAccept {
    /// Accept every cookie.
    #[serde(rename = "all")]
    All,
    /// Reject every cookie.
    #[serde(rename = "never")]
    Never,
    /// Accept first-party cookies only.
    #[serde(rename = "no-3rdparty")]
    No3rdParty,
    /// Accept first-party cookies and third-party cookies from sites that
    /// were visited before. The engine-side filter treats this like
    /// `no-3rdparty`.
    #[serde(rename = "no-unknown-3rdparty")]
    NoUnknown3rdParty,
}

impl fmt::Display for CookieAccept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::All => "all",
            Self::Never => "never",
            Self::No3rdParty => "no-3rdparty",
            Self::NoUnknown3rdParty => "no-unknown-3rdparty",
        };
        f.write_str(s)
    }
}

/// A per-site override of the global accept mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptOverride {
    /// First-party URLs this override applies to.
    pub pattern: UrlPattern,
    pub accept: CookieAccept,
}

/// Cookie acceptance policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookiePolicy {
    /// Global accept mode.
    pub accept: CookieAccept,
    /// Per-pattern overrides of the global mode, matched against the
    /// first-party URL.
    pub overrides: Vec<AcceptOverride>,
    /// Third-party origins that may set cookies even when the effective mode
    /// restricts third-party cookies.
    pub thirdparty_whitelist: Vec<UrlPattern>,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            accept: CookieAccept::All,
            overrides: Vec::new(),
            thirdparty_whitelist: Vec::new(),
        }
    }
}

impl CookiePolicy {
    /// Resolve the effective accept mode for a first-party URL.
    ///
    /// The most specific matching override wins over the global setting;
    /// among equally specific overrides the last one defined wins. `None`
    /// (an invalid or empty first-party URL) falls back to the global mode.
    pub fn accept_for_url(&self, url: Option<&Url>) -> CookieAccept {
        let url = match url {
            Some(url) => url,
            None => return self.accept,
        };

        let mut best: Option<(u32, CookieAccept)> = None;
        for override_ in &self.overrides {
            if !override_.pattern.matches(url) {
                continue;
            }
            let rank = override_.pattern.specificity();
            if best.map_or(true, |(r, _)| rank >= r) {
                best = Some((rank, override_.accept));
            }
        }
        best.map_or(self.accept, |(_, accept)| accept)
    }

    /// Check whether an origin URL is whitelisted for third-party cookies.
    pub fn is_whitelisted(&self, origin: &Url) -> bool {
        self.thirdparty_whitelist
            .iter()
            .any(|pattern| pattern.matches(origin))
    }
}

/// Shader feature settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSettings {
    /// Whether the element shader starts enabled. The engine-side effect
    /// runs unconditionally unless a page is marked as shader-off.
    pub enabled: bool,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Debug switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Log every cookie decision at debug level.
    pub log_cookies: bool,
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cookies: CookiePolicy,
    pub shader: ShaderSettings,
    pub debug: DebugSettings,
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse settings: {}", path.display()))
    }

    /// Load settings, falling back to defaults when the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default settings location at ~/.prism/config.json.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".prism")
            .join("config.json")
    }

    /// Wrap settings in the live-shareable handle.
    pub fn into_shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }
}
