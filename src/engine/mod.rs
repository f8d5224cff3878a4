//! Browser-engine seam.
//!
//! The engine itself (rendering, networking, cookie storage) is external;
//! this layer only reaches it through a handful of narrow calls: install a
//! named startup script into a profile, enumerate open windows and tabs, run
//! JavaScript on a tab, and register a cookie-filter callback on a profile's
//! cookie store.

pub mod cdp;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// When an injected profile script runs relative to page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionPoint {
    /// Before the document element exists and before styles resolve.
    DocumentCreation,
    /// After the DOM is constructed.
    DocumentReady,
    /// After the page has finished loading.
    Deferred,
}

/// The JavaScript world a profile script runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptWorld {
    /// The page's own world.
    Main,
    /// An isolated world reserved for the application.
    Application,
}

/// A named script installed into a profile's script registry, injected into
/// every page the profile loads.
#[derive(Debug, Clone)]
pub struct ProfileScript {
    pub name: String,
    pub source: String,
    pub injection_point: InjectionPoint,
    pub world: ScriptWorld,
    /// Whether the script also runs on subframes.
    pub on_subframes: bool,
}

/// A cookie request as presented to the filter callback.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    /// URL of the top-level page the request is associated with. `None` when
    /// the engine reports an invalid or empty URL (e.g. some iframe
    /// requests).
    pub first_party_url: Option<Url>,
    /// URL of the origin attempting to set or read the cookie.
    pub origin: Option<Url>,
    /// Whether the origin differs from the first party.
    pub third_party: bool,
}

impl FilterRequest {
    /// Build a request from raw URL strings; unparseable URLs become `None`.
    pub fn new(first_party_url: &str, origin: &str, third_party: bool) -> Self {
        Self {
            first_party_url: Url::parse(first_party_url).ok(),
            origin: Url::parse(origin).ok(),
            third_party,
        }
    }
}

/// Callback deciding whether a cookie request is accepted.
pub type CookieFilter = Arc<dyn Fn(&FilterRequest) -> bool + Send + Sync>;

/// A profile's cookie store, as far as this layer is concerned: the place
/// the filter callback is registered.
pub trait CookieStore: Send + Sync {
    /// Register (or clear) the filter invoked for every cookie request.
    fn set_filter(&self, filter: Option<CookieFilter>);

    /// The currently registered filter.
    fn filter(&self) -> Option<CookieFilter>;
}

/// An open tab.
#[async_trait]
pub trait TabHandle: Send + Sync {
    /// Run JavaScript in the tab. Results are discarded.
    async fn run_js(&self, js: &str) -> Result<()>;

    /// The tab's current URL, when known.
    async fn url(&self) -> Option<Url>;
}

/// An open window holding tabs.
#[async_trait]
pub trait WindowHandle: Send + Sync {
    async fn tabs(&self) -> Vec<Arc<dyn TabHandle>>;
}

/// A browsing profile: the per-profile script registry plus the cookie
/// store.
#[async_trait]
pub trait EngineProfile: Send + Sync {
    /// Install a named script, replacing any existing script with the same
    /// name.
    async fn install_script(&self, script: ProfileScript) -> Result<()>;

    /// Remove all scripts with the given name. Returns how many were
    /// removed.
    async fn remove_script(&self, name: &str) -> Result<usize>;

    fn cookie_store(&self) -> Arc<dyn CookieStore>;
}
