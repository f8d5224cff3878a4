//! In-memory engine implementation.
//!
//! Backs the policy-evaluation paths that don't need a real browser, and the
//! test suites: it records installed scripts and executed JavaScript, and
//! applies the registered cookie filter to set attempts.

use super::{
    CookieFilter, CookieStore, EngineProfile, FilterRequest, ProfileScript, TabHandle,
    WindowHandle,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, RwLock};
use url::Url;

/// Cookie store that applies the registered filter to set attempts.
#[derive(Default)]
pub struct MemoryCookieStore {
    filter: RwLock<Option<CookieFilter>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the store would do with a cookie request. Without a registered
    /// filter every request is accepted.
    pub fn would_accept(&self, request: &FilterRequest) -> bool {
        match self.filter.read().expect("filter lock poisoned").as_ref() {
            Some(filter) => filter(request),
            None => true,
        }
    }

    pub fn has_filter(&self) -> bool {
        self.filter.read().expect("filter lock poisoned").is_some()
    }
}

impl CookieStore for MemoryCookieStore {
    fn set_filter(&self, filter: Option<CookieFilter>) {
        *self.filter.write().expect("filter lock poisoned") = filter;
    }

    fn filter(&self) -> Option<CookieFilter> {
        self.filter.read().expect("filter lock poisoned").clone()
    }
}

/// A tab that records every script executed against it.
pub struct MemoryTab {
    url: Option<Url>,
    executed: Mutex<Vec<String>>,
}

impl MemoryTab {
    pub fn new(url: &str) -> Self {
        Self {
            url: Url::parse(url).ok(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Scripts run against this tab, in order.
    pub fn executed_js(&self) -> Vec<String> {
        self.executed.lock().expect("tab lock poisoned").clone()
    }
}

#[async_trait]
impl TabHandle for MemoryTab {
    async fn run_js(&self, js: &str) -> Result<()> {
        self.executed
            .lock()
            .expect("tab lock poisoned")
            .push(js.to_string());
        Ok(())
    }

    async fn url(&self) -> Option<Url> {
        self.url.clone()
    }
}

/// A window holding a fixed set of tabs.
#[derive(Default)]
pub struct MemoryWindow {
    tabs: Vec<Arc<MemoryTab>>,
}

impl MemoryWindow {
    pub fn new(tabs: Vec<Arc<MemoryTab>>) -> Self {
        Self { tabs }
    }
}

#[async_trait]
impl WindowHandle for MemoryWindow {
    async fn tabs(&self) -> Vec<Arc<dyn TabHandle>> {
        self.tabs
            .iter()
            .map(|tab| Arc::clone(tab) as Arc<dyn TabHandle>)
            .collect()
    }
}

/// A profile with a script registry and a cookie store.
pub struct MemoryProfile {
    scripts: Mutex<Vec<ProfileScript>>,
    store: Arc<MemoryCookieStore>,
}

impl MemoryProfile {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            store: Arc::new(MemoryCookieStore::new()),
        }
    }

    /// The concrete store, for inspection.
    pub fn memory_store(&self) -> Arc<MemoryCookieStore> {
        Arc::clone(&self.store)
    }

    /// Installed scripts, in installation order.
    pub fn scripts(&self) -> Vec<ProfileScript> {
        self.scripts.lock().expect("script lock poisoned").clone()
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts
            .lock()
            .expect("script lock poisoned")
            .iter()
            .any(|s| s.name == name)
    }
}

impl Default for MemoryProfile {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineProfile for MemoryProfile {
    async fn install_script(&self, script: ProfileScript) -> Result<()> {
        let mut scripts = self.scripts.lock().expect("script lock poisoned");
        scripts.retain(|s| s.name != script.name);
        scripts.push(script);
        Ok(())
    }

    async fn remove_script(&self, name: &str) -> Result<usize> {
        let mut scripts = self.scripts.lock().expect("script lock poisoned");
        let before = scripts.len();
        scripts.retain(|s| s.name != name);
        Ok(before - scripts.len())
    }

    fn cookie_store(&self) -> Arc<dyn CookieStore> {
        Arc::clone(&self.store) as Arc<dyn CookieStore>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InjectionPoint, ScriptWorld};

    fn script(name: &str) -> ProfileScript {
        ProfileScript {
            name: name.to_string(),
            source: "(function() {})();".to_string(),
            injection_point: InjectionPoint::DocumentCreation,
            world: ScriptWorld::Application,
            on_subframes: true,
        }
    }

    #[tokio::test]
    async fn test_install_replaces_same_name() {
        let profile = MemoryProfile::new();
        profile.install_script(script("a")).await.unwrap();
        profile.install_script(script("a")).await.unwrap();
        assert_eq!(profile.scripts().len(), 1);

        assert_eq!(profile.remove_script("a").await.unwrap(), 1);
        assert!(!profile.has_script("a"));
        assert_eq!(profile.remove_script("a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tab_records_js() {
        let tab = MemoryTab::new("https://example.com");
        tab.run_js("console.log(1)").await.unwrap();
        assert_eq!(tab.executed_js(), vec!["console.log(1)".to_string()]);
    }

    #[test]
    fn test_store_without_filter_accepts() {
        let store = MemoryCookieStore::new();
        let request = FilterRequest::new("https://example.com", "https://example.com", false);
        assert!(store.would_accept(&request));
    }

    #[test]
    fn test_store_applies_filter() {
        let store = MemoryCookieStore::new();
        store.set_filter(Some(Arc::new(|request: &FilterRequest| {
            !request.third_party
        })));

        let first_party = FilterRequest::new("https://example.com", "https://example.com", false);
        let third_party = FilterRequest::new("https://example.com", "https://ads.net", true);
        assert!(store.would_accept(&first_party));
        assert!(!store.would_accept(&third_party));
    }
}
