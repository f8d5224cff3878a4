//! chromiumoxide engine adapter.
//!
//! Drives a real Chromium over CDP: pages opened here get the installed
//! profile scripts applied via `Page.addScriptToEvaluateOnNewDocument`, tab
//! JavaScript runs through `Runtime.evaluate`, and the registered cookie
//! filter is enforced by sweeping page cookie jars (CDP exposes no
//! per-request filter callback).

use super::{
    CookieFilter, CookieStore, EngineProfile, FilterRequest, ProfileScript, ScriptWorld,
    TabHandle, WindowHandle,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::cdp::browser_protocol::network::DeleteCookiesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, RemoveScriptToEvaluateOnNewDocumentParams,
    ScriptIdentifier,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Isolated world name for application-injected scripts.
const APPLICATION_WORLD: &str = "prism";

/// Cookie store for the CDP engine. CDP cannot call the filter per request,
/// so the store only holds the registration; enforcement happens in
/// [`CdpEngine::sweep_cookies`].
#[derive(Default)]
pub struct CdpCookieStore {
    filter: RwLock<Option<CookieFilter>>,
}

impl CookieStore for CdpCookieStore {
    fn set_filter(&self, filter: Option<CookieFilter>) {
        *self.filter.write().expect("filter lock poisoned") = filter;
    }

    fn filter(&self) -> Option<CookieFilter> {
        self.filter.read().expect("filter lock poisoned").clone()
    }
}

/// A cookie removed by a policy sweep.
#[derive(Debug, Clone, Serialize)]
pub struct RemovedCookie {
    pub page: String,
    pub name: String,
    pub domain: String,
}

/// Outcome of a cookie-policy sweep.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub pages: usize,
    pub examined: usize,
    pub removed: Vec<RemovedCookie>,
}

/// A Chromium instance acting as both the browsing profile and the single
/// window holding its tabs.
pub struct CdpEngine {
    browser: Browser,
    scripts: Mutex<Vec<ProfileScript>>,
    identifiers: Mutex<HashMap<String, Vec<(Page, ScriptIdentifier)>>>,
    store: Arc<CdpCookieStore>,
}

impl CdpEngine {
    /// Launch Chromium with a throwaway user-data directory.
    pub async fn launch(headless: bool) -> Result<Self> {
        let temp_dir = std::env::temp_dir().join(format!("prism-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&temp_dir).context("failed to create profile dir")?;

        let config = BrowserConfig::builder()
            .headless_mode(if headless {
                HeadlessMode::True
            } else {
                HeadlessMode::False
            })
            .user_data_dir(temp_dir)
            .build()
            .map_err(|e| anyhow!("browser config failed: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            scripts: Mutex::new(Vec::new()),
            identifiers: Mutex::new(HashMap::new()),
            store: Arc::new(CdpCookieStore::default()),
        })
    }

    /// Open a new tab, apply the installed profile scripts, and navigate.
    pub async fn open(&self, url: &str) -> Result<CdpTab> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        let scripts = self.scripts.lock().await.clone();
        for script in &scripts {
            match self.apply_to_page(&page, script).await {
                Ok(identifier) => {
                    self.identifiers
                        .lock()
                        .await
                        .entry(script.name.clone())
                        .or_default()
                        .push((page.clone(), identifier));
                }
                Err(e) => warn!("failed to apply script {} to new tab: {e}", script.name),
            }
        }

        page.goto(url)
            .await
            .with_context(|| format!("failed to navigate to {url}"))?;
        Ok(CdpTab { page })
    }

    /// All open tabs.
    pub async fn open_tabs(&self) -> Result<Vec<CdpTab>> {
        let pages = self.browser.pages().await.context("failed to list pages")?;
        Ok(pages.into_iter().map(|page| CdpTab { page }).collect())
    }

    async fn apply_to_page(
        &self,
        page: &Page,
        script: &ProfileScript,
    ) -> Result<ScriptIdentifier> {
        let mut builder =
            AddScriptToEvaluateOnNewDocumentParams::builder().source(script.source.clone());
        if script.world == ScriptWorld::Application {
            builder = builder.world_name(APPLICATION_WORLD);
        }
        let params = builder
            .build()
            .map_err(|e| anyhow!("bad injection params: {e}"))?;

        let response = page
            .execute(params)
            .await
            .with_context(|| format!("failed to install script {}", script.name))?;
        Ok(response.identifier.clone())
    }

    /// Enforce the registered cookie filter by deleting rejected cookies
    /// from every open tab's jar.
    pub async fn sweep_cookies(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let filter = match self.store.filter() {
            Some(filter) => filter,
            None => return Ok(report),
        };

        let pages = self.browser.pages().await.context("failed to list pages")?;
        for page in pages {
            report.pages += 1;
            let page_url = match page.url().await {
                Ok(Some(url)) => url,
                _ => continue,
            };
            let first_party = Url::parse(&page_url).ok();
            let page_host = first_party
                .as_ref()
                .and_then(|u| u.host_str())
                .map(str::to_ascii_lowercase);

            let cookies = match page.get_cookies().await {
                Ok(cookies) => cookies,
                Err(e) => {
                    warn!("failed to read cookies for {page_url}: {e}");
                    continue;
                }
            };

            for cookie in cookies {
                report.examined += 1;
                let domain = cookie.domain.trim_start_matches('.').to_ascii_lowercase();
                let third_party = page_host
                    .as_deref()
                    .map_or(true, |host| is_third_party(host, &domain));
                let scheme = if cookie.secure { "https" } else { "http" };
                let request = FilterRequest {
                    first_party_url: first_party.clone(),
                    origin: Url::parse(&format!("{scheme}://{domain}/")).ok(),
                    third_party,
                };

                if filter(&request) {
                    continue;
                }

                debug!("sweeping cookie {} from {}", cookie.name, domain);
                let params = DeleteCookiesParams::builder()
                    .name(cookie.name.clone())
                    .domain(cookie.domain.clone())
                    .build()
                    .map_err(|e| anyhow!("bad delete params: {e}"))?;
                if let Err(e) = page.delete_cookies(vec![params]).await {
                    warn!("failed to delete cookie {}: {e}", cookie.name);
                    continue;
                }
                report.removed.push(RemovedCookie {
                    page: page_url.clone(),
                    name: cookie.name,
                    domain,
                });
            }
        }

        Ok(report)
    }
}

/// A cookie counts as third-party when its domain neither equals the page
/// host nor is a parent suffix of it.
fn is_third_party(page_host: &str, cookie_domain: &str) -> bool {
    page_host != cookie_domain && !page_host.ends_with(&format!(".{cookie_domain}"))
}

#[async_trait]
impl EngineProfile for CdpEngine {
    async fn install_script(&self, script: ProfileScript) -> Result<()> {
        // Replace any previous registration under the same name.
        self.remove_script(&script.name).await?;

        let pages = self.browser.pages().await.context("failed to list pages")?;
        let mut applied = Vec::new();
        for page in pages {
            match self.apply_to_page(&page, &script).await {
                Ok(identifier) => applied.push((page, identifier)),
                Err(e) => warn!("failed to apply script {}: {e}", script.name),
            }
        }

        self.identifiers
            .lock()
            .await
            .insert(script.name.clone(), applied);
        self.scripts.lock().await.push(script);
        Ok(())
    }

    async fn remove_script(&self, name: &str) -> Result<usize> {
        let mut scripts = self.scripts.lock().await;
        let before = scripts.len();
        scripts.retain(|s| s.name != name);
        let removed = before - scripts.len();
        drop(scripts);

        if let Some(applied) = self.identifiers.lock().await.remove(name) {
            for (page, identifier) in applied {
                let params = RemoveScriptToEvaluateOnNewDocumentParams::builder()
                    .identifier(identifier)
                    .build()
                    .map_err(|e| anyhow!("bad removal params: {e}"))?;
                if let Err(e) = page.execute(params).await {
                    // The tab may have closed in the meantime.
                    debug!("failed to remove script {name} from a tab: {e}");
                }
            }
        }
        Ok(removed)
    }

    fn cookie_store(&self) -> Arc<dyn CookieStore> {
        Arc::clone(&self.store) as Arc<dyn CookieStore>
    }
}

#[async_trait]
impl WindowHandle for CdpEngine {
    async fn tabs(&self) -> Vec<Arc<dyn TabHandle>> {
        match self.open_tabs().await {
            Ok(tabs) => tabs
                .into_iter()
                .map(|tab| Arc::new(tab) as Arc<dyn TabHandle>)
                .collect(),
            Err(e) => {
                warn!("failed to enumerate tabs: {e}");
                Vec::new()
            }
        }
    }
}

/// A live Chromium tab.
pub struct CdpTab {
    page: Page,
}

#[async_trait]
impl TabHandle for CdpTab {
    async fn run_js(&self, js: &str) -> Result<()> {
        self.page
            .evaluate(js.to_string())
            .await
            .context("failed to evaluate script")?;
        Ok(())
    }

    async fn url(&self) -> Option<Url> {
        match self.page.url().await {
            Ok(Some(url)) => Url::parse(&url).ok(),
            _ => None,
        }
    }
}
