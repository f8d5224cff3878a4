//! Element-shader toggle.
//!
//! The shader effect itself runs engine-side on every page unless a page is
//! marked as shader-off. Turning the shader off therefore does two things:
//! install a profile script that marks new documents before their styles
//! resolve, and broadcast a marking script to every open tab. Turning it on
//! removes the profile script and broadcasts the unmarking script. Both
//! live-tab scripts poke a style element so the page recomputes styles
//! immediately.

use crate::engine::{EngineProfile, InjectionPoint, ProfileScript, ScriptWorld, WindowHandle};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the shader-off script in the profile script registry.
pub const SHADER_OFF_SCRIPT_NAME: &str = "_prism_shader_off";

/// Profile-level script, injected at document creation: marks the document
/// root before styles resolve.
const SHADER_OFF_PROFILE_JS: &str = "(function() {\
 if (document.documentElement)\
   document.documentElement.setAttribute('data-shader-off', '');\
})();";

/// Run on existing tabs to disable the shader and force a full style
/// recalculation.
const SHADER_OFF_JS: &str = r#"(function() {
    var root = document.documentElement;
    if (!root) return;
    root.setAttribute('data-shader-off', '');
    var s = document.getElementById('__prism_shader_state');
    if (!s) {
        s = document.createElement('style');
        s.id = '__prism_shader_state';
        (document.head || root).appendChild(s);
    }
    s.textContent = ':root { --prism-shader-state: off; }';
})();"#;

/// Run on existing tabs to enable the shader and force a full style
/// recalculation.
const SHADER_ON_JS: &str = r#"(function() {
    var root = document.documentElement;
    if (!root) return;
    root.removeAttribute('data-shader-off');
    var s = document.getElementById('__prism_shader_state');
    if (!s) {
        s = document.createElement('style');
        s.id = '__prism_shader_state';
        (document.head || root).appendChild(s);
    }
    s.textContent = ':root { --prism-shader-state: on; }';
})();"#;

fn shader_off_script() -> ProfileScript {
    ProfileScript {
        name: SHADER_OFF_SCRIPT_NAME.to_string(),
        source: SHADER_OFF_PROFILE_JS.to_string(),
        injection_point: InjectionPoint::DocumentCreation,
        world: ScriptWorld::Application,
        on_subframes: true,
    }
}

/// Shader state for one session. Owned by the session alongside its
/// profiles and windows; the shader is on by default.
#[derive(Debug)]
pub struct ShaderToggle {
    enabled: bool,
}

impl ShaderToggle {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn the shader off. No-op when already off.
    pub async fn turn_off(
        &mut self,
        profiles: &[Arc<dyn EngineProfile>],
        windows: &[Arc<dyn WindowHandle>],
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.apply_off(profiles, windows).await
    }

    /// Turn the shader on. No-op when already on.
    pub async fn turn_on(
        &mut self,
        profiles: &[Arc<dyn EngineProfile>],
        windows: &[Arc<dyn WindowHandle>],
    ) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        self.apply_on(profiles, windows).await
    }

    /// Reload the shader: off then on, regardless of the current state.
    pub async fn reload(
        &mut self,
        profiles: &[Arc<dyn EngineProfile>],
        windows: &[Arc<dyn WindowHandle>],
    ) -> Result<()> {
        self.apply_off(profiles, windows).await?;
        self.apply_on(profiles, windows).await
    }

    async fn apply_off(
        &mut self,
        profiles: &[Arc<dyn EngineProfile>],
        windows: &[Arc<dyn WindowHandle>],
    ) -> Result<()> {
        self.enabled = false;
        debug!("disabling element shader");
        for profile in profiles {
            profile.install_script(shader_off_script()).await?;
        }
        broadcast(windows, SHADER_OFF_JS).await;
        Ok(())
    }

    async fn apply_on(
        &mut self,
        profiles: &[Arc<dyn EngineProfile>],
        windows: &[Arc<dyn WindowHandle>],
    ) -> Result<()> {
        self.enabled = true;
        debug!("enabling element shader");
        for profile in profiles {
            profile.remove_script(SHADER_OFF_SCRIPT_NAME).await?;
        }
        broadcast(windows, SHADER_ON_JS).await;
        Ok(())
    }
}

impl Default for ShaderToggle {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a script on every open tab of every window. Fire-and-forget: per-tab
/// failures are logged and don't abort the sweep, and there's no ordering
/// guarantee across tabs.
async fn broadcast(windows: &[Arc<dyn WindowHandle>], js: &str) {
    let mut tabs = Vec::new();
    for window in windows {
        tabs.extend(window.tabs().await);
    }

    let results = futures::future::join_all(tabs.iter().map(|tab| tab.run_js(js))).await;
    for result in results {
        if let Err(e) = result {
            warn!("shader script failed on a tab: {e}");
        }
    }
}
