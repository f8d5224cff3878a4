//! Application session state.
//!
//! The session owns what the features operate on: the shared settings, the
//! engine profiles, the open windows, and the shader toggle. Profile-level
//! concerns are wired here — adding a profile installs the cookie filter on
//! its store.

use crate::config::SharedSettings;
use crate::engine::{EngineProfile, WindowHandle};
use crate::policy::cookies;
use crate::shader::ShaderToggle;
use anyhow::Result;
use std::sync::Arc;

pub struct Session {
    settings: SharedSettings,
    profiles: Vec<Arc<dyn EngineProfile>>,
    windows: Vec<Arc<dyn WindowHandle>>,
    shader: ShaderToggle,
}

impl Session {
    pub fn new(settings: SharedSettings) -> Self {
        let shader_enabled = settings
            .read()
            .expect("settings lock poisoned")
            .shader
            .enabled;
        Self {
            settings,
            profiles: Vec::new(),
            windows: Vec::new(),
            shader: ShaderToggle::with_enabled(shader_enabled),
        }
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Register a profile with the session and install the cookie filter on
    /// its store.
    pub fn add_profile(&mut self, profile: Arc<dyn EngineProfile>) {
        cookies::install_filter(profile.as_ref(), Arc::clone(&self.settings));
        self.profiles.push(profile);
    }

    pub fn add_window(&mut self, window: Arc<dyn WindowHandle>) {
        self.windows.push(window);
    }

    pub fn profiles(&self) -> &[Arc<dyn EngineProfile>] {
        &self.profiles
    }

    pub fn shader_enabled(&self) -> bool {
        self.shader.is_enabled()
    }

    pub async fn shader_off(&mut self) -> Result<()> {
        self.shader.turn_off(&self.profiles, &self.windows).await
    }

    pub async fn shader_on(&mut self) -> Result<()> {
        self.shader.turn_on(&self.profiles, &self.windows).await
    }

    pub async fn shader_reload(&mut self) -> Result<()> {
        self.shader.reload(&self.profiles, &self.windows).await
    }
}
