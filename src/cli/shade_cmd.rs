//! `shade` — open a page and toggle the element shader.

use crate::config::Settings;
use crate::engine::cdp::CdpEngine;
use crate::engine::{EngineProfile, WindowHandle};
use crate::session::Session;
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShadeAction {
    Off,
    On,
    Reload,
}

#[derive(Args)]
pub struct ShadeArgs {
    /// URL to open.
    pub url: String,

    #[arg(long, value_enum, default_value = "off")]
    pub action: ShadeAction,

    /// Run the browser with a visible window.
    #[arg(long)]
    pub headful: bool,

    /// Seconds to keep the browser open after toggling.
    #[arg(long, default_value_t = 5)]
    pub hold: u64,
}

pub async fn run(settings: Settings, args: ShadeArgs) -> Result<()> {
    let engine = Arc::new(CdpEngine::launch(!args.headful).await?);
    let mut session = Session::new(settings.into_shared());
    session.add_profile(Arc::clone(&engine) as Arc<dyn EngineProfile>);
    session.add_window(Arc::clone(&engine) as Arc<dyn WindowHandle>);

    info!("opening {}", args.url);
    engine.open(&args.url).await?;

    match args.action {
        ShadeAction::Off => session.shader_off().await?,
        ShadeAction::On => session.shader_on().await?,
        ShadeAction::Reload => session.shader_reload().await?,
    }
    println!(
        "shader is now {}",
        if session.shader_enabled() { "on" } else { "off" }
    );

    tokio::time::sleep(Duration::from_secs(args.hold)).await;
    Ok(())
}
