//! `sweep` — open pages and enforce the cookie policy on their jars.

use crate::config::Settings;
use crate::engine::cdp::CdpEngine;
use crate::policy::cookies;
use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tracing::info;

#[derive(Args)]
pub struct SweepArgs {
    /// URLs to open before sweeping.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Run the browser with a visible window.
    #[arg(long)]
    pub headful: bool,

    /// Seconds to let pages settle before the sweep.
    #[arg(long, default_value_t = 3)]
    pub settle: u64,

    /// Machine-readable output.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(settings: Settings, args: SweepArgs) -> Result<()> {
    let engine = CdpEngine::launch(!args.headful).await?;
    cookies::install_filter(&engine, settings.into_shared());

    for url in &args.urls {
        info!("opening {url}");
        engine.open(url).await?;
    }
    tokio::time::sleep(Duration::from_secs(args.settle)).await;

    let report = engine.sweep_cookies().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "swept {} page(s), examined {} cookie(s), removed {}",
            report.pages,
            report.examined,
            report.removed.len()
        );
        for cookie in &report.removed {
            println!("  - {} ({}) on {}", cookie.name, cookie.domain, cookie.page);
        }
    }
    Ok(())
}
