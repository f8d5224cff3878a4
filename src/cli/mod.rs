//! Command-line interface.

pub mod cookie_cmd;
pub mod shade_cmd;
pub mod sweep_cmd;

use crate::config::Settings;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prism", version, about = "Cookie policy and element-shader control for a CDP-driven browser")]
pub struct Cli {
    /// Settings file (defaults to ~/.prism/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Evaluate the cookie policy for a single request.
    CheckCookie(cookie_cmd::CheckCookieArgs),
    /// Open pages in the engine and enforce the cookie policy on their jars.
    Sweep(sweep_cmd::SweepArgs),
    /// Open a page in the engine and toggle the element shader.
    Shade(shade_cmd::ShadeArgs),
}

pub async fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load_or_default(&path)?;

    match cli.command {
        Command::CheckCookie(args) => cookie_cmd::run(settings, args),
        Command::Sweep(args) => sweep_cmd::run(settings, args).await,
        Command::Shade(args) => shade_cmd::run(settings, args).await,
    }
}
