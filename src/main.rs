use anyhow::Result;
use clap::Parser;
use prism_runtime::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prism_runtime=info".parse().unwrap()),
        )
        .init();

    cli::run(Cli::parse()).await
}
