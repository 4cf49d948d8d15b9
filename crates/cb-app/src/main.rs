use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use cb_app::cli::{self, Cli};
use cb_app::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to init tracing: {err}"))?;

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    cli::run(cli, config).await
}
