use clap::Parser;
use smartdoc_server::{config, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = config::Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting smartdoc-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        engines = ?config.engines,
        upload_dir = %config.upload_dir.display(),
        "Binding to {}:{}",
        config.host,
        config.port
    );

    server::run(config).await
}
