use anyhow::Context;
use clap::Parser;
use ghapp_agent::{HttpAgentRuntime, Settings, start};
use tokio::net::TcpListener;
use tracing::info;

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::parse();

    let agent = HttpAgentRuntime::connect(settings.agent_url.clone(), settings.agent_id).await?;
    let client = start(&settings, agent).await?;

    let listener = TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen))?;
    info!(address = %settings.listen, path = ghapp_agent::WEBHOOK_PATH, "listening for webhooks");

    axum::serve(listener, client.middleware())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Webhook server failed")?;

    client.stop().await;
    Ok(())
}
