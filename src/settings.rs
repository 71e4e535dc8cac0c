use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use url::Url;
use uuid::Uuid;

// Human-readable build info (for clap version display)
const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

/// Runtime configuration, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "ghapp-agent")]
#[command(
    about = "GitHub App that lets a conversational agent triage new issues and seed new discussions"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
pub struct Settings {
    /// GitHub App id
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: u64,

    /// Path to the GitHub App private key (PEM)
    #[arg(long, env = "GITHUB_APP_KEY", value_name = "PATH")]
    pub app_key: PathBuf,

    /// Secret configured on the App's webhook
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: String,

    /// Address the webhook server listens on
    #[arg(long, env = "GHAPP_AGENT_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Base URL of the agent runtime
    #[arg(long, env = "AGENT_RUNTIME_URL")]
    pub agent_url: Url,

    /// Agent the webhook events are routed to
    #[arg(long, env = "AGENT_ID")]
    pub agent_id: Uuid,
}
