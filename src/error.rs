use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while serving webhook deliveries.
///
/// Upstream failures from GitHub and the agent runtime are carried
/// transparently so callers see the original message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("client not found with installation id: {0}")]
    NotFound(u64),

    #[error("missing repository GitHub App installation")]
    MissingInstallation,

    #[error("agent response is not a label decision: {0}")]
    InvalidDecision(String),

    #[error("invalid webhook signature: {0}")]
    Signature(String),

    #[error("invalid webhook payload")]
    Payload(#[from] serde_json::Error),

    #[error("invalid GitHub App private key")]
    Key(#[from] jsonwebtoken::errors::Error),

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    GitHub(#[from] octocrab::Error),

    #[error("GitHub GraphQL request failed: {0}")]
    GraphQl(String),

    #[error(transparent)]
    Agent(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
