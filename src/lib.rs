//! ghapp-agent: a GitHub App that connects repository events to a
//! conversational agent runtime.
//!
//! New issues are triaged by the agent, which picks a priority and a type
//! label that are then applied to the issue. New discussions get their body
//! replaced with a voting template. Installation tokens are cached per
//! installation and refreshed when they expire.

pub mod agent;
pub mod cache;
pub mod clients;
pub mod error;
pub mod events;
pub mod github;
pub mod graphql;
pub mod handlers;
pub mod lifecycle;
pub mod settings;
pub mod types;
pub mod webhook;

pub use agent::{AgentRuntime, Content, HttpAgentRuntime, Memory, ModelClass, State};
pub use cache::{Clock, TOKEN_LIFETIME_MS, TokenAuthority, TokenCache};
pub use error::{Error, Result};
pub use events::{DiscussionCreatedEvent, IssuesOpenedEvent, WebhookEvent};
pub use github::{AppAuthority, GitHubApp};
pub use handlers::WebhookHandlers;
pub use lifecycle::{GitHubClient, start};
pub use settings::Settings;
pub use types::{Forge, InstallationId, LabelDecision, RepoLabel, render_labels};
pub use webhook::WEBHOOK_PATH;
