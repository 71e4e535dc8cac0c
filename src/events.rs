use octocrab::models::{
    Author,
    issues::Issue,
    webhook_events::{
        EventInstallation, WebhookEvent as GitHubEvent, WebhookEventPayload,
        payload::{DiscussionWebhookEventAction, IssuesWebhookEventAction},
    },
};
use serde::{Deserialize, Serialize, de::Error as _};

use crate::{
    error::{Error, Result},
    types::InstallationId,
};

/// Display name of a webhook author, falling back to the login when none is
/// set.
pub fn display_name(author: &Author) -> &str {
    author
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&author.login)
}

/// An `issues.opened` delivery.
#[derive(Debug, Clone)]
pub struct IssuesOpenedEvent {
    pub issue: Issue,
    pub owner: String,
    pub repo: String,
    pub installation: Option<EventInstallation>,
}

/// The parts of a discussion the handlers use. octocrab leaves the
/// discussion object untyped.
#[derive(Debug, Clone, Deserialize)]
pub struct Discussion {
    pub node_id: String,
    pub number: u64,
}

/// A `discussion.created` delivery.
#[derive(Debug, Clone)]
pub struct DiscussionCreatedEvent {
    pub discussion: Discussion,
    pub installation: Option<EventInstallation>,
}

/// Returns the installation a delivery was sent for.
pub fn require_installation(installation: Option<&EventInstallation>) -> Result<InstallationId> {
    installation
        .map(|installation| installation.id().into())
        .ok_or(Error::MissingInstallation)
}

/// A webhook delivery decoded into one of the events this App reacts to.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    IssueOpened(Box<IssuesOpenedEvent>),
    DiscussionCreated(Box<DiscussionCreatedEvent>),
    /// Any other event/action pair; acknowledged without side effects.
    Ignored {
        event: String,
        action: Option<String>,
    },
}

fn action_name(action: &impl Serialize) -> Option<String> {
    serde_json::to_value(action)
        .ok()?
        .as_str()
        .map(str::to_string)
}

impl WebhookEvent {
    /// Decodes a delivery from its `X-GitHub-Event` name and JSON body.
    pub fn decode(event: &str, payload: &[u8]) -> Result<Self> {
        let GitHubEvent {
            repository,
            installation,
            specific,
            ..
        } = GitHubEvent::try_from_header_and_body(event, payload)?;

        let ignored = |action: Option<String>| WebhookEvent::Ignored {
            event: event.to_string(),
            action,
        };

        let decoded = match specific {
            WebhookEventPayload::Issues(payload) => {
                if !matches!(payload.action, IssuesWebhookEventAction::Opened) {
                    return Ok(ignored(action_name(&payload.action)));
                }

                let repository =
                    repository.ok_or_else(|| serde_json::Error::missing_field("repository"))?;
                let owner = repository
                    .owner
                    .ok_or_else(|| serde_json::Error::missing_field("repository.owner"))?;

                WebhookEvent::IssueOpened(Box::new(IssuesOpenedEvent {
                    issue: payload.issue,
                    owner: owner.login,
                    repo: repository.name,
                    installation,
                }))
            }
            WebhookEventPayload::Discussion(payload) => {
                if !matches!(payload.action, DiscussionWebhookEventAction::Created) {
                    return Ok(ignored(action_name(&payload.action)));
                }

                WebhookEvent::DiscussionCreated(Box::new(DiscussionCreatedEvent {
                    discussion: serde_json::from_value(payload.discussion)?,
                    installation,
                }))
            }
            _ => ignored(None),
        };

        Ok(decoded)
    }

    /// The `event.action` name used in logs.
    pub fn name(&self) -> String {
        match self {
            WebhookEvent::IssueOpened(_) => "issues.opened".to_string(),
            WebhookEvent::DiscussionCreated(_) => "discussion.created".to_string(),
            WebhookEvent::Ignored {
                event,
                action: Some(action),
            } => format!("{event}.{action}"),
            WebhookEvent::Ignored { event, action: None } => event.clone(),
        }
    }
}
