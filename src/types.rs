use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    agent::Content,
    error::{Error, Result},
};

/// Identifies a GitHub App installation on one account or organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl From<u64> for InstallationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<octocrab::models::InstallationId> for InstallationId {
    fn from(id: octocrab::models::InstallationId) -> Self {
        Self(id.0)
    }
}

impl From<InstallationId> for octocrab::models::InstallationId {
    fn from(id: InstallationId) -> Self {
        octocrab::models::InstallationId(id.0)
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A label defined on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLabel {
    pub name: String,
    pub description: Option<String>,
}

impl RepoLabel {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
        }
    }
}

impl From<octocrab::models::Label> for RepoLabel {
    fn from(label: octocrab::models::Label) -> Self {
        Self {
            name: label.name,
            description: label.description,
        }
    }
}

/// Renders repository labels as a bullet list the agent can read.
///
/// Each label becomes `- name: description` followed by a newline; labels
/// without a (non-empty) description render as `- name`.
pub fn render_labels(labels: &[RepoLabel]) -> String {
    labels.iter().fold(String::new(), |mut content, label| {
        content.push_str("- ");
        content.push_str(&label.name);
        if let Some(description) = label.description.as_deref().filter(|d| !d.is_empty()) {
            content.push_str(": ");
            content.push_str(description);
        }
        content.push('\n');
        content
    })
}

/// The triage verdict the agent produces for a newly opened issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LabelDecision {
    pub priority: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl LabelDecision {
    /// Labels to apply to the issue, priority first.
    pub fn labels(&self) -> Vec<String> {
        vec![self.priority.clone(), self.kind.clone()]
    }

    /// Extracts a decision from a generated response.
    ///
    /// Structured `priority`/`type` fields win; otherwise the first JSON
    /// object in the response text that decodes as a decision is used.
    pub fn from_content(content: &Content) -> Result<Self> {
        let field = |name: &str| content.extra.get(name).and_then(Value::as_str);

        if let (Some(priority), Some(kind)) = (field("priority"), field("type")) {
            return Ok(Self {
                priority: priority.to_string(),
                kind: kind.to_string(),
            });
        }

        let text = content.text.as_str();
        text.match_indices('{')
            .find_map(|(start, _)| {
                serde_json::Deserializer::from_str(&text[start..])
                    .into_iter::<Self>()
                    .next()?
                    .ok()
            })
            .ok_or_else(|| Error::InvalidDecision(content.text.clone()))
    }
}

/// The GitHub operations webhook handlers depend on.
///
/// Every call is scoped to one installation; implementations obtain the
/// installation's credentials themselves.
#[async_trait]
pub trait Forge: Send + Sync {
    async fn get_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RepoLabel>>;

    async fn add_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        issue_number: u64,
        labels: &[String],
    ) -> Result<()>;

    async fn update_discussion_body(
        &self,
        installation_id: InstallationId,
        discussion_id: &str,
        body: &str,
    ) -> Result<()>;
}
