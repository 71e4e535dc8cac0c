#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use ghapp_agent::{
    AgentRuntime, Clock, Content, Error, Forge, InstallationId, Memory, ModelClass, RepoLabel,
    Result, State, TokenAuthority,
};
use octocrab::Octocrab;
use serde_json::{Value, json};
use sha2::Sha256;
use uuid::Uuid;

/// A clock tests can move by hand, in epoch milliseconds.
#[derive(Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn at(millis: i64) -> Self {
        Self(Arc::new(AtomicI64::new(millis)))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    pub fn clock(&self) -> Clock {
        let now = Arc::clone(&self.0);
        Arc::new(move || {
            DateTime::from_timestamp_millis(now.load(Ordering::SeqCst)).expect("valid timestamp")
        })
    }
}

/// Authority handing out numbered handles and counting exchanges.
#[derive(Clone, Default)]
pub struct MockAuthority {
    pub installations: Vec<InstallationId>,
    pub failing: Option<InstallationId>,
    pub calls: Arc<AtomicUsize>,
}

impl MockAuthority {
    pub fn with_installations(ids: &[u64]) -> Self {
        Self {
            installations: ids.iter().copied().map(InstallationId).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenAuthority for MockAuthority {
    type Handle = usize;

    async fn installation_client(&self, id: InstallationId) -> Result<usize> {
        if self.failing == Some(id) {
            return Err(Error::NotFound(id.0));
        }
        Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn installations(&self) -> Result<Vec<InstallationId>> {
        Ok(self.installations.clone())
    }
}

/// Authority whose handles talk to a fixed base URI (a local mock server, or
/// nothing at all).
#[derive(Clone)]
pub struct OctocrabAuthority {
    pub octocrab: Octocrab,
    pub installations: Vec<InstallationId>,
    pub calls: Arc<AtomicUsize>,
}

impl OctocrabAuthority {
    pub fn new(base_uri: Option<&str>, ids: &[u64]) -> Self {
        let builder = Octocrab::builder();
        let builder = match base_uri {
            Some(uri) => builder.base_uri(uri).expect("valid base uri"),
            None => builder,
        };

        Self {
            octocrab: builder.build().expect("octocrab client"),
            installations: ids.iter().copied().map(InstallationId).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TokenAuthority for OctocrabAuthority {
    type Handle = Octocrab;

    async fn installation_client(&self, _id: InstallationId) -> Result<Octocrab> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.octocrab.clone())
    }

    async fn installations(&self) -> Result<Vec<InstallationId>> {
        Ok(self.installations.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForgeCall {
    GetLabels {
        installation_id: InstallationId,
        owner: String,
        repo: String,
    },
    AddLabels {
        installation_id: InstallationId,
        owner: String,
        repo: String,
        issue_number: u64,
        labels: Vec<String>,
    },
    UpdateDiscussionBody {
        installation_id: InstallationId,
        discussion_id: String,
        body: String,
    },
}

/// Forge recording every call and serving a fixed label set.
#[derive(Clone, Default)]
pub struct MockForge {
    pub labels: Vec<RepoLabel>,
    pub fail_add_labels: bool,
    pub calls: Arc<Mutex<Vec<ForgeCall>>>,
}

impl MockForge {
    pub fn with_labels(labels: Vec<RepoLabel>) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ForgeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ForgeCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Forge for MockForge {
    async fn get_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RepoLabel>> {
        self.record(ForgeCall::GetLabels {
            installation_id,
            owner: owner.to_string(),
            repo: repo.to_string(),
        });
        Ok(self.labels.clone())
    }

    async fn add_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        issue_number: u64,
        labels: &[String],
    ) -> Result<()> {
        self.record(ForgeCall::AddLabels {
            installation_id,
            owner: owner.to_string(),
            repo: repo.to_string(),
            issue_number,
            labels: labels.to_vec(),
        });
        if self.fail_add_labels {
            return Err(Error::NotFound(installation_id.0));
        }
        Ok(())
    }

    async fn update_discussion_body(
        &self,
        installation_id: InstallationId,
        discussion_id: &str,
        body: &str,
    ) -> Result<()> {
        self.record(ForgeCall::UpdateDiscussionBody {
            installation_id,
            discussion_id: discussion_id.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentCall {
    EnsureConnection {
        user_id: Uuid,
        room_id: Uuid,
        user_name: String,
        source: String,
    },
    AddEmbedding(Uuid),
    CreateMemory(Memory),
    ComposeState(State),
    GenerateResponse {
        context: String,
        model_class: ModelClass,
    },
    UpdateRecentMessageState,
    Evaluate(Uuid),
}

/// Agent runtime that answers every generation with a fixed response.
#[derive(Clone)]
pub struct MockAgent {
    pub response: Content,
    pub calls: Arc<Mutex<Vec<AgentCall>>>,
}

impl MockAgent {
    pub fn responding(response: Value) -> Self {
        Self {
            response: serde_json::from_value(response).expect("content"),
            calls: Arc::default(),
        }
    }

    pub fn triaging(priority: &str, kind: &str) -> Self {
        Self::responding(json!({ "text": "", "priority": priority, "type": kind }))
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: AgentCall) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn agent_id() -> Uuid {
    Uuid::from_u128(0xa6e7)
}

#[async_trait]
impl AgentRuntime for MockAgent {
    fn agent_id(&self) -> Uuid {
        agent_id()
    }

    fn agent_name(&self) -> &str {
        "Triage"
    }

    async fn ensure_connection(
        &self,
        user_id: Uuid,
        room_id: Uuid,
        user_name: &str,
        _display_name: &str,
        source: &str,
    ) -> anyhow::Result<()> {
        self.record(AgentCall::EnsureConnection {
            user_id,
            room_id,
            user_name: user_name.to_string(),
            source: source.to_string(),
        });
        Ok(())
    }

    async fn add_embedding(&self, mut memory: Memory) -> anyhow::Result<Memory> {
        self.record(AgentCall::AddEmbedding(memory.id));
        memory.embedding = Some(vec![0.0; 4]);
        Ok(memory)
    }

    async fn create_memory(&self, memory: &Memory) -> anyhow::Result<()> {
        self.record(AgentCall::CreateMemory(memory.clone()));
        Ok(())
    }

    async fn compose_state(&self, _message: &Memory, extra: State) -> anyhow::Result<State> {
        self.record(AgentCall::ComposeState(extra.clone()));
        let mut state = extra;
        state.insert("bio", "Keeps the backlog tidy.");
        Ok(state)
    }

    async fn generate_response(
        &self,
        context: &str,
        model_class: ModelClass,
    ) -> anyhow::Result<Content> {
        self.record(AgentCall::GenerateResponse {
            context: context.to_string(),
            model_class,
        });
        Ok(self.response.clone())
    }

    async fn update_recent_message_state(&self, state: State) -> anyhow::Result<State> {
        self.record(AgentCall::UpdateRecentMessageState);
        Ok(state)
    }

    async fn evaluate(&self, message: &Memory, _state: &State) -> anyhow::Result<()> {
        self.record(AgentCall::Evaluate(message.id));
        Ok(())
    }
}

fn installation(id: u64) -> Value {
    json!({ "id": id, "node_id": format!("MDIzOkludGVncmF0aW9uSW5zdGFsbGF0aW9u{id}") })
}

pub fn user(id: u64, login: &str) -> Value {
    let api = format!("https://api.github.com/users/{login}");
    json!({
        "login": login,
        "id": id,
        "node_id": format!("U_{id}"),
        "avatar_url": format!("https://avatars.githubusercontent.com/u/{id}"),
        "gravatar_id": "",
        "url": api,
        "html_url": format!("https://github.com/{login}"),
        "followers_url": format!("{api}/followers"),
        "following_url": format!("{api}/following"),
        "gists_url": format!("{api}/gists"),
        "starred_url": format!("{api}/starred"),
        "subscriptions_url": format!("{api}/subscriptions"),
        "organizations_url": format!("{api}/orgs"),
        "repos_url": format!("{api}/repos"),
        "events_url": format!("{api}/events"),
        "received_events_url": format!("{api}/received_events"),
        "type": "User",
        "site_admin": false
    })
}

pub fn issue_opened_payload(installation_id: Option<u64>) -> Value {
    let api = "https://api.github.com/repos/acme/widgets";
    let mut author = user(55, "octocat");
    author["name"] = json!("The Octocat");

    let mut payload = json!({
        "action": "opened",
        "issue": {
            "id": 2001,
            "node_id": "I_kwDOAbc7",
            "url": format!("{api}/issues/7"),
            "repository_url": api,
            "labels_url": format!("{api}/issues/7/labels"),
            "comments_url": format!("{api}/issues/7/comments"),
            "events_url": format!("{api}/issues/7/events"),
            "html_url": "https://github.com/acme/widgets/issues/7",
            "number": 7,
            "state": "open",
            "title": "Bug: crash on save",
            "body": "Steps...",
            "user": author,
            "labels": [],
            "assignees": [],
            "locked": false,
            "comments": 0,
            "created_at": "2025-01-15T09:30:00Z",
            "updated_at": "2025-01-15T09:30:00Z"
        },
        "repository": {
            "id": 90210,
            "name": "widgets",
            "full_name": "acme/widgets",
            "url": api,
            "owner": user(3, "acme")
        },
        "sender": user(55, "octocat")
    });
    if let Some(id) = installation_id {
        payload["installation"] = installation(id);
    }
    payload
}

pub fn discussion_created_payload(installation_id: Option<u64>) -> Value {
    let mut payload = json!({
        "action": "created",
        "discussion": { "id": 31, "node_id": "D_kwDOAbc123", "number": 4, "title": "Roadmap" }
    });
    if let Some(id) = installation_id {
        payload["installation"] = installation(id);
    }
    payload
}

/// The `X-Hub-Signature-256` value GitHub sends for `payload`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn repo_labels() -> Vec<RepoLabel> {
    vec![
        RepoLabel::new("bug", Some("Something broken")),
        RepoLabel::new("enhancement", None),
    ]
}
