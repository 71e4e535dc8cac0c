//! Boundary to the conversational agent runtime.
//!
//! The runtime owns memory storage, embeddings, state composition and
//! response generation. This module describes what the webhook handlers
//! consume from it and provides the pieces that are pure functions of their
//! input: template rendering and deterministic identifiers.

pub mod http;

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use http::HttpAgentRuntime;

/// Source tag attached to everything this integration records.
pub const SOURCE: &str = "github";

/// Embedding width assumed when the runtime does not report one.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Derives a stable identifier from an arbitrary string, so repeated
/// deliveries of the same event land in the same conversation.
pub fn string_to_uuid(value: impl AsRef<str>) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, value.as_ref().as_bytes())
}

/// Model tier requested for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelClass {
    Small,
    Medium,
    Large,
}

/// Message content exchanged with the runtime.
///
/// Generated responses may carry arbitrary structured fields next to the
/// text; they are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<Uuid>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message persisted in the runtime's memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub room_id: Uuid,
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: i64,
}

impl Memory {
    pub fn new(id: Uuid, user_id: Uuid, agent_id: Uuid, room_id: Uuid, content: Content) -> Self {
        Self {
            id,
            user_id,
            agent_id,
            room_id,
            content,
            embedding: None,
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Template variables composed by the runtime for one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(pub Map<String, Value>);

impl State {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }
}

/// Renders `{{key}}` placeholders in `template` from `state`.
///
/// String values are inserted verbatim, other values as JSON, and unknown
/// keys render as an empty string.
pub fn compose_context(state: &State, template: &str) -> String {
    static PLACEHOLDER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));

    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            match state.get(&caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}

/// Operations the webhook handlers consume from the agent runtime.
///
/// Retry, latency and failure semantics belong to the runtime; errors are
/// surfaced as-is.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn agent_id(&self) -> Uuid;

    fn agent_name(&self) -> &str;

    /// Placeholder embedding for memories that are stored without being
    /// embedded, such as the agent's own replies.
    fn zero_embedding(&self) -> Vec<f32> {
        vec![0.0; DEFAULT_EMBEDDING_DIMENSION]
    }

    async fn ensure_connection(
        &self,
        user_id: Uuid,
        room_id: Uuid,
        user_name: &str,
        display_name: &str,
        source: &str,
    ) -> anyhow::Result<()>;

    /// Returns `memory` with its embedding filled in.
    async fn add_embedding(&self, memory: Memory) -> anyhow::Result<Memory>;

    async fn create_memory(&self, memory: &Memory) -> anyhow::Result<()>;

    async fn compose_state(&self, message: &Memory, extra: State) -> anyhow::Result<State>;

    async fn generate_response(
        &self,
        context: &str,
        model_class: ModelClass,
    ) -> anyhow::Result<Content>;

    async fn update_recent_message_state(&self, state: State) -> anyhow::Result<State>;

    async fn evaluate(&self, message: &Memory, state: &State) -> anyhow::Result<()>;
}
