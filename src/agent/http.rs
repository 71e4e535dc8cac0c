use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::{AgentRuntime, Content, DEFAULT_EMBEDDING_DIMENSION, Memory, ModelClass, State};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentInfo {
    name: String,
    #[serde(default = "default_embedding_dimension")]
    embedding_dimension: usize,
}

fn default_embedding_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

/// Talks to a remote agent runtime over JSON.
///
/// Each boundary operation maps to `POST {base}/agents/{agent_id}/{operation}`.
#[derive(Debug, Clone)]
pub struct HttpAgentRuntime {
    client: reqwest::Client,
    base_url: Url,
    agent_id: Uuid,
    agent_name: String,
    embedding_dimension: usize,
}

impl HttpAgentRuntime {
    /// Looks the agent up and returns a runtime bound to it.
    pub async fn connect(base_url: Url, agent_id: Uuid) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ghapp-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create agent runtime HTTP client")?;

        let base_url = with_trailing_slash(base_url);
        let url = base_url.join(&format!("agents/{agent_id}"))?;

        let info: AgentInfo = client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("Failed to reach agent runtime at {url}"))?
            .json()
            .await
            .context("Failed to decode agent description")?;

        Ok(Self {
            client,
            base_url,
            agent_id,
            agent_name: info.name,
            embedding_dimension: info.embedding_dimension,
        })
    }

    fn endpoint(&self, operation: &str) -> Result<Url> {
        self.base_url
            .join(&format!("agents/{}/{operation}", self.agent_id))
            .with_context(|| format!("Invalid agent runtime endpoint for '{operation}'"))
    }

    async fn call<B, R>(&self, operation: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(operation)?;
        debug!(%url, "agent runtime call");

        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("Agent runtime '{operation}' failed"))?
            .json()
            .await
            .with_context(|| format!("Failed to decode agent runtime '{operation}' response"))
    }

    async fn send<B>(&self, operation: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(operation)?;
        debug!(%url, "agent runtime call");

        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("Agent runtime '{operation}' failed"))?;

        Ok(())
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn zero_embedding(&self) -> Vec<f32> {
        vec![0.0; self.embedding_dimension]
    }

    async fn ensure_connection(
        &self,
        user_id: Uuid,
        room_id: Uuid,
        user_name: &str,
        display_name: &str,
        source: &str,
    ) -> Result<()> {
        self.send(
            "connections",
            &json!({
                "userId": user_id,
                "roomId": room_id,
                "userName": user_name,
                "displayName": display_name,
                "source": source,
            }),
        )
        .await
    }

    async fn add_embedding(&self, memory: Memory) -> Result<Memory> {
        self.call("embeddings", &memory).await
    }

    async fn create_memory(&self, memory: &Memory) -> Result<()> {
        self.send("memories", memory).await
    }

    async fn compose_state(&self, message: &Memory, extra: State) -> Result<State> {
        self.call("state", &json!({ "message": message, "additionalKeys": extra }))
            .await
    }

    async fn generate_response(&self, context: &str, model_class: ModelClass) -> Result<Content> {
        self.call(
            "responses",
            &json!({ "context": context, "modelClass": model_class }),
        )
        .await
    }

    async fn update_recent_message_state(&self, state: State) -> Result<State> {
        self.call("state/recent", &state).await
    }

    async fn evaluate(&self, message: &Memory, state: &State) -> Result<()> {
        self.send(
            "evaluations",
            &json!({ "message": message, "state": state }),
        )
        .await
    }
}
