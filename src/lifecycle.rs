use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use octocrab::Octocrab;
use tracing::info;

use crate::{
    agent::AgentRuntime,
    cache::{TokenAuthority, TokenCache},
    github::{AppAuthority, GitHubApp, load_private_key},
    handlers::WebhookHandlers,
    settings::Settings,
    webhook,
};

/// The running App: token cache, resource clients and webhook handlers.
pub struct GitHubClient<R, A = AppAuthority>
where
    A: TokenAuthority<Handle = Octocrab>,
{
    app: GitHubApp<A>,
    handlers: Arc<WebhookHandlers<GitHubApp<A>, R>>,
    webhook_secret: String,
}

impl<R, A> GitHubClient<R, A>
where
    R: AgentRuntime + 'static,
    A: TokenAuthority<Handle = Octocrab> + 'static,
{
    pub fn new(authority: A, agent: R, webhook_secret: impl Into<String>) -> Self {
        Self::from_cache(TokenCache::new(authority), agent, webhook_secret)
    }

    pub fn from_cache(cache: TokenCache<A>, agent: R, webhook_secret: impl Into<String>) -> Self {
        let app = GitHubApp::new(cache);
        let handlers = Arc::new(WebhookHandlers::new(app.clone(), agent));

        Self {
            app,
            handlers,
            webhook_secret: webhook_secret.into(),
        }
    }

    pub fn app(&self) -> &GitHubApp<A> {
        &self.app
    }

    /// Caches a token for every installation of the App.
    ///
    /// Installation tokens live for one hour; later lookups refresh them
    /// lazily.
    pub async fn retrieve_installations(&self) -> Result<usize> {
        self.app
            .cache()
            .populate()
            .await
            .context("Failed to retrieve GitHub App installations")
    }

    /// Router to mount in the host HTTP server.
    pub fn middleware(&self) -> Router {
        webhook::router(Arc::clone(&self.handlers), self.webhook_secret.clone())
    }

    pub async fn stop(&self) {
        info!("GitHub client stop");
    }
}

/// Loads the App credentials, caches installation tokens and returns the
/// client ready to serve webhooks. Any installation failing to authenticate
/// aborts startup.
pub async fn start<R>(settings: &Settings, agent: R) -> Result<GitHubClient<R>>
where
    R: AgentRuntime + 'static,
{
    info!("GitHub client start");

    let key = load_private_key(&settings.app_key).context("Failed to load GitHub App key")?;
    let authority =
        AppAuthority::new(settings.app_id, key).context("Failed to create GitHub App client")?;

    let client = GitHubClient::new(authority, agent, settings.webhook_secret.clone());
    let count = client.retrieve_installations().await?;
    info!(installations = count, app_id = settings.app_id, "GitHub client ready");

    Ok(client)
}
