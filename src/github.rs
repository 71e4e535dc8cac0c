use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::{Octocrab, models::AppId};

use crate::{
    cache::{TokenAuthority, TokenCache},
    clients::{Discussions, Issues, Repos},
    error::{Error, Result},
    types::{Forge, InstallationId, RepoLabel},
};

/// Reads and parses the App's RSA private key.
pub fn load_private_key(path: &Path) -> Result<EncodingKey> {
    let pem = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(EncodingKey::from_rsa_pem(&pem)?)
}

/// Authenticates as the GitHub App and mints installation clients.
#[derive(Debug, Clone)]
pub struct AppAuthority {
    app: Octocrab,
}

impl AppAuthority {
    pub fn new(app_id: u64, key: EncodingKey) -> Result<Self> {
        let app = Octocrab::builder().app(AppId(app_id), key).build()?;
        Ok(Self { app })
    }
}

#[async_trait]
impl TokenAuthority for AppAuthority {
    type Handle = Octocrab;

    async fn installation_client(&self, id: InstallationId) -> Result<Octocrab> {
        let (octocrab, _token) = self.app.installation_and_token(id.into()).await?;
        Ok(octocrab)
    }

    async fn installations(&self) -> Result<Vec<InstallationId>> {
        let first = self.app.apps().installations().per_page(100).send().await?;
        let installations = self.app.all_pages(first).await?;

        Ok(installations
            .into_iter()
            .map(|installation| InstallationId(installation.id.0))
            .collect())
    }
}

/// The App as seen by webhook handlers: resource clients sharing one token
/// cache.
pub struct GitHubApp<A: TokenAuthority<Handle = Octocrab> = AppAuthority> {
    cache: Arc<TokenCache<A>>,
}

impl<A: TokenAuthority<Handle = Octocrab>> Clone for GitHubApp<A> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<A: TokenAuthority<Handle = Octocrab>> GitHubApp<A> {
    pub fn new(cache: TokenCache<A>) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    pub fn cache(&self) -> &TokenCache<A> {
        &self.cache
    }

    pub fn issues(&self) -> Issues<'_, A> {
        Issues::new(&self.cache)
    }

    pub fn repos(&self) -> Repos<'_, A> {
        Repos::new(&self.cache)
    }

    pub fn discussions(&self) -> Discussions<'_, A> {
        Discussions::new(&self.cache)
    }
}

#[async_trait]
impl<A: TokenAuthority<Handle = Octocrab>> Forge for GitHubApp<A> {
    async fn get_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RepoLabel>> {
        self.repos().get_labels(installation_id, owner, repo).await
    }

    async fn add_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        issue_number: u64,
        labels: &[String],
    ) -> Result<()> {
        self.issues()
            .add_labels(installation_id, owner, repo, issue_number, labels)
            .await
    }

    async fn update_discussion_body(
        &self,
        installation_id: InstallationId,
        discussion_id: &str,
        body: &str,
    ) -> Result<()> {
        self.discussions()
            .update_body(installation_id, discussion_id, body)
            .await
    }
}
