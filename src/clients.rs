//! Per-resource GitHub facades.
//!
//! Each call obtains a fresh-enough installation handle from the token cache
//! and issues exactly one upstream request. Upstream errors are returned
//! unchanged; nothing here retries.

use octocrab::Octocrab;
use tracing::debug;

use crate::{
    cache::{TokenAuthority, TokenCache},
    error::Result,
    graphql::{GraphQLResponse, update_discussion_mutation},
    types::{InstallationId, RepoLabel},
};

pub struct Issues<'a, A: TokenAuthority<Handle = Octocrab>> {
    cache: &'a TokenCache<A>,
}

impl<'a, A: TokenAuthority<Handle = Octocrab>> Issues<'a, A> {
    pub fn new(cache: &'a TokenCache<A>) -> Self {
        Self { cache }
    }

    pub async fn add_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
        issue_number: u64,
        labels: &[String],
    ) -> Result<()> {
        let octocrab = self.cache.get_client(installation_id).await?;

        debug!(%owner, %repo, issue_number, ?labels, "adding issue labels");
        octocrab
            .issues(owner, repo)
            .add_labels(issue_number, labels)
            .await?;

        Ok(())
    }
}

pub struct Repos<'a, A: TokenAuthority<Handle = Octocrab>> {
    cache: &'a TokenCache<A>,
}

impl<'a, A: TokenAuthority<Handle = Octocrab>> Repos<'a, A> {
    pub fn new(cache: &'a TokenCache<A>) -> Self {
        Self { cache }
    }

    /// Labels defined on the repository, in the order GitHub returns them.
    pub async fn get_labels(
        &self,
        installation_id: InstallationId,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RepoLabel>> {
        let octocrab = self.cache.get_client(installation_id).await?;

        let page = octocrab
            .issues(owner, repo)
            .list_labels_for_repo()
            .per_page(100)
            .send()
            .await?;

        Ok(page.items.into_iter().map(RepoLabel::from).collect())
    }
}

pub struct Discussions<'a, A: TokenAuthority<Handle = Octocrab>> {
    cache: &'a TokenCache<A>,
}

impl<'a, A: TokenAuthority<Handle = Octocrab>> Discussions<'a, A> {
    pub fn new(cache: &'a TokenCache<A>) -> Self {
        Self { cache }
    }

    /// Replaces the body of the discussion with node id `discussion_id`.
    pub async fn update_body(
        &self,
        installation_id: InstallationId,
        discussion_id: &str,
        body: &str,
    ) -> Result<()> {
        let octocrab = self.cache.get_client(installation_id).await?;

        let response: GraphQLResponse = octocrab
            .graphql(&update_discussion_mutation(discussion_id, body))
            .await?;
        response.into_result()?;

        Ok(())
    }
}
