use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    types::InstallationId,
};

/// Installation access tokens expire after one hour.
pub const TOKEN_LIFETIME_MS: i64 = 60 * 60 * 1000;

/// Issues installation-scoped API handles on behalf of the App.
#[async_trait]
pub trait TokenAuthority: Send + Sync {
    type Handle: Clone + Send + Sync;

    /// Exchanges the App credentials for a fresh handle scoped to one
    /// installation. Performs one network round trip.
    async fn installation_client(&self, id: InstallationId) -> Result<Self::Handle>;

    /// Lists every installation the App is registered for.
    async fn installations(&self) -> Result<Vec<InstallationId>>;
}

/// Source of the current time, in UTC.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
struct CachedClient<H> {
    handle: H,
    expiration: i64,
}

/// Maps installation ids to authenticated handles, refreshing expired
/// entries on lookup.
///
/// The lock is never held across an await point: two tasks that observe the
/// same expired entry may both refresh it, and the last write wins.
pub struct TokenCache<A: TokenAuthority> {
    authority: A,
    clients: Mutex<HashMap<InstallationId, CachedClient<A::Handle>>>,
    clock: Clock,
}

impl<A: TokenAuthority> TokenCache<A> {
    pub fn new(authority: A) -> Self {
        Self::with_clock(authority, Arc::new(Utc::now))
    }

    pub fn with_clock(authority: A, clock: Clock) -> Self {
        Self {
            authority,
            clients: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn now_ms(&self) -> i64 {
        (self.clock)().timestamp_millis()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<InstallationId, CachedClient<A::Handle>>> {
        // A poisoned map still holds valid entries; keep serving them.
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a non-expired handle for `id`.
    ///
    /// Fails with [`Error::NotFound`] when the installation was never
    /// registered through [`TokenCache::refresh`] or [`TokenCache::populate`].
    pub async fn get_client(&self, id: InstallationId) -> Result<A::Handle> {
        let cached = self
            .entries()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound(id.0))?;

        if cached.expiration < self.now_ms() {
            debug!(installation_id = %id, "installation token expired, refreshing");
            return self.refresh(id).await;
        }

        Ok(cached.handle)
    }

    /// Requests a new handle for `id` and stores it for one hour.
    pub async fn refresh(&self, id: InstallationId) -> Result<A::Handle> {
        let handle = self.authority.installation_client(id).await?;
        let expiration = self.now_ms() + TOKEN_LIFETIME_MS;

        self.entries().insert(
            id,
            CachedClient {
                handle: handle.clone(),
                expiration,
            },
        );

        Ok(handle)
    }

    /// Registers every installation the App knows about.
    ///
    /// Installations are refreshed one at a time; the first failure aborts
    /// the whole run.
    pub async fn populate(&self) -> Result<usize> {
        let installations = self.authority.installations().await?;

        for id in &installations {
            self.refresh(*id).await?;
            debug!(installation_id = %id, "registered installation");
        }

        info!(count = installations.len(), "installation tokens cached");
        Ok(installations.len())
    }

    /// Expiration of the cached entry for `id`, in epoch milliseconds.
    pub fn expiration(&self, id: InstallationId) -> Option<i64> {
        self.entries().get(&id).map(|entry| entry.expiration)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
