use std::fmt;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;

use super::{SessionError, SessionPrincipal};
use crate::cache::CacheService;

pub const SESSION_KEY_PREFIX: &str = "SESSION:";

/// Per-user list of session ids, so every session of a deleted user can be
/// found and removed.
pub const USER_SESSIONS_PREFIX: &str = "USER_SESSIONS:";

const SESSION_ID_BYTES: usize = 32;

/// Opaque session identifier: 32 bytes from the OS RNG, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Result<SessionId, SessionError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SessionError::Generation(e.to_string()))?;
        Ok(SessionId(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        SessionId(raw.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session records in the cache, keyed `SESSION:<id>`, plus a
/// `USER_SESSIONS:<user id>` index per principal.
///
/// Writes are last-write-wins; concurrent refresh and logout on the same id
/// may race, and two logins of one user landing at the same instant may
/// leave one id out of the index.
#[derive(Clone)]
pub struct SessionStore {
    cache: CacheService,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: CacheService, ttl: Duration) -> Self {
        SessionStore { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key(id: &SessionId) -> String {
        format!("{SESSION_KEY_PREFIX}{id}")
    }

    pub fn user_index_key(user_id: i64) -> String {
        format!("{USER_SESSIONS_PREFIX}{user_id}")
    }

    /// Mint a fresh id and store `principal` under it.
    pub async fn create(&self, principal: &SessionPrincipal) -> Result<SessionId, SessionError> {
        let id = SessionId::generate()?;
        let payload = serde_json::to_string(principal).map_err(SessionError::Serialization)?;
        let key = Self::key(&id);

        self.cache
            .set(&key, &payload, Some(self.ttl))
            .await
            .map_err(SessionError::Store)?;

        if let Err(err) = self.track(principal.id, &id).await {
            // An unindexed session could outlive its user; drop it.
            if let Err(del_err) = self.cache.del(&key).await {
                tracing::warn!(error = %del_err, "failed to drop unindexed session");
            }
            return Err(err);
        }

        tracing::debug!(user_id = principal.id, "session created");
        Ok(id)
    }

    /// Add `id` to the user's index, prune ids whose records are gone and
    /// give the index the session lifetime.
    async fn track(&self, user_id: i64, id: &SessionId) -> Result<(), SessionError> {
        let index_key = Self::user_index_key(user_id);
        let listed: Vec<String> = self
            .cache
            .get_json(&index_key)
            .await
            .map_err(SessionError::Check)?
            .unwrap_or_default();

        let mut live = Vec::with_capacity(listed.len() + 1);
        for raw in listed {
            if raw == id.as_str() {
                continue;
            }
            let exists = self
                .cache
                .exists(&Self::key(&SessionId::from(raw.as_str())))
                .await
                .map_err(SessionError::Check)?;
            if exists {
                live.push(raw);
            }
        }
        live.push(id.to_string());

        self.cache
            .set_json(&index_key, &live, Some(self.ttl))
            .await
            .map_err(SessionError::Store)
    }

    pub async fn get(&self, id: &SessionId) -> Result<SessionPrincipal, SessionError> {
        let raw = self
            .cache
            .get(&Self::key(id))
            .await
            .map_err(SessionError::Check)?
            .ok_or(SessionError::NotFound)?;

        serde_json::from_str(&raw).map_err(SessionError::Deserialization)
    }

    /// Reset the TTL of a live session. With `Some(principal)` the stored
    /// principal is replaced as well. The owner's index is extended with it.
    pub async fn refresh(
        &self,
        id: &SessionId,
        principal: Option<&SessionPrincipal>,
    ) -> Result<(), SessionError> {
        let key = Self::key(id);
        let current = self.get(id).await?;

        match principal {
            Some(principal) => {
                let payload =
                    serde_json::to_string(principal).map_err(SessionError::Serialization)?;
                self.cache
                    .set(&key, &payload, Some(self.ttl))
                    .await
                    .map_err(SessionError::Store)?;
            }
            None => {
                let extended = self
                    .cache
                    .expire(&key, self.ttl)
                    .await
                    .map_err(SessionError::Store)?;
                // Expired between the lookup and the TTL reset.
                if !extended {
                    return Err(SessionError::NotFound);
                }
            }
        }

        let owner = principal.map_or(current.id, |p| p.id);
        self.track(owner, id).await
    }

    /// Remove the record. Deleting an absent session succeeds.
    pub async fn delete(&self, id: &SessionId) -> Result<(), SessionError> {
        self.cache
            .del(&Self::key(id))
            .await
            .map(|_| ())
            .map_err(SessionError::Store)
    }

    /// Delete every session of `user_id` and its index. Returns how many
    /// live sessions were removed.
    pub async fn revoke_user(&self, user_id: i64) -> Result<usize, SessionError> {
        let index_key = Self::user_index_key(user_id);
        let listed: Vec<String> = self
            .cache
            .get_json(&index_key)
            .await
            .map_err(SessionError::Check)?
            .unwrap_or_default();

        let mut revoked = 0;
        for raw in &listed {
            let removed = self
                .cache
                .del(&Self::key(&SessionId::from(raw.as_str())))
                .await
                .map_err(SessionError::Store)?;
            if removed {
                revoked += 1;
            }
        }
        self.cache
            .del(&index_key)
            .await
            .map_err(SessionError::Store)?;

        tracing::info!(user_id, revoked, "sessions revoked");
        Ok(revoked)
    }
}
