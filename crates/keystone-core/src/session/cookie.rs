use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::store::{SessionId, SessionStore};
use super::{SessionError, SessionPrincipal};

pub const SESSION_COOKIE: &str = "session";

/// Outcome of a best-effort cleanup. Never fails the surrounding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Done,
    /// Nothing to clean up.
    Skipped,
    Failed(String),
}

/// The HTTP side of sessions: mints, reads, refreshes and expires the
/// `session` cookie around a [`SessionStore`].
#[derive(Clone)]
pub struct SessionCookies {
    store: SessionStore,
    secure: bool,
}

impl SessionCookies {
    /// `secure` sets the cookie's `Secure` attribute; on in production.
    pub fn new(store: SessionStore, secure: bool) -> Self {
        SessionCookies { store, secure }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn cookie(&self, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(max_age)
            .build()
    }

    fn live_cookie(&self, id: &SessionId) -> Cookie<'static> {
        let ttl = i64::try_from(self.store.ttl().as_secs()).unwrap_or(i64::MAX);
        self.cookie(id.to_string(), time::Duration::seconds(ttl))
    }

    fn session_id(jar: &CookieJar) -> Result<SessionId, SessionError> {
        let cookie = jar.get(SESSION_COOKIE).ok_or(SessionError::CookieNotFound)?;
        let value = cookie.value().trim();
        if value.is_empty() {
            return Err(SessionError::EmptySessionId);
        }
        Ok(SessionId::from(value))
    }

    /// Create a session for `principal` and attach its cookie.
    pub async fn login(
        &self,
        jar: CookieJar,
        principal: &SessionPrincipal,
    ) -> Result<(CookieJar, SessionId), SessionError> {
        let id = self.store.create(principal).await?;
        let jar = jar.add(self.live_cookie(&id));
        Ok((jar, id))
    }

    /// End the caller's session. Safe on callers without one.
    ///
    /// The record is deleted best-effort; the cookie is expired regardless.
    pub async fn logout(&self, jar: CookieJar) -> (CookieJar, Cleanup) {
        let Ok(id) = Self::session_id(&jar) else {
            return (jar, Cleanup::Skipped);
        };

        let cleanup = match self.store.delete(&id).await {
            Ok(()) => Cleanup::Done,
            Err(err) => {
                tracing::warn!(error = %err, "failed to delete session record on logout");
                Cleanup::Failed(err.to_string())
            }
        };

        let jar = jar.add(self.cookie(String::new(), time::Duration::ZERO));
        (jar, cleanup)
    }

    /// Extend the caller's session, optionally replacing its principal, and
    /// re-issue the cookie with a fresh max-age.
    pub async fn refresh(
        &self,
        jar: CookieJar,
        principal: Option<&SessionPrincipal>,
    ) -> Result<CookieJar, SessionError> {
        let id = Self::session_id(&jar)?;
        self.store.refresh(&id, principal).await?;
        Ok(jar.add(self.live_cookie(&id)))
    }

    /// Resolve the caller's principal. Every call goes to the store.
    pub async fn check(&self, jar: &CookieJar) -> Result<(SessionId, SessionPrincipal), SessionError> {
        let id = Self::session_id(jar)?;
        let principal = self.store.get(&id).await?;
        Ok((id, principal))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::cache::CacheService;

    fn principal() -> SessionPrincipal {
        let now = Utc::now();
        SessionPrincipal {
            id: 42,
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            phone: Some("+905551234567".to_string()),
            role: "admin".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn cookies(secure: bool) -> SessionCookies {
        let store = SessionStore::new(CacheService::in_memory(), Duration::from_secs(604_800));
        SessionCookies::new(store, secure)
    }

    #[tokio::test]
    async fn test_login_sets_hardened_cookie() {
        let sessions = cookies(true);
        let (jar, id) = sessions.login(CookieJar::new(), &principal()).await.unwrap();

        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.value(), id.as_str());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604_800)));
    }

    #[tokio::test]
    async fn test_cookie_not_secure_outside_production() {
        let sessions = cookies(false);
        let (jar, _) = sessions.login(CookieJar::new(), &principal()).await.unwrap();
        assert_eq!(jar.get(SESSION_COOKIE).unwrap().secure(), Some(false));
    }

    #[tokio::test]
    async fn test_check_after_login_returns_principal() {
        let sessions = cookies(false);
        let jane = principal();
        let (jar, id) = sessions.login(CookieJar::new(), &jane).await.unwrap();
        let (checked_id, checked) = sessions.check(&jar).await.unwrap();
        assert_eq!(checked_id, id);
        assert_eq!(checked, jane);
    }

    #[tokio::test]
    async fn test_check_without_cookie() {
        let sessions = cookies(false);
        let err = sessions.check(&CookieJar::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::CookieNotFound));
    }

    #[tokio::test]
    async fn test_check_with_blank_cookie() {
        let sessions = cookies(false);
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, ""));
        let err = sessions.check(&jar).await.unwrap_err();
        assert!(matches!(err, SessionError::EmptySessionId));
    }

    #[tokio::test]
    async fn test_logout_expires_cookie_and_record() {
        let sessions = cookies(false);
        let (jar, _) = sessions.login(CookieJar::new(), &principal()).await.unwrap();
        let stale = jar.clone();

        let (jar, cleanup) = sessions.logout(jar).await;
        assert_eq!(cleanup, Cleanup::Done);
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));

        let err = sessions.check(&stale).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_logout_twice_is_fine() {
        let sessions = cookies(false);
        let (jar, _) = sessions.login(CookieJar::new(), &principal()).await.unwrap();
        let (_, first) = sessions.logout(jar.clone()).await;
        let (_, second) = sessions.logout(jar).await;
        assert_eq!(first, Cleanup::Done);
        assert_eq!(second, Cleanup::Done);

        let (_, anonymous) = sessions.logout(CookieJar::new()).await;
        assert_eq!(anonymous, Cleanup::Skipped);
    }

    #[tokio::test]
    async fn test_refresh_requires_cookie() {
        let sessions = cookies(false);
        let err = sessions.refresh(CookieJar::new(), None).await.unwrap_err();
        assert!(matches!(err, SessionError::CookieNotFound));
    }

    #[tokio::test]
    async fn test_refresh_reissues_cookie() {
        let sessions = cookies(false);
        let (jar, id) = sessions.login(CookieJar::new(), &principal()).await.unwrap();
        let jar = sessions.refresh(jar, None).await.unwrap();
        let cookie = jar.get(SESSION_COOKIE).unwrap();
        assert_eq!(cookie.value(), id.as_str());
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604_800)));
    }
}
