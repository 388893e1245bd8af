//! Cookie-backed sessions.
//!
//! The cookie carries only an opaque id; the principal lives in the cache
//! under `SESSION:<id>` and is re-read on every access.

mod cookie;
mod store;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::cache::CacheError;
use crate::error::{AppError, DomainError};

pub use cookie::{Cleanup, SESSION_COOKIE, SessionCookies};
pub use store::{SESSION_KEY_PREFIX, SessionId, SessionStore, USER_SESSIONS_PREFIX};

/// Identity attached to a session. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPrincipal {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cookie not found")]
    CookieNotFound,

    #[error("session cookie is empty")]
    EmptySessionId,

    #[error("session expired or not found")]
    NotFound,

    #[error("failed to generate session id: {0}")]
    Generation(String),

    #[error("failed to serialize session principal: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("failed to write session: {0}")]
    Store(#[source] CacheError),

    #[error("failed to read session: {0}")]
    Check(#[source] CacheError),

    #[error("failed to deserialize session principal: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::CookieNotFound => "ERR:SESSION_COOKIE_NOT_FOUND",
            SessionError::EmptySessionId => "ERR:SESSION_EMPTY_ID",
            SessionError::NotFound => "ERR:SESSION_NOT_FOUND",
            SessionError::Generation(_) => "ERR:SESSION_GENERATE_ID",
            SessionError::Serialization(_) => "ERR:SESSION_SERIALIZATION",
            SessionError::Store(_) => "ERR:SESSION_STORE",
            SessionError::Check(_) => "ERR:SESSION_CHECK_EXIST",
            SessionError::Deserialization(_) => "ERR:SESSION_DESERIALIZE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::CookieNotFound
            | SessionError::EmptySessionId
            | SessionError::NotFound => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        if err.status().is_server_error() {
            tracing::error!(error = %err, code = err.code(), "session operation failed");
        }
        AppError::Domain(DomainError::new(err.code(), err.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_side_failures_are_unauthorized() {
        assert_eq!(SessionError::CookieNotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(SessionError::EmptySessionId.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(SessionError::NotFound.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_store_failures_are_internal() {
        let err = SessionError::Check(CacheError::Backend("down".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "ERR:SESSION_CHECK_EXIST");
    }

    #[test]
    fn test_converts_into_domain_error() {
        let err: AppError = SessionError::NotFound.into();
        match err {
            AppError::Domain(domain) => {
                assert_eq!(domain.code(), "ERR:SESSION_NOT_FOUND");
                assert_eq!(domain.status(), StatusCode::UNAUTHORIZED);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
