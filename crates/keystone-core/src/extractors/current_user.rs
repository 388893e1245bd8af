use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{AppError, DomainError};
use crate::session::SessionPrincipal;

/// The principal resolved by the access gate.
///
/// Usage in handlers behind `AccessGate::required()`:
/// ```rust,ignore
/// async fn me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     // user.id, user.role, ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionPrincipal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| DomainError::SESSION_UNAUTHORIZED.into())
    }
}

/// Like [`CurrentUser`], for routes behind `AccessGate::optional()`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<SessionPrincipal>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentUser>().map(|u| u.0.clone()),
        ))
    }
}
