use std::future::Future;
use std::pin::Pin;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::roles;
use crate::context::RequestContext;
use crate::controllers::AppState;
use crate::error::{AppError, DomainError};
use crate::extractors::CurrentUser;
use crate::session::{SessionCookies, SessionPrincipal};

type GateFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// Route-level session check with an optional role requirement.
///
/// ```rust,ignore
/// use axum::middleware;
///
/// Router::new()
///     .route("/api/v1/users/{id}", delete(delete_user))
///     .route_layer(middleware::from_fn_with_state(
///         state.clone(),
///         AccessGate::roles(&[roles::ADMIN]).middleware(),
///     ))
/// ```
///
/// Optional gates let anonymous callers through but still resolve the
/// principal when a valid session exists. Roles are matched exactly; a
/// mismatch is `ERR:SESSION_UNAUTHORIZED` like a missing session.
#[derive(Debug, Clone)]
pub struct AccessGate {
    is_optional: bool,
    roles: Vec<&'static str>,
}

impl AccessGate {
    pub fn new(is_optional: bool, roles: &[&'static str]) -> Self {
        AccessGate {
            is_optional,
            roles: roles.to_vec(),
        }
    }

    /// Any logged-in caller.
    pub fn required() -> Self {
        Self::new(false, &[])
    }

    /// Anyone; the principal is attached when present.
    pub fn optional() -> Self {
        Self::new(true, &[])
    }

    /// Logged-in callers holding one of `roles`.
    pub fn roles(roles: &[&'static str]) -> Self {
        Self::new(false, roles)
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// Decide whether the caller behind `jar` may pass.
    ///
    /// `Ok(None)` means an anonymous caller on an optional gate.
    pub async fn admit(
        &self,
        sessions: &SessionCookies,
        jar: &CookieJar,
    ) -> Result<Option<SessionPrincipal>, AppError> {
        let principal = match sessions.check(jar).await {
            Ok((_, principal)) => principal,
            Err(err) => {
                if err.status().is_server_error() {
                    tracing::warn!(error = %err, code = err.code(), "session check failed");
                } else {
                    tracing::debug!(code = err.code(), "no usable session");
                }
                if self.is_optional {
                    return Ok(None);
                }
                return Err(DomainError::SESSION_UNAUTHORIZED.into());
            }
        };

        if !roles::satisfies(&principal.role, &self.roles) {
            tracing::debug!(
                user_id = principal.id,
                role = %principal.role,
                required = ?self.roles,
                "role not allowed"
            );
            return Err(DomainError::SESSION_UNAUTHORIZED.into());
        }

        Ok(Some(principal))
    }

    /// The gate as a function for `axum::middleware::from_fn_with_state`.
    pub fn middleware(
        self,
    ) -> impl Fn(State<AppState>, Request, Next) -> GateFuture + Clone + Send {
        move |State(state): State<AppState>, mut req: Request, next: Next| {
            let gate = self.clone();
            Box::pin(async move {
                let jar = CookieJar::from_headers(req.headers());
                if let Some(principal) = gate.admit(&state.sessions, &jar).await? {
                    if let Some(ctx) = req.extensions_mut().get_mut::<RequestContext>() {
                        ctx.principal = Some(principal.clone());
                    }
                    req.extensions_mut().insert(CurrentUser(principal));
                }
                Ok(next.run(req).await)
            })
        }
    }
}
