use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::openapi::MessageEnvelope;
use crate::response::ApiResponse;

use super::AppState;

// ── Request types ──

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(required, email)]
    pub email: Option<String>,
    #[validate(required)]
    pub password: Option<String>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", get(refresh))
        .route("/logout", get(logout))
}

/// Check credentials and start a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; sets the `session` cookie", body = MessageEnvelope),
        (status = 401, description = "Unknown email or wrong password", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid input", body = crate::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<()>), AppError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let principal = state.users.authenticate(&email, &password).await?;
    let (jar, _) = state.sessions.login(jar, &principal).await?;
    tracing::info!(user_id = principal.id, "user logged in");

    Ok((
        jar,
        ApiResponse::ok().with_message(ctx.locale, "SUCC:LOGIN_SUCCESS"),
    ))
}

/// Extend the caller's session.
#[utoipa::path(
    get,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Session extended; cookie re-issued", body = MessageEnvelope),
        (status = 401, description = "No live session", body = crate::error::ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: RequestContext,
) -> Result<(CookieJar, ApiResponse<()>), AppError> {
    let jar = state.sessions.refresh(jar, None).await?;
    Ok((
        jar,
        ApiResponse::ok().with_message(ctx.locale, "SUCC:SESSION_REFRESHED"),
    ))
}

/// End the caller's session. Always succeeds.
#[utoipa::path(
    get,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session ended; cookie expired", body = MessageEnvelope)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    ctx: RequestContext,
) -> (CookieJar, ApiResponse<()>) {
    let (jar, _) = state.sessions.logout(jar).await;
    (
        jar,
        ApiResponse::ok().with_message(ctx.locale, "SUCC:LOGOUT_SUCCESS"),
    )
}
