use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{AccessGate, roles};
use crate::context::RequestContext;
use crate::error::{AppError, DomainError, ErrorBody};
use crate::extractors::{CurrentUser, ValidatedJson};
use crate::models::user::UserResponse;
use crate::openapi::MessageEnvelope;
use crate::repositories::UserChanges;
use crate::response::ApiResponse;
use crate::services::Registration;
use crate::session::SessionPrincipal;
use crate::validation::{validate_alpha, validate_phone};

use super::AppState;

// ── Request types ──

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(required, length(min = 3, max = 20), custom(function = "validate_alpha"))]
    pub name: Option<String>,
    #[validate(required, email)]
    pub email: Option<String>,
    #[validate(required, length(min = 8, max = 72))]
    pub password: Option<String>,
    /// Turkish GSM number, `+905XXXXXXXXX`
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

/// Replaces the editable profile fields.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(required, length(min = 3, max = 20), custom(function = "validate_alpha"))]
    pub name: Option<String>,
    #[validate(required, email)]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(req: UpdateUserRequest) -> Self {
        UserChanges {
            name: req.name.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            phone: req.phone,
        }
    }
}

// ── Routes ──

pub fn routes(state: &AppState) -> Router<AppState> {
    let logged_in =
        middleware::from_fn_with_state(state.clone(), AccessGate::required().middleware());
    let staff = middleware::from_fn_with_state(
        state.clone(),
        AccessGate::roles(&[roles::ADMIN, roles::SUBADMIN]).middleware(),
    );
    let admin = middleware::from_fn_with_state(
        state.clone(),
        AccessGate::roles(&[roles::ADMIN]).middleware(),
    );

    Router::new()
        .route("/users", post(create_user))
        .route(
            "/users/me",
            get(get_me)
                .put(update_me)
                .delete(delete_me)
                .route_layer(logged_in),
        )
        .route(
            "/users/{id}",
            get(get_user)
                .put(update_user)
                .route_layer(staff)
                .merge(delete(delete_user).route_layer(admin)),
        )
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| DomainError::INVALID_ID.into())
}

/// Public registration. New accounts get the `user` role.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserResponse>),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state
        .users
        .register(Registration {
            name: payload.name.unwrap_or_default(),
            email: payload.email.unwrap_or_default(),
            password: payload.password.unwrap_or_default(),
            phone: payload.phone,
        })
        .await?;

    Ok(ApiResponse::new(StatusCode::CREATED)
        .with_message(ctx.locale, "SUCC:USER_CREATED")
        .with_data(UserResponse::from(user)))
}

/// The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.users.get(me.id).await?;
    Ok(ApiResponse::ok().with_data(user))
}

/// Update the caller's profile and the principal stored in their session.
///
/// The database write and the session refresh are independent: when the
/// refresh fails after the write, the update stands and the failure is
/// logged.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    jar: CookieJar,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<(CookieJar, ApiResponse<UserResponse>), AppError> {
    let user = state.users.update(me.id, payload.into()).await?;

    let principal = SessionPrincipal::from(user.clone());
    let jar = match state.sessions.refresh(jar.clone(), Some(&principal)).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::warn!(error = %err, user_id = me.id, "profile updated but session refresh failed");
            jar
        }
    };

    Ok((
        jar,
        ApiResponse::ok()
            .with_message(ctx.locale, "SUCC:USER_UPDATED")
            .with_data(UserResponse::from(user)),
    ))
}

/// Delete the caller's account and end all of their sessions.
#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "User deleted; session ended", body = MessageEnvelope),
        (status = 401, description = "Not logged in", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    jar: CookieJar,
    ctx: RequestContext,
) -> Result<(CookieJar, ApiResponse<()>), AppError> {
    state.users.delete(me.id).await?;
    state.sessions.store().revoke_user(me.id).await?;
    let (jar, _) = state.sessions.logout(jar).await;

    Ok((
        jar,
        ApiResponse::ok().with_message(ctx.locale, "SUCC:USER_DELETED"),
    ))
}

/// Any user by id. Admin or subadmin.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = ApiResponse<UserResponse>),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Not logged in or role not allowed", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.users.get(parse_id(&id)?).await?;
    Ok(ApiResponse::ok().with_data(user))
}

/// Update any user by id. Admin or subadmin.
///
/// Sessions the target already holds keep their old principal until they
/// are refreshed with new data or end.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Not logged in or role not allowed", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: RequestContext,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.users.update(parse_id(&id)?, payload.into()).await?;
    Ok(ApiResponse::ok()
        .with_message(ctx.locale, "SUCC:USER_UPDATED")
        .with_data(UserResponse::from(user)))
}

/// Delete any user by id and end their sessions. Admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageEnvelope),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Not logged in or not an admin", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ctx: RequestContext,
) -> Result<ApiResponse<()>, AppError> {
    let id = parse_id(&id)?;
    state.users.delete(id).await?;
    state.sessions.store().revoke_user(id).await?;
    Ok(ApiResponse::ok().with_message(ctx.locale, "SUCC:USER_DELETED"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
    }

    #[test]
    fn test_create_request_rules() {
        let ok = CreateUserRequest {
            name: Some("Jane".into()),
            email: Some("jane@example.com".into()),
            password: Some("long-enough".into()),
            phone: Some("+905551234567".into()),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateUserRequest {
            name: Some("J4".into()),
            email: None,
            password: Some("short".into()),
            phone: Some("555".into()),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("phone"));
    }
}
