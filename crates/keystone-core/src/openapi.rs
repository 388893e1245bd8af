use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::controllers::auth::LoginRequest;
use crate::controllers::users::{CreateUserRequest, UpdateUserRequest};
use crate::error::ErrorBody;
use crate::models::user::UserResponse;
use crate::validation::FieldErrorBody;

/// Documentation shape of a success envelope that carries only a message.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    pub is_error: bool,
    pub status: u16,
    pub message: String,
}

/// OpenAPI document for every route the application serves.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Keystone API",
        description = "Session-cookie auth and user management with localized envelopes."
    ),
    paths(
        crate::controllers::auth::login,
        crate::controllers::auth::refresh,
        crate::controllers::auth::logout,
        crate::controllers::users::create_user,
        crate::controllers::users::get_me,
        crate::controllers::users::update_me,
        crate::controllers::users::delete_me,
        crate::controllers::users::get_user,
        crate::controllers::users::update_user,
        crate::controllers::users::delete_user,
    ),
    components(
        schemas(
            LoginRequest,
            CreateUserRequest,
            UpdateUserRequest,
            UserResponse,
            MessageEnvelope,
            ErrorBody,
            FieldErrorBody,
        )
    ),
    tags(
        (name = "auth", description = "Session lifecycle"),
        (name = "users", description = "User management")
    ),
    security(
        ("session_cookie" = [])
    ),
    modifiers(&SessionCookieAddon)
)]
pub struct ApiDoc;

/// Register the `session` cookie as the security scheme.
struct SessionCookieAddon;

impl utoipa::Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::session::SESSION_COOKIE,
                ))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/api/v1/auth/login",
            "/api/v1/auth/refresh",
            "/api/v1/auth/logout",
            "/api/v1/users",
            "/api/v1/users/me",
            "/api/v1/users/{id}",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["components"]["securitySchemes"]["session_cookie"].is_object());
    }
}
