use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::cache::CacheError;
use crate::context::RequestContext;
use crate::controllers::AppState;
use crate::i18n::{self, DEFAULT_LOCALE, Locale};
use crate::validation::{FieldErrorBody, FieldFailure};

/// An expected failure with a stable catalog code, an HTTP status and
/// optional message arguments. Always safe to show to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}")]
pub struct DomainError {
    code: &'static str,
    status: StatusCode,
    args: Vec<String>,
}

impl DomainError {
    pub const SESSION_UNAUTHORIZED: DomainError =
        DomainError::new("ERR:SESSION_UNAUTHORIZED", StatusCode::UNAUTHORIZED);
    pub const USER_NOT_FOUND: DomainError =
        DomainError::new("ERR:USER_NOT_FOUND", StatusCode::NOT_FOUND);
    pub const USER_ALREADY_EXISTS: DomainError =
        DomainError::new("ERR:USER_ALREADY_EXISTS", StatusCode::CONFLICT);
    pub const USER_EMAIL_ALREADY_EXISTS: DomainError =
        DomainError::new("ERR:USER_EMAIL_ALREADY_EXISTS", StatusCode::CONFLICT);
    pub const INVALID_ID: DomainError = DomainError::new("ERR:INVALID_ID", StatusCode::BAD_REQUEST);
    pub const INVALID_REQUEST_PAYLOAD: DomainError =
        DomainError::new("ERR:INVALID_REQUEST_PAYLOAD", StatusCode::BAD_REQUEST);

    pub const fn new(code: &'static str, status: StatusCode) -> Self {
        DomainError {
            code,
            status,
            args: Vec::new(),
        }
    }

    /// Positional arguments for the message template.
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToString,
    {
        self.args = args.into_iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Every failure that reaches the request boundary.
///
/// Variants are classified in declaration order: validation, domain,
/// framework-level HTTP status, then everything else as an internal error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("http error {0}")]
    Http(StatusCode),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error envelope.
///
/// ```json
/// {
///   "isError": true,
///   "code": "VAL:VALIDATION_ERR",
///   "status": 422,
///   "message": "Validation failed",
///   "validationErrors": [{ "input": "", "field": "email", "message": "Email is required" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub is_error: bool,
    pub code: String,
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<FieldErrorBody>>,
}

const INTERNAL_CODE: &str = "ERR:INTERNAL_SERVER_ERROR";
const VALIDATION_CODE: &str = "VAL:VALIDATION_ERR";

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    /// Database, cache and internal failures: no stable code, rendered as a
    /// generic 500 and reported to the alarm notifier.
    pub fn is_unclassified(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_)
        )
    }

    /// Render the envelope for `locale`. Pure; no logging.
    pub fn render(&self, locale: Locale) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(errors) => {
                let fields = FieldFailure::collect(errors)
                    .iter()
                    .map(|failure| failure.render(locale))
                    .collect();
                let status = StatusCode::UNPROCESSABLE_ENTITY;
                let mut body = envelope(status, VALIDATION_CODE.to_string(), locale, &[]);
                body.validation_errors = Some(fields);
                (status, body)
            }
            AppError::Domain(err) => (
                err.status,
                envelope(err.status, err.code.to_string(), locale, &err.args),
            ),
            AppError::Http(status) => {
                let code = format!("ERR:HTTP_{}", status.as_u16());
                (*status, envelope(*status, code, locale, &[]))
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, envelope(status, INTERNAL_CODE.to_string(), locale, &[]))
            }
        }
    }
}

fn envelope(status: StatusCode, code: String, locale: Locale, args: &[String]) -> ErrorBody {
    ErrorBody {
        is_error: true,
        message: i18n::translate(&code, locale, args),
        code,
        status: status.as_u16(),
        validation_errors: None,
    }
}

/// The original error, carried on the response so [`error_envelope_layer`]
/// can render it again in the caller's locale.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unclassified() {
            tracing::error!(error = %self, "unhandled error");
        }

        let (status, body) = self.render(DEFAULT_LOCALE);
        let mut response = (status, axum::Json(body)).into_response();
        response
            .extensions_mut()
            .insert(ErrorReport(Arc::new(self)));
        response
    }
}

/// Localize every error response and wrap bare framework errors.
///
/// Must run inside the locale layer. Responses carrying an [`ErrorReport`]
/// are re-rendered in the request's locale. Error statuses without a JSON
/// body (unmatched route, wrong method, timeout, oversized body) become
/// `ERR:HTTP_<status>`. Unclassified errors are forwarded to the alarm
/// notifier.
pub async fn error_envelope_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let locale = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.locale)
        .unwrap_or_default();
    let route = format!("{} {}", req.method(), req.uri().path());

    let response = next.run(req).await;

    let error = match response.extensions().get::<ErrorReport>() {
        Some(report) => report.0.clone(),
        None if is_bare_error(&response) => Arc::new(AppError::Http(response.status())),
        None => return response,
    };

    if error.is_unclassified() {
        state.alarm.notify(format!(
            "[{}] {} failed: {}",
            state.config.app_name, route, error
        ));
    }

    let (status, body) = error.render(locale);
    let bytes = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode error envelope");
            return response;
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.status = status;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(bytes))
}

fn is_bare_error(response: &Response) -> bool {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    !response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}
