use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::i18n::{self, Locale};

/// Success envelope.
///
/// ```json
/// { "isError": false, "status": 201, "message": "User created successfully" }
/// ```
///
/// `message` is present only when a handler supplies a success code, `data`
/// only when it supplies a payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub is_error: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl ApiResponse<()> {
    /// Start an envelope with no data.
    pub fn new(status: StatusCode) -> Self {
        ApiResponse {
            is_error: false,
            status: status.as_u16(),
            message: None,
            data: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data<U: Serialize>(self, data: U) -> ApiResponse<U> {
        ApiResponse {
            is_error: false,
            status: self.status,
            message: self.message,
            data: Some(data),
        }
    }

    /// Attach the localized text of a `SUCC:*` code.
    pub fn with_message(self, locale: Locale, code: &str) -> Self {
        self.with_message_args(locale, code, &[])
    }

    pub fn with_message_args(mut self, locale: Locale, code: &str, args: &[String]) -> Self {
        self.message = Some(i18n::translate(code, locale, args));
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK)
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), axum::Json(self)).into_response()
    }
}
