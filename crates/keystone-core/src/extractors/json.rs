use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

use crate::error::{AppError, DomainError};

/// JSON body extractor whose rejections use the error envelope.
///
/// Malformed bodies, a wrong content type and unknown shapes all become
/// `ERR:INVALID_REQUEST_PAYLOAD` (400). Oversized bodies stay 413.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(AppError::Http(StatusCode::PAYLOAD_TOO_LARGE))
            }
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request payload");
                Err(DomainError::INVALID_REQUEST_PAYLOAD.into())
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// [`Json`] followed by `validator` rules. Rule failures become a 422
/// validation envelope.
///
/// ```rust,ignore
/// async fn create(ValidatedJson(body): ValidatedJson<CreateUserRequest>) -> AppResult<..> {
///     // body passed every #[validate(..)] rule
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}
