//! Mapping of core errors and extractor rejections onto HTTP responses.
//!
//! Every failure leaves the server as `{"error": "<message>"}`. Server-side causes are logged
//! and replaced by a generic message.

use api_shared::ErrorRes;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use odyssey_core::store::StoreError;
use odyssey_core::LogisticsError;

#[derive(Debug)]
pub enum ApiError {
    /// A failure raised by a core service.
    Logistics(LogisticsError),
    /// The request body or query string could not be decoded.
    BadRequest(String),
}

impl From<LogisticsError> for ApiError {
    fn from(err: LogisticsError) -> Self {
        Self::Logistics(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Logistics(err) => match err {
                LogisticsError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
                LogisticsError::Validation(msg) | LogisticsError::Reference(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                LogisticsError::Store(StoreError::DuplicateKey { .. }) => {
                    (StatusCode::CONFLICT, err.to_string())
                }
                LogisticsError::Store(_) | LogisticsError::InvalidConfig(_) => {
                    tracing::error!("request failed: {err:?}");
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorRes::new(message))).into_response()
    }
}

/// JSON body extractor whose rejection is an [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejection is an [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

pub type ApiResult<T> = Result<T, ApiError>;
