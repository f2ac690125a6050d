//! Wire-level response envelope.
//!
//! Every response carries `{success, message, data?, error?}` with camelCase
//! keys. Raw driver text goes into the error details field, never into the
//! top-level message.

use crate::error::ScoutError;
use crate::service::query::error_type_tag;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Successful response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wraps a payload in a success envelope.
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    /// A success envelope with no payload.
    pub fn ok_empty(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

/// Error body nested in a failure envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable code, `{CATEGORY}_ERROR`.
    pub code: &'static str,
    /// Query-failure tag: validation_error, database_error, timeout_error
    /// or execution_error.
    pub error_type: &'static str,
    /// Technical details (driver text, parser diagnostic).
    pub details: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Free-form context, e.g. the offending SQL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Failure envelope; the `?` target for handlers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFailure {
    pub success: bool,
    pub message: String,
    pub error: ErrorBody,
    #[serde(skip)]
    status: StatusCode,
}

impl From<ScoutError> for ApiFailure {
    fn from(e: ScoutError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            success: false,
            message: e.user_message.clone(),
            error: ErrorBody {
                code: e.code(),
                error_type: error_type_tag(e.category),
                details: e.message,
                suggestions: e.suggestions,
                context: e.context,
            },
            status,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}
