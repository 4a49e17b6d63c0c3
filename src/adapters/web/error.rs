//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::StocksimError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StocksimError> for ApiError {
    fn from(err: StocksimError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

pub fn status_from_error(err: &StocksimError) -> StatusCode {
    match err {
        StocksimError::InvalidSymbol { .. }
        | StocksimError::InvalidQuantity { .. }
        | StocksimError::InvalidPrice { .. }
        | StocksimError::InvalidDuration { .. }
        | StocksimError::InvalidParameter { .. }
        | StocksimError::UnknownSymbol { .. }
        | StocksimError::DuplicateSymbol { .. }
        | StocksimError::InsufficientCash { .. }
        | StocksimError::InsufficientShares { .. }
        | StocksimError::HoldingLimit { .. } => StatusCode::BAD_REQUEST,
        StocksimError::Persistence { .. }
        | StocksimError::MalformedRecord { .. }
        | StocksimError::ConfigParse { .. }
        | StocksimError::ConfigInvalid { .. }
        | StocksimError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
