//! Error responses for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::simulate::DriverError;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::NonFinite { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Driver(DriverError::Busy) => StatusCode::CONFLICT,
            ApiError::Driver(DriverError::Task(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "request rejected");

        let body = Json(json!({
            "data": null,
            "meta": {
                "error": self.to_string(),
                "status": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}
