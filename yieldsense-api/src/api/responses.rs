//! API response types

use crate::core::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: i64,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// HTTP status for a service failure
pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        ServiceError::PoolNotFound { .. } | ServiceError::NoPoolForPair => StatusCode::NOT_FOUND,
        ServiceError::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }
        (status, Json(ErrorResponse::new(status, self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DepositError, NetworkError};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ServiceError::InvalidTickRange { lower: 1, upper: 0 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ServiceError::Deposit(DepositError::TooSmall)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&ServiceError::NoPoolForPair), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&ServiceError::Network(NetworkError::Transport("timeout".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ServiceError::Serialization("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
