use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::{account::database::AccountDatabaseError, notifications::gateway::NotificationError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Directory store unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

impl DispatchError {
    /// Machine-readable kind reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidArgument(_) => "invalid-argument",
            DispatchError::UpstreamUnavailable(_) => "upstream-unavailable",
            DispatchError::DeliveryFailed(_) => "delivery-failed",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DispatchError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<AccountDatabaseError> for DispatchError {
    fn from(err: AccountDatabaseError) -> Self {
        DispatchError::UpstreamUnavailable(err.to_string())
    }
}

impl From<NotificationError> for DispatchError {
    fn from(err: NotificationError) -> Self {
        DispatchError::DeliveryFailed(err.to_string())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        error!("{}", self);
        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.kind().to_string(),
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
