use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{invites::model::InviteError, leases::validator::LeaseError};

pub type AppResult<T> = Result<T, AppError>;

/// Rejection surfaced to API clients. Internal failures are logged and
/// replaced by a generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Gone(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LeaseError> for AppError {
    fn from(e: LeaseError) -> Self {
        match e {
            LeaseError::InvalidRange => AppError::BadRequest(e.to_string()),
            LeaseError::Overlap { .. } => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<InviteError> for AppError {
    fn from(e: InviteError) -> Self {
        match e {
            InviteError::NotFound => AppError::NotFound(e.to_string()),
            InviteError::AlreadyUsed => AppError::Conflict(e.to_string()),
            InviteError::Expired => AppError::Gone(e.to_string()),
            InviteError::CommunityInactive => AppError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn lease_errors_map_to_client_statuses() {
        assert_eq!(
            AppError::from(LeaseError::InvalidRange).status(),
            StatusCode::BAD_REQUEST
        );
        let overlap = LeaseError::Overlap {
            start: datetime!(2024-01-01 0:00 UTC),
            end: datetime!(2024-01-10 0:00 UTC),
        };
        assert_eq!(AppError::from(overlap).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn invite_errors_map_to_client_statuses() {
        assert_eq!(AppError::from(InviteError::Expired).status(), StatusCode::GONE);
        assert_eq!(
            AppError::from(InviteError::AlreadyUsed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(InviteError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::from(anyhow::anyhow!("connection refused to 10.0.0.3"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
