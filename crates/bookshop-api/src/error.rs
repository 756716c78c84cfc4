use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use bookshop_store::StoreError;
use bookshop_types::api::ErrorResponse;

/// Error type returned by every handler. Rendered as `{ "error": … }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No session, or a session token that does not verify.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => match err {
                StoreError::DuplicateEmail | StoreError::Conflict { .. } => StatusCode::CONFLICT,
                StoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                StoreError::NotFound | StoreError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
                StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                StoreError::Capacity { .. } => StatusCode::INSUFFICIENT_STORAGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Storage internals never leave the server.
    fn message(&self) -> String {
        match self {
            Self::Store(err) => match err {
                StoreError::DuplicateEmail => "An account with this email already exists".into(),
                StoreError::InvalidCredentials => "Invalid credentials".into(),
                StoreError::NotFound | StoreError::NotFoundOrForbidden => "Not found".into(),
                StoreError::Forbidden(_) => "Forbidden".into(),
                StoreError::InvalidInput(msg) => msg.clone(),
                StoreError::Conflict { .. } => {
                    "The data was changed concurrently, please retry".into()
                }
                StoreError::Capacity { .. } => "Storage limit reached".into(),
                _ => "Internal server error".into(),
            },
            Self::Unauthorized => "Unauthorized".into(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else if status == StatusCode::CONFLICT {
            warn!(error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshop_types::Role;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::DuplicateEmail, StatusCode::CONFLICT),
            (StoreError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (StoreError::NotFound, StatusCode::NOT_FOUND),
            (StoreError::NotFoundOrForbidden, StatusCode::NOT_FOUND),
            (StoreError::Forbidden(Role::Customer), StatusCode::FORBIDDEN),
            (StoreError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::Conflict { table: "books" }, StatusCode::CONFLICT),
            (
                StoreError::Capacity {
                    table: "books",
                    limit: 1,
                },
                StatusCode::INSUFFICIENT_STORAGE,
            ),
            (StoreError::LockPoisoned("users"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::from(StoreError::DataIntegrity {
            table: "users",
            reason: "row 3: column `password` is not a PHC string".into(),
        });
        assert_eq!(err.message(), "Internal server error");
    }
}
