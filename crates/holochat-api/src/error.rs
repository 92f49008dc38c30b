use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use holochat_types::api::MessageResponse;

/// Error returned by every handler. Rendered as `{"message": ...}` with the
/// status the Holochat clients expect.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// No token was supplied.
    #[error("{0}")]
    Unauthorized(String),

    /// A token was supplied but did not verify.
    #[error("{0}")]
    Forbidden(String),

    /// Store failure. Clients get the driver message back with a 400.
    #[error("SQL Error: {0:#}")]
    Database(anyhow::Error),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn missing_information() -> Self {
        Self::bad_request("Missing required information")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message_body(message)),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message_body(message)),
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message_body(message)),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message_body(message)),
            Self::Database(e) => {
                warn!("Database error: {:#}", e);
                (
                    StatusCode::BAD_REQUEST,
                    MessageResponse {
                        message: "SQL Error".into(),
                        error: Some(format!("{:#}", e)),
                    },
                )
            }
            Self::Internal => {
                error!("Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message_body("Internal server error".into()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

fn message_body(message: String) -> MessageResponse {
    MessageResponse { message, error: None }
}
