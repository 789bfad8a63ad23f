//! Error types for the Koin API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Economy
//! errors keep their kind in the response body so clients can tell a
//! conflict from a validation failure without parsing the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use koin_catalog::CatalogError;
use koin_economy::EconomyError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An economy operation failed.
    #[error(transparent)]
    Economy(#[from] EconomyError),

    /// The loaded catalog could not price an item.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A path or query parameter could not be parsed.
    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)
            | Self::Economy(
                EconomyError::Validation(_) | EconomyError::ExternalVerification(_),
            ) => StatusCode::BAD_REQUEST,
            Self::Economy(EconomyError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Economy(EconomyError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Catalog(_) | Self::Economy(EconomyError::Persistence(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Economy(err) => err.kind(),
            Self::Catalog(_) => "catalog",
            Self::BadRequest(_) => "validation",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            String::from("internal error")
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
