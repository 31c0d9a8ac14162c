//! HTTP error mapping.
//!
//! Every failure a handler can produce goes through [`ApiError`], so the
//! status code for each kind is decided in exactly one place.

use crate::provider::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Unauthenticated!")]
    Unauthenticated,
    #[error("Internal Server Error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Provider(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // JSON bodies for request and provider failures, plain text otherwise
            Self::MissingCredentials | Self::Provider(_) => (
                status,
                Json(ErrorBody {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            Self::Unauthenticated | Self::Internal => (status, self.to_string()).into_response(),
        }
    }
}
