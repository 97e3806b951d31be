use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// A refused API request
#[derive(Debug, Error)]
pub enum ApiError {
    /// No such resource
    #[error("Resource Not Found")]
    NotFound,

    /// The request body is missing, malformed, or conflicts with the menu
    #[error("unprocessable")]
    Unprocessable,

    /// The route exists but not for this method
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::DuplicateTitle(_) | StoreError::BlankTitle | StoreError::EmptyPatch => {
                Self::Unprocessable
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
