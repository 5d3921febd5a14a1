use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::service::ServiceError;

const INVALID_VALUE: &str = "Invalid Value";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{title}: {description}")]
    BadRequest { title: String, description: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    title: &'a str,
    description: &'a str,
}

impl ApiError {
    pub fn bad_request(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::BadRequest { title: title.into(), description: description.into() }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Query(q) => Self::bad_request(q.title(), q.description()),
            ServiceError::Invalid(v) => {
                Self::bad_request(INVALID_VALUE, format!("Invalid request body:\n{v}"))
            }
            ServiceError::InvalidId(_) => Self::bad_request(INVALID_VALUE, e.to_string()),
            ServiceError::Storage(_) | ServiceError::Corrupt { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Malformed JSON", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(
            INVALID_VALUE,
            format!("Invalid arguments in URL query:\n{}", rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest { title, description } => {
                log::debug!("rejecting request: {title}: {description}");
                let body = ErrorBody { title: &title, description: &description };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::Internal(detail) => {
                log::error!("request failed: {detail}");
                let body = ErrorBody {
                    title: "Internal Server Error",
                    description: "The server failed to complete the request.",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
