//! HTTP error responses for the web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::domain::error::IndexcastError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<IndexcastError> for WebError {
    fn from(err: IndexcastError) -> Self {
        let status = match &err {
            IndexcastError::ConfigParse { .. }
            | IndexcastError::ConfigMissing { .. }
            | IndexcastError::ConfigInvalid { .. } => StatusCode::BAD_REQUEST,
            IndexcastError::InsufficientData { .. } | IndexcastError::FeatureMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            IndexcastError::Fetch { .. } | IndexcastError::EmptyResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            IndexcastError::ArtifactLoad { .. } => StatusCode::NOT_FOUND,
            IndexcastError::Store { .. } | IndexcastError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    message: &'a str,
    status: u16,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let template = ErrorTemplate {
            message: &self.message,
            status: self.status.as_u16(),
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}
