use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::JsonResponse;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Server error")]
    ServerError,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestErrorJsonWrapper {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl RequestErrorJsonWrapper {
    pub fn new(message: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            success: false,
            message: message.to_string(),
            errors: None,
        }
    }

    fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Flattens validator output into a field list sorted by field name.
pub fn collect_field_errors(value: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (field, field_errors) in value.field_errors() {
        for error in field_errors.iter() {
            let message = match &error.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            };
            errors.push(FieldError::new(field.to_string(), message));
        }
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    errors
}

impl From<validator::ValidationErrors> for RequestError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Validation(collect_field_errors(&value))
    }
}

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for RequestError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Validation(_) | RequestError::BadRequest(_) | RequestError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            RequestError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::ServerError | RequestError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let json = match self {
            RequestError::Validation(errors) => {
                RequestErrorJsonWrapper::new("Validation failed").with_errors(errors.clone())
            }
            RequestError::BadRequest(message) => RequestErrorJsonWrapper::new(message),
            RequestError::Conflict(message)
            | RequestError::NotAuthorized(message)
            | RequestError::Forbidden(message)
            | RequestError::NotFound(message) => RequestErrorJsonWrapper::new(message),
            RequestError::ServerError => RequestErrorJsonWrapper::new("Server error"),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                RequestErrorJsonWrapper::new("Server error")
            }
        };
        (self.status_code(), Json(json))
    }
}
