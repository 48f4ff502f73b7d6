use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::{ValidationError, ValidationErrors};

use crate::store::StoreError;

#[derive(Debug)]
pub enum AppError {
    InternalServerError,
    BadRequest(String),
    Validation(ValidationErrors),
    InvalidCredentials,
    Unauthorized,
    RelationNotFound(String),
    NotFound(String),
}

impl AppError {
    /// Single field-level validation failure.
    pub fn field(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Owned(message.into()));
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) | AppError::Validation(_) | AppError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RelationNotFound(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field, message } => AppError::field(field, "unique", message),
            StoreError::MissingReference { field } => {
                AppError::field(field, "exists", format!("The selected {field} is invalid."))
            }
            other => {
                tracing::error!("Store error: {:?}", other);
                AppError::InternalServerError
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("The {field} field is invalid."),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, fields) = match self {
            AppError::InternalServerError => ("Internal Server Error".to_string(), None),
            AppError::InvalidCredentials => (
                "The provided credentials are incorrect.".to_string(),
                None,
            ),
            AppError::Unauthorized => ("Unauthenticated.".to_string(), None),
            AppError::BadRequest(msg) | AppError::RelationNotFound(msg) | AppError::NotFound(msg) => {
                (msg, None)
            }
            AppError::Validation(errors) => {
                let fields = field_messages(&errors);
                let message = fields
                    .values()
                    .flatten()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| "The given data was invalid.".to_string());
                (message, Some(fields))
            }
        };

        // Same envelope as ApiResponse, plus field errors for validation failures
        let mut body = json!({
            "success": false,
            "message": message,
            "data": null
        });
        if let Some(fields) = fields {
            body["errors"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(AppError::field("email", "unique", "taken").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::RelationNotFound("Like not found".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::NotFound("Post not found".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InternalServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflicts_become_field_errors() {
        let err = AppError::from(StoreError::Conflict {
            field: "email",
            message: "The email has already been taken.".to_string(),
        });
        let AppError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        let fields = field_messages(&errors);
        assert_eq!(fields["email"], vec!["The email has already been taken.".to_string()]);
    }
}
