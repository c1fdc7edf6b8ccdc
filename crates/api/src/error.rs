use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use onboard_core::{CoreError, ValidationReport};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant renders as a JSON body with `success: false`, a `message`,
/// the `error` detail and a machine-readable `code`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body could not be read as a form.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The form was readable but failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INVALID_REQUEST: &str = "Invalid request data";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match &self {
            AppError::Core(CoreError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                INVALID_REQUEST,
                msg.clone(),
            ),
            AppError::Core(CoreError::Internal(msg)) | AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                INVALID_REQUEST,
                msg.clone(),
            ),
            AppError::Validation(report) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                INVALID_REQUEST,
                report.to_string(),
            ),
        };

        let mut body = json!({
            "success": false,
            "message": message,
            "error": detail,
            "code": code,
        });
        if let AppError::Validation(report) = &self {
            let errors: serde_json::Map<_, _> = report
                .iter()
                .map(|(field, msg)| (field.as_str().to_string(), json!(msg)))
                .collect();
            body["errors"] = serde_json::Value::Object(errors);
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::BadRequest("eof".into()), StatusCode::BAD_REQUEST),
            (
                AppError::Validation(ValidationReport::default()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Core(CoreError::Internal("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Core(CoreError::Validation("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
