use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Network or authentication failure talking to an upstream API
    #[error("{service} service error: {message}")]
    ExternalService { service: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The active filter combination matched zero records
    #[error("No titles match the current filters")]
    EmptyResult,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds an `ExternalService` error tagged with the failing source
    pub fn external(service: &str, message: impl std::fmt::Display) -> Self {
        AppError::ExternalService {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::EmptyResult => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ExternalService { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Csv(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_error_display_names_service() {
        let err = AppError::external("omdb", "401 Unauthorized");
        assert_eq!(err.to_string(), "omdb service error: 401 Unauthorized");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidInput("bad".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::EmptyResult.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::external("tmdb", "timeout").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
