use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("internal server error")]
    ServerError,
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub type RequestResult<T> = Result<T, RequestError>;

/// Body extraction failures answer with the same `{message}` shape as every other error.
impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "rejected request body");
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`"
            }
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::JsonDataError(_) => "Request body has missing or invalid fields",
            _ => "Failed to read request body",
        };
        RequestError::Validation(message)
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RequestErrorJson {
    pub message: String,
}

impl RequestErrorJson {
    pub fn new(message: &str) -> RequestErrorJson {
        RequestErrorJson {
            message: message.to_string(),
        }
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
            RequestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RequestError::Conflict(_) => StatusCode::CONFLICT,
            RequestError::ServerError | RequestError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJson> {
        let json = match self {
            RequestError::Validation(message)
            | RequestError::NotFound(message)
            | RequestError::NotAuthorized(message)
            | RequestError::Forbidden(message)
            | RequestError::Conflict(message) => RequestErrorJson::new(message),
            RequestError::ServerError => RequestErrorJson::new("Internal Server Error"),
            RequestError::DatabaseError(e) => {
                tracing::error!(error = %e, "database error");
                RequestErrorJson::new("Internal Server Error")
            }
        };
        (self.status_code(), Json(json))
    }

    /// True when the store rejected a write because of a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        self.database_message_contains("UNIQUE constraint failed")
    }

    /// True when the store rejected a write because a referenced row is missing.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.database_message_contains("FOREIGN KEY constraint failed")
    }

    fn database_message_contains(&self, needle: &str) -> bool {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => e.message().contains(needle),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(
            RequestError::Validation("title is required").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RequestError::NotFound("Question not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::Forbidden("nope").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RequestError::NotAuthorized("Invalid token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RequestError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_hide_their_details() {
        let (_, Json(body)) =
            RequestError::DatabaseError(sqlx::Error::PoolTimedOut).to_json_response();
        assert_eq!(body.message, "Internal Server Error");
    }

    #[test]
    fn non_database_errors_are_not_constraint_violations() {
        assert!(!RequestError::ServerError.is_unique_violation());
        assert!(!RequestError::DatabaseError(sqlx::Error::RowNotFound).is_foreign_key_violation());
    }
}
