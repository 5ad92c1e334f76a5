use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::api::types::Message;
use crate::store::StoreError;
use crate::testcase::EngineError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::TestCaseNotFound(_) | EngineError::ProjectNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            EngineError::Validation(_) => ApiError::BadRequest(err.to_string()),
            EngineError::Store(StoreError::MongoDb(e)) => {
                ApiError::Internal(format!("database error: {}", e))
            }
            EngineError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", msg),
            ),
        };

        if status.is_server_error() {
            error!("API Error: {}", message);
        } else {
            warn!("API Client Error: {}", message);
        }

        let body = Json(Message {
            message,
            item: None::<()>,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaError;

    #[test]
    fn not_found_errors_map_to_404() {
        let api_err = ApiError::from(EngineError::TestCaseNotFound("tc-9".to_string()));
        match &api_err {
            ApiError::NotFound(msg) => assert!(msg.contains("tc-9")),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(api_err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_errors_map_to_400() {
        let err = EngineError::Validation(SchemaError::OrphanEquals {
            path: "$.children[0]".to_string(),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_errors_map_to_500() {
        let err = EngineError::Store(StoreError::Other("boom".to_string()));
        match ApiError::from(err) {
            ApiError::Internal(msg) => assert_eq!(msg, "boom"),
            other => panic!("expected Internal, got {:?}", other),
        }
    }
}
