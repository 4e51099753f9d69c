//! JSON request/response plumbing shared by every handler.
//!
//! Errors leave as `{ "success": false, "error": "..." }`. Client mistakes
//! keep their message; internal failures are logged and reported generically.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::AppError;
use crate::store::Page;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Llm(e) => {
                warn!(error = %e, "AI provider request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            _ => {
                error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// `Json<T>` whose rejections are reported as validation errors.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// `{ success: true, data }`
pub fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "success": true, "data": value }))
}

/// `201 { success: true, data }`
pub fn created<T: Serialize>(value: T) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, data(value))
}

/// `{ success: true }`
pub fn ok() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// `{ success: true, data: [...], total, skip, limit }`
pub fn page<T: Serialize>(page: Page<T>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": page.items,
        "total": page.total,
        "skip": page.skip,
        "limit": page.limit,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: AppError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn error_statuses() {
        assert_eq!(status_of(AppError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AppError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::Database("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(crate::llm::ProviderError::NotConfigured.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
