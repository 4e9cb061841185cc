//! 错误到HTTP响应的映射

use axum::{http::StatusCode, response::IntoResponse, Json};
use modula_core::ModulaError;
use serde_json::json;

/// HTTP层的错误包装
///
/// `ModulaError`属于modula-core，孤儿规则不允许在这里为它实现
/// `IntoResponse`，因此通过newtype映射。
#[derive(Debug)]
pub struct ApiError(pub ModulaError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<ModulaError> for ApiError {
    fn from(err: ModulaError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ModulaError::Validation(_) => StatusCode::BAD_REQUEST,
            ModulaError::NotFound(_) => StatusCode::NOT_FOUND,
            ModulaError::Conflict(_) => StatusCode::CONFLICT,
            ModulaError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            ModulaError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ModulaError::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = Json(json!({
            "error": true,
            "code": self.0.code(),
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ModulaError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ModulaError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ModulaError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ModulaError::InvalidStateTransition {
                    from: "completed".into(),
                    event: "cancel".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                ModulaError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ModulaError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                ModulaError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
