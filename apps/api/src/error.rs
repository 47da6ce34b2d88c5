use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flowgate_core::AppError;
use serde::Serialize;
use ts_rs::TS;

/// API error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Timeout(String),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::App(error) => {
                let status = match error {
                    AppError::Validation(_) => StatusCode::BAD_REQUEST,
                    AppError::NotFound(_) => StatusCode::NOT_FOUND,
                    AppError::Conflict(_) => StatusCode::CONFLICT,
                    AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    AppError::Forbidden(_) => StatusCode::FORBIDDEN,
                    AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                    AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error.to_string())
            }
            Self::Timeout(message) => (StatusCode::GATEWAY_TIMEOUT, message),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use flowgate_core::AppError;

    use super::ApiError;

    #[test]
    fn app_errors_map_to_status_codes() {
        let cases = [
            (AppError::Validation("x".to_owned()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".to_owned()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".to_owned()), StatusCode::CONFLICT),
            (AppError::Unauthorized("x".to_owned()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".to_owned()), StatusCode::FORBIDDEN),
            (
                AppError::RateLimited("x".to_owned()),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AppError::Internal("x".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), expected);
        }
    }

    #[test]
    fn timeouts_map_to_gateway_timeout() {
        let response = ApiError::Timeout("dispatch timed out".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
