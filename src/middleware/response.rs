use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

/// Wrapper for API responses that adds the `{message, data}` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub message: &'static str,
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(message: &'static str, data: T) -> Self {
        Self {
            message,
            data,
            status_code: None,
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(message: &'static str, data: T, status_code: StatusCode) -> Self {
        Self {
            message,
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(message: &'static str, data: T) -> Self {
        Self::with_status(message, data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to serialize response data" })),
                )
                    .into_response();
            }
        };

        let envelope = json!({
            "message": self.message,
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
