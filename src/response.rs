use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Envelope for every successful API response.
/// Failures use the same shape, rendered by `AppError`.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    /// Always true here; `AppError` writes the false case.
    pub success: bool,
    /// Confirmation text such as "Profile updated successfully".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The entity or view being returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Success response with data.
    /// Status code defaults to 200 OK.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Success response carrying both a confirmation and data, as the
    /// profile endpoints reply.
    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Usage: `ApiResponse::success(data).with_status(StatusCode::ACCEPTED)`
    pub fn with_status(self, status: StatusCode) -> ApiResponseWithStatus<T> {
        ApiResponseWithStatus {
            status,
            response: self,
        }
    }

    /// Shorthand for 201 Created.
    pub fn created(self) -> ApiResponseWithStatus<T> {
        self.with_status(StatusCode::CREATED)
    }

    /// First-or-create replies: 201 when this request inserted the row,
    /// 200 when it returned one that already existed.
    pub fn created_if(self, created: bool) -> ApiResponseWithStatus<T> {
        if created {
            self.created()
        } else {
            self.with_status(StatusCode::OK)
        }
    }
}

/// Payload type for message-only responses (deletes, logout).
#[derive(Serialize)]
pub struct EmptyData;

impl ApiResponse<EmptyData> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// An ApiResponse paired with a non-default status code.
pub struct ApiResponseWithStatus<T> {
    status: StatusCode,
    response: ApiResponse<T>,
}

impl<T> IntoResponse for ApiResponseWithStatus<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

/// Plain `ApiResponse` handler returns are 200 OK.
impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
