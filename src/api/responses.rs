//! Common API response types

use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

use crate::models::HubError;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    /// Create an error response
    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
            code: None,
        }
    }
}

/// Convert HubError to HTTP response
impl From<HubError> for HttpResponse {
    fn from(error: HubError) -> Self {
        let status = match &error {
            HubError::NotRegistered => StatusCode::FORBIDDEN,
            HubError::DuplicateRequest(_) => StatusCode::CONFLICT,
            HubError::UnknownTarget(_) => StatusCode::NOT_FOUND,
            HubError::ReplyMismatch(_) => StatusCode::NOT_FOUND,
            HubError::CallFailed(_) => StatusCode::BAD_GATEWAY,
            HubError::ChannelClosed(_) => StatusCode::GONE,
            HubError::Remote { .. } => StatusCode::BAD_GATEWAY,
            HubError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
            HubError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HubError::NetworkError(_) => StatusCode::BAD_GATEWAY,
            HubError::FederationError(_) => StatusCode::FORBIDDEN,
            HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = ApiResponse::<()>::error(error.to_string());
        body.code = Some(error.code().to_string());
        HttpResponse::build(status).json(body)
    }
}

/// Wrap a HubError so handlers can use `?`
pub fn api_error(error: HubError) -> actix_web::Error {
    let message = error.to_string();
    actix_web::error::InternalError::from_response(message, HttpResponse::from(error)).into()
}

/// Result type that can be converted to HttpResponse
pub type ApiResult<T> = Result<T, actix_web::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let resp = HttpResponse::from(HubError::InvalidMessage("bad".into()));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = HttpResponse::from(HubError::ChannelClosed("gone".into()));
        assert_eq!(resp.status(), StatusCode::GONE);
    }

    #[test]
    fn test_success_serialization() {
        let value = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], serde_json::json!([1, 2]));
        assert!(value.get("error").is_none());
    }
}
