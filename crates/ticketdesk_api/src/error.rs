//! Error model used by ticket and directory service operations.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Failure modes of a service call. HTTP errors carry the service's own
/// message when the body has one.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl ApiError {
    /// Builds an HTTP error from a response status and raw body.
    ///
    /// Service failures arrive as `{"error": {"code": "...", "message": "..."}}`;
    /// the message is kept as the human-readable text when present, otherwise
    /// the status line stands in for it.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let detail = parsed.as_ref().and_then(|value| value.get("error"));

        let code = detail
            .and_then(|error| error.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = detail
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("http {}", status));

        ApiError::Http {
            status,
            code,
            message,
        }
    }

    /// HTTP status for service-side failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            ApiError::Http {
                status,
                code: None,
                message: err.to_string(),
            }
        } else if err.is_connect() {
            ApiError::Network(err.to_string())
        } else if err.is_decode() {
            ApiError::Serialization(err.to_string())
        } else {
            ApiError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use reqwest::StatusCode;

    #[test]
    fn service_error_message_is_surfaced() {
        let body = r#"{"error":{"code":"0x80040217","message":"Entity 'cr76d_ticket' With Id = 42 Does Not Exist"}}"#;
        let err = ApiError::from_response(StatusCode::NOT_FOUND, body);

        assert_eq!(err.to_string(), "Entity 'cr76d_ticket' With Id = 42 Does Not Exist");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        match err {
            ApiError::Http { code, .. } => assert_eq!(code.as_deref(), Some("0x80040217")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert_eq!(err.to_string(), "http 502 Bad Gateway");
    }
}
