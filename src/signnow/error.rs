//! Remote API error type and response status mapping

use async_trait::async_trait;
use reqwest::Response;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request error: {0}")]
    Transport(String),
    /// Non-success status; `message` is the remote service's own error text
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("unable to parse response from {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("response from {operation} is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

#[async_trait]
pub trait ResponseExt {
    async fn map_api_error(self) -> Result<Response, ApiError>;
}

#[async_trait]
impl ResponseExt for Response {
    async fn map_api_error(self) -> Result<Response, ApiError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }
        let body = self.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: remote_message(&body)
                .unwrap_or_else(|| format!("remote API returned {status}")),
        })
    }
}

#[async_trait]
impl ResponseExt for Result<Response, reqwest::Error> {
    async fn map_api_error(self) -> Result<Response, ApiError> {
        match self {
            Ok(response) => response.map_api_error().await,
            Err(e) => Err(ApiError::Transport(e.to_string())),
        }
    }
}

/// Extract the human-readable message from a remote error body.
///
/// The service reports errors as `{"errors":[{"code":..,"message":..}]}`,
/// `{"error": ".."}` or `{"message": ".."}`; anything else is returned raw.
pub fn remote_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    ["error", "message", "error_description"]
        .iter()
        .find_map(|key| json.get(*key).and_then(|v| v.as_str()))
        .map(ToString::to_string)
        .or_else(|| Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_errors_array() {
        let body = r#"{"errors":[{"code":65582,"message":"Invalid template id"},{"code":1,"message":"second"}]}"#;
        assert_eq!(
            remote_message(body).as_deref(),
            Some("Invalid template id; second")
        );
    }

    #[test]
    fn test_remote_message_single_error_key() {
        assert_eq!(
            remote_message(r#"{"error":"invalid_client"}"#).as_deref(),
            Some("invalid_client")
        );
        assert_eq!(
            remote_message(r#"{"message":"Document not found"}"#).as_deref(),
            Some("Document not found")
        );
    }

    #[test]
    fn test_remote_message_raw_and_empty() {
        assert_eq!(remote_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(remote_message("   "), None);
    }

    #[test]
    fn test_status_error_displays_remote_message() {
        let err = ApiError::Status {
            status: 404,
            message: "Document not found".to_string(),
        };
        assert_eq!(err.to_string(), "Document not found");
    }
}
