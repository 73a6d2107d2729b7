// lib.rs - Case intelligence client core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod capture;
pub mod cases;
pub mod config;
pub mod conversation;
pub mod event;
pub mod model;
pub mod projection;
pub mod staging;
pub mod submission;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ClientConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

use capabilities::{HttpError, MicrophoneError};

pub const DEFAULT_CASES_PAGE_SIZE: u32 = 20;
pub const MAX_ERROR_BODY_PREVIEW: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Network,
    BadRequest,
    NotFound,
    Server,
    InvalidResponse,
    MicrophonePermissionDenied,
    MicrophoneUnavailable,
    Recording,
    InvalidConfig,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Server => "SERVER_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::MicrophonePermissionDenied => "MICROPHONE_PERMISSION_DENIED",
            Self::MicrophoneUnavailable => "MICROPHONE_UNAVAILABLE",
            Self::Recording => "RECORDING_ERROR",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Whether repeating the same user action can reasonably succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Server | Self::MicrophoneUnavailable | Self::Recording
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::Network => {
                "Unable to reach the case service. Please check that it is running and try again."
                    .into()
            }
            ErrorKind::BadRequest => {
                format!("The request was rejected: {}", self.message)
            }
            ErrorKind::NotFound => "The requested case could not be found.".into(),
            ErrorKind::Server => {
                "The case service ran into a problem. Please try again.".into()
            }
            ErrorKind::InvalidResponse => {
                "The case service sent an unexpected response. Please try again.".into()
            }
            ErrorKind::MicrophonePermissionDenied => {
                "Error accessing microphone. Please check permissions.".into()
            }
            ErrorKind::MicrophoneUnavailable => {
                "No microphone is available. Please connect one and try again.".into()
            }
            ErrorKind::Recording => "The recording could not be saved. Please try again.".into(),
            ErrorKind::InvalidConfig => {
                format!("The backend address is not valid: {}", self.message)
            }
            ErrorKind::Unknown => "An unexpected error occurred. Please try again.".into(),
        }
    }

    /// Maps a non-2xx status to an error, pulling the server's message out of
    /// a FastAPI `{"detail": ...}` or `{"error": ...}` body when present.
    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 | 409 | 413 | 415 | 422 => ErrorKind::BadRequest,
            404 => ErrorKind::NotFound,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .and_then(ApiErrorResponse::into_message)
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        let mut error = Self::new(kind, message).with_context("http_status", status.to_string());
        if let Some(raw) = body.filter(|b| !b.is_empty()) {
            let preview: String = String::from_utf8_lossy(raw)
                .chars()
                .take(MAX_ERROR_BODY_PREVIEW)
                .collect();
            error = error.with_internal(preview);
        }
        error
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn into_message(self) -> Option<String> {
        let detail = self.detail.and_then(|d| match d {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        detail
            .or(self.error)
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Status { status, body } => Self::from_http_status(status, Some(&body)),
            HttpError::Transport { message } => {
                AppError::new(ErrorKind::Network, "Network error").with_internal(message)
            }
            HttpError::InvalidUrl { .. } => {
                AppError::new(ErrorKind::InvalidConfig, e.to_string())
            }
            HttpError::InvalidResponse { .. } => {
                AppError::new(ErrorKind::InvalidResponse, "Unexpected response")
                    .with_internal(e.to_string())
            }
            HttpError::InvalidHeader { .. }
            | HttpError::InvalidRequest { .. }
            | HttpError::Serialization { .. } => {
                AppError::new(ErrorKind::Unknown, "Request could not be built")
                    .with_internal(e.to_string())
            }
        }
    }
}

impl From<MicrophoneError> for AppError {
    fn from(e: MicrophoneError) -> Self {
        let kind = match &e {
            MicrophoneError::PermissionDenied => ErrorKind::MicrophonePermissionDenied,
            MicrophoneError::DeviceUnavailable { .. } => ErrorKind::MicrophoneUnavailable,
            MicrophoneError::RecorderFailed { .. } => ErrorKind::Recording,
        };
        AppError::new(kind, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let error = AppError::new(ErrorKind::Network, "Connection failed");
        assert_eq!(error.kind, ErrorKind::Network);
        assert_eq!(error.code(), "NETWORK_ERROR");
        assert!(error.is_retryable());
        assert!(error.internal_message.is_none());
    }

    #[test]
    fn test_app_error_with_internal() {
        let error = AppError::new(ErrorKind::Server, "Failed").with_internal("stack trace");
        assert_eq!(error.internal_message.as_deref(), Some("stack trace"));
        assert_eq!(error.to_string(), "[SERVER_ERROR] Failed (internal: stack trace)");
    }

    #[test]
    fn test_app_error_from_http_status() {
        let error = AppError::from_http_status(404, None);
        assert_eq!(error.kind, ErrorKind::NotFound);
        assert_eq!(error.message, "HTTP error: 404");
        assert_eq!(error.context.get("http_status").map(String::as_str), Some("404"));

        let error = AppError::from_http_status(500, Some(br#"{"detail":"Failed to completely delete case"}"#));
        assert_eq!(error.kind, ErrorKind::Server);
        assert_eq!(error.message, "Failed to completely delete case");

        let error = AppError::from_http_status(422, Some(br#"{"detail":[{"msg":"field required"}]}"#));
        assert_eq!(error.kind, ErrorKind::BadRequest);
        assert!(error.message.contains("field required"));

        let error = AppError::from_http_status(418, Some(b"not json"));
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(error.internal_message.as_deref(), Some("not json"));
    }

    #[test]
    fn test_http_error_conversion() {
        let error: AppError = HttpError::Transport {
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::Network);
        assert_eq!(error.internal_message.as_deref(), Some("connection refused"));

        let error: AppError = HttpError::Status {
            status: 503,
            body: Vec::new(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::Server);
    }

    #[test]
    fn test_microphone_error_conversion() {
        let error: AppError = MicrophoneError::PermissionDenied.into();
        assert_eq!(error.kind, ErrorKind::MicrophonePermissionDenied);
        assert!(!error.is_retryable());
        assert_eq!(
            error.user_facing_message(),
            "Error accessing microphone. Please check permissions."
        );

        let error: AppError = MicrophoneError::DeviceUnavailable {
            message: "none".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::MicrophoneUnavailable);
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let error = AppError::validation("Please add at least one file.");
        assert_eq!(error.user_facing_message(), "Please add at least one file.");
    }
}
