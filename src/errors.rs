use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Fallback shown to the buyer when the backend gives no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Error body returned by the procurement backend.
///
/// The backend is not consistent about the field name, so both `error` and
/// `message` are accepted; `error` wins when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.error
            .or(self.message)
            .map(|msg| msg.trim().to_string())
            .filter(|msg| !msg.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    ApiError {
        status: StatusCode,
        message: String,
        /// Whether `message` came from the backend body or is our fallback.
        from_backend: bool,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Action already in progress: {0}")]
    ActionInFlight(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::SerializationError(err.to_string())
        } else {
            ServiceError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Builds an error from a non-success backend response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let backend_message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(ErrorResponse::into_message);

        let (message, from_backend) = match backend_message {
            Some(msg) => (msg, true),
            None => (GENERIC_FAILURE_MESSAGE.to_string(), false),
        };

        match status {
            StatusCode::NOT_FOUND => ServiceError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::Unauthorized(message),
            _ => ServiceError::ApiError {
                status,
                message,
                from_backend,
            },
        }
    }

    /// Validation errors are raised before any request leaves the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Returns the HTTP status behind this error, if one was received.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Self::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }

    /// Message suitable for a transient notification.
    /// Transport and internal failures collapse to the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::InvalidState(msg) => msg.clone(),
            Self::ApiError { message, .. } => message.clone(),
            Self::ActionInFlight(_) => "This action is already in progress".to_string(),
            Self::NetworkError(_)
            | Self::SerializationError(_)
            | Self::ConfigError(_)
            | Self::Other(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

// Result extensions for easier error handling
pub trait ResultExt<T> {
    fn map_err_to_service(self) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn map_err_to_service(self) -> Result<T, ServiceError> {
        self.map_err(|e| e.into())
    }
}
