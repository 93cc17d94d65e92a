use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Errors raised while talking to the task API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to {action}: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to {action}: {status}")]
    Status {
        action: &'static str,
        status: StatusCode,
    },

    #[error("Failed to {action}: malformed response: {source}")]
    Decode {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

const UNKNOWN_FAILURE: &str = "An unknown error occurred";

/// The one failure value every view escalates to the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn invalid_task_id() -> Self {
        Self::new("Invalid task ID")
    }

    pub fn message(&self) -> &str {
        if self.message.trim().is_empty() {
            UNKNOWN_FAILURE
        } else {
            &self.message
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Failure {}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Failure::new(err.to_string())
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::new(message)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::new(message)
    }
}
