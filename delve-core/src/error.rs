//! Unified error handling for the delve workspace
//!
//! Every error carries an [`ErrorContext`] with a unique id, the component
//! that produced it, and recovery suggestions, so failures stay diagnosable
//! once they have crossed a few layers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result alias used throughout the workspace
pub type DelveResult<T> = Result<T, DelveError>;

/// Structured context attached to errors for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error identifier
    pub error_id: String,
    /// When the error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Component where the error originated
    pub component: String,
    /// Operation that was being performed
    pub operation: Option<String>,
    /// Additional key/value details
    pub metadata: HashMap<String, String>,
    /// Suggested recovery actions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum DelveError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation '{operation}' timed out after {duration_ms}ms")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        model: Option<String>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DelveError {
    /// Context of this error, if it carries one
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            DelveError::Config { context, .. }
            | DelveError::Network { context, .. }
            | DelveError::Timeout { context, .. }
            | DelveError::RateLimit { context, .. }
            | DelveError::Llm { context, .. }
            | DelveError::Validation { context, .. }
            | DelveError::Internal { context, .. } => Some(context),
            DelveError::Io(_) | DelveError::Serialization(_) => None,
        }
    }

    /// Whether retrying the failed operation can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DelveError::Network { .. } | DelveError::Timeout { .. } | DelveError::RateLimit { .. }
        )
    }

    /// Suggested delay before a retry, if the error is recoverable
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            DelveError::Network { .. } => Some(1000),
            DelveError::Timeout { .. } => Some(2000),
            DelveError::RateLimit { retry_after_ms, .. } => retry_after_ms.or(Some(5000)),
            _ => None,
        }
    }

    /// Log this error at a severity matching its recoverability
    pub fn log(&self) {
        let error_id = self.context().map(|c| c.error_id.as_str()).unwrap_or("-");
        if self.is_recoverable() {
            tracing::warn!(error_id = %error_id, error = %self, "Recoverable error occurred");
        } else {
            tracing::error!(error_id = %error_id, error = %self, "Error occurred");
        }
    }
}

/// Create a configuration error with context
#[macro_export]
macro_rules! config_error {
    ($component:expr, $message:expr) => {
        $crate::DelveError::Config {
            message: $message.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($component:expr, $message:expr, $suggestion:expr) => {
        $crate::DelveError::Config {
            message: $message.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component).with_suggestion($suggestion),
        }
    };
}

/// Create a validation error, optionally naming the offending field
#[macro_export]
macro_rules! validation_error {
    ($message:expr) => {
        $crate::DelveError::Validation {
            message: $message.to_string(),
            field: None,
            context: $crate::ErrorContext::new("validation"),
        }
    };
    ($message:expr, $field:expr) => {
        $crate::DelveError::Validation {
            message: $message.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new("validation"),
        }
    };
}

/// Create an internal error with context
#[macro_export]
macro_rules! internal_error {
    ($component:expr, $message:expr) => {
        $crate::DelveError::Internal {
            message: $message.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
}
