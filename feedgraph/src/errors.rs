use std::borrow::Cow;
use std::fmt;

use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::types::PostStatus;

/// Top-level error type returned by feedgraph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Malformed id or otherwise unusable argument.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A required text field was blank after trimming.
    #[error("{field} cannot be empty")]
    EmptyInput { field: &'static str },

    /// Referenced entity is absent.
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Ownership, block or privacy rule rejected the caller.
    #[error("forbidden: {reason}")]
    Forbidden { reason: Cow<'static, str> },

    /// Publish / remove-draft applied to a post in the wrong state.
    #[error("cannot {action} a post that is {from}")]
    InvalidStateTransition { from: PostStatus, action: &'static str },

    /// An optional reference (audio track) points at nothing.
    #[error("{entity} '{id}' does not exist")]
    InvalidReference { entity: &'static str, id: String },

    /// Unique field already claimed by another entity.
    #[error("{field} '{value}' is already taken")]
    Conflict { field: &'static str, value: String },

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Media file I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn forbidden(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden { reason: reason.into() }
    }

    /// Stable classification used at the request boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } | Self::EmptyInput { .. } | Self::InvalidReference { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Redis(_) | Self::Io(_) | Self::Serialization(_) | Self::Other { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Forbidden,
    InvalidStateTransition,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidStateTransition => "invalid_state_transition",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure surfaced to callers at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    /// Converts an error into its public shape. Internal errors are logged and replaced by a generic
    /// message so storage details never leak to the caller.
    pub fn from_error(err: &GraphError) -> Self {
        let kind = err.kind();
        let message = if err.is_internal() {
            error!("internal failure: {err}");
            "something went wrong".to_string()
        } else {
            err.to_string()
        };
        Self { kind, message }
    }
}

impl From<GraphError> for Failure {
    fn from(err: GraphError) -> Self {
        Self::from_error(&err)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
