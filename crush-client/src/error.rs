//! Error types for crush-client
//!
//! Every failure is scoped to the operation that produced it and is terminal:
//! nothing here is retried. User-facing messages come from the backend's
//! `message` field when it sends one, otherwise from the HTTP status.

use std::fmt;
use thiserror::Error;

/// Why the backend (or the transport) refused an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status, `None` when the request never produced a response
    pub status: Option<u16>,
    /// Message suitable for showing to the user
    pub message: String,
}

impl Rejection {
    /// Build a rejection from a non-success response body
    ///
    /// Uses the JSON `message` field when present and non-empty, otherwise
    /// a generic status-derived message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("Server responded with status {}", status));

        Self {
            status: Some(status),
            message,
        }
    }

    /// A request that failed before any status was received
    pub fn transport(err: impl fmt::Display) -> Self {
        Self {
            status: None,
            message: err.to_string(),
        }
    }

    /// A successful response whose body could not be used
    pub fn malformed(status: u16, detail: impl fmt::Display) -> Self {
        Self {
            status: Some(status),
            message: format!("Unexpected response from server: {}", detail),
        }
    }

    /// 401/403 responses
    ///
    /// Only a classification: nothing in this crate clears the session on it.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Identity exchange (login) errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Backend answered the exchange with a non-success status
    #[error("{0}")]
    ExchangeRejected(Rejection),

    /// Exchange request failed in transport or returned an unusable body
    #[error("Authentication failed: {0}")]
    Transport(Rejection),

    /// The identity provider reported failure before any exchange
    #[error("Identity provider authentication failed. Please try again.")]
    ProviderFailed,

    /// Session could not be persisted
    #[error("Could not save session: {0}")]
    Storage(#[from] crush_common::Error),
}

impl AuthError {
    /// Classify a failed exchange request
    pub fn from_exchange(rejection: Rejection) -> Self {
        if rejection.status.is_some() {
            AuthError::ExchangeRejected(rejection)
        } else {
            AuthError::Transport(rejection)
        }
    }
}

/// Profile load errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    LoadFailed(Rejection),
}

impl FetchError {
    pub fn rejection(&self) -> &Rejection {
        match self {
            FetchError::LoadFailed(r) => r,
        }
    }
}

/// Profile update errors
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Basic-info resource refused the update
    #[error("{0}")]
    BasicInfoRejected(Rejection),

    /// Survey-answers resource refused the update
    #[error("{0}")]
    AnswersRejected(Rejection),

    /// No profile is loaded in the view (never mounted, unmounted, or the
    /// session changed since it was loaded)
    #[error("Profile is not loaded")]
    NotLoaded,
}

impl UpdateError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            UpdateError::BasicInfoRejected(r) | UpdateError::AnswersRejected(r) => Some(r),
            UpdateError::NotLoaded => None,
        }
    }
}

/// Picture upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Backend did not hand out a usable upload slot
    #[error("Upload slot unavailable: {0}")]
    SlotUnavailable(Rejection),

    /// Object store refused the bytes
    #[error("Upload failed: {0}")]
    TransferFailed(Rejection),

    /// Another upload is still in flight
    #[error("An upload is already in progress")]
    Busy,
}

impl UploadError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            UploadError::SlotUnavailable(r) | UploadError::TransferFailed(r) => Some(r),
            UploadError::Busy => None,
        }
    }
}

/// Edit-shape field assignment errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Unknown profile field: {0}")]
    UnknownField(String),

    #[error("Profile field {0} cannot be edited")]
    ReadOnly(String),

    #[error("Invalid value {value:?} for {field}: expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },
}
