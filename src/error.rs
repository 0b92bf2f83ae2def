//! Error type for store API calls.
//!
//! The variants follow the three ways a fetch can go wrong: the request never
//! completed, the server answered with a non-success status, or the body could
//! not be decoded. Screen controllers convert all of them into view state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Connection refused, timeout, DNS failure and friends.
    #[error("{0}")]
    Transport(String),

    /// Non-2xx response. `message` is the `message`/`error` field of the JSON
    /// body when the server sent one.
    #[error("{}", status_display(*status, message.as_deref()))]
    Status { status: u16, message: Option<String> },

    /// The response body was not the JSON shape we expected.
    #[error("Invalid response from store API: {0}")]
    Payload(String),
}

fn status_display(status: u16, message: Option<&str>) -> String {
    match message {
        Some(m) => format!("{m} (HTTP {status})"),
        None => format!("{} (HTTP {status})", status_error(status)),
    }
}

/// Convert an HTTP status code into a user-friendly message.
pub(crate) fn status_error(status: u16) -> &'static str {
    match status {
        400 => "The store API rejected the request",
        404 => "Store API endpoint not found",
        s if s >= 500 => "Store API server error",
        _ => "Unexpected response from store API",
    }
}

impl ApiError {
    /// The message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                message: Some(m), ..
            } => Some(m.as_str()),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Message to show on screen: the server's own text when present,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }
}
