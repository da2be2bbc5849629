use serde_json::Value;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// Shown to the user when the server gave no readable reason.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Everything a query or mutation can fail with.
///
/// The type is `Clone` because a single network result is handed to every
/// caller that was coalesced onto the same in-flight request.
#[derive(Debug, Clone, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{resource} '{id}' was not found")]
    NotFound { resource: &'static str, id: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not decode the {endpoint} response: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String
    }
}

impl LibraryError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        LibraryError::NotFound {
            resource,
            id: id.into()
        }
    }

    pub fn decode(endpoint: &'static str, reason: impl fmt::Display) -> Self {
        LibraryError::Decode {
            endpoint,
            reason: reason.to_string()
        }
    }

    /// The message a view should display or toast for this error.
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::Transport(e) => e.message(),
            other => other.to_string()
        }
    }

    /// The HTTP status behind this error, if it came from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            LibraryError::Transport(e) => e.status,
            LibraryError::NotFound { .. } => Some(404),
            _ => None
        }
    }
}

/// A failed HTTP exchange. `status` is `None` when the request never got a
/// response (connection refused, timeout, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    pub status: Option<u16>,
    pub payload: Value
}

impl TransportError {
    pub fn new(status: Option<u16>, payload: Value) -> Self {
        Self { status, payload }
    }

    pub fn network(reason: impl fmt::Display) -> Self {
        Self {
            status: None,
            payload: serde_json::json!({ "error": reason.to_string() })
        }
    }

    /// The server's own `error` or `message` string, verbatim.
    pub fn server_message(&self) -> Option<&str> {
        let object = self.payload.as_object()?;
        ["error", "message"]
            .iter()
            .filter_map(|field| object.get(*field))
            .find_map(|value| value.as_str().filter(|s| !s.trim().is_empty()))
    }

    /// Human readable message, falling back to a generic one.
    pub fn message(&self) -> String {
        self.server_message()
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "server responded with {}: {}", status, self.message()),
            None => write!(f, "request failed: {}", self.message())
        }
    }
}

impl std::error::Error for TransportError {}

/// Client-side form constraint violations, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: BTreeMap<&'static str, String>
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.errors.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(value)` when no field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", summary)
    }
}

impl std::error::Error for ValidationError {}
