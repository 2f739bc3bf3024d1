//! Error types for the GLPI client.
//!
//! This module defines `GlpiError`, the unified error type returned by every
//! fallible operation in the crate.
//!
//! # Security
//!
//! User and application tokens must never show up in logs or error messages.
//! Use `sanitize_message()` when building messages from external sources.

use thiserror::Error;

/// Unified error type for all GLPI operations.
///
/// The remote API has no structured error taxonomy: it answers failures with
/// a `[code, message]` array. Callers mostly care whether the session could
/// be established ([`GlpiError::Session`]) or a resource operation failed
/// ([`GlpiError::Api`]); the remaining variants cover local failures.
#[derive(Error, Debug)]
pub enum GlpiError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status whose body was not JSON.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The (truncated) response body.
        body: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The `initSession` handshake was rejected.
    #[error("session error: {message}")]
    Session {
        /// Message returned by GLPI.
        message: String,
    },

    /// A resource operation was rejected by GLPI.
    #[error("GLPI error: {message}")]
    Api {
        /// Message returned by GLPI.
        message: String,
    },

    /// A field is neither present on the record nor resolvable as a relation.
    #[error("{item_type} has no field or relation named {field:?}")]
    FieldLookup {
        /// Endpoint of the record.
        item_type: String,
        /// The requested field.
        field: String,
    },

    /// A search keyword has no entry in the resource's field map.
    #[error("{item_type} has no search field named {field:?}")]
    UnknownSearchField {
        /// Endpoint searched.
        item_type: String,
        /// The keyword that could not be translated.
        field: String,
    },

    /// No resource type is registered under this name.
    #[error("unknown resource type: {name}")]
    UnknownResource {
        /// The name that was looked up.
        name: String,
    },

    /// A `<relation>_id` value is neither an id nor a list of ids.
    #[error("relation field {field:?} holds an unsupported value: {value}")]
    InvalidRelation {
        /// The `_id` sibling field.
        field: String,
        /// The offending value.
        value: serde_json::Value,
    },

    /// The record carries no id so it cannot be fetched or saved.
    #[error("{item_type} record has no id")]
    MissingId {
        /// Endpoint of the record.
        item_type: String,
    },
}

impl GlpiError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        GlpiError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        GlpiError::Config(message.into())
    }

    /// Creates a session error.
    pub fn session(message: impl Into<String>) -> Self {
        GlpiError::Session {
            message: message.into(),
        }
    }

    /// Creates a domain error carrying the remote message.
    pub fn api(message: impl Into<String>) -> Self {
        GlpiError::Api {
            message: message.into(),
        }
    }

    /// Creates a lookup error for a field missing on a record.
    pub fn field_lookup(item_type: impl Into<String>, field: impl Into<String>) -> Self {
        GlpiError::FieldLookup {
            item_type: item_type.into(),
            field: field.into(),
        }
    }

    /// Returns true if the session handshake failed.
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        matches!(self, GlpiError::Session { .. })
    }

    /// Returns the message GLPI supplied, for session and domain errors.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            GlpiError::Session { message } | GlpiError::Api { message } => Some(message),
            _ => None,
        }
    }

    /// Replaces every occurrence of each secret in `message` with `[REDACTED]`.
    ///
    /// Empty secrets are ignored.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        Self::sanitize_message(&self.to_string(), secrets)
    }
}

/// Extracts the message from a GLPI `[code, message]` error array.
///
/// Falls back to the serialized array when the second element is missing
/// or not a string.
pub(crate) fn error_array_message(items: &[serde_json::Value]) -> String {
    match items.get(1) {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => serde_json::Value::Array(items.to_vec()).to_string(),
    }
}
