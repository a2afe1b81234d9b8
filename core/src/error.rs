//! Error types for the request pipeline.
//!
//! # Design
//! Callers only ever see one failure type from an execution: `RequestError`,
//! a structured value carrying the HTTP status as `code` plus the server's
//! `id` / `name` / `description`. Transport failures, cancellation and
//! malformed success bodies are folded into the same shape under well-known
//! names so a single `match` on `name` covers every outcome.
//!
//! `BuildError`, `TransportError` and `DecodeError` are the narrower errors
//! of the individual stages; they are converted into `RequestError` at the
//! pipeline boundary.

use serde_json::{Map, Value};
use thiserror::Error;

/// `code` used when no HTTP status was received.
pub const NO_STATUS: u16 = 0;

/// Building a request failed. These indicate a programming mistake in the
/// caller (a malformed endpoint or an unserializable payload).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("endpoint does not resolve against the API root: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("payload could not be serialized to JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The transport could not produce an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("could not connect: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

/// A success body did not have the shape the caller asked for.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("expected a JSON array, found {0}")]
    NotAnArray(&'static str),

    #[error("key path `{path}` cannot descend into `{segment}`")]
    PathSegment { segment: String, path: String },
}

/// The structured failure delivered to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{name} ({code}): {description}")]
pub struct RequestError {
    pub code: u16,
    pub id: String,
    pub name: String,
    pub description: String,
}

impl RequestError {
    pub const NETWORK_ERROR: &'static str = "network_error";
    pub const CANCELLED: &'static str = "cancelled";
    pub const MALFORMED_RESPONSE: &'static str = "malformed_response";
    pub const HTTP_ERROR: &'static str = "http_error";

    pub fn new(
        code: u16,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code,
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Decode a server error body, overriding any `code` it carries with the
    /// status actually received.
    ///
    /// The API names the error in `id` and explains it in `message`; `name`
    /// and `description` are accepted as fallbacks. `request_id` becomes `id`.
    pub fn from_body(status: u16, body: &Map<String, Value>) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };
        Self {
            code: status,
            id: text(&["request_id"]),
            name: text(&["id", "name"]),
            description: text(&["message", "description"]),
        }
    }

    pub fn network(code: u16, err: &TransportError) -> Self {
        Self::new(code, "", Self::NETWORK_ERROR, err.to_string())
    }

    pub fn cancelled() -> Self {
        Self::new(NO_STATUS, "", Self::CANCELLED, "request was cancelled")
    }

    pub fn malformed(status: u16, err: &DecodeError) -> Self {
        Self::new(status, "", Self::MALFORMED_RESPONSE, err.to_string())
    }

    pub fn is_network_error(&self) -> bool {
        self.name == Self::NETWORK_ERROR
    }

    pub fn is_cancelled(&self) -> bool {
        self.name == Self::CANCELLED
    }

    pub fn is_malformed(&self) -> bool {
        self.name == Self::MALFORMED_RESPONSE
    }
}

/// Human-readable name of a JSON value's kind, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
