//! Response decoding.
//!
//! # Design
//! `decode_response` is the single status-driven primitive: it classifies
//! the status, unwraps the key path on success and builds a `RequestError`
//! on failure. `parse` and `parse_collection` adapt its raw JSON into one
//! model or a list of models through [`FromJson`]. All of it is pure, so the
//! same functions serve the async client and callers that run their own
//! HTTP round-trips.
//!
//! Outcomes:
//! - 2xx with an empty, unparseable or `null` payload: `Ok(None)`.
//! - 2xx whose payload cannot be unwrapped or decoded: `malformed_response`.
//! - non-2xx with a JSON object body: that body as a `RequestError`, with
//!   `code` set to the received status.
//! - non-2xx without one: `network_error` with the received status when the
//!   body could not be read, otherwise `http_error` carrying the body text.

use serde_json::Value;
use tracing::warn;

use crate::error::{kind_of, DecodeError, RequestError, TransportError, NO_STATUS};
use crate::http::HttpResponse;
use crate::json::{navigate, FromJson, KeyPath};

/// The single result of one execution.
pub type Outcome<T> = Result<Option<T>, RequestError>;

/// Classify `response` and extract its payload as raw JSON.
pub fn decode_response(response: &HttpResponse, key_path: Option<&KeyPath>) -> Outcome<Value> {
    let json = match &response.body_error {
        Some(_) => None,
        None => parse_body(&response.body),
    };

    if response.is_success() {
        let Some(json) = json else {
            if let Some(err) = &response.body_error {
                warn!(status = response.status, error = %err, "success body could not be read");
            } else if !response.body.is_empty() {
                warn!(status = response.status, "success body is not valid JSON");
            }
            return Ok(None);
        };
        let payload = match key_path {
            Some(path) => navigate(json, path)
                .map_err(|err| RequestError::malformed(response.status, &err))?,
            None => json,
        };
        return Ok((!payload.is_null()).then_some(payload));
    }

    match (json, &response.body_error) {
        (Some(Value::Object(body)), _) => Err(RequestError::from_body(response.status, &body)),
        (_, Some(err)) => {
            warn!(status = response.status, error = %err, "error body could not be read");
            Err(RequestError::network(response.status, err))
        }
        _ => Err(RequestError::new(
            response.status,
            "",
            RequestError::HTTP_ERROR,
            status_text(response),
        )),
    }
}

/// The error delivered when the transport produced no response.
pub fn decode_transport_error(err: &TransportError) -> RequestError {
    warn!(error = %err, "transport failure");
    RequestError::network(NO_STATUS, err)
}

/// Decode a single model.
pub fn parse<T: FromJson>(response: &HttpResponse, key_path: Option<&KeyPath>) -> Outcome<T> {
    let Some(payload) = decode_response(response, key_path)? else {
        return Ok(None);
    };
    T::from_value(&payload)
        .map(Some)
        .map_err(|err| RequestError::malformed(response.status, &err))
}

/// Decode an array of models, preserving order.
pub fn parse_collection<T: FromJson>(
    response: &HttpResponse,
    key_path: Option<&KeyPath>,
) -> Outcome<Vec<T>> {
    let Some(payload) = decode_response(response, key_path)? else {
        return Ok(None);
    };
    let items = match &payload {
        Value::Array(items) => items,
        other => {
            let err = DecodeError::NotAnArray(kind_of(other));
            return Err(RequestError::malformed(response.status, &err));
        }
    };
    T::collection(items)
        .map(Some)
        .map_err(|err| RequestError::malformed(response.status, &err))
}

fn parse_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

fn status_text(response: &HttpResponse) -> String {
    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();
    if text.is_empty() {
        format!("unexpected HTTP status {}", response.status)
    } else {
        text.to_string()
    }
}
