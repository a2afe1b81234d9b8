//! Typed client core for a JSON REST API (DigitalOcean v2 shape).
//!
//! # Overview
//! Turns endpoints, pagination and filters into authenticated `HttpRequest`
//! values, executes them through a pluggable `Transport`, and decodes the
//! responses into typed models or a `RequestError`.
//!
//! # Design
//! - Request building (`request`) and response decoding (`decode`) are pure
//!   functions. Callers that perform their own HTTP round-trips can use them
//!   directly and never touch `client` or `handle`.
//! - `ApiClient::execute*` spawn the round-trip and return a [`Handle`] that
//!   can be awaited, cancelled, suspended and resumed. Exactly one outcome is
//!   produced per execution.
//! - Models implement [`FromJson`] and live in `types`. DTOs are defined
//!   independently from the mock-server crate; integration tests catch
//!   schema drift.

pub mod client;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod handle;
pub mod http;
pub mod json;
pub mod params;
pub mod request;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::{ApiVersion, ClientConfig, ConfigError};
pub use decode::{decode_response, decode_transport_error, parse, parse_collection, Outcome};
pub use endpoint::Endpoint;
pub use error::{BuildError, DecodeError, RequestError, TransportError, NO_STATUS};
pub use handle::{Handle, State};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseHead};
pub use json::{Fields, FromJson, JsonObject, KeyPath};
pub use params::{IntoParameters, Page, Parameters};
pub use request::{build_request, build_url, Payload};
pub use transport::{ReqwestTransport, Transport, TransportFuture};
pub use types::{CreateDroplet, Droplet, ImageRef, SshKeyRef};
