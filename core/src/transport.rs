//! The I/O seam between request building and response decoding.
//!
//! A `Transport` turns one `HttpRequest` into one `HttpResponse`. It reports
//! non-2xx statuses as ordinary responses. Failing to obtain a response at
//! all is a `TransportError`; failing after the head arrived is reported in
//! `HttpResponse::body_error` so the status and headers are kept. Timeouts,
//! proxies and TLS are transport configuration.

use std::error::Error as _;
use std::future::Future;
use std::pin::Pin;

use reqwest::{Client, Method};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + 'a>>;

pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a>;
}

/// `Transport` backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("ocean-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(error_chain(&e)))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client, e.g. one with timeouts.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
        }
    }

    fn map_error(error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else if error.is_connect() {
            TransportError::Connect(error_chain(error))
        } else {
            TransportError::Other(error_chain(error))
        }
    }
}

impl Transport for ReqwestTransport {
    fn execute<'a>(&'a self, request: &'a HttpRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(Self::method(request.method), request.url.clone());
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(|e| Self::map_error(&e))?;

            let status = response.status().as_u16();
            let url = response.url().clone();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            let (body, body_error) = match response.bytes().await {
                Ok(body) => (body.to_vec(), None),
                Err(e) => (Vec::new(), Some(Self::map_error(&e))),
            };

            Ok(HttpResponse {
                status,
                url,
                headers,
                body,
                body_error,
            })
        })
    }
}

// reqwest's top-level message omits the cause (DNS, refused, TLS).
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
