//! HTTP request and response values exchanged with a [`Transport`].
//!
//! # Design
//! These types describe HTTP traffic as plain data. The request builder
//! produces `HttpRequest` values without touching the network and the
//! decoder consumes `HttpResponse` values; the transport in between is the
//! only piece that performs I/O.
//!
//! [`Transport`]: crate::transport::Transport

use std::fmt;

use url::Url;

use crate::error::TransportError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully formed outbound request.
///
/// Built by [`build_request`](crate::request::build_request). Headers are kept
/// in insertion order so identical inputs yield identical requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response returned by a transport.
///
/// `url` is the final URL after any redirects the transport followed.
/// `body_error` is set when the status line and headers arrived but reading
/// the body failed; `body` is then not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub body_error: Option<TransportError>,
}

impl HttpResponse {
    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        self.status / 100 == 2
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The status line and headers without the body.
    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }
}

/// Status and headers of a completed response, exposed through a
/// [`Handle`](crate::handle::Handle) once the transport has answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
