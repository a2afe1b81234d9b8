//! URL and request construction.
//!
//! Nothing here performs I/O. Identical inputs always produce identical
//! `HttpRequest` values: query items follow parameter insertion order and
//! headers are emitted in a fixed order.

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::BuildError;
use crate::http::{HttpMethod, HttpRequest};
use crate::params::{Page, Parameters};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A request body already encoded as JSON.
///
/// Encoding happens when the payload is created, so building the request
/// itself cannot fail on serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, BuildError> {
        Ok(Self {
            bytes: serde_json::to_vec(value)?,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Resolve `endpoint` below `root` and attach the merged query parameters.
///
/// `page` is applied first and `parameters` second, so explicit parameters
/// override pagination keys.
pub fn build_url(
    root: &Url,
    endpoint: &Endpoint,
    page: Option<&Page>,
    parameters: Option<&Parameters>,
) -> Result<Url, BuildError> {
    let mut url = root.join(endpoint.path())?;

    let merged = Parameters::new().combine(page).combine(parameters);
    if !merged.is_empty() {
        url.query_pairs_mut().extend_pairs(merged.iter());
    }
    Ok(url)
}

/// Build the outbound request for `endpoint`.
///
/// `Authorization: Bearer <token>` is always set. `Content-Type` is set only
/// when a payload is present.
pub fn build_request(
    config: &ClientConfig,
    endpoint: &Endpoint,
    method: HttpMethod,
    page: Option<&Page>,
    parameters: Option<&Parameters>,
    payload: Option<&Payload>,
) -> Result<HttpRequest, BuildError> {
    let url = build_url(config.api_root(), endpoint, page, parameters)?;

    let mut headers = Vec::with_capacity(2);
    if payload.is_some() {
        headers.push(("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()));
    }
    headers.push((
        "Authorization".to_string(),
        format!("Bearer {}", config.token()),
    ));

    debug!(%method, %url, has_body = payload.is_some(), "built request");

    Ok(HttpRequest {
        method,
        url,
        headers,
        body: payload.map(|p| p.as_bytes().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiVersion;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> ClientConfig {
        ClientConfig::new(ApiVersion::V2, "token-123")
    }

    #[test]
    fn endpoint_resolves_below_root() {
        let url = build_url(config().api_root(), &Endpoint::droplets(), None, None).unwrap();
        assert_eq!(url.as_str(), "https://api.digitalocean.com/v2/droplets");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn page_becomes_query_items() {
        let page = Page::new(2, 20);
        let url = build_url(config().api_root(), &Endpoint::droplets(), Some(&page), None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.digitalocean.com/v2/droplets?page=2&per_page=20"
        );
    }

    #[test]
    fn explicit_parameters_override_page() {
        let page = Page::new(2, 20);
        let params = Parameters::new().with("per_page", "200").with("tag_name", "web");
        let url = build_url(
            config().api_root(),
            &Endpoint::droplets(),
            Some(&page),
            Some(&params),
        )
        .unwrap();
        assert_eq!(url.query(), Some("page=2&per_page=200&tag_name=web"));
    }

    #[test]
    fn empty_parameters_leave_no_query_string() {
        let params = Parameters::new();
        let url = build_url(config().api_root(), &Endpoint::droplets(), None, Some(&params)).unwrap();
        assert_eq!(url.query(), None);
        assert!(!url.as_str().ends_with('?'));
    }

    #[test]
    fn query_values_are_url_encoded() {
        let params = Parameters::new().with("name", "web 01&02");
        let url = build_url(config().api_root(), &Endpoint::droplets(), None, Some(&params)).unwrap();
        assert_eq!(url.query(), Some("name=web+01%2602"));
    }

    #[test]
    fn get_request_has_auth_and_no_body() {
        let req = build_request(&config(), &Endpoint::droplet(7), HttpMethod::Get, None, None, None)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url.as_str(), "https://api.digitalocean.com/v2/droplets/7");
        assert_eq!(
            req.headers,
            vec![("Authorization".to_string(), "Bearer token-123".to_string())]
        );
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn payload_sets_body_and_content_type() {
        let payload = Payload::json(&json!({"name": "web-01", "region": "nyc3"})).unwrap();
        let req = build_request(
            &config(),
            &Endpoint::droplets(),
            HttpMethod::Post,
            None,
            None,
            Some(&payload),
        )
        .unwrap();
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("Authorization"), Some("Bearer token-123"));
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "web-01", "region": "nyc3"}));
    }

    #[test]
    fn building_twice_is_identical() {
        let page = Page::new(3, 50);
        let params = Parameters::new().with("tag_name", "db");
        let payload = Payload::json(&json!({"type": "reboot"})).unwrap();
        let build = || {
            build_request(
                &config(),
                &Endpoint::new("droplets/9/actions"),
                HttpMethod::Post,
                Some(&page),
                Some(&params),
                Some(&payload),
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn payload_rejects_unserializable_values() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(vec![1u8], "non-string key");
        assert!(matches!(Payload::json(&map), Err(BuildError::Serialization(_))));
    }
}
