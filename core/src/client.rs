//! Asynchronous API client.
//!
//! # Design
//! `ApiClient` holds an immutable `ClientConfig` and a `Transport`, both
//! behind `Arc`, so it is cheap to clone and safe to share between tasks.
//! Each call is split into `build_request` (pure) and one of the `execute_*`
//! methods, which spawn the request and return a [`Handle`] immediately.
//! The typed `execute` variants are thin adapters over the same decoding
//! primitive and differ only in how the payload becomes models.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::decode::{decode_response, parse, parse_collection};
use crate::endpoint::Endpoint;
use crate::error::{BuildError, TransportError};
use crate::handle::Handle;
use crate::http::{HttpMethod, HttpRequest};
use crate::json::{FromJson, JsonObject, KeyPath};
use crate::params::{Page, Parameters};
use crate::request::{build_request, Payload};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CreateDroplet, Droplet};

#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// A client using the default reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_request(
        &self,
        endpoint: &Endpoint,
        method: HttpMethod,
        page: Option<&Page>,
        parameters: Option<&Parameters>,
        payload: Option<&Payload>,
    ) -> Result<HttpRequest, BuildError> {
        build_request(&self.config, endpoint, method, page, parameters, payload)
    }

    /// Execute and return the raw JSON found at `key_path`.
    ///
    /// Outside a Tokio runtime the handle resolves to a `network_error`.
    pub fn execute_json(&self, request: HttpRequest, key_path: Option<&str>) -> Handle<Value> {
        Handle::spawn(
            Arc::clone(&self.transport),
            request,
            key_path.map(KeyPath::from),
            decode_response,
        )
    }

    /// Execute and decode one model from the payload at `key_path`.
    ///
    /// Outside a Tokio runtime the handle resolves to a `network_error`.
    pub fn execute<T>(&self, request: HttpRequest, key_path: Option<&str>) -> Handle<T>
    where
        T: FromJson + Send + 'static,
    {
        Handle::spawn(
            Arc::clone(&self.transport),
            request,
            key_path.map(KeyPath::from),
            parse::<T>,
        )
    }

    /// Execute and decode an array of models from the payload at `key_path`.
    ///
    /// Outside a Tokio runtime the handle resolves to a `network_error`.
    pub fn execute_collection<T>(
        &self,
        request: HttpRequest,
        key_path: Option<&str>,
    ) -> Handle<Vec<T>>
    where
        T: FromJson + Send + 'static,
    {
        Handle::spawn(
            Arc::clone(&self.transport),
            request,
            key_path.map(KeyPath::from),
            parse_collection::<T>,
        )
    }
}

/// Droplet operations.
impl ApiClient {
    /// `GET droplets`, optionally paginated and filtered by tag.
    pub fn list_droplets(
        &self,
        page: Option<&Page>,
        tag: Option<&str>,
    ) -> Result<Handle<Vec<Droplet>>, BuildError> {
        let filter = tag.map(|tag| Parameters::new().with("tag_name", tag));
        let request = self.build_request(
            &Endpoint::droplets(),
            HttpMethod::Get,
            page,
            filter.as_ref(),
            None,
        )?;
        Ok(self.execute_collection(request, Some("droplets")))
    }

    pub fn droplet(&self, id: u64) -> Result<Handle<Droplet>, BuildError> {
        let request =
            self.build_request(&Endpoint::droplet(id), HttpMethod::Get, None, None, None)?;
        Ok(self.execute(request, Some("droplet")))
    }

    /// Create one droplet. Use [`ApiClient::create_droplets`] for several names.
    pub fn create_droplet(&self, input: &CreateDroplet) -> Result<Handle<Droplet>, BuildError> {
        let request = self.create_request(input)?;
        Ok(self.execute(request, Some("droplet")))
    }

    pub fn create_droplets(
        &self,
        input: &CreateDroplet,
    ) -> Result<Handle<Vec<Droplet>>, BuildError> {
        let request = self.create_request(input)?;
        Ok(self.execute_collection(request, Some("droplets")))
    }

    /// `DELETE droplets/{id}`; a successful delete has no content.
    pub fn delete_droplet(&self, id: u64) -> Result<Handle<JsonObject>, BuildError> {
        let request =
            self.build_request(&Endpoint::droplet(id), HttpMethod::Delete, None, None, None)?;
        Ok(self.execute(request, None))
    }

    fn create_request(&self, input: &CreateDroplet) -> Result<HttpRequest, BuildError> {
        let payload = Payload::json(input)?;
        self.build_request(
            &Endpoint::droplets(),
            HttpMethod::Post,
            None,
            None,
            Some(&payload),
        )
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
