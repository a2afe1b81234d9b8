//! Client configuration: API root and bearer token.
//!
//! A `ClientConfig` is read-only once built and is shared between concurrent
//! requests behind an `Arc`.

use std::fmt;

use thiserror::Error;
use url::Url;

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "DIGITALOCEAN_TOKEN";

/// Environment variable overriding the API root.
pub const API_ROOT_ENV: &str = "DIGITALOCEAN_API_ROOT";

/// Known API versions and their roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V2,
}

impl ApiVersion {
    pub fn root(self) -> &'static str {
        match self {
            ApiVersion::V2 => "https://api.digitalocean.com/v2/",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingToken(&'static str),

    #[error("invalid API root {root:?}: {source}")]
    InvalidRoot {
        root: String,
        #[source]
        source: url::ParseError,
    },

    #[error("API root {0:?} cannot be used as a base URL")]
    NotABase(String),

    #[error("API root {0:?} must not carry a query or fragment")]
    QueryOrFragment(String),
}

#[derive(Clone)]
pub struct ClientConfig {
    api_root: Url,
    token: String,
}

impl ClientConfig {
    pub fn new(version: ApiVersion, token: impl Into<String>) -> Self {
        Self {
            api_root: Url::parse(version.root()).expect("static API root is a valid URL"),
            token: token.into(),
        }
    }

    /// Use a custom API root such as a local mock server.
    ///
    /// A missing trailing `/` is added to the path so endpoints resolve below
    /// the root instead of replacing its last segment. Roots carrying a query
    /// or fragment are rejected.
    pub fn with_root(root: &str, token: impl Into<String>) -> Result<Self, ConfigError> {
        let mut api_root = Url::parse(root).map_err(|source| ConfigError::InvalidRoot {
            root: root.to_string(),
            source,
        })?;
        if api_root.cannot_be_a_base() {
            return Err(ConfigError::NotABase(root.to_string()));
        }
        if api_root.query().is_some() || api_root.fragment().is_some() {
            return Err(ConfigError::QueryOrFragment(root.to_string()));
        }
        if !api_root.path().ends_with('/') {
            let path = format!("{}/", api_root.path());
            api_root.set_path(&path);
        }
        Ok(Self {
            api_root,
            token: token.into(),
        })
    }

    /// Read the token (and optionally the root) from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| ConfigError::MissingToken(TOKEN_ENV))?;
        match std::env::var(API_ROOT_ENV) {
            Ok(root) => Self::with_root(&root, token),
            Err(_) => Ok(Self::new(ApiVersion::V2, token)),
        }
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Keeps the token out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_root", &self.api_root.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}
