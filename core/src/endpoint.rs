//! Relative API paths.

use std::fmt;

/// A path relative to the API root, such as `droplets` or `droplets/42`.
///
/// Leading slashes are dropped on construction: an absolute path would
/// replace the version segment of the root when resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    path: String,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            path: path.trim_start_matches('/').to_string(),
        }
    }

    pub fn droplets() -> Self {
        Self::new("droplets")
    }

    pub fn droplet(id: u64) -> Self {
        Self::new(format!("droplets/{id}"))
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
