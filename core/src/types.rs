//! Droplet resource models and payloads.
//!
//! # Design
//! Nested values whose wire shape matches their Rust shape (image, size,
//! region, kernel, backup window) derive `Deserialize` and are read through
//! `Fields::required`. `Droplet` and `Network` implement `FromJson` by hand
//! because their wire shape differs: networks are grouped by IP version and
//! IPv6 netmasks are numbers while IPv4 netmasks are strings.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::DecodeError;
use crate::json::{Fields, FromJson, JsonObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropletStatus {
    New,
    Active,
    Off,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Kernel {
    pub id: u64,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackupWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    pub id: u64,
    pub name: String,
    pub distribution: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Size {
    pub slug: String,
    pub memory: u64,
    pub vcpus: u32,
    pub disk: u64,
    #[serde(default)]
    pub transfer: f64,
    #[serde(default)]
    pub price_monthly: f64,
    #[serde(default)]
    pub price_hourly: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub ip_address: IpAddr,
    /// Dotted mask for IPv4, prefix length for IPv6.
    pub netmask: String,
    pub gateway: Option<String>,
    pub kind: NetworkKind,
}

impl FromJson for Network {
    fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
        let fields = Fields::new(object);
        let netmask = match fields.required::<Value>("netmask")? {
            Value::String(mask) => mask,
            Value::Number(prefix) => prefix.to_string(),
            _ => {
                return Err(DecodeError::InvalidField {
                    field: "netmask".to_string(),
                    reason: "expected a string or a number".to_string(),
                })
            }
        };
        Ok(Self {
            ip_address: fields.required("ip_address")?,
            netmask,
            gateway: fields.optional("gateway")?,
            kind: fields.required("type")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub memory: u64,
    pub vcpus: u32,
    pub disk: u64,
    pub locked: bool,
    pub status: DropletStatus,
    pub features: Vec<String>,
    pub tags: Vec<String>,
    pub backup_ids: Vec<u64>,
    pub snapshot_ids: Vec<u64>,
    pub volume_ids: Vec<String>,
    pub kernel: Option<Kernel>,
    pub next_backup_window: Option<BackupWindow>,
    pub image: Image,
    pub size: Size,
    pub region: Region,
    pub v4_networks: Vec<Network>,
    pub v6_networks: Vec<Network>,
    pub created_at: DateTime<Utc>,
}

impl FromJson for Droplet {
    fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
        let fields = Fields::new(object);
        let networks = fields.object("networks")?;
        Ok(Self {
            id: fields.required("id")?,
            name: fields.required("name")?,
            memory: fields.required("memory")?,
            vcpus: fields.required("vcpus")?,
            disk: fields.required("disk")?,
            locked: fields.required("locked")?,
            status: fields.required("status")?,
            features: fields.optional("features")?.unwrap_or_default(),
            tags: fields.optional("tags")?.unwrap_or_default(),
            backup_ids: fields.optional("backup_ids")?.unwrap_or_default(),
            snapshot_ids: fields.optional("snapshot_ids")?.unwrap_or_default(),
            volume_ids: fields.optional("volume_ids")?.unwrap_or_default(),
            kernel: fields.optional("kernel")?,
            next_backup_window: fields.optional("next_backup_window")?,
            image: fields.required("image")?,
            size: fields.required("size")?,
            region: fields.required("region")?,
            v4_networks: networks.collection("v4")?,
            v6_networks: networks.collection("v6")?,
            created_at: fields.required("created_at")?,
        })
    }
}

/// An image given by numeric id or by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ImageRef {
    Id(u64),
    Slug(String),
}

/// An SSH key given by numeric id or by fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SshKeyRef {
    Id(u64),
    Fingerprint(String),
}

/// Request payload for creating one or more droplets.
///
/// A single name is sent as `name`, several as `names`. Flags are only
/// emitted when enabled and optional lists only when non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDroplet {
    pub names: Vec<String>,
    pub region: String,
    pub size: String,
    pub image: ImageRef,
    pub ssh_keys: Option<Vec<SshKeyRef>>,
    pub backups: bool,
    pub ipv6: bool,
    pub private_networking: bool,
    pub user_data: Option<String>,
    pub volumes: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl CreateDroplet {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        size: impl Into<String>,
        image: ImageRef,
    ) -> Self {
        Self::multiple(vec![name.into()], region, size, image)
    }

    pub fn multiple(
        names: Vec<String>,
        region: impl Into<String>,
        size: impl Into<String>,
        image: ImageRef,
    ) -> Self {
        Self {
            names,
            region: region.into(),
            size: size.into(),
            image,
            ssh_keys: None,
            backups: false,
            ipv6: false,
            private_networking: false,
            user_data: None,
            volumes: None,
            tags: None,
        }
    }
}

impl Serialize for CreateDroplet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self.names.as_slice() {
            [name] => map.serialize_entry("name", name)?,
            names => map.serialize_entry("names", names)?,
        }
        map.serialize_entry("region", &self.region)?;
        map.serialize_entry("size", &self.size)?;
        map.serialize_entry("image", &self.image)?;
        if let Some(ssh_keys) = &self.ssh_keys {
            map.serialize_entry("ssh_keys", ssh_keys)?;
        }
        if self.backups {
            map.serialize_entry("backups", &true)?;
        }
        if self.ipv6 {
            map.serialize_entry("ipv6", &true)?;
        }
        if self.private_networking {
            map.serialize_entry("private_networking", &true)?;
        }
        if let Some(user_data) = &self.user_data {
            map.serialize_entry("user_data", user_data)?;
        }
        if let Some(volumes) = self.volumes.as_ref().filter(|v| !v.is_empty()) {
            map.serialize_entry("volumes", volumes)?;
        }
        if let Some(tags) = self.tags.as_ref().filter(|t| !t.is_empty()) {
            map.serialize_entry("tags", tags)?;
        }
        map.end()
    }
}
