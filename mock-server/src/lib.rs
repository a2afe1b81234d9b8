//! In-memory stand-in for the droplet endpoints of the DigitalOcean v2 API.
//!
//! Serves the same envelopes and error bodies as the real service:
//! collections under a plural key with `links` and `meta` siblings, single
//! resources under a singular key, and errors as
//! `{"id": ..., "message": ..., "request_id": ...}`.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 200;
/// Request header that delays the response, for exercising in-flight cancellation.
pub const DELAY_HEADER: &str = "x-mock-delay-ms";

const CREATED_AT: &str = "2024-01-01T00:00:00Z";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    pub memory: u64,
    pub vcpus: u32,
    pub disk: u64,
    pub locked: bool,
    pub status: String,
    pub created_at: String,
    pub features: Vec<String>,
    pub backup_ids: Vec<u64>,
    pub snapshot_ids: Vec<u64>,
    pub volume_ids: Vec<String>,
    pub image: Image,
    pub size: Size,
    pub region: Region,
    pub networks: Networks,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub name: String,
    pub distribution: String,
    pub slug: Option<String>,
    pub public: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Size {
    pub slug: String,
    pub memory: u64,
    pub vcpus: u32,
    pub disk: u64,
    pub transfer: f64,
    pub price_monthly: f64,
    pub price_hourly: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Region {
    pub slug: String,
    pub name: String,
    pub available: bool,
    pub features: Vec<String>,
    pub sizes: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Networks {
    pub v4: Vec<Network>,
    pub v6: Vec<Network>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    pub ip_address: String,
    /// Dotted string for IPv4, prefix length for IPv6.
    pub netmask: Value,
    pub gateway: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDroplet {
    pub name: Option<String>,
    pub names: Option<Vec<String>>,
    pub region: String,
    pub size: String,
    pub image: Value,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub tag_name: Option<String>,
}

/// An error body in the service's format.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    id: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, id: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            id,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "The resource you were accessing could not be found.",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "id": self.id,
            "message": self.message,
            "request_id": Uuid::new_v4(),
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Default)]
pub struct Store {
    droplets: BTreeMap<u64, Droplet>,
    next_id: u64,
}

impl Store {
    fn insert(&mut self, name: String, input: &CreateDroplet) -> Droplet {
        self.next_id += 1;
        let droplet = new_droplet(self.next_id, name, input);
        self.droplets.insert(droplet.id, droplet.clone());
        droplet
    }
}

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    store: Arc<RwLock<Store>>,
}

/// Router with no droplets, accepting `Bearer {token}`.
pub fn app(token: &str) -> Router {
    app_with_droplets(token, 0)
}

/// Router pre-populated with droplets named `web-001` .. `web-{count}`.
pub fn app_with_droplets(token: &str, count: u64) -> Router {
    let mut store = Store::default();
    let template = CreateDroplet {
        name: None,
        names: None,
        region: "nyc3".to_string(),
        size: "s-1vcpu-1gb".to_string(),
        image: json!("ubuntu-22-04-x64"),
        ipv6: false,
        tags: vec!["web".to_string()],
    };
    for n in 1..=count {
        store.insert(format!("web-{n:03}"), &template);
    }

    let state = AppState {
        token: Arc::from(token),
        store: Arc::new(RwLock::new(store)),
    };

    Router::new()
        .route("/v2/droplets", get(list_droplets).post(create_droplets))
        .route("/v2/droplets/{id}", get(get_droplet).delete(delete_droplet))
        .route("/v1/droplets", get(moved_droplets))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(middleware::from_fn(delay))
        .with_state(state)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if !authorized {
        debug!(uri = %request.uri(), "rejecting unauthenticated request");
        return ApiError::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Unable to authenticate you.",
        )
        .into_response();
    }
    next.run(request).await
}

async fn delay(request: Request, next: Next) -> Response {
    let millis = request
        .headers()
        .get(DELAY_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    if let Some(millis) = millis {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
    next.run(request).await
}

async fn list_droplets(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 || per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "bad_request",
            format!("page must be >= 1 and per_page between 1 and {MAX_PER_PAGE}"),
        ));
    }

    let store = state.store.read().await;
    let matching: Vec<&Droplet> = store
        .droplets
        .values()
        .filter(|d| query.tag_name.as_ref().is_none_or(|tag| d.tags.contains(tag)))
        .collect();
    let total = matching.len();
    // Both factors are u32, so the product fits in u64.
    let skip = usize::try_from(u64::from(page - 1) * u64::from(per_page)).unwrap_or(usize::MAX);
    let droplets: Vec<&Droplet> = matching.into_iter().skip(skip).take(per_page as usize).collect();

    let mut pages = serde_json::Map::new();
    if skip.saturating_add(droplets.len()) < total {
        pages.insert(
            "next".to_string(),
            json!(format!("/v2/droplets?page={}&per_page={per_page}", page + 1)),
        );
    }
    if page > 1 {
        pages.insert(
            "prev".to_string(),
            json!(format!("/v2/droplets?page={}&per_page={per_page}", page - 1)),
        );
    }

    info!(page, per_page, total, "list droplets");
    Ok(Json(json!({
        "droplets": droplets,
        "links": { "pages": pages },
        "meta": { "total": total },
    })))
}

async fn create_droplets(
    State(state): State<AppState>,
    Json(input): Json<CreateDroplet>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut store = state.store.write().await;
    let body = match (&input.name, &input.names) {
        (Some(name), None) => json!({ "droplet": store.insert(name.clone(), &input) }),
        (None, Some(names)) if !names.is_empty() => {
            let created: Vec<Droplet> = names
                .iter()
                .map(|name| store.insert(name.clone(), &input))
                .collect();
            json!({ "droplets": created })
        }
        _ => {
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable_entity",
                "You must specify either name or names.",
            ))
        }
    };
    info!(next_id = store.next_id, "created droplets");
    Ok((StatusCode::ACCEPTED, Json(body)))
}

async fn get_droplet(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store.read().await;
    let droplet = store.droplets.get(&id).ok_or_else(ApiError::not_found)?;
    Ok(Json(json!({ "droplet": droplet })))
}

async fn delete_droplet(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    store
        .droplets
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(ApiError::not_found)
}

async fn moved_droplets(request: Request) -> Redirect {
    let target = match request.uri().query() {
        Some(query) => format!("/v2/droplets?{query}"),
        None => "/v2/droplets".to_string(),
    };
    Redirect::permanent(&target)
}

fn new_droplet(id: u64, name: String, input: &CreateDroplet) -> Droplet {
    let (memory, vcpus, disk, price_monthly) = match input.size.as_str() {
        "s-2vcpu-2gb" => (2048, 2, 60, 18.0),
        "s-4vcpu-8gb" => (8192, 4, 160, 48.0),
        _ => (1024, 1, 25, 6.0),
    };
    let image = match &input.image {
        Value::Number(n) => Image {
            id: n.as_u64().unwrap_or_default(),
            name: "Custom Image".to_string(),
            distribution: "Unknown".to_string(),
            slug: None,
            public: false,
        },
        other => Image {
            id: 100_000,
            name: "22.04 (LTS) x64".to_string(),
            distribution: "Ubuntu".to_string(),
            slug: other.as_str().map(str::to_string),
            public: true,
        },
    };
    let region_name = match input.region.as_str() {
        "nyc3" => "New York 3".to_string(),
        "ams3" => "Amsterdam 3".to_string(),
        "sfo3" => "San Francisco 3".to_string(),
        other => other.to_uppercase(),
    };

    let mut networks = Networks::default();
    networks.v4.push(Network {
        ip_address: format!("203.0.113.{}", id % 250 + 1),
        netmask: json!("255.255.255.0"),
        gateway: "203.0.113.254".to_string(),
        kind: "public".to_string(),
    });
    if input.ipv6 {
        networks.v6.push(Network {
            ip_address: format!("2001:db8::{id:x}"),
            netmask: json!(64),
            gateway: "2001:db8::1".to_string(),
            kind: "public".to_string(),
        });
    }

    Droplet {
        id,
        name,
        memory,
        vcpus,
        disk,
        locked: false,
        status: "new".to_string(),
        created_at: CREATED_AT.to_string(),
        features: if input.ipv6 { vec!["ipv6".to_string()] } else { Vec::new() },
        backup_ids: Vec::new(),
        snapshot_ids: Vec::new(),
        volume_ids: Vec::new(),
        image,
        size: Size {
            slug: input.size.clone(),
            memory,
            vcpus,
            disk,
            transfer: 1.0,
            price_monthly,
            price_hourly: price_monthly / 672.0,
        },
        region: Region {
            slug: input.region.clone(),
            name: region_name,
            available: true,
            features: vec!["backups".to_string(), "ipv6".to_string()],
            sizes: vec![input.size.clone()],
        },
        networks,
        tags: input.tags.clone(),
    }
}
