use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_droplets, Droplet};
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

fn get(uri: &str) -> Request<String> {
    authed("GET", uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    authed(method, uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401_error_body() {
    let resp = app(TOKEN)
        .oneshot(Request::builder().uri("/v2/droplets").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["id"], "unauthorized");
    assert_eq!(body["message"], "Unable to authenticate you.");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app(TOKEN)
        .oneshot(
            Request::builder()
                .uri("/v2/droplets")
                .header(http::header::AUTHORIZATION, "Bearer nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn list_droplets_empty_envelope() {
    let resp = app(TOKEN).oneshot(get("/v2/droplets")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["droplets"], serde_json::json!([]));
    assert_eq!(body["meta"]["total"], 0);
    assert!(body["links"].is_object());
}

#[tokio::test]
async fn list_droplets_paginates() {
    let resp = app_with_droplets(TOKEN, 45)
        .oneshot(get("/v2/droplets?page=2&per_page=20"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let droplets: Vec<Droplet> = serde_json::from_value(body["droplets"].clone()).unwrap();
    assert_eq!(droplets.len(), 20);
    assert_eq!(droplets[0].name, "web-021");
    assert_eq!(body["meta"]["total"], 45);
    assert_eq!(body["links"]["pages"]["next"], "/v2/droplets?page=3&per_page=20");
    assert_eq!(body["links"]["pages"]["prev"], "/v2/droplets?page=1&per_page=20");
}

#[tokio::test]
async fn list_droplets_last_page_has_no_next() {
    let resp = app_with_droplets(TOKEN, 45)
        .oneshot(get("/v2/droplets?page=3&per_page=20"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["droplets"].as_array().unwrap().len(), 5);
    assert!(body["links"]["pages"].get("next").is_none());
}

#[tokio::test]
async fn list_droplets_filters_by_tag() {
    let resp = app_with_droplets(TOKEN, 3)
        .oneshot(get("/v2/droplets?tag_name=db"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn list_droplets_rejects_oversized_page() {
    let resp = app(TOKEN)
        .oneshot(get("/v2/droplets?per_page=500"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["id"], "bad_request");
}

#[tokio::test]
async fn list_droplets_page_far_past_the_end_is_empty() {
    let resp = app_with_droplets(TOKEN, 3)
        .oneshot(get("/v2/droplets?page=4294967295&per_page=200"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["droplets"], serde_json::json!([]));
    assert_eq!(body["meta"]["total"], 3);
    assert!(body["links"]["pages"].get("next").is_none());
}

// --- create ---

#[tokio::test]
async fn create_single_droplet() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            "/v2/droplets",
            r#"{"name":"web-01","region":"nyc3","size":"s-1vcpu-1gb","image":"ubuntu-22-04-x64","tags":["web"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = body_json(resp).await;
    let droplet: Droplet = serde_json::from_value(body["droplet"].clone()).unwrap();
    assert_eq!(droplet.name, "web-01");
    assert_eq!(droplet.status, "new");
    assert_eq!(droplet.tags, vec!["web".to_string()]);
}

#[tokio::test]
async fn create_several_droplets() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            "/v2/droplets",
            r#"{"names":["a","b"],"region":"ams3","size":"s-2vcpu-2gb","image":42}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = body_json(resp).await;
    let droplets: Vec<Droplet> = serde_json::from_value(body["droplets"].clone()).unwrap();
    assert_eq!(droplets.len(), 2);
    assert_eq!(droplets[1].region.name, "Amsterdam 3");
}

#[tokio::test]
async fn create_without_name_returns_422() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            "/v2/droplets",
            r#"{"region":"nyc3","size":"s-1vcpu-1gb","image":1}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["id"], "unprocessable_entity");
}

// --- get / delete ---

#[tokio::test]
async fn get_droplet_not_found() {
    let resp = app(TOKEN).oneshot(get("/v2/droplets/99")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["id"], "not_found");
}

#[tokio::test]
async fn delete_droplet_not_found() {
    let resp = app(TOKEN)
        .oneshot(authed("DELETE", "/v2/droplets/99").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn legacy_path_redirects_with_query() {
    let resp = app(TOKEN)
        .oneshot(get("/v1/droplets?page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(resp.headers()[http::header::LOCATION], "/v2/droplets?page=2");
}

// --- full lifecycle ---

#[tokio::test]
async fn droplet_lifecycle() {
    use tower::Service;

    let mut app = app(TOKEN).into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v2/droplets",
            r#"{"name":"db-01","region":"sfo3","size":"s-4vcpu-8gb","image":"ubuntu","ipv6":true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = body_json(resp).await;
    let created: Droplet = serde_json::from_value(body["droplet"].clone()).unwrap();
    assert_eq!(created.networks.v6.len(), 1);
    let id = created.id;

    // list
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/v2/droplets"))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["droplets"][0]["id"], id);

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/v2/droplets/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["droplet"]["name"], "db-01");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", &format!("/v2/droplets/{id}")).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/v2/droplets/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
