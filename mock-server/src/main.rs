use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let token = std::env::var("MOCK_TOKEN").unwrap_or_else(|_| "test-token".to_string());
    let seed = std::env::var("MOCK_DROPLETS")
        .ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, seed, "listening");
    mock_server::run(listener, mock_server::app_with_droplets(&token, seed)).await
}
