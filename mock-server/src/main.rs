use mock_server::Relay;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let status = std::env::var("MOCK_STATUS")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(200);
    let relay = match std::env::var("MOCK_BODY") {
        Ok(body) => Relay::replying(status, body),
        Err(_) if status == 200 => Relay::new(),
        Err(_) => Relay::replying(status, String::new()),
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, status, "mock bark relay listening");
    mock_server::run(listener, relay).await
}
