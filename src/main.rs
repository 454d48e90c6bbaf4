use campus_api::app;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL,
    // SESSION_SECRET, the gateway keys, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_api=info,tower_http=info".into()),
        )
        .init();

    let config = campus_api::config::config();
    tracing::info!("Starting Campus API in {:?} mode", config.environment);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Campus API listening on http://{}", bind_addr);

    axum::serve(listener, app()).await.expect("server");
}
