use warehouse_layout::api;
use warehouse_layout::config::AppConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            tracing::warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    tracing::info!("Warehouse layout service v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(err) = api::start_api_server(app_config.api, app_config.layout).await {
        tracing::error!("API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
