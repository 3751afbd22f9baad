use cronscrape::{resolve_settings_path, router, AppState, JsonFileStore, Scraper, Settings, SettingsSource};
use std::{env, net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let settings_path = resolve_settings_path();
    info!("reading settings from environment and {}", settings_path.display());
    let source = SettingsSource::new(Arc::new(JsonFileStore::new(settings_path)));
    let settings = Arc::new(Settings::load(&source).await?);
    info!(
        "production: {}, first day: {}, cutoff hour: {}",
        settings.production, settings.first_day, settings.day_cutoff_hour
    );

    let collector = Arc::new(Scraper::new(settings.clone()));
    let state = AppState::new(settings, collector);
    let app = router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
