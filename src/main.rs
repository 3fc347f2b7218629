use quest_tracker::{AppState, Config, JsonFileStorage, QuestStore, remote::RemoteTable, router};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    info!(data_dir = %config.data_dir.display(), "loading quest data");
    let store = QuestStore::load_local(JsonFileStorage::new(&config.data_dir));

    let remote = config.remote.clone().map(RemoteTable::new);
    match &remote {
        Some(remote) => info!(table = remote.table(), "remote table configured"),
        None => info!("remote table not configured"),
    }

    let app = router(AppState::new(store, remote));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
