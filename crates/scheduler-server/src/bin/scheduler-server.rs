//! Scheduler process entry point: recovers from a previous crash, then
//! serves the broker RPCs, log intake, and the REST facade.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Server;
use message_bus::BusConnection;
use persistence::Store;
use scheduler_core::{Scheduler, SystemConfig};
use scheduler_server::{http, rpc_servers, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;
    tracing::info!(bind_addr = %settings.bind_addr, "starting scheduler server");

    let store = Arc::new(Store::connect(&settings.database_url).await?);
    let bus = BusConnection::connect(&settings.broker_url).await?;

    let system_config = SystemConfig {
        storage: serde_json::json!({ "root": settings.storage_root }),
        worker_config: settings.worker_config.clone(),
    };
    let scheduler = Arc::new(Scheduler::new(store, bus.clone(), system_config));
    scheduler.recover().await?;

    rpc_servers::spawn_all(scheduler.clone(), bus).await?;

    let app = http::build_router(scheduler);
    let addr: SocketAddr = settings.bind_addr.parse()?;
    tracing::info!(%addr, "listening");
    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
