//! Users service entry-point: loads settings, connects to the store and
//! serves the REST API until a shutdown signal arrives.

mod server;

use std::io;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use users_backend::inbound::http::health::HealthState;
use users_backend::outbound::mongo::MongoStore;
use users_backend::settings::ServiceSettings;

use server::{ServerConfig, create_server, drain_on_signal, spawn_store_probe};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::from_args(std::env::args_os()).map_err(io::Error::other)?;
    let store_config = settings.store_config().map_err(io::Error::other)?;
    let bind_addr = settings.bind_addr().map_err(io::Error::other)?;

    let store = MongoStore::connect(&store_config)
        .await
        .map_err(io::Error::other)?;

    let health_state = web::Data::new(HealthState::new());
    match store.ping().await {
        Ok(()) => info!(database = store_config.database(), "store reachable"),
        Err(err) => {
            warn!(error = %err, "store unreachable at startup; serving while not ready");
            health_state.set_store_reachable(false);
        }
    }

    let config = ServerConfig::new(bind_addr, store.clone())
        .with_retry_policy(settings.retry_policy());
    let server = create_server(health_state.clone(), &config)?;
    drain_on_signal(server.handle(), health_state.clone());
    let probe = spawn_store_probe(store.clone(), health_state.clone(), config.probe_interval);

    let outcome = server.await;

    health_state.mark_unhealthy();
    probe.abort();
    store.shutdown().await;
    info!("users service stopped");
    outcome
}

