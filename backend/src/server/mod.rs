//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServerHandle, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use users_backend::Trace;
#[cfg(debug_assertions)]
use users_backend::doc::ApiDoc;
use users_backend::domain::UserService;
use users_backend::inbound::http::configure;
use users_backend::inbound::http::health::{HealthState, live, ready};
use users_backend::inbound::http::state::HttpState;
use users_backend::outbound::mongo::{MongoStore, MongoUserRepository};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(configure)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Build the handler state: the Mongo repository behind one user service.
fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let repository = Arc::new(MongoUserRepository::new(&config.store));
    let service = UserService::new(repository, config.retry_policy);
    web::Data::new(HttpState::from_service(service))
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is bound.
/// - `config`: pre-built [`ServerConfig`] carrying the bind address and store.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener. OS signal
/// handling is left to [`drain_on_signal`].
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: &ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = build_http_state(config);
    let shutdown_secs = config.shutdown_timeout.as_secs();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .disable_signals()
    .shutdown_timeout(shutdown_secs)
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    info!(bind_addr = %config.bind_addr, "http server bound");
    Ok(server)
}

/// Refresh store reachability on a fixed interval until aborted.
pub fn spawn_store_probe(
    store: MongoStore,
    health_state: web::Data<HealthState>,
    interval: Duration,
) -> JoinHandle<()> {
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(interval);
        let mut reachable = health_state.is_store_reachable();
        loop {
            ticker.tick().await;
            let now_reachable = match store.ping().await {
                Ok(()) => true,
                Err(err) => {
                    if reachable {
                        warn!(error = %err, "store became unreachable; reporting not ready");
                    }
                    false
                }
            };
            if now_reachable && !reachable {
                info!("store reachable again; reporting ready");
            }
            health_state.set_store_reachable(now_reachable);
            reachable = now_reachable;
        }
    })
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable; waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Fail liveness and stop the server gracefully on SIGINT or SIGTERM.
pub fn drain_on_signal(handle: ServerHandle, health_state: web::Data<HealthState>) {
    actix_web::rt::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received; draining");
        health_state.mark_unhealthy();
        handle.stop(true).await;
    });
}
