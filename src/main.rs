mod config;
mod engine;
mod error;
mod handler;
mod logger;
mod middleware;
mod models;
mod response;
mod routes;
mod service;
mod state;
mod storage;

mod tracer;

use std::sync::Arc;

use log::info;
use opentelemetry::global;
use opentelemetry::global::shutdown_tracer_provider;
use tokio::signal;

use crate::config::settings::Settings;
use crate::engine::face_engine::FaceEngine;
use crate::engine::rest_client::RestFaceEngine;
use crate::logger::logger::setup_logger;
use crate::routes::root::{root_routes, RouterState};
use crate::tracer::tracer::init_tracer_provider;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() {
    // Setup settings and logger
    let settings = Settings::new().expect("Failed to setup settings");
    setup_logger(&settings);
    let addr = format!("0.0.0.0:{}", settings.server.http_port);

    // Setup face engine client
    let engine: Arc<dyn FaceEngine> = Arc::new(
        RestFaceEngine::new(&settings.engine)
            .unwrap_or_else(|e| panic!("Failed to init face engine client: {}", e.to_string())),
    );
    info!(
        "completed initializing face engine client for {}",
        settings.engine.base_url
    );

    // Setup tracing
    let tracer_provider =
        init_tracer_provider(&settings).expect("Failed to initialize tracer provider.");
    global::set_tracer_provider(tracer_provider.clone());

    // Init server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to create new listener: {}", e.to_string()));
    info!("starting api server on {:?}", addr);
    let router_state = RouterState::new(engine, settings);

    axum::serve(listener, root_routes(router_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| panic!("Failed to start api server: {}", e.to_string()));

    shutdown_tracer_provider();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
