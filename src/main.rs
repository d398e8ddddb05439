mod config;
mod error;
mod handler;
mod logger;
mod middleware;
mod models;
mod pipeline;
mod response;
mod routes;
mod service;
mod state;
mod tracer;

use std::sync::Arc;

use log::{error, info};
use opentelemetry::global;
use tokio::signal;

use crate::config::settings::SETTINGS;
use crate::logger::logger::setup_logger;
use crate::pipeline::comparison_pipeline::comparison_pipeline::{ComparisonPipeline, FaceComparer};
use crate::routes::root::{root_routes, RouterState};
use crate::tracer::tracer::init_tracer_provider;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Setup logger
    setup_logger();
    let addr = format!("0.0.0.0:{}", SETTINGS.server.http_port);

    // Setup pipeline: both models are loaded before the server starts
    // accepting requests.
    let device = SETTINGS.models.device.as_deref().unwrap_or("cpu");
    let comparison_pipeline = ComparisonPipeline::new(
        SETTINGS.models.detection_model_path.as_str(),
        SETTINGS.models.embedding_model_path.as_str(),
        device,
    )
    .unwrap_or_else(|e| panic!("Failed to init comparison pipeline: {}", e));
    info!("completed initializing comparison pipeline on device '{device}'");

    // Setup tracing
    let tracer_provider = init_tracer_provider().expect("Failed to initialize tracer provider.");
    global::set_tracer_provider(tracer_provider.clone());

    // Init server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to create new listener: {}", e));
    info!("starting api server on {:?}", addr);
    let pipeline: Arc<dyn FaceComparer> = Arc::new(comparison_pipeline);
    let router_state = RouterState::new(pipeline);

    axum::serve(listener, root_routes(router_state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| panic!("Failed to start api server: {}", e));

    if let Err(e) = tracer_provider.shutdown() {
        error!("failed to shut down tracer provider: {e}");
    }
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
