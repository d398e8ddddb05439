use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::response::Html;
use axum::routing::get;
use axum::{middleware, Json, Router};
use http::{Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::propagate_header::PropagateHeaderLayer;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_request_id::RequestIdLayer;

use crate::config::settings::SETTINGS;
use crate::middleware::api_key_mw::validate_api_key_mw;
use crate::middleware::request_id_mw::generate_request_id_mw;
use crate::models::compare_model::HealthOutput;
use crate::pipeline::comparison_pipeline::comparison_pipeline::FaceComparer;
use crate::response::common_response::{GeneralResponseBuilder, GeneralResponseResult};
use crate::routes::compare::new_compare_route;
use crate::state::compare_state::CompareState;

#[derive(Clone, Serialize, Deserialize)]
struct FallbackResponse {
    message: String,
}

#[derive(Clone)]
pub struct RouterState {
    pipeline: Arc<dyn FaceComparer>,
}

impl RouterState {
    pub fn new(pipeline: Arc<dyn FaceComparer>) -> Self {
        RouterState { pipeline }
    }
}

pub fn root_routes(router_state: RouterState) -> Router {
    let compare_state = CompareState::new(&router_state.pipeline);

    let api_router = Router::new()
        .merge(Router::new().route("/health", get(healthcheck)))
        .merge(new_compare_route().with_state(compare_state))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(validate_api_key_mw));

    let mut request_timeout_duration: u64 = 20;
    if let Some(request_timeout) = SETTINGS.server.request_timeout {
        request_timeout_duration = request_timeout;
    }

    Router::new()
        .route("/", get(index))
        .nest("/api", api_router)
        .layer(PropagateHeaderLayer::new(header::HeaderName::from_static(
            "x-request-id",
        )))
        .layer(
            CorsLayer::permissive()
                .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS]),
        )
        .layer(RequestIdLayer)
        .layer(middleware::from_fn(generate_request_id_mw))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_duration)))
        .layer(SetSensitiveHeadersLayer::new(std::iter::once(
            header::AUTHORIZATION,
        )))
        .fallback(fallback)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

async fn fallback(uri: Uri) -> (StatusCode, Json<FallbackResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(FallbackResponse {
            message: format!("No route for {uri}"),
        }),
    )
}

async fn healthcheck() -> GeneralResponseResult<HealthOutput> {
    Ok(GeneralResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(HealthOutput {
            status: "healthy".to_string(),
            message: "Face matching service is running".to_string(),
        })
        .build())
}
