use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handler::compare_handler::compare_faces;
use crate::state::compare_state::CompareState;

pub fn new_compare_route() -> Router<CompareState> {
    Router::new()
        .route("/compare", post(compare_faces))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            25 * 1024 * 1024, /* 25mb: two base64 images plus JSON overhead */
        ))
}
