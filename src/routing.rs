use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::get;
use tower::{BoxError, ServiceBuilder};
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower_http::trace::TraceLayer;

use crate::net::{error, layer};
use crate::state::ArcShared;

mod api;

async fn ping() -> (StatusCode, &'static str) {
    (StatusCode::OK, "pong")
}

async fn handle_error(err: BoxError) -> error::Error {
    if err.is::<Elapsed>() {
        error::Error::api(error::GeneralKind::Timeout)
    } else {
        error::Error::new()
            .context("unhandled middleware error")
            .source(err)
    }
}

pub fn routes(state: &ArcShared) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest("/api", api::routes())
        .layer(ServiceBuilder::new()
            .layer(layer::RequestIdLayer::new())
            .layer(TraceLayer::new_for_http()
                .make_span_with(layer::make_span_with)
                .on_response(layer::on_response)
                .on_failure(layer::on_failure))
            .layer(HandleErrorLayer::new(handle_error))
            .layer(TimeoutLayer::new(Duration::new(90, 0))))
        .with_state(state.clone())
}
