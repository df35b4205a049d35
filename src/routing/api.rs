use axum::Router;
use axum::routing::get;

use crate::state::ArcShared;

mod profile;

pub fn routes() -> Router<ArcShared> {
    Router::new()
        .route(
            "/profile",
            get(profile::retrieve)
                .post(profile::update)
        )
}
