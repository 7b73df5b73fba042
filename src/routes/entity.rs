//! Entity routes. Handlers resolve the entity from the path segment and check its allowed operations.

use crate::handlers::entity::{bulk_create, count, create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route("/:path_segment/bulk", post(bulk_create))
        .route("/:path_segment/count", get(count))
        .route("/:path_segment/:id", get(read).patch(update).delete(delete_handler))
        .with_state(state)
}
