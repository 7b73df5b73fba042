//! Shared application state for all routes.

use crate::client::Client;
use crate::schema::ResolvedModel;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
}

impl AppState {
    pub fn new(pool: PgPool, model: ResolvedModel) -> Self {
        Self {
            pool,
            model: Arc::new(model),
        }
    }

    /// Serve the same pool and schema the client uses.
    pub fn from_client(client: &Client) -> Self {
        Self::new(client.pool().clone(), client.model().clone())
    }
}
