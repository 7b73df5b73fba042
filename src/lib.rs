//! photo-orders: typed PostgreSQL data-access client for the photo-order service schema,
//! with an optional REST surface over the same operations.

pub mod case;
pub mod client;
pub mod db;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod telemetry;

pub use client::{AggregateResult, BatchPayload, Client, Delegate, GroupByRow, TxClient};
pub use db::{connect_pool, ensure_database_exists};
pub use error::{AppError, ConfigError};
pub use migration::{apply_migrations, migration_statements};
pub use models::*;
pub use routes::{app_router, common_routes, entity_routes};
pub use schema::{resolve, resolve_in_schema, FullConfig, ResolvedEntity, ResolvedModel};
pub use service::{Conn, CrudService, RequestValidator};
pub use settings::Settings;
pub use sql::{AggregateArgs, FindArgs, GroupByArgs, OrderBy, SortOrder, Unique, Where};
pub use state::AppState;
