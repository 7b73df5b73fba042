//! Database client: lifecycle, per-model delegates and transactions.
//!
//! ```no_run
//! # async fn run() -> Result<(), photo_orders::AppError> {
//! use photo_orders::{Client, NewUser, Settings, Unique};
//!
//! let client = Client::connect(&Settings::from_env()?).await?;
//! let user = client.user().create(NewUser::with_email("ada@example.com")).await?;
//! let found = client.user().find_unique(Unique::by("email", "ada@example.com")).await?;
//! assert_eq!(found.map(|u| u.id), Some(user.id));
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod delegate;
mod results;

pub use delegate::Delegate;
pub use results::{AggregateResult, BatchPayload, GroupByRow};

use crate::db;
use crate::error::AppError;
use crate::migration::apply_migrations;
use crate::models::{
    Account, ErrorLog, GeneratedPhoto, Model, Order, PhotoRequest, Profile, Session, UploadedPhoto, User,
};
use crate::schema::{resolve_in_schema, FullConfig, ResolvedModel};
use crate::service::{Conn, CrudService};
use crate::settings::Settings;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

macro_rules! delegate_accessors {
    ($($name:ident => $model:ty),+ $(,)?) => {
        $(
            pub fn $name(&self) -> Delegate<'_, $model> {
                self.delegate::<$model>()
            }
        )+
    };
}

/// Pooled client. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Client {
    pool: PgPool,
    model: Arc<ResolvedModel>,
}

impl Client {
    /// Create the database if needed, open the pool, apply migrations when enabled, and resolve the schema.
    pub async fn connect(settings: &Settings) -> Result<Self, AppError> {
        db::ensure_database_exists(&settings.database_url).await?;
        let pool = db::connect_pool(settings).await?;
        let config = FullConfig::embedded()?;
        if settings.run_migrations {
            apply_migrations(&pool, &config, &settings.schema).await?;
        }
        let model = resolve_in_schema(&config, &settings.schema)?;
        tracing::info!(schema = %settings.schema, models = model.entities.len(), "client connected");
        Ok(Self::new(pool, model))
    }

    pub fn new(pool: PgPool, model: ResolvedModel) -> Self {
        Self {
            pool,
            model: Arc::new(model),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    /// Close the pool; waits for checked-out connections to be returned.
    pub async fn disconnect(&self) {
        self.pool.close().await;
        tracing::info!("client disconnected");
    }

    pub fn delegate<M: Model>(&self) -> Delegate<'_, M> {
        Delegate::new(Conn::Pool(&self.pool), &self.model)
    }

    delegate_accessors! {
        account => Account,
        session => Session,
        user => User,
        profile => Profile,
        order => Order,
        uploaded_photo => UploadedPhoto,
        generated_photo => GeneratedPhoto,
        photo_request => PhotoRequest,
        error_log => ErrorLog,
    }

    /// Begin a transaction. Delegates taken from the returned client run inside it.
    pub async fn transaction(&self) -> Result<TxClient, AppError> {
        let tx = self.pool.begin().await?;
        Ok(TxClient {
            tx: Mutex::new(tx),
            model: self.model.clone(),
        })
    }

    pub async fn query_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, AppError> {
        CrudService::query_raw(Conn::Pool(&self.pool), sql, params).await
    }

    pub async fn execute_raw(&self, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        CrudService::execute_raw(Conn::Pool(&self.pool), sql, params).await
    }
}

/// Client bound to one open transaction. Dropping it without `commit` rolls back.
///
/// A failed statement aborts the whole transaction; only `rollback` is useful after that.
pub struct TxClient {
    tx: Mutex<Transaction<'static, Postgres>>,
    model: Arc<ResolvedModel>,
}

impl TxClient {
    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn delegate<M: Model>(&self) -> Delegate<'_, M> {
        Delegate::new(Conn::Tx(&self.tx), &self.model)
    }

    delegate_accessors! {
        account => Account,
        session => Session,
        user => User,
        profile => Profile,
        order => Order,
        uploaded_photo => UploadedPhoto,
        generated_photo => GeneratedPhoto,
        photo_request => PhotoRequest,
        error_log => ErrorLog,
    }

    pub async fn query_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, AppError> {
        CrudService::query_raw(Conn::Tx(&self.tx), sql, params).await
    }

    pub async fn execute_raw(&self, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        CrudService::execute_raw(Conn::Tx(&self.tx), sql, params).await
    }

    pub async fn commit(self) -> Result<(), AppError> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), AppError> {
        self.tx.into_inner().rollback().await?;
        Ok(())
    }
}
