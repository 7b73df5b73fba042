//! Per-model operations with typed inputs and outputs.

use crate::client::results::{AggregateResult, BatchPayload, GroupByRow};
use crate::error::{AppError, ConfigError};
use crate::models::{Model, Patch};
use crate::schema::{ResolvedEntity, ResolvedModel};
use crate::service::{Conn, CrudService};
use crate::sql::{AggregateArgs, FindArgs, GroupByArgs, Unique, Where};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Operations for one model, bound to the pool or to an open transaction.
pub struct Delegate<'a, M> {
    conn: Conn<'a>,
    model: &'a ResolvedModel,
    _record: PhantomData<fn() -> M>,
}

impl<'a, M: Model> Delegate<'a, M> {
    pub(crate) fn new(conn: Conn<'a>, model: &'a ResolvedModel) -> Self {
        Self {
            conn,
            model,
            _record: PhantomData,
        }
    }

    fn entity(&self) -> Result<&'a ResolvedEntity, AppError> {
        self.model.entity(M::NAME).ok_or_else(|| {
            AppError::Config(ConfigError::MissingReference {
                kind: "model",
                id: M::NAME.to_string(),
            })
        })
    }

    pub async fn find_unique(&self, unique: Unique) -> Result<Option<M>, AppError> {
        self.find_unique_with(unique, &[]).await
    }

    /// `find_unique` with relations embedded (`&["orders", "profile"]`).
    pub async fn find_unique_with(&self, unique: Unique, include: &[&str]) -> Result<Option<M>, AppError> {
        let entity = self.entity()?;
        let include: Vec<String> = include.iter().map(|s| s.to_string()).collect();
        CrudService::find_unique(self.conn, self.model, entity, &unique, &include)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_unique_or_throw(&self, unique: Unique) -> Result<M, AppError> {
        self.find_unique(unique).await?.ok_or_else(not_found::<M>)
    }

    pub async fn find_first(&self, args: impl Into<FindArgs>) -> Result<Option<M>, AppError> {
        let entity = self.entity()?;
        CrudService::find_first(self.conn, self.model, entity, &args.into())
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn find_first_or_throw(&self, args: impl Into<FindArgs>) -> Result<M, AppError> {
        self.find_first(args).await?.ok_or_else(not_found::<M>)
    }

    pub async fn find_many(&self, args: impl Into<FindArgs>) -> Result<Vec<M>, AppError> {
        let entity = self.entity()?;
        CrudService::find_many(self.conn, self.model, entity, &args.into())
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn create(&self, data: M::Create) -> Result<M, AppError> {
        let entity = self.entity()?;
        let body = to_map(&data)?;
        decode(CrudService::create(self.conn, entity, &body).await?)
    }

    /// Insert all rows in one transaction; with `skip_duplicates`, conflicting rows are skipped and not counted.
    pub async fn create_many(&self, data: Vec<M::Create>, skip_duplicates: bool) -> Result<BatchPayload, AppError> {
        let entity = self.entity()?;
        let bodies = data.iter().map(to_map).collect::<Result<Vec<_>, _>>()?;
        let rows = CrudService::create_many(self.conn, entity, &bodies, skip_duplicates).await?;
        Ok(BatchPayload {
            count: rows.len() as u64,
        })
    }

    pub async fn update(&self, unique: Unique, data: Patch) -> Result<M, AppError> {
        let entity = self.entity()?;
        decode(CrudService::update(self.conn, self.model, entity, &unique, data.as_map()).await?)
    }

    pub async fn update_many(&self, filter: Where, data: Patch) -> Result<BatchPayload, AppError> {
        let entity = self.entity()?;
        let count = CrudService::update_many(self.conn, self.model, entity, &filter, data.as_map()).await?;
        Ok(BatchPayload { count })
    }

    pub async fn upsert(&self, unique: Unique, create: M::Create, update: Patch) -> Result<M, AppError> {
        let entity = self.entity()?;
        let create = to_map(&create)?;
        decode(CrudService::upsert(self.conn, self.model, entity, &unique, &create, update.as_map()).await?)
    }

    pub async fn delete(&self, unique: Unique) -> Result<M, AppError> {
        let entity = self.entity()?;
        decode(CrudService::delete(self.conn, self.model, entity, &unique).await?)
    }

    pub async fn delete_many(&self, filter: Where) -> Result<BatchPayload, AppError> {
        let entity = self.entity()?;
        let count = CrudService::delete_many(self.conn, self.model, entity, &filter).await?;
        Ok(BatchPayload { count })
    }

    pub async fn count(&self, filter: Where) -> Result<i64, AppError> {
        let entity = self.entity()?;
        CrudService::count(self.conn, self.model, entity, &filter).await
    }

    pub async fn aggregate(&self, args: AggregateArgs) -> Result<AggregateResult, AppError> {
        let entity = self.entity()?;
        let row = CrudService::aggregate(self.conn, self.model, entity, &args).await?;
        Ok(AggregateResult::from_row(row).0)
    }

    pub async fn group_by(&self, args: GroupByArgs) -> Result<Vec<GroupByRow>, AppError> {
        let entity = self.entity()?;
        let rows = CrudService::group_by(self.conn, self.model, entity, &args).await?;
        Ok(rows.into_iter().map(GroupByRow::from_row).collect())
    }
}

fn not_found<M: Model>() -> AppError {
    AppError::NotFound(format!("no {} record found", M::NAME))
}

fn to_map<T: Serialize>(data: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Validation("create data must serialize to an object".into())),
        Err(e) => Err(AppError::Validation(e.to_string())),
    }
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, AppError> {
    serde_json::from_value(row).map_err(|e| AppError::Db(sqlx::Error::Decode(Box::new(e))))
}
