//! Delegate operations executed against PostgreSQL. Rows come back as JSON objects keyed by column.

use crate::error::AppError;
use crate::schema::{ResolvedEntity, ResolvedModel};
use crate::service::conn::{fetch_one_on, fetch_optional_on, Conn};
use crate::service::validation::RequestValidator;
use crate::sql::{self, AggregateArgs, FindArgs, GroupByArgs, QueryBuf, Unique, Where};
use serde_json::{Map, Value};
use sqlx::PgConnection;

/// Most items accepted by one bulk request over HTTP.
pub const BULK_LIMIT: usize = 100;

pub struct CrudService;

impl CrudService {
    pub async fn find_many(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        args: &FindArgs,
    ) -> Result<Vec<Value>, AppError> {
        let q = sql::select_many(model, entity, args)?;
        conn.fetch_all(&q).await
    }

    pub async fn find_first(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        args: &FindArgs,
    ) -> Result<Option<Value>, AppError> {
        let mut args = args.clone();
        args.take = Some(1);
        let q = sql::select_many(model, entity, &args)?;
        conn.fetch_optional(&q).await
    }

    pub async fn find_unique(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        unique: &Unique,
        include: &[String],
    ) -> Result<Option<Value>, AppError> {
        let args = FindArgs {
            where_: unique.to_where(entity)?,
            include: include.to_vec(),
            take: Some(1),
            ..FindArgs::default()
        };
        let q = sql::select_many(model, entity, &args)?;
        conn.fetch_optional(&q).await
    }

    pub async fn create(
        conn: Conn<'_>,
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        RequestValidator::validate_create(entity, body)?;
        let q = sql::insert(entity, body, false)?;
        conn.fetch_optional(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Insert all rows atomically. With `skip_duplicates`, rows hitting a unique
    /// constraint are dropped; the returned rows are the ones actually inserted.
    pub async fn create_many(
        conn: Conn<'_>,
        entity: &ResolvedEntity,
        items: &[Map<String, Value>],
        skip_duplicates: bool,
    ) -> Result<Vec<Value>, AppError> {
        for body in items {
            RequestValidator::validate_create(entity, body)?;
        }
        let queries = items
            .iter()
            .map(|body| sql::insert(entity, body, skip_duplicates))
            .collect::<Result<Vec<_>, _>>()?;
        match conn {
            Conn::Pool(pool) => {
                let mut tx = pool.begin().await?;
                let out = insert_all(&mut tx, &queries).await?;
                tx.commit().await?;
                Ok(out)
            }
            Conn::Tx(tx) => {
                let mut guard = tx.lock().await;
                insert_all(&mut guard, &queries).await
            }
        }
    }

    /// Update the row identified by `unique`; not-found when it does not exist.
    pub async fn update(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        unique: &Unique,
        data: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        RequestValidator::validate_update(entity, data)?;
        let filter = unique.to_where(entity)?;
        let q = sql::update(model, entity, &filter, data, true)?;
        conn.fetch_optional(&q)
            .await?
            .ok_or_else(|| not_found(entity, "update"))
    }

    pub async fn update_many(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        filter: &Where,
        data: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        RequestValidator::validate_update(entity, data)?;
        let q = sql::update(model, entity, filter, data, false)?;
        conn.execute(&q).await
    }

    /// Update the row identified by `unique`, or insert `create` when there is none.
    ///
    /// When `create` carries the same unique values this is one `INSERT .. ON CONFLICT`;
    /// otherwise the row is locked with `SELECT .. FOR UPDATE` and written in the same transaction.
    pub async fn upsert(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        unique: &Unique,
        create: &Map<String, Value>,
        update: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        RequestValidator::validate_create(entity, create)?;
        RequestValidator::validate_update(entity, update)?;
        let filter = unique.to_where(entity)?;
        let carries_key = unique.fields.iter().all(|(c, v)| create.get(c) == Some(v));
        if carries_key {
            let conflict: Vec<String> = unique.columns().into_iter().map(String::from).collect();
            let q = sql::upsert(entity, &conflict, create, update)?;
            return conn
                .fetch_optional(&q)
                .await?
                .ok_or(AppError::Db(sqlx::Error::RowNotFound));
        }
        match conn {
            Conn::Pool(pool) => {
                let mut tx = pool.begin().await?;
                let out = locked_upsert(&mut tx, model, entity, &filter, create, update).await?;
                tx.commit().await?;
                Ok(out)
            }
            Conn::Tx(tx) => {
                let mut guard = tx.lock().await;
                locked_upsert(&mut guard, model, entity, &filter, create, update).await
            }
        }
    }

    /// Delete the row identified by `unique` and return it; not-found when it does not exist.
    pub async fn delete(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        unique: &Unique,
    ) -> Result<Value, AppError> {
        let filter = unique.to_where(entity)?;
        let q = sql::delete(model, entity, &filter, true)?;
        conn.fetch_optional(&q)
            .await?
            .ok_or_else(|| not_found(entity, "delete"))
    }

    pub async fn delete_many(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        filter: &Where,
    ) -> Result<u64, AppError> {
        let q = sql::delete(model, entity, filter, false)?;
        conn.execute(&q).await
    }

    pub async fn count(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        filter: &Where,
    ) -> Result<i64, AppError> {
        let q = sql::count(model, entity, filter)?;
        let row = conn.fetch_optional(&q).await?;
        Ok(row
            .as_ref()
            .and_then(|r| r.get("_count"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    /// One row with `_count`, `_sum.<col>`, `_avg.<col>`, `_min.<col>`, `_max.<col>` keys.
    pub async fn aggregate(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        args: &AggregateArgs,
    ) -> Result<Value, AppError> {
        let q = sql::aggregate(model, entity, args)?;
        conn.fetch_optional(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    pub async fn group_by(
        conn: Conn<'_>,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        args: &GroupByArgs,
    ) -> Result<Vec<Value>, AppError> {
        let q = sql::group_by(model, entity, args)?;
        conn.fetch_all(&q).await
    }

    /// Caller-written SQL with `$n` placeholders; values are bound, never interpolated.
    pub async fn query_raw(conn: Conn<'_>, sql: &str, params: &[Value]) -> Result<Vec<Value>, AppError> {
        conn.fetch_all(&raw(sql, params)).await
    }

    pub async fn execute_raw(conn: Conn<'_>, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        conn.execute(&raw(sql, params)).await
    }
}

fn raw(sql: &str, params: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = sql.to_string();
    for p in params {
        q.push_param(p.clone());
    }
    q
}

fn not_found(entity: &ResolvedEntity, op: &str) -> AppError {
    AppError::NotFound(format!("no {} record found to {}", entity.model, op))
}

async fn insert_all(c: &mut PgConnection, queries: &[QueryBuf]) -> Result<Vec<Value>, AppError> {
    let mut out = Vec::with_capacity(queries.len());
    for q in queries {
        if let Some(row) = fetch_optional_on(c, q).await? {
            out.push(row);
        }
    }
    Ok(out)
}

async fn locked_upsert(
    c: &mut PgConnection,
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    filter: &Where,
    create: &Map<String, Value>,
    update: &Map<String, Value>,
) -> Result<Value, AppError> {
    let lock = sql::select_for_update(model, entity, filter)?;
    match fetch_optional_on(c, &lock).await? {
        Some(existing) => {
            let by_pk = Where::And(
                entity
                    .pk_columns
                    .iter()
                    .map(|pk| Where::eq(pk.clone(), existing.get(pk).cloned().unwrap_or(Value::Null)))
                    .collect(),
            );
            tracing::debug!(model = %entity.model, "upsert: updating existing row");
            fetch_one_on(c, &sql::update(model, entity, &by_pk, update, true)?).await
        }
        None => {
            tracing::debug!(model = %entity.model, "upsert: inserting");
            fetch_one_on(c, &sql::insert(entity, create, false)?).await
        }
    }
}
