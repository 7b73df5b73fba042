//! Where statements run: the shared pool, or one open transaction.

use crate::error::AppError;
use crate::sql::{PgBindValue, QueryBuf};
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgConnection, PgPool, Postgres, Row, Transaction, TypeInfo};
use tokio::sync::Mutex;

/// Statement target. Transactions sit behind a mutex so delegates can share them by reference.
#[derive(Clone, Copy)]
pub enum Conn<'a> {
    Pool(&'a PgPool),
    Tx(&'a Mutex<Transaction<'static, Postgres>>),
}

pub(crate) fn bind(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from(p));
    }
    query
}

fn log(q: &QueryBuf, in_tx: bool) {
    tracing::debug!(sql = %q.sql, params = ?q.params, in_tx, "query");
}

impl<'a> Conn<'a> {
    pub fn in_transaction(&self) -> bool {
        matches!(self, Conn::Tx(_))
    }

    pub async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        log(q, self.in_transaction());
        let rows = match self {
            Conn::Pool(pool) => bind(q).fetch_all(*pool).await?,
            Conn::Tx(tx) => {
                let mut guard = tx.lock().await;
                bind(q).fetch_all(&mut **guard).await?
            }
        };
        rows.iter().map(row_to_json).collect()
    }

    pub async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        log(q, self.in_transaction());
        let row = match self {
            Conn::Pool(pool) => bind(q).fetch_optional(*pool).await?,
            Conn::Tx(tx) => {
                let mut guard = tx.lock().await;
                bind(q).fetch_optional(&mut **guard).await?
            }
        };
        row.as_ref().map(row_to_json).transpose()
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        log(q, self.in_transaction());
        let result = match self {
            Conn::Pool(pool) => bind(q).execute(*pool).await?,
            Conn::Tx(tx) => {
                let mut guard = tx.lock().await;
                bind(q).execute(&mut **guard).await?
            }
        };
        Ok(result.rows_affected())
    }
}

pub(crate) async fn fetch_optional_on(c: &mut PgConnection, q: &QueryBuf) -> Result<Option<Value>, AppError> {
    log(q, true);
    let row = bind(q).fetch_optional(&mut *c).await?;
    row.as_ref().map(row_to_json).transpose()
}

pub(crate) async fn fetch_one_on(c: &mut PgConnection, q: &QueryBuf) -> Result<Value, AppError> {
    fetch_optional_on(c, q)
        .await?
        .ok_or(AppError::Db(sqlx::Error::RowNotFound))
}

/// Decode a row into a JSON object keyed by column name.
pub(crate) fn row_to_json(row: &PgRow) -> Result<Value, AppError> {
    let mut map = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        let v = cell_to_value(row, idx, col.type_info().name())?;
        map.insert(col.name().to_string(), v);
    }
    Ok(Value::Object(map))
}

fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let v = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .and_then(|n| serde_json::Number::from_f64(n as f64))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        // exact digits, never through f64
        "NUMERIC" => row
            .try_get::<Option<rust_decimal::Decimal>, _>(idx)?
            .map(|d| Value::String(d.to_string())),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, false))),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?,
        // text, varchar, name and enum labels all arrive as UTF-8
        _ => row.try_get_unchecked::<Option<String>, _>(idx)?.map(Value::String),
    };
    Ok(v.unwrap_or(Value::Null))
}
