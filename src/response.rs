//! Response envelope and row presentation for the REST layer.

use crate::case::value_keys_to_camel_case_recursive;
use crate::schema::{ResolvedEntity, ResolvedModel};
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

/// Drop sensitive columns (also inside included relations) and camelCase every key.
pub fn present(model: &ResolvedModel, entity: &ResolvedEntity, mut row: Value) -> Value {
    strip_sensitive(model, entity, &mut row);
    value_keys_to_camel_case_recursive(&mut row);
    row
}

fn strip_sensitive(model: &ResolvedModel, entity: &ResolvedEntity, row: &mut Value) {
    let Value::Object(obj) = row else {
        return;
    };
    obj.retain(|k, _| !entity.sensitive_columns.contains(k));
    for inc in &entity.includes {
        let (Some(nested), Some(related)) = (obj.get_mut(&inc.name), model.entity(&inc.related_model)) else {
            continue;
        };
        match nested {
            Value::Array(items) => items.iter_mut().for_each(|i| strip_sensitive(model, related, i)),
            other => strip_sensitive(model, related, other),
        }
    }
}

pub fn one(status: StatusCode, model: &ResolvedModel, entity: &ResolvedEntity, row: Value) -> (StatusCode, Json<SuccessOne<Value>>) {
    (
        status,
        Json(SuccessOne {
            data: present(model, entity, row),
            meta: None,
        }),
    )
}

pub fn many(status: StatusCode, model: &ResolvedModel, entity: &ResolvedEntity, rows: Vec<Value>) -> (StatusCode, Json<SuccessMany<Value>>) {
    let data: Vec<Value> = rows.into_iter().map(|r| present(model, entity, r)).collect();
    let count = data.len() as u64;
    (status, Json(SuccessMany { data, meta: MetaCount { count } }))
}
