//! Entity handlers: list, count, create, bulk create, read, update, delete.

use crate::case::{object_keys_to_snake_case, to_snake_case};
use crate::error::{AppError, ConfigError};
use crate::response;
use crate::schema::{ColumnKind, ResolvedEntity, ResolvedModel};
use crate::service::{Conn, CrudService, BULK_LIMIT};
use crate::sql::{FindArgs, OrderBy, SortOrder, Unique, Where};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const DEFAULT_TAKE: i64 = 100;
const MAX_TAKE: i64 = 1000;

fn entity_for<'m>(model: &'m ResolvedModel, path_segment: &str, op: &str) -> Result<&'m ResolvedEntity, AppError> {
    let entity = model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("no resource '{}'", path_segment)))?;
    if !entity.allows(op) {
        tracing::warn!(resource = %path_segment, op, "operation not allowed");
        return Err(AppError::BadRequest(format!("{} not allowed on {}", op, path_segment)));
    }
    Ok(entity)
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(mut m) => {
            object_keys_to_snake_case(&mut m);
            Ok(m)
        }
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Query-string value typed by the column so `?imagesProcessed=true` compares as a boolean.
fn query_value_for_column(entity: &ResolvedEntity, col: &str, s: &str) -> Value {
    let kind = entity.column(col).map(|c| c.kind);
    match kind {
        Some(ColumnKind::Int | ColumnKind::BigInt) => s.parse::<i64>().map(Value::from).unwrap_or_else(|_| s.into()),
        Some(ColumnKind::Bool) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Some(ColumnKind::Bool) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ if s == "null" => Value::Null,
        _ => Value::String(s.to_string()),
    }
}

fn parse_json_param(name: &str, raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw).map_err(|e| AppError::BadRequest(format!("{} is not valid JSON: {}", name, e)))
}

/// `orderBy=createdAt:desc,id` or the JSON form `orderBy=[{"createdAt":"desc"}]`.
fn parse_order_by(raw: &str) -> Result<Vec<OrderBy>, AppError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return OrderBy::from_json(&parse_json_param("orderBy", raw)?);
    }
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|part| {
            let (col, dir) = part.split_once(':').unwrap_or((part, "asc"));
            let order = match dir {
                "asc" => SortOrder::Asc,
                "desc" => SortOrder::Desc,
                other => return Err(AppError::BadRequest(format!("invalid sort direction '{}'", other))),
            };
            Ok(OrderBy {
                column: to_snake_case(col),
                order,
            })
        })
        .collect()
}

fn parse_include(raw: &str) -> Vec<String> {
    raw.split(',').filter(|s| !s.is_empty()).map(to_snake_case).collect()
}

fn parse_count(name: &str, raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .ok_or_else(|| AppError::BadRequest(format!("{} must be a non-negative integer", name)))
}

fn check_not_sensitive(entity: &ResolvedEntity, column: &str) -> Result<(), AppError> {
    if entity.sensitive_columns.contains(column) {
        tracing::warn!(model = %entity.model, column, "sensitive column in query");
        return Err(AppError::BadRequest(format!(
            "{} cannot be used to filter or sort {}",
            column, entity.model
        )));
    }
    Ok(())
}

/// Sensitive columns never leave the API, so they cannot be matched or sorted on either,
/// including through relation filters.
fn reject_sensitive(model: &ResolvedModel, entity: &ResolvedEntity, w: &Where) -> Result<(), AppError> {
    match w {
        Where::Field { column, .. } => check_not_sensitive(entity, column),
        Where::And(parts) | Where::Or(parts) => parts.iter().try_for_each(|p| reject_sensitive(model, entity, p)),
        Where::Not(inner) => reject_sensitive(model, entity, inner),
        Where::Relation { name, filter, .. } => {
            let spec = entity.include(name).ok_or_else(|| {
                AppError::Validation(format!("unknown relation '{}' on {}", name, entity.model))
            })?;
            let related = model.entity(&spec.related_model).ok_or_else(|| {
                AppError::Config(ConfigError::MissingReference {
                    kind: "model",
                    id: spec.related_model.clone(),
                })
            })?;
            reject_sensitive(model, related, filter)
        }
    }
}

/// Build find arguments from the query string. Unknown keys are rejected.
fn find_args_from_query(
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    params: HashMap<String, String>,
) -> Result<FindArgs, AppError> {
    let mut args = FindArgs::new();
    let mut parts = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "take" | "limit" => args.take = Some(parse_count(&k, &v)?.min(MAX_TAKE)),
            "skip" | "offset" => args.skip = Some(parse_count(&k, &v)?),
            "where" => parts.push(Where::from_json(model, entity, &parse_json_param("where", &v)?)?),
            "orderBy" => args.order_by = parse_order_by(&v)?,
            "include" => args.include = parse_include(&v),
            _ => {
                let col = to_snake_case(&k);
                if !entity.has_column(&col) {
                    return Err(AppError::BadRequest(format!("unknown query parameter '{}'", k)));
                }
                let val = query_value_for_column(entity, &col, &v);
                parts.push(Where::eq(col, val));
            }
        }
    }
    args.where_ = match parts.len() {
        0 => Where::all(),
        1 => parts.remove(0),
        _ => Where::And(parts),
    };
    reject_sensitive(model, entity, &args.where_)?;
    for o in &args.order_by {
        check_not_sensitive(entity, &o.column)?;
    }
    Ok(args)
}

/// Count takes filters only; paging, ordering and include keys are refused.
fn count_filter_from_query(
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    params: HashMap<String, String>,
) -> Result<Where, AppError> {
    const NOT_FOR_COUNT: [&str; 6] = ["take", "limit", "skip", "offset", "orderBy", "include"];
    if let Some(k) = params.keys().find(|k| NOT_FOR_COUNT.contains(&k.as_str())) {
        return Err(AppError::BadRequest(format!("count does not accept '{}'", k)));
    }
    Ok(find_args_from_query(model, entity, params)?.where_)
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "read")?;
    let mut args = find_args_from_query(model, entity, params)?;
    args.take.get_or_insert(DEFAULT_TAKE);
    let rows = CrudService::find_many(Conn::Pool(&state.pool), model, entity, &args).await?;
    Ok(response::many(StatusCode::OK, model, entity, rows))
}

pub async fn count(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "read")?;
    let filter = count_filter_from_query(model, entity, params)?;
    let n = CrudService::count(Conn::Pool(&state.pool), model, entity, &filter).await?;
    Ok(Json(response::SuccessOne {
        data: json!({ "count": n }),
        meta: None,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "create")?;
    let body = body_to_map(body)?;
    let row = CrudService::create(Conn::Pool(&state.pool), entity, &body).await?;
    Ok(response::one(StatusCode::CREATED, model, entity, row))
}

/// Body is an array of objects; `?skipDuplicates=true` drops rows that hit a unique constraint.
pub async fn bulk_create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "bulk_create")?;
    let items = match body {
        Value::Array(arr) => arr.into_iter().map(body_to_map).collect::<Result<Vec<_>, _>>()?,
        _ => return Err(AppError::BadRequest("body must be a JSON array".into())),
    };
    if items.len() > BULK_LIMIT {
        return Err(AppError::BadRequest(format!("bulk create limited to {} items", BULK_LIMIT)));
    }
    let skip_duplicates = params.get("skipDuplicates").map_or(false, |v| v == "true");
    let rows = CrudService::create_many(Conn::Pool(&state.pool), entity, &items, skip_duplicates).await?;
    Ok(response::many(StatusCode::CREATED, model, entity, rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "read")?;
    let include = params.get("include").map(|s| parse_include(s)).unwrap_or_default();
    let row = CrudService::find_unique(Conn::Pool(&state.pool), model, entity, &Unique::id(id.clone()), &include)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} '{}'", entity.model, id)))?;
    Ok(response::one(StatusCode::OK, model, entity, row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "update")?;
    let body = body_to_map(body)?;
    let row = CrudService::update(Conn::Pool(&state.pool), model, entity, &Unique::id(id), &body).await?;
    Ok(response::one(StatusCode::OK, model, entity, row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let model = &state.model;
    let entity = entity_for(model, &path_segment, "delete")?;
    CrudService::delete(Conn::Pool(&state.pool), model, entity, &Unique::id(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve, FullConfig};

    fn model() -> ResolvedModel {
        resolve(&FullConfig::embedded().unwrap()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn query_string_becomes_typed_filters() {
        let m = model();
        let order = m.entity("order").unwrap();
        let args = find_args_from_query(
            &m,
            order,
            params(&[("imagesProcessed", "true"), ("take", "5000"), ("orderBy", "createdAt:desc")]),
        )
        .unwrap();
        assert_eq!(args.where_, Where::eq("images_processed", true));
        assert_eq!(args.take, Some(MAX_TAKE));
        assert_eq!(args.order_by, vec![OrderBy::desc("created_at")]);
    }

    #[test]
    fn where_json_and_columns_combine() {
        let m = model();
        let order = m.entity("order").unwrap();
        let args = find_args_from_query(
            &m,
            order,
            params(&[("userId", "u1"), ("where", r#"{"paymentStatus":{"in":["PAID","REFUNDED"]}}"#)]),
        )
        .unwrap();
        let Where::And(parts) = &args.where_ else { panic!("expected AND") };
        assert_eq!(parts.len(), 2);
        assert!(parts.contains(&Where::eq("user_id", "u1")));
    }

    #[test]
    fn unknown_query_parameter_is_rejected() {
        let m = model();
        let err = find_args_from_query(&m, m.entity("user").unwrap(), params(&[("nickname", "x")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(find_args_from_query(&m, m.entity("user").unwrap(), params(&[("skip", "-1")])).is_err());
    }

    #[test]
    fn sensitive_columns_cannot_be_filtered_or_sorted() {
        let m = model();
        let user = m.entity("user").unwrap();
        for query in [
            params(&[("where", r#"{"password":{"startsWith":"$2b$10$s"}}"#)]),
            params(&[("where", r#"{"OR":[{"email":"a@x.io"},{"NOT":{"resetToken":{"contains":"a"}}}]}"#)]),
            params(&[("resetToken", "abc")]),
            params(&[("orderBy", "password")]),
            params(&[("orderBy", r#"[{"resetTokenExpiry":"desc"}]"#)]),
            params(&[("where", r#"{"sessions":{"some":{"sessionToken":{"contains":"a"}}}}"#)]),
        ] {
            let err = find_args_from_query(&m, user, query.clone()).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{query:?}: {err:?}");
        }

        let order = m.entity("order").unwrap();
        let err = find_args_from_query(
            &m,
            order,
            params(&[("where", r#"{"user":{"is":{"password":{"startsWith":"$"}}}}"#)]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "{err:?}");

        find_args_from_query(&m, user, params(&[("where", r#"{"email":{"startsWith":"a"}}"#), ("orderBy", "email")]))
            .unwrap();
    }

    #[test]
    fn count_accepts_filters_only() {
        let m = model();
        let order = m.entity("order").unwrap();
        let filter = count_filter_from_query(&m, order, params(&[("userId", "u1")])).unwrap();
        assert_eq!(filter, Where::eq("user_id", "u1"));
        for key in ["take", "skip", "limit", "offset", "include", "orderBy"] {
            let err = count_filter_from_query(&m, order, params(&[(key, "1")])).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{key}: {err:?}");
        }
    }

    #[test]
    fn include_and_json_order_by_parse() {
        assert_eq!(parse_include("uploadedPhotos,user"), vec!["uploaded_photos", "user"]);
        assert_eq!(
            parse_order_by(r#"[{"totalAmount":"desc"}]"#).unwrap(),
            vec![OrderBy::desc("total_amount")]
        );
        assert!(parse_order_by("id:sideways").is_err());
    }

    #[test]
    fn disallowed_operation_is_rejected() {
        let m = model();
        assert!(entity_for(&m, "accounts", "create").is_err());
        assert!(entity_for(&m, "nope", "read").unwrap_err().is_not_found());
        assert_eq!(entity_for(&m, "orders", "update").unwrap().model, "order");
    }
}
