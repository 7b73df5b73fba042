//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and aggregate statements from a resolved entity.

use crate::error::AppError;
use crate::schema::{quote_ident, ColumnInfo, ColumnKind, IncludeDirection, ResolvedEntity, ResolvedModel};
use crate::sql::args::{AggregateArgs, FindArgs, GroupByArgs};
use crate::sql::filter::{OrderBy, SortOrder, Where};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Alias of the statement's main table.
pub const MAIN_ALIAS: &str = "t0";

fn quoted(s: &str) -> String {
    quote_ident(s)
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
    aliases: u32,
}

impl QueryBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_param(&mut self, v: Value) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }

    /// Push a parameter and return its placeholder cast to `pg_type`.
    pub fn placeholder(&mut self, v: Value, pg_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, pg_type)
    }

    /// Fresh alias for a subquery table (`t1`, `t2`, ...).
    pub fn next_alias(&mut self) -> String {
        self.aliases += 1;
        format!("t{}", self.aliases)
    }
}

fn column_expr(c: &ColumnInfo, alias: &str) -> String {
    let q = quoted(&c.name);
    if c.kind.select_as_text() {
        format!("{}.{}::text AS {}", alias, q, q)
    } else {
        format!("{}.{}", alias, q)
    }
}

/// SELECT list: each column as-is, except enums and numerics as text so decoding keeps them exact.
pub fn select_column_list(entity: &ResolvedEntity, alias: &str) -> String {
    entity
        .columns
        .iter()
        .map(|c| column_expr(c, alias))
        .collect::<Vec<_>>()
        .join(", ")
}

fn require_column<'e>(entity: &'e ResolvedEntity, name: &str) -> Result<&'e ColumnInfo, AppError> {
    entity
        .column(name)
        .ok_or_else(|| AppError::Validation(format!("unknown column '{}' on {}", name, entity.model)))
}

fn where_clause(model: &ResolvedModel, entity: &ResolvedEntity, filter: &Where, q: &mut QueryBuf) -> Result<String, AppError> {
    if filter.is_all() {
        return Ok(String::new());
    }
    Ok(format!(" WHERE {}", filter.render(model, entity, MAIN_ALIAS, q)?))
}

fn order_clause(entity: &ResolvedEntity, order_by: &[OrderBy]) -> Result<String, AppError> {
    let mut parts = Vec::with_capacity(order_by.len() + 1);
    let mut seen = HashSet::new();
    for o in order_by {
        require_column(entity, &o.column)?;
        seen.insert(o.column.as_str());
        parts.push(format!("{}.{} {}", MAIN_ALIAS, quoted(&o.column), direction(o.order)));
    }
    // primary key as tie-breaker keeps pagination stable
    for pk in &entity.pk_columns {
        if !seen.contains(pk.as_str()) {
            parts.push(format!("{}.{} ASC", MAIN_ALIAS, quoted(pk)));
        }
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

fn pagination(take: Option<i64>, skip: Option<i64>) -> Result<String, AppError> {
    let mut out = String::new();
    if let Some(n) = take {
        if n < 0 {
            return Err(AppError::Validation("take must not be negative".into()));
        }
        out.push_str(&format!(" LIMIT {}", n));
    }
    if let Some(n) = skip {
        if n < 0 {
            return Err(AppError::Validation("skip must not be negative".into()));
        }
        out.push_str(&format!(" OFFSET {}", n));
    }
    Ok(out)
}

/// Correlated subquery returning the related row (to-one) or a JSON array (to-many).
fn include_subquery(model: &ResolvedModel, entity: &ResolvedEntity, name: &str, q: &mut QueryBuf) -> Result<String, AppError> {
    let inc = entity
        .include(name)
        .ok_or_else(|| AppError::Validation(format!("unknown include '{}' on {}", name, entity.model)))?;
    let related = model.entity(&inc.related_model).ok_or_else(|| {
        AppError::Config(crate::error::ConfigError::MissingReference {
            kind: "model",
            id: inc.related_model.clone(),
        })
    })?;
    let sub = q.next_alias();
    let rel_cols = select_column_list(related, &sub);
    let sub_from = format!(
        "{} AS {} WHERE {}.{} = {}.{}",
        related.qualified_table(),
        sub,
        sub,
        quoted(&inc.their_key_column),
        MAIN_ALIAS,
        quoted(&inc.our_key_column)
    );
    let pk = quoted(related.pk());
    Ok(match inc.direction {
        IncludeDirection::ToOne => format!(
            "(SELECT row_to_json(sub) FROM (SELECT {} FROM {} LIMIT 1) sub) AS {}",
            rel_cols,
            sub_from,
            quoted(name)
        ),
        IncludeDirection::ToMany => format!(
            "(SELECT COALESCE(json_agg(row_to_json(sub) ORDER BY sub.{}), '[]'::json) FROM (SELECT {} FROM {}) sub) AS {}",
            pk,
            rel_cols,
            sub_from,
            quoted(name)
        ),
    })
}

/// SELECT with filter, ordering, pagination and includes (one scalar subquery per include).
pub fn select_many(model: &ResolvedModel, entity: &ResolvedEntity, args: &FindArgs) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let mut select_parts = vec![select_column_list(entity, MAIN_ALIAS)];
    for name in &args.include {
        select_parts.push(include_subquery(model, entity, name, &mut q)?);
    }
    let where_sql = where_clause(model, entity, &args.where_, &mut q)?;
    q.sql = format!(
        "SELECT {} FROM {} AS {}{}{}{}",
        select_parts.join(", "),
        entity.qualified_table(),
        MAIN_ALIAS,
        where_sql,
        order_clause(entity, &args.order_by)?,
        pagination(args.take, args.skip)?
    );
    Ok(q)
}

/// Lock the first matching row for the rest of the transaction; returns its primary key.
pub fn select_for_update(model: &ResolvedModel, entity: &ResolvedEntity, filter: &Where) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, entity, filter, &mut q)?;
    let pk_cols = entity
        .pk_columns
        .iter()
        .map(|c| format!("{}.{}", MAIN_ALIAS, quoted(c)))
        .collect::<Vec<_>>()
        .join(", ");
    q.sql = format!(
        "SELECT {} FROM {} AS {}{} LIMIT 1 FOR UPDATE",
        pk_cols,
        entity.qualified_table(),
        MAIN_ALIAS,
        where_sql
    );
    Ok(q)
}

pub fn count(model: &ResolvedModel, entity: &ResolvedEntity, filter: &Where) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, entity, filter, &mut q)?;
    q.sql = format!(
        "SELECT COUNT(*) AS \"_count\" FROM {} AS {}{}",
        entity.qualified_table(),
        MAIN_ALIAS,
        where_sql
    );
    Ok(q)
}

/// Select expressions for the requested aggregates, aliased `_count` and `_sum.<column>` etc.
fn aggregate_selects(entity: &ResolvedEntity, args: &AggregateArgs) -> Result<Vec<String>, AppError> {
    let mut out = Vec::new();
    if args.count {
        out.push("COUNT(*) AS \"_count\"".to_string());
    }
    for name in &args.sum {
        let c = numeric_column(entity, name, "_sum")?;
        let cast = match c.kind {
            ColumnKind::Decimal | ColumnKind::BigInt => "::text",
            _ => "",
        };
        out.push(format!("SUM({}.{}){} AS {}", MAIN_ALIAS, quoted(name), cast, quoted(&format!("_sum.{}", name))));
    }
    for name in &args.avg {
        let c = numeric_column(entity, name, "_avg")?;
        let cast = if c.kind == ColumnKind::Decimal { "::text" } else { "::float8" };
        out.push(format!("AVG({}.{}){} AS {}", MAIN_ALIAS, quoted(name), cast, quoted(&format!("_avg.{}", name))));
    }
    for (func, key, names) in [("MIN", "_min", &args.min), ("MAX", "_max", &args.max)] {
        for name in names {
            let c = require_column(entity, name)?;
            if matches!(c.kind, ColumnKind::Bool | ColumnKind::Json) {
                return Err(AppError::Validation(format!("{} is not supported on {}", key, name)));
            }
            let cast = if c.kind.select_as_text() { "::text" } else { "" };
            out.push(format!(
                "{}({}.{}){} AS {}",
                func,
                MAIN_ALIAS,
                quoted(name),
                cast,
                quoted(&format!("{}.{}", key, name))
            ));
        }
    }
    Ok(out)
}

fn numeric_column<'e>(entity: &'e ResolvedEntity, name: &str, op: &str) -> Result<&'e ColumnInfo, AppError> {
    let c = require_column(entity, name)?;
    if !c.kind.is_numeric() {
        return Err(AppError::Validation(format!("{} requires a numeric column, got {}", op, name)));
    }
    Ok(c)
}

pub fn aggregate(model: &ResolvedModel, entity: &ResolvedEntity, args: &AggregateArgs) -> Result<QueryBuf, AppError> {
    let selects = aggregate_selects(entity, args)?;
    if selects.is_empty() {
        return Err(AppError::Validation("aggregate needs at least one of count/sum/avg/min/max".into()));
    }
    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, entity, &args.where_, &mut q)?;
    q.sql = format!(
        "SELECT {} FROM {} AS {}{}",
        selects.join(", "),
        entity.qualified_table(),
        MAIN_ALIAS,
        where_sql
    );
    Ok(q)
}

pub fn group_by(model: &ResolvedModel, entity: &ResolvedEntity, args: &GroupByArgs) -> Result<QueryBuf, AppError> {
    if args.by.is_empty() {
        return Err(AppError::Validation("group_by needs at least one column".into()));
    }
    let mut by_exprs = Vec::with_capacity(args.by.len());
    let mut select_parts = Vec::with_capacity(args.by.len());
    for name in &args.by {
        let c = require_column(entity, name)?;
        by_exprs.push(format!("{}.{}", MAIN_ALIAS, quoted(name)));
        select_parts.push(column_expr(c, MAIN_ALIAS));
    }
    select_parts.extend(aggregate_selects(entity, &args.aggregate)?);

    let mut order_parts = Vec::new();
    for o in &args.order_by {
        if !args.by.contains(&o.column) {
            return Err(AppError::Validation(format!(
                "group_by can only order by grouped columns, got {}",
                o.column
            )));
        }
        order_parts.push(format!("{}.{} {}", MAIN_ALIAS, quoted(&o.column), direction(o.order)));
    }
    if order_parts.is_empty() {
        order_parts = by_exprs.iter().map(|e| format!("{} ASC", e)).collect();
    }

    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, entity, &args.aggregate.where_, &mut q)?;
    q.sql = format!(
        "SELECT {} FROM {} AS {}{} GROUP BY {} ORDER BY {}{}",
        select_parts.join(", "),
        entity.qualified_table(),
        MAIN_ALIAS,
        where_sql,
        by_exprs.join(", "),
        order_parts.join(", "),
        pagination(args.take, args.skip)?
    );
    Ok(q)
}

fn values_for(entity: &ResolvedEntity, body: &Map<String, Value>, q: &mut QueryBuf) -> Result<(Vec<String>, Vec<String>), AppError> {
    for key in body.keys() {
        require_column(entity, key)?;
    }
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        if let Some(v) = body.get(&c.name) {
            cols.push(quoted(&c.name));
            placeholders.push(q.placeholder(v.clone(), &c.pg_type));
        }
    }
    Ok((cols, placeholders))
}

fn insert_head(entity: &ResolvedEntity, body: &Map<String, Value>, q: &mut QueryBuf) -> Result<String, AppError> {
    let (cols, placeholders) = values_for(entity, body, q)?;
    let table = format!("{} AS {}", entity.qualified_table(), MAIN_ALIAS);
    Ok(if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", ")
        )
    })
}

/// INSERT one row. Columns absent from `body` take their database default.
/// With `skip_duplicates`, a row hitting any unique constraint is silently dropped.
pub fn insert(entity: &ResolvedEntity, body: &Map<String, Value>, skip_duplicates: bool) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let head = insert_head(entity, body, &mut q)?;
    let conflict = if skip_duplicates { " ON CONFLICT DO NOTHING" } else { "" };
    q.sql = format!(
        "{}{} RETURNING {}",
        head,
        conflict,
        select_column_list(entity, MAIN_ALIAS)
    );
    Ok(q)
}

fn set_list(entity: &ResolvedEntity, data: &Map<String, Value>, q: &mut QueryBuf) -> Result<Vec<String>, AppError> {
    let mut sets = Vec::new();
    for (k, v) in data {
        let c = require_column(entity, k)?;
        sets.push(format!("{} = {}", quoted(k), q.placeholder(v.clone(), &c.pg_type)));
    }
    for c in entity.columns.iter().filter(|c| c.auto_updated) {
        if !data.contains_key(&c.name) {
            sets.push(format!("{} = NOW()", quoted(&c.name)));
        }
    }
    if sets.is_empty() {
        let pk = quoted(entity.pk());
        sets.push(format!("{} = {}.{}", pk, MAIN_ALIAS, pk));
    }
    Ok(sets)
}

/// INSERT ... ON CONFLICT (unique key) DO UPDATE. `conflict` must be a declared unique key.
pub fn upsert(
    entity: &ResolvedEntity,
    conflict: &[String],
    create: &Map<String, Value>,
    update: &Map<String, Value>,
) -> Result<QueryBuf, AppError> {
    let keys: Vec<&str> = conflict.iter().map(String::as_str).collect();
    if entity.unique_key_for(&keys).is_none() {
        return Err(AppError::Validation(format!(
            "({}) is not a unique key of {}",
            keys.join(", "),
            entity.model
        )));
    }
    let mut q = QueryBuf::new();
    let head = insert_head(entity, create, &mut q)?;
    let sets = set_list(entity, update, &mut q)?;
    q.sql = format!(
        "{} ON CONFLICT ({}) DO UPDATE SET {} RETURNING {}",
        head,
        conflict.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", "),
        sets.join(", "),
        select_column_list(entity, MAIN_ALIAS)
    );
    Ok(q)
}

/// UPDATE matching rows: SET only columns present in `data`, plus auto-updated timestamps.
pub fn update(
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    filter: &Where,
    data: &Map<String, Value>,
    returning: bool,
) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let sets = set_list(entity, data, &mut q)?;
    let where_sql = where_clause(model, entity, filter, &mut q)?;
    let returning_sql = if returning {
        format!(" RETURNING {}", select_column_list(entity, MAIN_ALIAS))
    } else {
        String::new()
    };
    q.sql = format!(
        "UPDATE {} AS {} SET {}{}{}",
        entity.qualified_table(),
        MAIN_ALIAS,
        sets.join(", "),
        where_sql,
        returning_sql
    );
    Ok(q)
}

pub fn delete(model: &ResolvedModel, entity: &ResolvedEntity, filter: &Where, returning: bool) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, entity, filter, &mut q)?;
    let returning_sql = if returning {
        format!(" RETURNING {}", select_column_list(entity, MAIN_ALIAS))
    } else {
        String::new()
    };
    q.sql = format!(
        "DELETE FROM {} AS {}{}{}",
        entity.qualified_table(),
        MAIN_ALIAS,
        where_sql,
        returning_sql
    );
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve, FullConfig};
    use crate::sql::filter::Unique;
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&FullConfig::embedded().unwrap()).unwrap()
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn select_casts_decimal_and_enum_columns_to_text() {
        let m = model();
        let order = m.entity("order").unwrap();
        let list = select_column_list(order, "t0");
        assert!(list.contains("t0.\"total_amount\"::text AS \"total_amount\""));
        assert!(list.contains("t0.\"status\"::text AS \"status\""));
        assert!(list.contains("t0.\"images_processed\","));
    }

    #[test]
    fn find_many_orders_paginates_and_breaks_ties_on_pk() {
        let m = model();
        let order = m.entity("order").unwrap();
        let args = FindArgs::new()
            .where_(Where::eq("user_id", "u1"))
            .order_by(OrderBy::desc("created_at"))
            .take(10)
            .skip(20);
        let q = select_many(&m, order, &args).unwrap();
        assert!(q.sql.starts_with("SELECT t0.\"id\", t0.\"user_id\""));
        assert!(q
            .sql
            .ends_with(" FROM \"public\".\"orders\" AS t0 WHERE t0.\"user_id\" = $1::text ORDER BY t0.\"created_at\" DESC, t0.\"id\" ASC LIMIT 10 OFFSET 20"));
        assert_eq!(q.params, vec![json!("u1")]);
    }

    #[test]
    fn negative_take_is_rejected() {
        let m = model();
        let args = FindArgs::new().take(-1);
        assert!(select_many(&m, m.entity("user").unwrap(), &args).is_err());
    }

    #[test]
    fn includes_become_json_subqueries() {
        let m = model();
        let user = m.entity("user").unwrap();
        let q = select_many(&m, user, &FindArgs::new().include("orders").include("profile")).unwrap();
        assert!(q.sql.contains(
            "(SELECT COALESCE(json_agg(row_to_json(sub) ORDER BY sub.\"id\"), '[]'::json) FROM (SELECT t1.\"id\""
        ));
        assert!(q.sql.contains("FROM \"public\".\"orders\" AS t1 WHERE t1.\"user_id\" = t0.\"id\") sub) AS \"orders\""));
        assert!(q.sql.contains("(SELECT row_to_json(sub) FROM (SELECT t2.\"id\""));
        assert!(q.sql.contains("LIMIT 1) sub) AS \"profile\""));
    }

    #[test]
    fn unknown_include_is_rejected() {
        let m = model();
        let err = select_many(&m, m.entity("error_log").unwrap(), &FindArgs::new().include("user")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn insert_binds_only_provided_columns_with_casts() {
        let m = model();
        let order = m.entity("order").unwrap();
        let q = insert(
            order,
            &body(json!({ "user_id": "u1", "total_amount": "19.99", "status": "PROCESSING" })),
            false,
        )
        .unwrap();
        assert!(q.sql.starts_with(
            "INSERT INTO \"public\".\"orders\" AS t0 (\"user_id\", \"status\", \"total_amount\") VALUES ($1::text, $2::\"public\".\"OrderStatus\", $3::numeric) RETURNING "
        ));
        assert_eq!(q.params, vec![json!("u1"), json!("PROCESSING"), json!("19.99")]);
    }

    #[test]
    fn insert_with_skip_duplicates_does_nothing_on_conflict() {
        let m = model();
        let user = m.entity("user").unwrap();
        let q = insert(user, &body(json!({ "email": "a@b.c" })), true).unwrap();
        assert!(q.sql.contains(" ON CONFLICT DO NOTHING RETURNING "));
    }

    #[test]
    fn insert_without_columns_uses_defaults() {
        let m = model();
        let q = insert(m.entity("user").unwrap(), &Map::new(), false).unwrap();
        assert!(q.sql.starts_with("INSERT INTO \"public\".\"users\" AS t0 DEFAULT VALUES RETURNING"));
    }

    #[test]
    fn insert_rejects_unknown_columns() {
        let m = model();
        assert!(insert(m.entity("user").unwrap(), &body(json!({ "nickname": "x" })), false).is_err());
    }

    #[test]
    fn update_touches_updated_at() {
        let m = model();
        let order = m.entity("order").unwrap();
        let filter = Unique::id("o1").to_where(order).unwrap();
        let q = update(&m, order, &filter, &body(json!({ "payment_status": "PAID" })), true).unwrap();
        assert!(q.sql.starts_with(
            "UPDATE \"public\".\"orders\" AS t0 SET \"payment_status\" = $1::\"public\".\"PaymentStatus\", \"updated_at\" = NOW() WHERE (t0.\"id\" = $2::text) RETURNING "
        ));
        assert_eq!(q.params, vec![json!("PAID"), json!("o1")]);
    }

    #[test]
    fn update_without_data_on_table_without_timestamps_is_still_valid() {
        let m = model();
        let photo = m.entity("uploaded_photo").unwrap();
        let q = update(&m, photo, &Where::all(), &Map::new(), false).unwrap();
        assert_eq!(q.sql, "UPDATE \"public\".\"uploaded_photos\" AS t0 SET \"id\" = t0.\"id\"");
    }

    #[test]
    fn upsert_targets_the_unique_key() {
        let m = model();
        let account = m.entity("account").unwrap();
        let conflict = vec!["provider".to_string(), "provider_account_id".to_string()];
        let q = upsert(
            account,
            &conflict,
            &body(json!({ "user_id": "u1", "type": "oauth", "provider": "github", "provider_account_id": "7" })),
            &body(json!({ "access_token": "tok" })),
        )
        .unwrap();
        assert!(q
            .sql
            .contains(" ON CONFLICT (\"provider\", \"provider_account_id\") DO UPDATE SET \"access_token\" = $5::text RETURNING "));
        let bad = vec!["provider".to_string()];
        assert!(upsert(account, &bad, &Map::new(), &Map::new()).is_err());
    }

    #[test]
    fn delete_many_without_filter_has_no_where() {
        let m = model();
        let q = delete(&m, m.entity("error_log").unwrap(), &Where::all(), false).unwrap();
        assert_eq!(q.sql, "DELETE FROM \"public\".\"error_logs\" AS t0");
    }

    #[test]
    fn aggregate_keeps_decimal_sums_exact() {
        let m = model();
        let order = m.entity("order").unwrap();
        let args = AggregateArgs::new()
            .count()
            .sum("total_amount")
            .avg("total_amount")
            .max("created_at");
        let q = aggregate(&m, order, &args).unwrap();
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) AS \"_count\", SUM(t0.\"total_amount\")::text AS \"_sum.total_amount\", AVG(t0.\"total_amount\")::text AS \"_avg.total_amount\", MAX(t0.\"created_at\") AS \"_max.created_at\" FROM \"public\".\"orders\" AS t0"
        );
    }

    #[test]
    fn aggregate_rejects_sum_of_text() {
        let m = model();
        let args = AggregateArgs::new().sum("url");
        assert!(aggregate(&m, m.entity("uploaded_photo").unwrap(), &args).is_err());
        assert!(aggregate(&m, m.entity("uploaded_photo").unwrap(), &AggregateArgs::new()).is_err());
    }

    #[test]
    fn group_by_selects_keys_and_aggregates() {
        let m = model();
        let order = m.entity("order").unwrap();
        let args = GroupByArgs::by(["payment_status"])
            .aggregate(AggregateArgs::new().count().sum("total_amount"))
            .order_by(OrderBy::desc("payment_status"));
        let q = group_by(&m, order, &args).unwrap();
        assert_eq!(
            q.sql,
            "SELECT t0.\"payment_status\"::text AS \"payment_status\", COUNT(*) AS \"_count\", SUM(t0.\"total_amount\")::text AS \"_sum.total_amount\" FROM \"public\".\"orders\" AS t0 GROUP BY t0.\"payment_status\" ORDER BY t0.\"payment_status\" DESC"
        );
        let bad = GroupByArgs::by(["payment_status"]).order_by(OrderBy::asc("created_at"));
        assert!(group_by(&m, order, &bad).is_err());
    }
}
