//! Filter inputs: the where tree, where-unique keys and ordering.
//!
//! A `Where` can be built in code (`Where::eq("email", "a@b.c")`) or parsed from
//! the JSON shape used by REST clients:
//!
//! ```json
//! { "status": { "in": ["PENDING", "PROCESSING"] },
//!   "OR": [{ "paymentStatus": "PAID" }, { "totalAmount": { "gte": "100" } }],
//!   "uploadedPhotos": { "some": { "url": { "endsWith": ".png" } } } }
//! ```

use crate::case::to_snake_case;
use crate::error::AppError;
use crate::schema::{ColumnInfo, ColumnKind, IncludeDirection, ResolvedEntity, ResolvedModel};
use crate::sql::builder::QueryBuf;
use serde_json::{Map, Value};

/// Comparison applied to one column.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Equals(Value),
    Not(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

/// How a relation filter quantifies over related rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantifier {
    /// At least one related row matches (to-many).
    Some,
    /// No related row matches (to-many).
    None,
    /// Every related row matches (to-many).
    Every,
    /// The related row exists and matches (to-one).
    Is,
    /// No related row, or it does not match (to-one).
    IsNot,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Where {
    Field {
        column: String,
        condition: Condition,
        insensitive: bool,
    },
    And(Vec<Where>),
    Or(Vec<Where>),
    Not(Box<Where>),
    Relation {
        name: String,
        quantifier: Quantifier,
        filter: Box<Where>,
    },
}

impl Default for Where {
    fn default() -> Self {
        Where::all()
    }
}

impl Where {
    /// Matches every row.
    pub fn all() -> Self {
        Where::And(Vec::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Where::And(v) if v.is_empty())
    }

    pub fn field(column: impl Into<String>, condition: Condition) -> Self {
        Where::Field {
            column: column.into(),
            condition,
            insensitive: false,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(column, Condition::Equals(value.into()))
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(column, Condition::Not(value.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::field(column, Condition::Equals(Value::Null))
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(column, Condition::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::field(column, Condition::NotIn(values.into_iter().map(Into::into).collect()))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(column, Condition::Lt(value.into()))
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(column, Condition::Lte(value.into()))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(column, Condition::Gt(value.into()))
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(column, Condition::Gte(value.into()))
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::field(column, Condition::Contains(needle.into()))
    }

    pub fn starts_with(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::field(column, Condition::StartsWith(prefix.into()))
    }

    pub fn ends_with(column: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::field(column, Condition::EndsWith(suffix.into()))
    }

    /// Case-insensitive variant of a field filter; no-op on other nodes.
    pub fn insensitive(mut self) -> Self {
        if let Where::Field { insensitive, .. } = &mut self {
            *insensitive = true;
        }
        self
    }

    pub fn and(self, other: Where) -> Self {
        match self {
            Where::And(mut v) => {
                v.push(other);
                Where::And(v)
            }
            w => Where::And(vec![w, other]),
        }
    }

    pub fn or(self, other: Where) -> Self {
        match self {
            Where::Or(mut v) => {
                v.push(other);
                Where::Or(v)
            }
            w => Where::Or(vec![w, other]),
        }
    }

    pub fn negate(self) -> Self {
        Where::Not(Box::new(self))
    }

    pub fn relation(name: impl Into<String>, quantifier: Quantifier, filter: Where) -> Self {
        Where::Relation {
            name: name.into(),
            quantifier,
            filter: Box::new(filter),
        }
    }

    pub fn some(name: impl Into<String>, filter: Where) -> Self {
        Self::relation(name, Quantifier::Some, filter)
    }

    pub fn none(name: impl Into<String>, filter: Where) -> Self {
        Self::relation(name, Quantifier::None, filter)
    }

    pub fn every(name: impl Into<String>, filter: Where) -> Self {
        Self::relation(name, Quantifier::Every, filter)
    }

    pub fn is(name: impl Into<String>, filter: Where) -> Self {
        Self::relation(name, Quantifier::Is, filter)
    }

    pub fn is_not(name: impl Into<String>, filter: Where) -> Self {
        Self::relation(name, Quantifier::IsNot, filter)
    }

    /// Parse the JSON filter shape. Keys may be camelCase or snake_case.
    pub fn from_json(model: &ResolvedModel, entity: &ResolvedEntity, value: &Value) -> Result<Self, AppError> {
        let obj = value
            .as_object()
            .ok_or_else(|| AppError::BadRequest("where must be a JSON object".into()))?;
        let mut parts = Vec::new();
        for (key, v) in obj {
            match key.as_str() {
                "AND" => parts.push(Where::And(parse_list(model, entity, v)?)),
                "OR" => parts.push(Where::Or(parse_list(model, entity, v)?)),
                // every listed condition must be false
                "NOT" => {
                    let inner = parse_list(model, entity, v)?;
                    parts.push(Where::And(inner.into_iter().map(Where::negate).collect()));
                }
                _ => {
                    let name = to_snake_case(key);
                    if entity.has_column(&name) {
                        parts.push(parse_field(&name, v)?);
                    } else if let Some(spec) = entity.include(&name) {
                        let related = related_entity(model, &spec.related_model)?;
                        parts.push(parse_relation(model, related, &name, spec.direction, v)?);
                    } else {
                        return Err(AppError::Validation(format!(
                            "unknown field '{}' on {}",
                            key, entity.model
                        )));
                    }
                }
            }
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Where::And(parts)
        })
    }

    /// Render as a SQL boolean expression over `alias`, pushing parameters into `q`.
    pub(crate) fn render(
        &self,
        model: &ResolvedModel,
        entity: &ResolvedEntity,
        alias: &str,
        q: &mut QueryBuf,
    ) -> Result<String, AppError> {
        match self {
            Where::Field {
                column,
                condition,
                insensitive,
            } => {
                let col = entity.column(column).ok_or_else(|| {
                    AppError::Validation(format!("unknown column '{}' on {}", column, entity.model))
                })?;
                render_condition(col, alias, condition, *insensitive, q)
            }
            Where::And(parts) => {
                if parts.is_empty() {
                    return Ok("TRUE".into());
                }
                let rendered = parts
                    .iter()
                    .map(|p| p.render(model, entity, alias, q))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", rendered.join(" AND ")))
            }
            Where::Or(parts) => {
                if parts.is_empty() {
                    return Ok("FALSE".into());
                }
                let rendered = parts
                    .iter()
                    .map(|p| p.render(model, entity, alias, q))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", rendered.join(" OR ")))
            }
            Where::Not(inner) => Ok(format!("NOT {}", wrap(inner.render(model, entity, alias, q)?))),
            Where::Relation {
                name,
                quantifier,
                filter,
            } => {
                let spec = entity.include(name).ok_or_else(|| {
                    AppError::Validation(format!("unknown relation '{}' on {}", name, entity.model))
                })?;
                let valid = match spec.direction {
                    IncludeDirection::ToMany => {
                        matches!(quantifier, Quantifier::Some | Quantifier::None | Quantifier::Every)
                    }
                    IncludeDirection::ToOne => matches!(quantifier, Quantifier::Is | Quantifier::IsNot),
                };
                if !valid {
                    return Err(AppError::Validation(format!(
                        "{:?} is not a valid filter for relation '{}'",
                        quantifier, name
                    )));
                }
                let related = related_entity(model, &spec.related_model)?;
                let sub = q.next_alias();
                let join = format!(
                    "{}.{} = {}.{}",
                    sub,
                    quoted(&spec.their_key_column),
                    alias,
                    quoted(&spec.our_key_column)
                );
                let inner = filter.render(model, related, &sub, q)?;
                let from = format!("{} AS {}", related.qualified_table(), sub);
                Ok(match quantifier {
                    Quantifier::Some | Quantifier::Is => {
                        format!("EXISTS (SELECT 1 FROM {} WHERE {} AND {})", from, join, inner)
                    }
                    Quantifier::None | Quantifier::IsNot => {
                        format!("NOT EXISTS (SELECT 1 FROM {} WHERE {} AND {})", from, join, inner)
                    }
                    Quantifier::Every => {
                        format!("NOT EXISTS (SELECT 1 FROM {} WHERE {} AND NOT {})", from, join, wrap(inner))
                    }
                })
            }
        }
    }
}

fn wrap(expr: String) -> String {
    if expr.starts_with('(') || expr == "TRUE" || expr == "FALSE" {
        expr
    } else {
        format!("({})", expr)
    }
}

fn quoted(s: &str) -> String {
    crate::schema::quote_ident(s)
}

fn related_entity<'m>(model: &'m ResolvedModel, name: &str) -> Result<&'m ResolvedEntity, AppError> {
    model.entity(name).ok_or_else(|| {
        AppError::Config(crate::error::ConfigError::MissingReference {
            kind: "model",
            id: name.to_string(),
        })
    })
}

fn parse_list(model: &ResolvedModel, entity: &ResolvedEntity, v: &Value) -> Result<Vec<Where>, AppError> {
    match v {
        Value::Array(items) => items.iter().map(|i| Where::from_json(model, entity, i)).collect(),
        Value::Object(_) => Ok(vec![Where::from_json(model, entity, v)?]),
        _ => Err(AppError::BadRequest("AND/OR/NOT take an object or an array".into())),
    }
}

fn parse_field(column: &str, v: &Value) -> Result<Where, AppError> {
    let ops = match v {
        Value::Object(ops) => ops,
        scalar => return Ok(Where::eq(column, scalar.clone())),
    };
    let insensitive = match ops.get("mode") {
        None => false,
        Some(Value::String(m)) if m == "insensitive" => true,
        Some(Value::String(m)) if m == "default" => false,
        Some(other) => return Err(AppError::BadRequest(format!("invalid mode {}", other))),
    };
    let mut parts = Vec::new();
    for (op, arg) in ops {
        let condition = match op.as_str() {
            "mode" => continue,
            "equals" => Condition::Equals(arg.clone()),
            "not" => match arg {
                Value::Object(_) => {
                    let inner = parse_field(column, arg)?;
                    parts.push(inner.negate());
                    continue;
                }
                scalar => Condition::Not(scalar.clone()),
            },
            "in" => Condition::In(array_arg(op, arg)?),
            "notIn" | "not_in" => Condition::NotIn(array_arg(op, arg)?),
            "lt" => Condition::Lt(arg.clone()),
            "lte" => Condition::Lte(arg.clone()),
            "gt" => Condition::Gt(arg.clone()),
            "gte" => Condition::Gte(arg.clone()),
            "contains" => Condition::Contains(string_arg(op, arg)?),
            "startsWith" | "starts_with" => Condition::StartsWith(string_arg(op, arg)?),
            "endsWith" | "ends_with" => Condition::EndsWith(string_arg(op, arg)?),
            other => return Err(AppError::BadRequest(format!("unknown filter operator '{}'", other))),
        };
        parts.push(Where::Field {
            column: column.to_string(),
            condition,
            insensitive,
        });
    }
    Ok(if parts.len() == 1 {
        parts.remove(0)
    } else {
        Where::And(parts)
    })
}

fn parse_relation(
    model: &ResolvedModel,
    related: &ResolvedEntity,
    name: &str,
    direction: IncludeDirection,
    v: &Value,
) -> Result<Where, AppError> {
    let quantifiers: &[(&str, Quantifier)] = match direction {
        IncludeDirection::ToMany => &[
            ("some", Quantifier::Some),
            ("none", Quantifier::None),
            ("every", Quantifier::Every),
        ],
        IncludeDirection::ToOne => &[("is", Quantifier::Is), ("isNot", Quantifier::IsNot)],
    };
    let obj = match v {
        Value::Null if direction == IncludeDirection::ToOne => {
            return Ok(Where::relation(name, Quantifier::IsNot, Where::all()));
        }
        Value::Object(obj) => obj,
        _ => return Err(AppError::BadRequest(format!("relation filter '{}' must be an object", name))),
    };
    let quantified: Vec<_> = quantifiers.iter().filter(|(k, _)| obj.contains_key(*k)).collect();
    if quantified.is_empty() {
        return match direction {
            // to-one shorthand: { user: { email: ... } } means { user: { is: ... } }
            IncludeDirection::ToOne => Ok(Where::relation(name, Quantifier::Is, Where::from_json(model, related, v)?)),
            IncludeDirection::ToMany => Err(AppError::BadRequest(format!(
                "relation filter '{}' needs one of some/none/every",
                name
            ))),
        };
    }
    let mut parts = Vec::new();
    for (key, quantifier) in quantified {
        let arg = &obj[*key];
        let part = match (arg, quantifier) {
            // `is: null` / `isNot: null` test for presence only
            (Value::Null, Quantifier::Is) => Where::relation(name, Quantifier::IsNot, Where::all()),
            (Value::Null, Quantifier::IsNot) => Where::relation(name, Quantifier::Is, Where::all()),
            _ => Where::relation(name, *quantifier, Where::from_json(model, related, arg)?),
        };
        parts.push(part);
    }
    Ok(if parts.len() == 1 {
        parts.remove(0)
    } else {
        Where::And(parts)
    })
}

fn array_arg(op: &str, v: &Value) -> Result<Vec<Value>, AppError> {
    v.as_array()
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("'{}' takes an array", op)))
}

fn string_arg(op: &str, v: &Value) -> Result<String, AppError> {
    v.as_str()
        .map(String::from)
        .ok_or_else(|| AppError::BadRequest(format!("'{}' takes a string", op)))
}

/// Escape LIKE metacharacters; backslash is PostgreSQL's default LIKE escape.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn check_filter_value(col: &ColumnInfo, v: &Value) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let (Some(allowed), Some(s)) = (&col.enum_values, v.as_str()) {
        if !allowed.iter().any(|a| a == s) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col.name,
                allowed.join(", ")
            )));
        }
    }
    if col.kind == ColumnKind::Bool && !v.is_boolean() {
        return Err(AppError::Validation(format!("{} filter takes a boolean", col.name)));
    }
    Ok(())
}

fn render_condition(
    col: &ColumnInfo,
    alias: &str,
    condition: &Condition,
    insensitive: bool,
    q: &mut QueryBuf,
) -> Result<String, AppError> {
    let is_text = matches!(col.kind, ColumnKind::Text);
    let fold = insensitive && is_text;
    let lhs = if fold {
        format!("LOWER({}.{})", alias, quoted(&col.name))
    } else {
        format!("{}.{}", alias, quoted(&col.name))
    };
    let ph = |q: &mut QueryBuf, v: &Value| -> Result<String, AppError> {
        check_filter_value(col, v)?;
        let p = q.placeholder(v.clone(), &col.pg_type);
        Ok(if fold { format!("LOWER({})", p) } else { p })
    };
    Ok(match condition {
        Condition::Equals(Value::Null) => format!("{} IS NULL", lhs),
        Condition::Not(Value::Null) => format!("{} IS NOT NULL", lhs),
        Condition::Equals(v) => format!("{} = {}", lhs, ph(q, v)?),
        // `not: x` also keeps rows where the column is NULL
        Condition::Not(v) => format!("({} <> {} OR {} IS NULL)", lhs, ph(q, v)?, lhs),
        Condition::In(vs) | Condition::NotIn(vs) => {
            let negated = matches!(condition, Condition::NotIn(_));
            if vs.is_empty() {
                return Ok(if negated { "TRUE".into() } else { "FALSE".into() });
            }
            let list = vs.iter().map(|v| ph(q, v)).collect::<Result<Vec<_>, _>>()?;
            format!("{} {}IN ({})", lhs, if negated { "NOT " } else { "" }, list.join(", "))
        }
        Condition::Lt(v) => format!("{} < {}", lhs, ph(q, v)?),
        Condition::Lte(v) => format!("{} <= {}", lhs, ph(q, v)?),
        Condition::Gt(v) => format!("{} > {}", lhs, ph(q, v)?),
        Condition::Gte(v) => format!("{} >= {}", lhs, ph(q, v)?),
        Condition::Contains(s) | Condition::StartsWith(s) | Condition::EndsWith(s) => {
            if !is_text {
                return Err(AppError::Validation(format!(
                    "{} does not support text matching",
                    col.name
                )));
            }
            let escaped = escape_like(s);
            let pattern = match condition {
                Condition::Contains(_) => format!("%{}%", escaped),
                Condition::StartsWith(_) => format!("{}%", escaped),
                _ => format!("%{}", escaped),
            };
            let n = q.push_param(Value::String(pattern));
            let op = if insensitive { "ILIKE" } else { "LIKE" };
            format!("{}.{} {} ${}", alias, quoted(&col.name), op, n)
        }
    })
}

/// Where-unique input: column/value pairs that must form exactly one declared unique key.
#[derive(Clone, Debug, PartialEq)]
pub struct Unique {
    pub fields: Vec<(String, Value)>,
}

impl Unique {
    pub fn id(value: impl Into<Value>) -> Self {
        Self::by("id", value)
    }

    pub fn by(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            fields: vec![(column.into(), value.into())],
        }
    }

    pub fn compound<C: Into<String>, V: Into<Value>>(pairs: impl IntoIterator<Item = (C, V)>) -> Self {
        Self {
            fields: pairs.into_iter().map(|(c, v)| (c.into(), v.into())).collect(),
        }
    }

    /// Parse `{ "email": "..." }` or `{ "provider": "...", "providerAccountId": "..." }`.
    pub fn from_json(value: &Value) -> Result<Self, AppError> {
        let obj: &Map<String, Value> = value
            .as_object()
            .ok_or_else(|| AppError::BadRequest("unique where must be a JSON object".into()))?;
        Ok(Self {
            fields: obj.iter().map(|(k, v)| (to_snake_case(k), v.clone())).collect(),
        })
    }

    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|(c, _)| c.as_str()).collect()
    }

    /// Check against the entity's unique keys and turn into an equality filter.
    pub fn to_where(&self, entity: &ResolvedEntity) -> Result<Where, AppError> {
        if entity.unique_key_for(&self.columns()).is_none() {
            return Err(AppError::Validation(format!(
                "({}) is not a unique key of {}",
                self.columns().join(", "),
                entity.model
            )));
        }
        if self.fields.iter().any(|(_, v)| v.is_null()) {
            return Err(AppError::Validation("unique where values must not be null".into()));
        }
        Ok(Where::And(
            self.fields
                .iter()
                .map(|(c, v)| Where::eq(c.clone(), v.clone()))
                .collect(),
        ))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub order: SortOrder,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }

    /// Parse `{"createdAt": "desc"}` or an array of such objects.
    pub fn from_json(value: &Value) -> Result<Vec<Self>, AppError> {
        let items: Vec<&Value> = match value {
            Value::Array(a) => a.iter().collect(),
            other => vec![other],
        };
        let mut out = Vec::new();
        for item in items {
            let obj = item
                .as_object()
                .ok_or_else(|| AppError::BadRequest("orderBy entries must be objects".into()))?;
            for (k, v) in obj {
                let order = match v.as_str() {
                    Some("asc") => SortOrder::Asc,
                    Some("desc") => SortOrder::Desc,
                    _ => return Err(AppError::BadRequest(format!("orderBy '{}' must be asc or desc", k))),
                };
                out.push(OrderBy {
                    column: to_snake_case(k),
                    order,
                });
            }
        }
        Ok(out)
    }
}
