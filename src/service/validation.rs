//! Write validation: column existence, nullability, value types, enum literals and configured rules.

use crate::error::AppError;
use crate::schema::{ColumnInfo, ColumnKind, ResolvedEntity, ValidationRule};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate an insert body. Non-nullable columns without a default must be present.
    pub fn validate_create(entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<(), AppError> {
        check_known_columns(entity, body)?;
        for col in &entity.columns {
            let val = body.get(&col.name);
            let missing = val.map_or(true, Value::is_null);
            let required_by_rule = entity
                .validation
                .get(&col.name)
                .and_then(|r| r.required)
                .unwrap_or(false);
            if missing && ((!col.nullable && !col.has_default) || required_by_rule) {
                return Err(AppError::Validation(format!("{} is required", col.name)));
            }
        }
        for (name, v) in body {
            validate_value(entity, name, v)?;
        }
        Ok(())
    }

    /// Validate only the fields present (update payloads).
    pub fn validate_update(entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<(), AppError> {
        check_known_columns(entity, body)?;
        for (name, v) in body {
            if v.is_null() {
                let required_by_rule = entity
                    .validation
                    .get(name)
                    .and_then(|r| r.required)
                    .unwrap_or(false);
                if required_by_rule {
                    return Err(AppError::Validation(format!("{} is required", name)));
                }
            }
            validate_value(entity, name, v)?;
        }
        Ok(())
    }
}

fn check_known_columns(entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<(), AppError> {
    match body.keys().find(|k| !entity.has_column(k)) {
        Some(k) => Err(AppError::Validation(format!("unknown field '{}' on {}", k, entity.model))),
        None => Ok(()),
    }
}

fn validate_value(entity: &ResolvedEntity, name: &str, v: &Value) -> Result<(), AppError> {
    let Some(col) = entity.column(name) else {
        return Err(AppError::Validation(format!("unknown field '{}' on {}", name, entity.model)));
    };
    if v.is_null() {
        if !col.nullable {
            return Err(AppError::Validation(format!("{} must not be null", name)));
        }
        return Ok(());
    }
    check_kind(col, v)?;
    if let Some(rule) = entity.validation.get(name) {
        validate_field(name, v, rule)?;
    }
    Ok(())
}

fn check_kind(col: &ColumnInfo, v: &Value) -> Result<(), AppError> {
    let ok = match col.kind {
        ColumnKind::Text => v.is_string(),
        ColumnKind::Bool => v.is_boolean(),
        ColumnKind::Int | ColumnKind::BigInt => v.is_i64() || v.is_u64(),
        ColumnKind::Float => v.is_number(),
        ColumnKind::Decimal => parse_decimal(v).is_some(),
        ColumnKind::Timestamp => v
            .as_str()
            .map_or(false, |s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
        ColumnKind::Date => v
            .as_str()
            .map_or(false, |s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
        ColumnKind::Uuid => v.as_str().map_or(false, |s| uuid::Uuid::parse_str(s).is_ok()),
        ColumnKind::Json => true,
        ColumnKind::Enum => {
            let allowed = col.enum_values.as_deref().unwrap_or(&[]);
            return match v.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => Ok(()),
                _ => Err(AppError::Validation(format!(
                    "{} must be one of: {}",
                    col.name,
                    allowed.join(", ")
                ))),
            };
        }
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} has the wrong type (expected {})",
            col.name, col.pg_type
        )))
    }
}

/// Decimals are accepted as exact strings or JSON numbers.
fn parse_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => exact_decimal(s),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    }
}

/// Parse `s` only when `Decimal` holds it digit for digit; `from_str` rounds past 28 significant digits.
fn exact_decimal(s: &str) -> Option<Decimal> {
    let d = Decimal::from_str(s).ok()?;
    let unsigned = s.strip_prefix('-').or_else(|| s.strip_prefix('+')).unwrap_or(s);
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = format!("{int}{frac}");
    let digits = digits.trim_start_matches('0');
    let mantissa = d.mantissa().unsigned_abs();
    let same_digits = if digits.is_empty() {
        mantissa == 0
    } else {
        mantissa.to_string() == digits
    };
    (same_digits && d.scale() as usize == frac.len()).then_some(d)
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
        if let Some(ref pattern) = rule.pattern {
            let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        if let Some(n) = parse_decimal(v) {
            if let Some(min) = rule.minimum.and_then(|m| Decimal::try_from(m).ok()) {
                if n < min {
                    return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
                }
            }
            if let Some(max) = rule.maximum.and_then(|m| Decimal::try_from(m).ok()) {
                if n > max {
                    return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
                }
            }
        }
    }
    Ok(())
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Ok(());
    };
    let valid = match format.to_lowercase().as_str() {
        "email" => match s.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
            None => false,
        },
        "url" => s.starts_with("https://") || s.starts_with("http://"),
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", col, format)))
    }
}
