//! Result shapes for batch writes and aggregates.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Number of rows touched by a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchPayload {
    pub count: u64,
}

/// Aggregates keyed by column. Decimal sums and averages are exact strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(rename = "_sum", skip_serializing_if = "Map::is_empty")]
    pub sum: Map<String, Value>,
    #[serde(rename = "_avg", skip_serializing_if = "Map::is_empty")]
    pub avg: Map<String, Value>,
    #[serde(rename = "_min", skip_serializing_if = "Map::is_empty")]
    pub min: Map<String, Value>,
    #[serde(rename = "_max", skip_serializing_if = "Map::is_empty")]
    pub max: Map<String, Value>,
}

impl AggregateResult {
    /// Split a flat row (`_count`, `_sum.total_amount`, ...) into aggregates and the remaining columns.
    pub fn from_row(row: Value) -> (Self, Map<String, Value>) {
        let mut out = AggregateResult::default();
        let mut rest = Map::new();
        let Value::Object(obj) = row else {
            return (out, rest);
        };
        for (key, v) in obj {
            if key == "_count" {
                out.count = v.as_i64();
                continue;
            }
            let (prefix, col) = match key.split_once('.') {
                Some((p, c)) => (p.to_string(), c.to_string()),
                None => {
                    rest.insert(key, v);
                    continue;
                }
            };
            let map = match prefix.as_str() {
                "_sum" => &mut out.sum,
                "_avg" => &mut out.avg,
                "_min" => &mut out.min,
                "_max" => &mut out.max,
                _ => {
                    rest.insert(key, v);
                    continue;
                }
            };
            map.insert(col, v);
        }
        (out, rest)
    }

    /// `_sum` of a numeric column as an exact decimal; `None` when no rows matched.
    pub fn sum_decimal(&self, column: &str) -> Option<Decimal> {
        self.sum.get(column).and_then(to_decimal)
    }

    pub fn avg_decimal(&self, column: &str) -> Option<Decimal> {
        self.avg.get(column).and_then(to_decimal)
    }
}

fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

/// One group: the grouping columns plus its aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupByRow {
    pub key: Map<String, Value>,
    #[serde(flatten)]
    pub aggregates: AggregateResult,
}

impl GroupByRow {
    pub fn from_row(row: Value) -> Self {
        let (aggregates, key) = AggregateResult::from_row(row);
        Self { key, aggregates }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_flat_aggregate_row() {
        let (agg, rest) = AggregateResult::from_row(json!({
            "payment_status": "PAID",
            "_count": 3,
            "_sum.total_amount": "30.30",
            "_max.created_at": "2024-05-01T10:00:00+00:00"
        }));
        assert_eq!(agg.count, Some(3));
        assert_eq!(agg.sum_decimal("total_amount"), Some(Decimal::new(3030, 2)));
        assert_eq!(agg.max["created_at"], json!("2024-05-01T10:00:00+00:00"));
        assert_eq!(rest, json!({ "payment_status": "PAID" }).as_object().cloned().unwrap());
    }

    #[test]
    fn empty_sum_is_none() {
        let (agg, _) = AggregateResult::from_row(json!({ "_sum.total_amount": null }));
        assert_eq!(agg.sum_decimal("total_amount"), None);
    }
}
