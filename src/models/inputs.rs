//! Create inputs and the update payload.
//!
//! Optional create fields left `None` are omitted from the INSERT so the column default applies.

use crate::models::enums::{OrderStatus, PaymentStatus, UserRole};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_first_time_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl NewUser {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hobbies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub total_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_processed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_initiated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_generated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

impl NewOrder {
    pub fn new(user_id: impl Into<String>, total_amount: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            total_amount,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewUploadedPhoto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewGeneratedPhoto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewPhotoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub order_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewErrorLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Update payload: only the columns set here are written.
///
/// ```
/// use photo_orders::{Patch, PaymentStatus};
/// let p = Patch::new().set("payment_status", PaymentStatus::Paid).set_null("stripe_session_id");
/// assert_eq!(p.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn set_null(mut self, column: impl Into<String>) -> Self {
        self.0.insert(column.into(), Value::Null);
        self
    }

    /// Decimal columns are written from their exact string form.
    pub fn set_decimal(self, column: impl Into<String>, value: Decimal) -> Self {
        self.set(column, value.to_string())
    }

    pub fn set_time(self, column: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.set(column, value.to_rfc3339())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn unset_optionals_are_omitted() {
        let v = serde_json::to_value(NewUser::with_email("a@example.com")).unwrap();
        assert_eq!(v, json!({ "email": "a@example.com" }));
    }

    #[test]
    fn order_amount_serializes_as_exact_string() {
        let order = NewOrder::new("u1", Decimal::from_str("0.10").unwrap());
        let v = serde_json::to_value(order).unwrap();
        assert_eq!(v["total_amount"], json!("0.10"));
        assert!(v.get("status").is_none());
    }

    #[test]
    fn account_type_keeps_its_column_name() {
        let v = serde_json::to_value(NewAccount {
            user_id: "u1".into(),
            type_: "oauth".into(),
            provider: "github".into(),
            provider_account_id: "1".into(),
            ..NewAccount::default()
        })
        .unwrap();
        assert_eq!(v["type"], json!("oauth"));
    }

    #[test]
    fn patch_collects_columns() {
        let p = Patch::new()
            .set("status", OrderStatus::Completed)
            .set_decimal("total_amount", Decimal::new(1999, 2))
            .set_null("stripe_session_id");
        assert_eq!(
            Value::Object(p.into_map()),
            json!({ "status": "COMPLETED", "total_amount": "19.99", "stripe_session_id": null })
        );
    }
}
