//! Row types. Relation fields stay `None` unless the relation was included in the query.

use crate::models::enums::{OrderStatus, PaymentStatus, UserRole};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: UserRole,
    pub is_first_time_user: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    /// Password hash; never returned over HTTP.
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<Account>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<Session>>,
    /// Also `None` when included but the user has no profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Box<Profile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
}

/// External identity-provider link (OAuth account).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<i32>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub hobbies: Option<String>,
    pub location: Option<String>,
    pub style: Option<String>,
    pub additional_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub images_processed: bool,
    pub training_initiated: bool,
    pub images_generated: bool,
    pub order_completed: bool,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub stripe_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_photos: Option<Vec<UploadedPhoto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_photos: Option<Vec<GeneratedPhoto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_requests: Option<Vec<PhotoRequest>>,
}

/// Customer-supplied photo attached to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedPhoto {
    pub id: String,
    pub url: String,
    pub order_id: String,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Box<Order>>,
}

/// Output photo produced for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPhoto {
    pub id: String,
    pub url: String,
    pub order_id: String,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Box<Order>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRequest {
    pub id: String,
    pub order_id: String,
    pub description: String,
    pub reference_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Box<Order>>,
}

/// Application error record. `user_id` is informational only and not a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLog {
    pub id: String,
    pub message: String,
    pub stack: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn order_row_decodes_text_decimal_and_enums() {
        let row = json!({
            "id": "o1",
            "user_id": "u1",
            "status": "PROCESSING",
            "images_processed": false,
            "training_initiated": false,
            "images_generated": false,
            "order_completed": false,
            "total_amount": "12345678901234567890.123456789",
            "payment_status": "PAID",
            "stripe_session_id": null,
            "payment_intent_id": null,
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": "2024-05-01T10:00:00+00:00"
        });
        let order: Order = serde_json::from_value(row).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(
            order.total_amount,
            Decimal::from_str("12345678901234567890.123456789").unwrap()
        );
        assert!(order.uploaded_photos.is_none());
    }

    #[test]
    fn included_relations_decode() {
        let row = json!({
            "id": "u1", "name": null, "email": "a@example.com", "email_verified": null,
            "image": null, "role": "USER", "is_first_time_user": true,
            "created_at": "2024-05-01T10:00:00+00:00", "updated_at": "2024-05-01T10:00:00+00:00",
            "reset_token": null, "reset_token_expiry": null, "password": null,
            "profile": null,
            "sessions": [{ "id": "s1", "session_token": "t", "user_id": "u1", "expires": "2030-01-01T00:00:00+00:00" }]
        });
        let user: User = serde_json::from_value(row).unwrap();
        assert!(user.profile.is_none());
        assert_eq!(user.sessions.unwrap()[0].session_token, "t");
    }
}
