//! Database enum types. Each serializes to its literal (`"PAID"`) and parses only known literals.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {type_name}")]
pub struct ParseEnumError {
    pub type_name: &'static str,
    pub value: String,
}

macro_rules! literal_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $lit:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $lit)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $lit),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        type_name: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl From<$name> for Value {
            fn from(v: $name) -> Value {
                Value::String(v.as_str().to_string())
            }
        }
    };
}

literal_enum!(
    /// Account privilege level.
    UserRole {
        User => "USER",
        Admin => "ADMIN",
    }
);

literal_enum!(
    OrderStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
);

literal_enum!(
    PaymentStatus {
        Pending => "PENDING",
        Paid => "PAID",
        Failed => "FAILED",
        Refunded => "REFUNDED",
    }
);

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("PENDING", PaymentStatus::Pending)]
    #[case("PAID", PaymentStatus::Paid)]
    #[case("FAILED", PaymentStatus::Failed)]
    #[case("REFUNDED", PaymentStatus::Refunded)]
    fn payment_status_literals(#[case] lit: &str, #[case] expected: PaymentStatus) {
        assert_eq!(lit.parse::<PaymentStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), lit);
        assert_eq!(serde_json::to_value(expected).unwrap(), json!(lit));
    }

    #[rstest]
    #[case("paid")]
    #[case("SHIPPED")]
    #[case("")]
    fn unknown_literals_are_rejected(#[case] lit: &str) {
        let err = lit.parse::<PaymentStatus>().unwrap_err();
        assert_eq!(err.type_name, "PaymentStatus");
        assert!(serde_json::from_value::<PaymentStatus>(json!(lit)).is_err());
    }

    #[test]
    fn every_variant_is_listed() {
        assert_eq!(UserRole::ALL.len(), 2);
        assert_eq!(OrderStatus::ALL.len(), 4);
        assert_eq!(PaymentStatus::ALL.len(), 4);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(Value::from(UserRole::Admin), json!("ADMIN"));
    }
}
