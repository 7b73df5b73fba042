//! Shared setup for database-backed tests.
//!
//! Tests run only when `TEST_DATABASE_URL` points at a PostgreSQL 13+ server. Each test gets
//! its own schema (`it_<uuid>`), so tests run in parallel and leave nothing behind but that schema.

#![allow(dead_code)]

use photo_orders::{apply_migrations, resolve_in_schema, Client, FullConfig, NewOrder, NewUser, Order, User};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use std::str::FromStr;

pub async fn test_client() -> Option<Client> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    let schema = format!("it_{}", uuid::Uuid::new_v4().simple());
    let config = FullConfig::embedded().expect("embedded schema");
    apply_migrations(&pool, &config, &schema).await.expect("migrations");
    let model = resolve_in_schema(&config, &schema).expect("resolve");
    Some(Client::new(pool, model))
}

/// `let client = client_or_skip!();` at the top of a test.
#[macro_export]
macro_rules! client_or_skip {
    () => {
        match common::test_client().await {
            Some(c) => c,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping");
                return;
            }
        }
    };
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}

pub async fn user(client: &Client, email: &str) -> User {
    client.user().create(NewUser::with_email(email)).await.expect("create user")
}

pub async fn order(client: &Client, user_id: &str, amount: &str) -> Order {
    client
        .order()
        .create(NewOrder::new(user_id, dec(amount)))
        .await
        .expect("create order")
}
