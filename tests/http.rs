//! REST surface against a live database.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use photo_orders::{app_router, AppState, Client};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(client: &Client) -> Router {
    app_router(AppState::from_client(client))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let req = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn user_lifecycle_over_http() {
    let client = client_or_skip!();
    let app = app(&client);

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some(json!({ "email": "http@example.com", "name": "Http", "password": "hash" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["isFirstTimeUser"], json!(true));
    assert!(created["data"].get("password").is_none());

    let (status, _) = send(&app, "POST", "/api/v1/users", Some(json!({ "email": "http@example.com" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/{id}"),
        Some(json!({ "isFirstTimeUser": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["isFirstTimeUser"], json!(false));

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_list_with_filters_and_includes() {
    let client = client_or_skip!();
    let app = app(&client);
    let u = common::user(&client, "lister@example.com").await;
    for amount in ["10.00", "20.00", "30.00"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/orders",
            Some(json!({ "userId": u.id, "totalAmount": amount })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = send(
        &app,
        "GET",
        &format!("/api/v1/orders?userId={}&orderBy=totalAmount:desc&take=2", u.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["meta"]["count"], json!(2));
    assert_eq!(page["data"][0]["totalAmount"], json!("30.00"));
    assert_eq!(page["data"][1]["totalAmount"], json!("20.00"));

    let (_, counted) = send(&app, "GET", "/api/v1/orders/count?paymentStatus=PENDING", None).await;
    assert_eq!(counted["data"]["count"], json!(3));

    let id = page["data"][0]["id"].as_str().unwrap();
    let (status, one) = send(&app, "GET", &format!("/api/v1/orders/{id}?include=user,uploadedPhotos"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["data"]["user"]["email"], json!("lister@example.com"));
    assert!(one["data"]["user"].get("password").is_none());
    assert_eq!(one["data"]["uploadedPhotos"], json!([]));
}

#[tokio::test]
async fn bulk_create_reports_duplicates() {
    let client = client_or_skip!();
    let app = app(&client);
    let body = json!([{ "email": "one@example.com" }, { "email": "two@example.com" }]);

    let (status, first) = send(&app, "POST", "/api/v1/users/bulk", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["meta"]["count"], json!(2));

    let (status, err) = send(&app, "POST", "/api/v1/users/bulk", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], json!("unique_violation"));

    let (status, skipped) = send(&app, "POST", "/api/v1/users/bulk?skipDuplicates=true", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(skipped["meta"]["count"], json!(0));
}

#[tokio::test]
async fn ready_when_database_answers() {
    let client = client_or_skip!();
    let (status, _) = send(&app(&client), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn secrets_and_lossy_amounts_are_refused() {
    let client = client_or_skip!();
    let app = app(&client);
    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some(json!({ "email": "secret@example.com", "password": "$2b$10$secrethash" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = created["data"]["id"].as_str().unwrap().to_string();

    // where={"password":{"startsWith":"$2b"}}
    let by_password = "/api/v1/users?where=%7B%22password%22%3A%7B%22startsWith%22%3A%22%242b%22%7D%7D";
    for uri in [
        by_password,
        "/api/v1/users?password=x",
        "/api/v1/users?orderBy=password",
        "/api/v1/users/count?resetToken=x",
    ] {
        let (status, body) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
    }

    let (status, _) = send(&app, "GET", "/api/v1/orders/count?take=1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/orders",
        Some(json!({ "userId": user_id, "totalAmount": "0.123456789012345678901234567891234" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
