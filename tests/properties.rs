//! Schema guarantees checked against a real database.

mod common;

use common::{dec, order, user};
use photo_orders::{
    AppError, Conn, CrudService, NewAccount, NewProfile, NewUploadedPhoto, NewUser, OrderStatus, Patch,
    PaymentStatus, Unique, Where,
};
use serde_json::json;

#[tokio::test]
async fn duplicate_email_is_a_unique_violation() {
    let client = client_or_skip!();
    user(&client, "dup@example.com").await;
    let err = client
        .user()
        .create(NewUser::with_email("dup@example.com"))
        .await
        .unwrap_err();
    match err {
        AppError::UniqueViolation { constraint, .. } => assert_eq!(constraint, "users_email_key"),
        other => panic!("expected unique violation, got {other:?}"),
    }
    assert_eq!(client.user().count(Where::all()).await.unwrap(), 1);
}

#[tokio::test]
async fn users_without_email_do_not_collide() {
    let client = client_or_skip!();
    client.user().create(NewUser::default()).await.unwrap();
    client.user().create(NewUser::default()).await.unwrap();
    assert_eq!(client.user().count(Where::is_null("email")).await.unwrap(), 2);
}

#[tokio::test]
async fn photo_needs_existing_order_and_follows_its_deletion() {
    let client = client_or_skip!();
    let u = user(&client, "photos@example.com").await;
    let o = order(&client, &u.id, "49.00").await;

    let photo = client
        .uploaded_photo()
        .create(NewUploadedPhoto {
            url: "https://img.example/1.png".into(),
            order_id: o.id.clone(),
            ..NewUploadedPhoto::default()
        })
        .await
        .unwrap();
    assert_eq!(photo.order_id, o.id);

    let orphan = client
        .uploaded_photo()
        .create(NewUploadedPhoto {
            url: "https://img.example/2.png".into(),
            order_id: "missing".into(),
            ..NewUploadedPhoto::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(orphan, AppError::ForeignKeyViolation { .. }), "{orphan:?}");

    client.order().delete(Unique::id(o.id.clone())).await.unwrap();
    assert!(client
        .uploaded_photo()
        .find_unique(Unique::id(photo.id))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn deleting_a_user_cascades_to_orders_and_profile() {
    let client = client_or_skip!();
    let u = user(&client, "gone@example.com").await;
    order(&client, &u.id, "1.00").await;
    client
        .profile()
        .create(NewProfile {
            user_id: u.id.clone(),
            ..NewProfile::default()
        })
        .await
        .unwrap();

    client.user().delete(Unique::id(u.id.clone())).await.unwrap();
    assert_eq!(client.order().count(Where::eq("user_id", u.id.clone())).await.unwrap(), 0);
    assert_eq!(client.profile().count(Where::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn account_uniqueness_is_per_provider_pair() {
    let client = client_or_skip!();
    let u = user(&client, "oauth@example.com").await;
    let account = |provider: &str, id: &str| NewAccount {
        user_id: u.id.clone(),
        type_: "oauth".into(),
        provider: provider.into(),
        provider_account_id: id.into(),
        ..NewAccount::default()
    };

    client.account().create(account("github", "1")).await.unwrap();
    client.account().create(account("github", "2")).await.unwrap();
    client.account().create(account("google", "1")).await.unwrap();
    let err = client.account().create(account("github", "1")).await.unwrap_err();
    assert!(matches!(err, AppError::UniqueViolation { .. }), "{err:?}");

    let found = client
        .account()
        .find_unique(Unique::compound([("provider", "google"), ("provider_account_id", "1")]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.provider, "google");
}

#[tokio::test]
async fn order_enums_accept_only_their_literals() {
    let client = client_or_skip!();
    let u = user(&client, "enums@example.com").await;
    let o = order(&client, &u.id, "10.00").await;
    assert_eq!(o.status, OrderStatus::Pending);
    assert_eq!(o.payment_status, PaymentStatus::Pending);

    for status in OrderStatus::ALL {
        let updated = client
            .order()
            .update(Unique::id(o.id.clone()), Patch::new().set("status", *status))
            .await
            .unwrap();
        assert_eq!(updated.status, *status);
    }

    let err = client
        .order()
        .update(Unique::id(o.id.clone()), Patch::new().set("payment_status", "SHIPPED"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    // the database enforces the same set when the client is bypassed
    let raw = client
        .execute_raw(
            &format!(
                "UPDATE {} SET payment_status = $1::text::{} WHERE id = $2",
                client.model().entity("order").unwrap().qualified_table(),
                client.model().entity("order").unwrap().column("payment_status").unwrap().pg_type
            ),
            &[json!("SHIPPED"), json!(o.id)],
        )
        .await
        .unwrap_err();
    assert!(matches!(raw, AppError::Validation(_)), "{raw:?}");
}

#[tokio::test]
async fn a_user_has_at_most_one_profile() {
    let client = client_or_skip!();
    let u = user(&client, "profile@example.com").await;
    let new_profile = || NewProfile {
        user_id: u.id.clone(),
        style: Some("film".into()),
        ..NewProfile::default()
    };
    client.profile().create(new_profile()).await.unwrap();
    let err = client.profile().create(new_profile()).await.unwrap_err();
    assert!(matches!(err, AppError::UniqueViolation { .. }), "{err:?}");

    let with_profile = client
        .user()
        .find_unique_with(Unique::id(u.id.clone()), &["profile"])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(with_profile.profile.unwrap().style.as_deref(), Some("film"));
}

#[tokio::test]
async fn total_amount_keeps_every_digit() {
    let client = client_or_skip!();
    let u = user(&client, "money@example.com").await;
    for amount in ["0.10", "19.99", "1234567890123456.123456789", "0.0000000001"] {
        let o = order(&client, &u.id, amount).await;
        let back = client.order().find_unique_or_throw(Unique::id(o.id)).await.unwrap();
        assert_eq!(back.total_amount, dec(amount));
        assert_eq!(back.total_amount.to_string(), amount);
    }

    // more digits than Decimal holds: refused instead of stored and read back rounded
    let too_precise = "0.123456789012345678901234567891234";
    let entity = client.model().entity("order").unwrap();
    let body = json!({ "user_id": u.id, "total_amount": too_precise });
    let err = CrudService::create(Conn::Pool(client.pool()), entity, body.as_object().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    let existing = client.order().find_first(Where::eq("user_id", u.id.clone())).await.unwrap().unwrap();
    let err = client
        .order()
        .update(Unique::id(existing.id), Patch::new().set("total_amount", too_precise))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");
    assert_eq!(client.order().count(Where::eq("user_id", u.id.clone())).await.unwrap(), 4);
}
