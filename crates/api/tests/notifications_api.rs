mod common;

use axum::http::StatusCode;
use common::{delete_auth, expect_json, get_auth, post_auth, post_json_auth};
use naoty_core::roles::Role;
use serde_json::json;
use sqlx::PgPool;

async fn list(app: &axum::Router, uri: &str, user: &common::TestUser) -> serde_json::Value {
    expect_json(get_auth(app.clone(), uri, &user.token).await, StatusCode::OK).await
}

/// Submit a note so the chef receives a VALIDATION_REQUESTED notification.
async fn seed(pool: &PgPool) -> (axum::Router, common::TestUser, common::TestUser) {
    let author = common::create_user(pool, "fatou", &[Role::Redacteur]).await;
    let chef = common::create_user(pool, "gora", &[Role::ChefDepartement]).await;
    let app = common::build_test_app(pool.clone());

    let note = expect_json(
        post_json_auth(
            app.clone(),
            "/api/v1/notes",
            &author.token,
            json!({ "title": "Note de service", "content": "Horaires", "type": "ANNONCE" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let id = note["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/notes/{id}/submit");
    expect_json(post_auth(app.clone(), &uri, &author.token).await, StatusCode::OK).await;

    (app, author, chef)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submission_notifies_first_level_validators_only(pool: PgPool) {
    let (app, author, chef) = seed(&pool).await;

    let json = list(&app, "/api/v1/notifications", &chef).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["type"], "VALIDATION_REQUESTED");
    assert_eq!(items[0]["is_read"], false);

    // The actor is not notified of their own action.
    let json = list(&app, "/api/v1/notifications", &author).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn read_all_is_idempotent(pool: PgPool) {
    let (app, _author, chef) = seed(&pool).await;

    let count = list(&app, "/api/v1/notifications/unread-count", &chef).await;
    assert_eq!(count["data"]["count"], 1);

    for expected in [1, 0] {
        let json = expect_json(
            post_auth(app.clone(), "/api/v1/notifications/read-all", &chef.token).await,
            StatusCode::OK,
        )
        .await;
        assert_eq!(json["data"]["marked_read"], expected);
    }

    let count = list(&app, "/api/v1/notifications/unread-count", &chef).await;
    assert_eq!(count["data"]["count"], 0);

    let unread = list(&app, "/api/v1/notifications?unread_only=true", &chef).await;
    assert!(unread["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn single_notification_read_and_delete(pool: PgPool) {
    let (app, author, chef) = seed(&pool).await;

    let json = list(&app, "/api/v1/notifications", &chef).await;
    let id = json["data"][0]["id"].as_i64().unwrap();
    let read_uri = format!("/api/v1/notifications/{id}/read");

    // Someone else's notification is invisible.
    let response = post_auth(app.clone(), &read_uri, &author.token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for _ in 0..2 {
        let response = post_auth(app.clone(), &read_uri, &chef.token).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let uri = format!("/api/v1/notifications/{id}");
    for _ in 0..2 {
        let response = delete_auth(app.clone(), &uri, &chef.token).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let json = list(&app, "/api/v1/notifications", &chef).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn notifications_require_authentication(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = expect_json(
        common::get(app, "/api/v1/notifications").await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}
