mod common;

use axum::http::StatusCode;
use common::{expect_json, get_auth, post_json_auth};
use naoty_core::roles::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_and_authors_read_templates(pool: PgPool) {
    let admin = common::create_user(&pool, "admin", &[Role::Admin]).await;
    let author = common::create_user(&pool, "hawa", &[Role::Redacteur]).await;
    let app = common::build_test_app(pool);

    let body = json!({
        "name": "Convocation CA",
        "type": "CONVOCATION",
        "title": "Conseil d'administration",
    });
    let created = expect_json(
        post_json_auth(app.clone(), "/api/v1/templates", &admin.token, body).await,
        StatusCode::CREATED,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["note_type"], "CONVOCATION");
    assert_eq!(created["data"]["created_by"], admin.id);

    let list = expect_json(
        get_auth(app.clone(), "/api/v1/templates", &author.token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let one = expect_json(
        get_auth(app.clone(), &format!("/api/v1/templates/{id}"), &author.token).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(one["data"]["name"], "Convocation CA");

    let missing = expect_json(
        get_auth(app, "/api/v1/templates/999999", &author.token).await,
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(missing["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn template_creation_needs_manage_permission_and_unique_names(pool: PgPool) {
    let admin = common::create_user(&pool, "admin", &[Role::Admin]).await;
    let author = common::create_user(&pool, "ibou", &[Role::Redacteur]).await;
    let de = common::create_user(&pool, "jeanne", &[Role::DirecteurExecutif]).await;
    let app = common::build_test_app(pool);
    let body = json!({ "name": "Rapport mensuel", "type": "RAPPORT" });

    // Reading templates does not grant managing them.
    for user in [&author, &de] {
        let json = expect_json(
            post_json_auth(app.clone(), "/api/v1/templates", &user.token, body.clone()).await,
            StatusCode::FORBIDDEN,
        )
        .await;
        assert_eq!(json["code"], "PERMISSION_DENIED");
    }

    expect_json(
        post_json_auth(app.clone(), "/api/v1/templates", &admin.token, body.clone()).await,
        StatusCode::CREATED,
    )
    .await;
    let json = expect_json(
        post_json_auth(app.clone(), "/api/v1/templates", &admin.token, body).await,
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(json["code"], "CONFLICT");

    let blank = json!({ "name": "  ", "type": "AUTRE" });
    let json = expect_json(
        post_json_auth(app, "/api/v1/templates", &admin.token, blank).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn destinataire_cannot_browse_templates(pool: PgPool) {
    let reader = common::create_user(&pool, "jules", &[Role::Destinataire]).await;
    let app = common::build_test_app(pool);

    let json = expect_json(
        get_auth(app, "/api/v1/templates", &reader.token).await,
        StatusCode::FORBIDDEN,
    )
    .await;
    assert_eq!(json["code"], "PERMISSION_DENIED");
}
