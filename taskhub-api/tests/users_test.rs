/// Integration tests for registration, profiles and user administration

mod common;

use axum::http::StatusCode;
use common::{TestContext, PASSWORD};
use serde_json::json;
use taskhub_shared::auth::password::verify_password;
use taskhub_shared::store::EntityStore;

#[tokio::test]
async fn test_anonymous_registration_then_me() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/v1/users",
            None,
            json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "password": "Str0ng!Pass",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "employee");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
    assert!(!body.to_string().contains("Str0ng!Pass"));

    let (status, tokens) = ctx
        .post(
            "/v1/auth/token",
            None,
            json!({ "username": "newbie", "password": "Str0ng!Pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, me) = ctx.get("/v1/users/me", tokens["access"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], body["id"]);
    assert_eq!(me["username"], "newbie");
    assert_eq!(me["role"], "employee");
    assert_eq!(me["role_display"], "Employee");
    assert_eq!(me["display_name"], "newbie");
    assert!(me.get("password").is_none());
}

#[tokio::test]
async fn test_profile_update_keeps_or_rehashes_credential() {
    let ctx = TestContext::new().await;
    let original = ctx.alice.user.password_hash.clone();

    let (status, body) = ctx
        .patch(
            "/v1/users/update_profile",
            ctx.alice.token(),
            json!({ "first_name": "Alicia" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["display_name"], "Alicia Smith");

    let stored = ctx.store.get_user(ctx.alice.id()).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, original);

    let (status, body) = ctx
        .patch(
            "/v1/users/update_profile",
            ctx.alice.token(),
            json!({ "password": "N3w!Passw0rd" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.to_string().contains("N3w!Passw0rd"));

    let stored = ctx.store.get_user(ctx.alice.id()).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, original);
    assert!(verify_password("N3w!Passw0rd", &stored.password_hash).unwrap());
    assert!(!verify_password(PASSWORD, &stored.password_hash).unwrap());

    let (status, _) = ctx
        .post(
            "/v1/auth/token",
            None,
            json!({ "username": "alice", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_put_is_partial() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .put(
            "/v1/users/update_profile",
            ctx.alice.token(),
            json!({ "first_name": "Alicia" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["username"], "alice");
    assert_eq!(body["first_name"], "Alicia");
    assert_eq!(body["last_name"], "Smith");
}

#[tokio::test]
async fn test_only_admins_manage_other_accounts() {
    let ctx = TestContext::new().await;
    let bob = format!("/v1/users/{}", ctx.bob.id());

    let (status, _) = ctx.get("/v1/users", ctx.alice.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.get("/v1/users", ctx.manager.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.get("/v1/users", ctx.admin.token()).await;
    assert_eq!(status, StatusCode::OK);
    let usernames: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(usernames, vec!["alice", "bob", "mia", "root"]);

    let (status, _) = ctx.get(&bob, ctx.alice.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.patch(&bob, ctx.manager.token(), json!({ "first_name": "B" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.get(&bob, ctx.bob.token()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.delete(&bob, ctx.manager.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&bob, ctx.admin.token()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&bob, ctx.admin.token()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_is_admin_only_and_read_per_request() {
    let ctx = TestContext::new().await;
    ctx.create_task(&ctx.bob, "Bob's", &[]).await;

    let (status, body) = ctx
        .patch(
            "/v1/users/update_profile",
            ctx.alice.token(),
            json!({ "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "employee");

    let (_, tasks) = ctx.get("/v1/tasks", ctx.alice.token()).await;
    assert!(tasks.as_array().unwrap().is_empty());

    let (status, body) = ctx
        .patch(
            &format!("/v1/users/{}", ctx.alice.id()),
            ctx.admin.token(),
            json!({ "role": "manager" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "manager");

    // same token, new role
    let (_, tasks) = ctx.get("/v1/tasks", ctx.alice.token()).await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_registration_validation() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/v1/users",
            None,
            json!({ "username": "alice", "password": "Str0ng!Pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "username");

    let (status, body) = ctx
        .post("/v1/users", None, json!({ "username": "weak", "password": "weak" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "password");

    let (status, body) = ctx
        .post(
            "/v1/users",
            None,
            json!({ "username": "bad-mail", "email": "nowhere", "password": "Str0ng!Pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, body) = ctx
        .post(
            "/v1/users",
            None,
            json!({ "username": "no-mail", "email": "", "password": "Str0ng!Pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["email"], "");
}

#[tokio::test]
async fn test_token_for_deleted_user_is_rejected() {
    let ctx = TestContext::new().await;

    let (status, _) = ctx
        .delete(&format!("/v1/users/{}", ctx.bob.id()), ctx.admin.token())
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get("/v1/users/me", ctx.bob.token()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleting_a_user_cascades_to_created_tasks() {
    let ctx = TestContext::new().await;
    let owned = ctx.create_task(&ctx.bob, "Bob's", &[]).await;
    let assigned = ctx.create_task(&ctx.alice, "Alice's", &[ctx.bob.id()]).await;

    ctx.delete(&format!("/v1/users/{}", ctx.bob.id()), ctx.admin.token())
        .await;

    let (status, _) = ctx.get(&format!("/v1/tasks/{owned}"), ctx.admin.token()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .get(&format!("/v1/tasks/{assigned}"), ctx.admin.token())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned_to"], json!([]));
}
