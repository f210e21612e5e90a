/// Integration tests for health, token issuance, categories and request
/// body handling

mod common;

use axum::http::StatusCode;
use common::{TestContext, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn test_token_issue_and_refresh() {
    let ctx = TestContext::new().await;

    let (status, tokens) = ctx
        .post(
            "/v1/auth/token",
            None,
            json!({ "username": "mia", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, me) = ctx.get("/v1/users/me", tokens["access"].as_str()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "manager");

    let (status, refreshed) = ctx
        .post(
            "/v1/auth/token/refresh",
            None,
            json!({ "refresh": tokens["refresh"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["access"].as_str().is_some());

    // a refresh token is not an access token, and vice versa
    let (status, _) = ctx.get("/v1/users/me", tokens["refresh"].as_str()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .post(
            "/v1/auth/token/refresh",
            None,
            json!({ "refresh": tokens["access"] }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_credentials_look_the_same() {
    let ctx = TestContext::new().await;

    let (wrong_status, wrong) = ctx
        .post(
            "/v1/auth/token",
            None,
            json!({ "username": "mia", "password": "Wr0ng!Password" }),
        )
        .await;
    let (unknown_status, unknown) = ctx
        .post(
            "/v1/auth/token",
            None,
            json!({ "username": "nobody", "password": PASSWORD }),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn test_categories_are_for_managers_and_admins() {
    let ctx = TestContext::new().await;

    let (status, _) = ctx
        .post("/v1/categories", ctx.alice.token(), json!({ "name": "Backend" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.get("/v1/categories", ctx.alice.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = ctx
        .post("/v1/categories", ctx.manager.token(), json!({ "name": "Backend" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["color"], "#007bff");

    let uri = format!("/v1/categories/{}", created["id"].as_str().unwrap());

    let (status, body) = ctx
        .patch(&uri, ctx.admin.token(), json!({ "color": "blue" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "color");

    let (status, body) = ctx
        .put(
            &uri,
            ctx.admin.token(),
            json!({ "name": "Infra", "description": "Servers", "color": "#112233" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Infra");
    assert_eq!(body["description"], "Servers");

    let (status, _) = ctx.delete(&uri, ctx.alice.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, ctx.manager.token()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&uri, ctx.manager.token()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tasks_render_category_names() {
    let ctx = TestContext::new().await;

    let (_, category) = ctx
        .post("/v1/categories", ctx.manager.token(), json!({ "name": "Frontend" }))
        .await;

    let (status, task) = ctx
        .post(
            "/v1/tasks",
            ctx.alice.token(),
            json!({
                "title": "Polish buttons",
                "due_date": "2030-01-01",
                "categories": [category["id"]],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    assert_eq!(task["categories"], json!([category["id"]]));
    assert_eq!(task["category_names"], json!(["Frontend"]));

    let uri = format!("/v1/tasks?category={}", category["id"].as_str().unwrap());
    let (_, body) = ctx.get(&uri, ctx.alice.token()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // removing the category leaves the task in place
    ctx.delete(
        &format!("/v1/categories/{}", category["id"].as_str().unwrap()),
        ctx.admin.token(),
    )
    .await;

    let (status, body) = ctx
        .get(&format!("/v1/tasks/{}", task["id"].as_str().unwrap()), ctx.alice.token())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!([]));
}

#[tokio::test]
async fn test_malformed_json_uses_error_shape() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/users",
            None,
            Some(json!({ "username": 42 })),
        )
        .await;
    assert!(status.is_client_error());
    assert!(body["error"].as_str().is_some());
    assert!(body["message"].as_str().is_some());
}
