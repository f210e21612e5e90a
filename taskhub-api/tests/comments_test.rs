/// Integration tests for the comment endpoints

mod common;

use axum::http::StatusCode;
use common::{ids, TestContext};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_comment_on_invisible_task_is_not_found() {
    let ctx = TestContext::new().await;
    let task = ctx.create_task(&ctx.alice, "Private", &[]).await;

    let (read_status, read_body) = ctx.get(&format!("/v1/tasks/{task}"), ctx.bob.token()).await;
    let (status, body) = ctx
        .post(
            "/v1/comments",
            ctx.bob.token(),
            json!({ "task": task, "content": "let me in" }),
        )
        .await;

    assert_eq!(read_status, StatusCode::NOT_FOUND);
    assert_eq!(status, read_status);
    assert_eq!(body, read_body);

    let (status, _) = ctx
        .post(
            "/v1/comments",
            ctx.bob.token(),
            json!({ "task": Uuid::new_v4(), "content": "anyone?" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, comments) = ctx.get("/v1/comments", ctx.admin.token()).await;
    assert!(ids(&comments).is_empty());
}

#[tokio::test]
async fn test_author_comes_from_the_caller() {
    let ctx = TestContext::new().await;
    let task = ctx.create_task(&ctx.alice, "Review", &[ctx.bob.id()]).await;

    let (status, body) = ctx
        .post(
            "/v1/comments",
            ctx.bob.token(),
            json!({ "task": task, "content": "Looks good", "user": ctx.admin.id() }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"], ctx.bob.id().to_string());
    assert_eq!(body["user_name"], "bob");
    assert_eq!(body["task"], task.to_string());
}

#[tokio::test]
async fn test_comments_are_listed_in_creation_order() {
    let ctx = TestContext::new().await;
    let first = ctx.create_task(&ctx.alice, "First", &[]).await;
    let second = ctx.create_task(&ctx.alice, "Second", &[]).await;

    for (task, content) in [(first, "one"), (second, "other"), (first, "two")] {
        let (status, _) = ctx
            .post(
                "/v1/comments",
                ctx.alice.token(),
                json!({ "task": task, "content": content }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx
        .get(&format!("/v1/comments?task={first}"), ctx.bob.token())
        .await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["one", "two"]);

    let (_, body) = ctx.get("/v1/comments", ctx.alice.token()).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, detail) = ctx.get(&format!("/v1/tasks/{first}"), ctx.alice.token()).await;
    assert_eq!(detail["comments"][0]["content"], "one");
    assert_eq!(detail["comments"][1]["content"], "two");
    assert_eq!(detail["comments"][1]["user_name"], "Alice Smith");
}

#[tokio::test]
async fn test_only_author_or_elevated_may_change_a_comment() {
    let ctx = TestContext::new().await;
    let task = ctx.create_task(&ctx.alice, "Discuss", &[ctx.bob.id()]).await;

    let (_, comment) = ctx
        .post(
            "/v1/comments",
            ctx.alice.token(),
            json!({ "task": task, "content": "draft" }),
        )
        .await;
    let uri = format!("/v1/comments/{}", comment["id"].as_str().unwrap());

    let (status, _) = ctx.patch(&uri, ctx.bob.token(), json!({ "content": "mine now" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .patch(
            &uri,
            ctx.manager.token(),
            json!({ "content": "edited", "task": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "edited");
    assert_eq!(body["task"], task.to_string());
    assert_eq!(body["user"], ctx.alice.id().to_string());

    let (status, _) = ctx.put(&uri, ctx.alice.token(), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx.delete(&uri, ctx.bob.token()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, ctx.alice.token()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_comment_validation() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.post("/v1/comments", ctx.alice.token(), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"task"));
    assert!(fields.contains(&"content"));

    let (status, body) = ctx
        .post(
            "/v1/comments",
            ctx.alice.token(),
            json!({ "task": "nope", "content": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "task");

    let (status, _) = ctx.get("/v1/comments", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
