mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, body_json, empty_request, json_request};

async fn create(app: &TestApp, title: &str) -> i64 {
    let res = app
        .send(json_request(
            "POST",
            "/conversations",
            json!({ "title": title, "model_type": "tinyLlama" }),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn crud_lifecycle() {
    let app = TestApp::new();
    let id = create(&app, "first").await;
    create(&app, "second").await;

    let res = app.send(empty_request("GET", &format!("/conversations/{}", id))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["title"], "first");

    let res = app.send(empty_request("GET", "/conversations?skip=1&take=10")).await;
    let listed = body_json(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let res = app
        .send(json_request(
            "PUT",
            &format!("/conversations/{}", id),
            json!({ "title": "renamed", "model_type": "gemma2b" }),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let updated = body_json(res).await;
    assert_eq!(updated["title"], "renamed");
    assert_eq!(updated["model_type"], "gemma2b");

    let res = app.send(empty_request("DELETE", &format!("/conversations/{}", id))).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.send(empty_request("GET", &format!("/conversations/{}", id))).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["detail"], "Conversation not found");
}

#[tokio::test]
async fn missing_conversations_are_not_found() {
    let app = TestApp::new();

    let res = app
        .send(json_request(
            "PUT",
            "/conversations/42",
            json!({ "title": "x", "model_type": "tinyLlama" }),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(empty_request("DELETE", "/conversations/42")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(empty_request("GET", "/conversations/42/messages")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(empty_request("POST", "/generate/message/42?prompt=hello")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn messages_are_stored_and_cascade_on_delete() {
    let app = TestApp::new();
    let id = create(&app, "chat").await;

    let res = app
        .send(empty_request("GET", &format!("/conversations/{}/messages", id)))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!([]));

    let res = app
        .send(empty_request(
            "POST",
            &format!("/generate/message/{}?prompt=hello%20there", id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let reply = body_json(res).await;
    assert_eq!(reply["model"], "tinyLlama");
    assert_eq!(reply["content"], "echo hello there");

    // Stored in the background after the response.
    let mut messages = json!([]);
    for _ in 0..50 {
        let res = app
            .send(empty_request("GET", &format!("/conversations/{}/messages", id)))
            .await;
        messages = body_json(res).await;
        if !messages.as_array().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["prompt_content"], "hello there");
    assert_eq!(messages[0]["response_content"], "echo hello there");
    assert_eq!(messages[0]["prompt_tokens"], 2);
    assert_eq!(messages[0]["response_tokens"], 3);
    assert_eq!(messages[0]["total_tokens"], 5);
    assert_eq!(messages[0]["is_success"], true);

    let res = app.send(empty_request("DELETE", &format!("/conversations/{}", id))).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .send(empty_request("GET", &format!("/conversations/{}/messages", id)))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let orphans = app.state.db.list_messages(id).unwrap();
    assert!(orphans.is_empty());
}
