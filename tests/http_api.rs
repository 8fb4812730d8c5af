mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::setup;
use social_hub::create_social_router;

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_sign_up_post_and_like_over_http() {
    let app = setup().await;
    let router = create_social_router(app.social.clone());

    let (status, session) = call(
        &router,
        Method::POST,
        "/auth/sign-up",
        None,
        Some(json!({ "email": "ada@example.com", "password": "password123", "username": "ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = session["access_token"].as_str().unwrap().to_string();

    let (status, created) = call(
        &router,
        Method::POST,
        "/posts",
        Some(&token),
        Some(json!({ "content": "over the wire" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let post_id = created["id"].as_i64().unwrap();

    let (status, liked) = call(&router, Method::POST, &format!("/posts/{}/like", post_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["liked"], json!(true));

    let (status, feed) = call(&router, Method::GET, "/feed/for-you", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["data"][0]["caption"], json!("over the wire"));
    assert_eq!(feed["data"][0]["likes"], json!(1));
}

#[tokio::test]
async fn test_lists_fail_empty_without_session() {
    let app = setup().await;
    let router = create_social_router(app.social.clone());

    let (status, body) = call(&router, Method::GET, "/feed/explore", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["error"], json!("Auth session missing!"));

    let (status, body) = call(&router, Method::GET, "/notifications", Some("stale-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_error_statuses() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let router = create_social_router(app.social.clone());

    let (status, body) = call(&router, Method::POST, &format!("/users/{}/follow", ada.id), Some(&ada.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("You cannot follow yourself"));

    let (status, _) = call(&router, Method::GET, "/feed/trending", Some(&ada.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&router, Method::GET, "/posts/12345", Some(&ada.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &router,
        Method::POST,
        "/auth/sign-in",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid login credentials"));
}

#[tokio::test]
async fn test_messages_over_http() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let router = create_social_router(app.social.clone());

    let (status, sent) = call(
        &router,
        Method::POST,
        &format!("/conversations/{}/messages", bob.id),
        Some(&ada.token),
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["from"], json!("you"));

    let (_, conversations) = call(&router, Method::GET, "/conversations", Some(&bob.token), None).await;
    assert_eq!(conversations["data"][0]["unread"], json!(1));
    assert_eq!(conversations["data"][0]["lastMessage"], json!("hello"));

    let (_, thread) = call(
        &router,
        Method::GET,
        &format!("/conversations/{}/messages", ada.id),
        Some(&bob.token),
        None,
    )
    .await;
    assert_eq!(thread["data"][0]["from"], json!("them"));
}
