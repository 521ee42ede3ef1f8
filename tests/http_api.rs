#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot

use gigbook::routes::api_router;

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_login_and_access_protected_route() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let app = api_router(Arc::new(ctx.state.clone()));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/create-account",
            None,
            json!({ "name": "Jo", "email": "jo@example.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "jo@example.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();

    // No token: rejected before any handler runs.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/clients/get-all-clients")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // With the bearer token the same route answers.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/clients/get-all-clients")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!([]));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let app = api_router(Arc::new(ctx.state.clone()));

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/create-account",
            None,
            json!({ "name": "Jo", "email": "jo@example.com", "password": "secret123" }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "jo@example.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn validation_errors_surface_as_bad_request() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let app = api_router(Arc::new(ctx.state.clone()));

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/create-account",
            None,
            json!({ "name": "Jo", "email": "jo@example.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "jo@example.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    let token = response_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    // Client without a name.
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/clients/create-client",
            Some(&token),
            json!({ "name": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));

    common::teardown(Some(ctx)).await;
}
