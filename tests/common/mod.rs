#![allow(dead_code)]

use std::{io::Cursor, sync::Arc};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use contacts_api::{app::build_app, config::AppConfig, mail::MemoryMailer, AppState};
use image::{DynamicImage, ImageFormat};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    /// Public dir; removed when the app is dropped.
    pub dir: TempDir,
}

/// Router over in-memory stores and a recording mailer.
pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::in_memory(AppConfig::test_default(dir.path()), mailer.clone());
    TestApp {
        router: build_app(state.clone()),
        state,
        mailer,
        dir,
    }
}

pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// JSON content type over an arbitrary, possibly malformed, body.
pub fn raw_json_request(method: Method, uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub const BOUNDARY: &str = "contacts-api-test-boundary";

/// One-part multipart body.
pub fn multipart_request(
    uri: &str,
    token: &str,
    field: &str,
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    match file {
        Some((file_name, content_type, bytes)) => {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
        }
        None => {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\nhello")
                    .as_bytes(),
            );
        }
    }
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

/// Sends `req` and returns the status with the JSON body (`Null` when empty).
pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

pub async fn register(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        &app.router,
        json_request(
            Method::POST,
            "/api/users/register",
            json!({ "username": "tester", "email": email, "password": password }),
            None,
        ),
    )
    .await
}

pub async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        &app.router,
        json_request(
            Method::POST,
            "/api/users/login",
            json!({ "email": email, "password": password }),
            None,
        ),
    )
    .await
}

/// Verification token taken from the last mail sent to `email`.
pub async fn mailed_token(app: &TestApp, email: &str) -> String {
    let mail = app.mailer.last_to(email).await.expect("verification mail");
    let start = mail.html.find("/verify/").expect("link in mail") + "/verify/".len();
    let rest = &mail.html[start..];
    let end = rest.find('"').expect("end of link");
    rest[..end].to_string()
}

pub async fn verify(app: &TestApp, token: &str) -> (StatusCode, Value) {
    send(
        &app.router,
        empty_request(Method::GET, &format!("/api/users/verify/{token}"), None),
    )
    .await
}

/// Registers, verifies and logs in; returns the session token.
pub async fn signed_in(app: &TestApp, email: &str) -> String {
    let (status, _) = register(app, email, "secret-pass").await;
    assert_eq!(status, StatusCode::CREATED);
    let token = mailed_token(app, email).await;
    let (status, _) = verify(app, &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = login(app, email, "secret-pass").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token").to_string()
}

pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}
