use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use usersdesk::{app::build_app, state::AppState};

const BOUNDARY: &str = "usersdeskBoundary";

struct FilePart<'a> {
    file_name: &'a str,
    content_type: &'a str,
    bytes: &'a [u8],
}

fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(f) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"profile\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                f.file_name, f.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(f.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn person(first: &str, email: &str) -> Vec<(&'static str, String)> {
    vec![
        ("firstName", first.to_string()),
        ("lastName", "Doe".to_string()),
        ("email", email.to_string()),
        ("mobile", "555-0100".to_string()),
        ("gender", "Female".to_string()),
        ("status", "Active".to_string()),
        ("location", "Lisbon".to_string()),
    ]
}

fn form_request(method: &str, uri: &str, fields: &[(&str, String)], file: Option<FilePart<'_>>) -> Request<Body> {
    let fields: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(&fields, file)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, req).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn create(app: &Router, first: &str, email: &str) -> Value {
    let (status, body) =
        send_json(app, form_request("POST", "/api/users", &person(first, email), None)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn create_returns_record_with_defaults() {
    let app = build_app(AppState::fake());
    let mut fields = person("Ann", "Ann@Example.com");
    fields.retain(|(k, _)| *k != "status");

    let (status, headers, body) =
        send(&app, form_request("POST", "/api/users", &fields, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let user: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(user["email"], "ann@example.com");
    assert_eq!(user["status"], "Active");
    assert_eq!(user["profile"], "");
    assert!(user["createdAt"].is_string());

    let location = headers.get(header::LOCATION).unwrap().to_str().unwrap();
    assert_eq!(location, format!("/api/users/{}", user["_id"].as_str().unwrap()));
}

#[tokio::test]
async fn missing_fields_and_duplicates_are_rejected() {
    let app = build_app(AppState::fake());
    let mut partial = person("Ann", "ann@x.com");
    partial.retain(|(k, _)| *k != "mobile" && *k != "location");
    let (status, body) = send_json(&app, form_request("POST", "/api/users", &partial, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("mobile"), "{message}");

    create(&app, "Ann", "ann@x.com").await;
    let (status, body) = send_json(
        &app,
        form_request("POST", "/api/users", &person("Other", "ANN@x.com"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn list_is_newest_first_and_paginated() {
    let app = build_app(AppState::fake());
    create(&app, "Bob", "bob@x.com").await;
    create(&app, "Cara", "cara@x.com").await;

    let (status, page1) = send_json(&app, get("/api/users?page=1&limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page1["total"], 2);
    assert_eq!(page1["pages"], 2);
    assert_eq!(page1["page"], 1);
    assert_eq!(page1["users"][0]["firstName"], "Cara");

    let (_, page2) = send_json(&app, get("/api/users?page=2&limit=1")).await;
    assert_eq!(page2["users"][0]["firstName"], "Bob");

    let (_, defaults) = send_json(&app, get("/api/users?page=zero&limit=-1")).await;
    assert_eq!(defaults["page"], 1);
    assert_eq!(defaults["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_matches_names_and_email() {
    let app = build_app(AppState::fake());
    create(&app, "Bob", "bob@x.com").await;
    create(&app, "Cara", "cara@mail.org").await;

    let (_, found) = send_json(&app, get("/api/users?search=MAIL.ORG")).await;
    assert_eq!(found["total"], 1);
    assert_eq!(found["users"][0]["firstName"], "Cara");

    let (status, none) = send_json(&app, get("/api/users?search=zzz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none["total"], 0);
    assert_eq!(none["pages"], 0);
    assert!(none["users"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn get_and_delete_lifecycle() {
    let app = build_app(AppState::fake());
    let user = create(&app, "Dan", "dan@x.com").await;
    let uri = format!("/api/users/{}", user["_id"].as_str().unwrap());

    let (status, fetched) = send_json(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, user);

    let delete = || Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap();
    let (status, ack) = send_json(&app, delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["message"], "User deleted successfully");

    let (status, body) = send_json(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, _) = send_json(&app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_id_is_server_error_on_get() {
    let app = build_app(AppState::fake());
    let (status, body) = send_json(&app, get("/api/users/not-an-id")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn update_keeps_profile_unless_a_file_is_sent() {
    let app = build_app(AppState::fake());
    let png = |file_name| FilePart {
        file_name,
        content_type: "image/png",
        bytes: b"\x89PNGfake",
    };
    let (status, user) = send_json(
        &app,
        form_request("POST", "/api/users", &person("Eve", "eve@x.com"), Some(png("me.png"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let original = user["profile"].as_str().unwrap().to_string();
    assert!(original.starts_with("uploads/"));

    let (status, _, served) = send(&app, get(&format!("/{}", original))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, b"\x89PNGfake");

    let uri = format!("/api/users/{}", user["_id"].as_str().unwrap());
    let (status, updated) = send_json(
        &app,
        form_request("PUT", &uri, &[("location", "Porto".to_string())], None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "Porto");
    assert_eq!(updated["firstName"], "Eve");
    assert_eq!(updated["profile"], original.as_str());

    let (status, replaced) = send_json(
        &app,
        form_request("PUT", &uri, &[("status", "InActive".to_string())], Some(png("new.png"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["status"], "Inactive");
    assert_ne!(replaced["profile"], original.as_str());
}

#[tokio::test]
async fn update_of_missing_user_is_not_found() {
    let app = build_app(AppState::fake());
    let uri = format!("/api/users/{}", uuid::Uuid::new_v4());
    let (status, _) = send_json(
        &app,
        form_request("PUT", &uri, &[("location", "Nowhere".to_string())], None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_requires_records() {
    let app = build_app(AppState::fake());
    let (status, body) = send_json(&app, get("/api/users/export/csv")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No users found to export");
}

#[tokio::test]
async fn export_streams_csv_attachment() {
    let state = AppState::fake();
    let app = build_app(state.clone());
    create(&app, "Fay", "fay@x.com").await;
    create(&app, "Gus", "gus@x.com").await;

    let (status, headers, body) = send(&app, get("/api/users/export/csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"users.csv\""
    );

    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("_id,firstName,lastName,email,mobile,createdAt"));
    assert_eq!(lines.count(), 2);

    let mut left = tokio::fs::read_dir(state.exporter.dir()).await.unwrap();
    assert!(left.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn health_check_responds() {
    let app = build_app(AppState::fake());
    let (status, _, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn non_multipart_body_is_rejected_with_message() {
    let app = build_app(AppState::fake());
    let json_post = |method: &str, uri: &str| {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"firstName":"Ann"}"#))
            .unwrap()
    };

    let (status, body) = send_json(&app, json_post("POST", "/api/users")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string(), "{body}");

    let user = create(&app, "Ann", "ann@x.com").await;
    let uri = format!("/api/users/{}", user["_id"].as_str().unwrap());
    let (status, body) = send_json(&app, json_post("PUT", &uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string(), "{body}");
}
