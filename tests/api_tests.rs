use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use smartasset::config::Config;
use smartasset::db::Store;
use smartasset::domain::schedule::today_at_offset;
use smartasset::domain::{AuditAction, audit_entity};
use smartasset::state::SharedState;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// Bootstrap administrator seeded by the initial migration.
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "password";

/// Default `scheduler.timezone_offset_minutes`.
const TZ_OFFSET_MINUTES: i32 = 330;

fn days_from_today(days: i64) -> String {
    (today_at_offset(TZ_OFFSET_MINUTES) + chrono::Duration::days(days)).to_string()
}

struct TestApp {
    router: Router,
    store: Store,
    root: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

async fn spawn_app() -> TestApp {
    let root = std::env::temp_dir().join(format!("smartasset_api_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}?mode=rwc", root.join("app.db").display());
    config.storage.upload_dir = root.join("uploads").display().to_string();
    config.storage.qr_dir = root.join("qr").display().to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config.observability.metrics_enabled = false;

    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open test database");
    let shared = SharedState::with_store(config, store.clone())
        .await
        .expect("Failed to create shared state");

    let state = smartasset::api::create_app_state(Arc::new(shared), None);
    let router = smartasset::api::router(state).await;

    TestApp {
        router,
        store,
        root,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn login(&self, login: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": login, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Provisions a TECH account and returns `(id, token)`.
    async fn tech(&self, admin: &str, email: &str) -> (i64, String) {
        let (status, body) = self
            .json(
                "POST",
                "/api/admin/users",
                Some(admin),
                Some(json!({
                    "name": "Field Tech",
                    "email": email,
                    "role": "TECH",
                    "temp_password": "Temp@12345"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "provision failed: {body}");
        let id = body["data"]["id"].as_i64().unwrap();
        (id, self.login(email, "Temp@12345").await)
    }

    /// Adds a maintenance log and returns its id.
    async fn add_log(&self, token: &str, asset: i64, body: Value) -> i64 {
        let (status, body) = self
            .json(
                "POST",
                &format!("/api/assets/{asset}/maintenance"),
                Some(token),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "log create failed: {body}");
        body["data"]["log"]["id"].as_i64().unwrap()
    }

    /// Fetches a file response as `(status, content-disposition, body text)`.
    async fn download(&self, uri: &str, token: &str) -> (StatusCode, String, String) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, disposition, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn create_asset(&self, token: &str, body: Value) -> i64 {
        let (status, body) = self.json("POST", "/api/assets", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "asset create failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn login_issues_token_with_role() {
    let app = spawn_app().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "ADMIN");
    assert_eq!(body["data"]["must_change_password"], true);
    assert!(body["data"]["access_token"].as_str().is_some());
}

#[tokio::test]
async fn login_by_username_is_accepted() {
    let app = spawn_app().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": ADMIN_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn wrong_password_never_yields_a_token() {
    let app = spawn_app().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "nope" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn missing_credentials_are_a_validation_error() {
    let app = spawn_app().await;

    let (status, _) = app
        .json("POST", "/api/auth/login", None, Some(json!({ "email": "" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_app().await;

    let (status, _) = app.json("GET", "/api/assets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json("GET", "/api/assets", Some("not-a-real-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_clears_forced_rotation() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "new_password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            Some(json!({ "new_password": "a-much-longer-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["must_change_password"], false);
}

#[tokio::test]
async fn tech_cannot_create_assets() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, tech) = app.tech(&admin, "tech1@example.com").await;

    let (status, body) = app
        .json(
            "POST",
            "/api/assets",
            Some(&tech),
            Some(json!({ "name": "Drill" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn asset_create_generates_qr_and_validates_dates() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .json(
            "POST",
            "/api/assets",
            Some(&admin),
            Some(json!({ "name": "Pump", "purchase_date": "10/05/2024" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = app
        .create_asset(&admin, json!({ "name": "Pump", "category": "Plant" }))
        .await;

    let (status, body) = app
        .json("GET", &format!("/api/assets/{id}/qr"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let qr_path = body["data"]["qr_code_path"].as_str().unwrap().to_string();
    assert!(qr_path.ends_with(".svg"));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/qr/asset/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert_eq!(location, format!("/api/qr/{qr_path}"));
}

#[tokio::test]
async fn tech_logs_only_on_assigned_assets() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, tech) = app.tech(&admin, "tech1@example.com").await;

    let assigned = app
        .create_asset(
            &admin,
            json!({ "name": "Generator", "frequency_days": 180, "assigned_user_id": tech_id }),
        )
        .await;
    let unassigned = app
        .create_asset(&admin, json!({ "name": "Compressor" }))
        .await;

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/assets/{assigned}/maintenance"),
            Some(&tech),
            Some(json!({
                "description": "Oil change",
                "cost": 120.0,
                "service_date": "2025-08-17"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["message"], "Maintenance log added");
    assert_eq!(body["data"]["log"]["next_service_due"], "2026-02-13");
    assert_eq!(body["data"]["log"]["technician_id"], tech_id);

    let (status, _) = app
        .json(
            "POST",
            &format!("/api/assets/{unassigned}/maintenance"),
            Some(&tech),
            Some(json!({ "description": "Oil change" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .json(
            "POST",
            "/api/assets/9999/maintenance",
            Some(&tech),
            Some(json!({ "description": "Ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn explicit_next_due_is_kept_and_negative_cost_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let asset = app.create_asset(&admin, json!({ "name": "Boiler" })).await;

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/assets/{asset}/maintenance"),
            Some(&admin),
            Some(json!({
                "service_date": "2025-01-01",
                "next_service_due": "2025-03-01"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["log"]["next_service_due"], "2025-03-01");

    let (status, _) = app
        .json(
            "POST",
            &format!("/api/assets/{asset}/maintenance"),
            Some(&admin),
            Some(json!({ "cost": -5.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tech_cannot_edit_another_technicians_log() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (owner_id, owner) = app.tech(&admin, "owner@example.com").await;
    let (_, other) = app.tech(&admin, "other@example.com").await;

    let asset = app
        .create_asset(&admin, json!({ "name": "Lift", "assigned_user_id": owner_id }))
        .await;

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/assets/{asset}/maintenance"),
            Some(&owner),
            Some(json!({ "description": "Cable check", "service_date": "2025-02-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let log_id = body["data"]["log"]["id"].as_i64().unwrap();

    let (status, _) = app
        .json(
            "PUT",
            &format!("/api/maintenance/{log_id}"),
            Some(&other),
            Some(json!({ "description": "tampered" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/maintenance/{log_id}"),
            Some(&owner),
            Some(json!({ "description": "Cable replaced", "cost": 80.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Cable replaced");
    assert_eq!(body["data"]["cost"], 80.5);

    let (status, _) = app
        .json("DELETE", &format!("/api/maintenance/{log_id}"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tech_asset_listing_is_scoped_to_assignments() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, tech) = app.tech(&admin, "tech1@example.com").await;

    app.create_asset(&admin, json!({ "name": "Mine", "assigned_user_id": tech_id }))
        .await;
    app.create_asset(&admin, json!({ "name": "Theirs" })).await;

    let (status, body) = app.json("GET", "/api/assets", Some(&tech), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Mine");

    let (status, body) = app.json("GET", "/api/assets", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);

    let (status, _) = app
        .json("GET", "/api/assets?limit=500", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_an_asset_removes_its_logs() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let asset = app.create_asset(&admin, json!({ "name": "Forklift" })).await;

    for day in ["2025-01-10", "2025-02-10"] {
        let (status, _) = app
            .json(
                "POST",
                &format!("/api/assets/{asset}/maintenance"),
                Some(&admin),
                Some(json!({ "description": "Service", "service_date": day })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let before = app.store.maintenance().count_for_asset(asset as i32).await.unwrap();
    assert_eq!(before, 2);

    let (status, body) = app
        .json("DELETE", &format!("/api/assets/{asset}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["logs_deleted"], 2);

    assert_eq!(
        app.store.maintenance().count_for_asset(asset as i32).await.unwrap(),
        0
    );

    let (status, _) = app
        .json("GET", &format!("/api/assets/{asset}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_import_reports_duplicate_row_and_keeps_the_rest() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/admin/users/bulk",
            Some(&admin),
            Some(json!({
                "users": [
                    { "name": "Asha Rao", "email": "asha@example.com" },
                    { "name": "Bilal Khan", "email": "bilal@example.com", "role": "MANAGER" },
                    { "name": "Asha Again", "email": "asha@example.com" },
                    { "name": "Chen Li", "email": "chen@example.com" }
                ]
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let created = body["data"]["created"].as_array().unwrap();
    let errors = body["data"]["errors"].as_array().unwrap();
    assert_eq!(created.len(), 3);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["row"], 3);
    assert_eq!(errors[0]["email"], "asha@example.com");

    for row in created {
        assert!(row["temp_password"].as_str().unwrap().len() >= 8);
    }

    // 1 seeded admin + 3 created
    assert_eq!(app.store.users().count().await.unwrap(), 4);
}

#[tokio::test]
async fn bulk_import_accepts_csv() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let csv = "name,email,role,username\nDana Cole,dana@example.com,TECH,\nEli Moss,eli@example.com,MANAGER,elim\n";
    let (status, body) = app
        .json(
            "POST",
            "/api/admin/users/bulk",
            Some(&admin),
            Some(json!({ "csv": csv })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let created = body["data"]["created"].as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[1]["username"], "elim");

    let (status, body) = app
        .json("POST", "/api/admin/users/bulk", Some(&admin), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Provide 'users' array or 'csv' string");
}

#[tokio::test]
async fn username_suggestion_avoids_existing_names() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({ "name": "Priya", "email": "priya@example.com", "username": "priya" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .json(
            "GET",
            "/api/admin/users/suggest-username?email=priya@example.com",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let suggestion = body["data"]["username"].as_str().unwrap();
    assert_ne!(suggestion, "priya");
    assert!(suggestion.starts_with("priya"));

    let (status, _) = app
        .json(
            "POST",
            "/api/admin/users",
            Some(&admin),
            Some(json!({ "name": "Other", "email": "other@example.com", "username": "priya" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn disabled_users_cannot_log_in() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, _) = app.tech(&admin, "tech1@example.com").await;

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/admin/users/{tech_id}/status"),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "tech1@example.com", "password": "Temp@12345" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reset_password_issues_a_new_temporary_credential() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, _) = app.tech(&admin, "tech1@example.com").await;

    let (status, body) = app
        .json(
            "POST",
            &format!("/api/admin/users/{tech_id}/reset-password"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let temp = body["data"]["temp_password"].as_str().unwrap().to_string();

    let token = app.login("tech1@example.com", &temp).await;
    let (_, me) = app.json("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(me["data"]["must_change_password"], true);

    let (status, _) = app
        .json(
            "PUT",
            &format!("/api/admin/users/{tech_id}/role"),
            Some(&admin),
            Some(json!({ "role": "OWNER" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_exports_carry_headers_and_attachment_names() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_asset(&admin, json!({ "name": "Rack, Main", "location": "Pune" }))
        .await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/reports/assets/export")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("assets.csv"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("ID,Name,Category,Location"));
    assert!(lines.next().unwrap().contains("\"Rack, Main\""));
}

#[tokio::test]
async fn file_routes_reject_traversal() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app.json("GET", "/api/qr/..%2F..%2Fapp.db", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json("GET", "/api/qr/missing.svg", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json("GET", "/api/uploads/..%2Fapp.db", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_then_download_attachment() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"receipt.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{boundary}--\r\n"
    );

    let (status, json_body) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/upload")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{json_body}");
    let filename = json_body["data"]["filename"].as_str().unwrap();
    assert!(filename.ends_with(".pdf"));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/uploads/{filename}"))
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
}

#[tokio::test]
async fn dashboard_summary_counts_assets_and_logs() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let first = app.create_asset(&admin, json!({ "name": "A" })).await;
    app.create_asset(&admin, json!({ "name": "B" })).await;

    let (status, _) = app
        .json(
            "POST",
            &format!("/api/assets/{first}/maintenance"),
            Some(&admin),
            Some(json!({
                "service_date": "2020-01-01",
                "next_service_due": "2020-06-01",
                "cost": 40.0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .json("GET", "/api/assets/dashboard-summary", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_assets"], 2);
    assert_eq!(body["data"]["total_logs"], 1);
    assert_eq!(body["data"]["overdue_logs"], 1);

    let (status, body) = app
        .json("GET", "/api/maintenance/due", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["overdue"], true);
    assert_eq!(body["data"][0]["asset_name"], "A");
}

#[tokio::test]
async fn mutations_are_audited() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_asset(&admin, json!({ "name": "Audited" })).await;

    let (status, body) = app
        .json("GET", "/api/audit?entity=asset", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["items"][0]["action"], "CREATE");
    assert_eq!(body["data"]["items"][0]["changes"]["name"], "Audited");
}

#[tokio::test]
async fn due_assets_follow_each_assets_latest_log() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, tech) = app.tech(&admin, "tech1@example.com").await;

    let mine = app
        .create_asset(&admin, json!({ "name": "Mine", "assigned_user_id": tech_id }))
        .await;
    let other = app.create_asset(&admin, json!({ "name": "Other" })).await;
    let fresh = app.create_asset(&admin, json!({ "name": "Fresh" })).await;
    let bare = app.create_asset(&admin, json!({ "name": "Bare" })).await;

    let overdue = json!({ "service_date": "2020-01-01", "next_service_due": "2020-06-01" });
    app.add_log(&admin, mine, overdue.clone()).await;
    app.add_log(&admin, other, overdue.clone()).await;
    app.add_log(&admin, fresh, overdue).await;
    app.add_log(
        &admin,
        fresh,
        json!({ "service_date": "2021-01-01", "next_service_due": days_from_today(30) }),
    )
    .await;

    let (status, body) = app.json("GET", "/api/assets/due", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let due = body["data"].as_array().unwrap();
    let names: Vec<&str> = due
        .iter()
        .map(|d| d["asset"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mine", "Other"]);
    assert_eq!(due[0]["latest_log"]["next_service_due"], "2020-06-01");
    assert_eq!(due[0]["overdue"], true);

    let (status, body) = app.json("GET", "/api/assets/due", Some(&tech), None).await;
    assert_eq!(status, StatusCode::OK);
    let due = body["data"].as_array().unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["asset"]["id"], mine);

    // Per-log listing still sees the superseded overdue log on "Fresh".
    let (_, body) = app.json("GET", "/api/maintenance/due", Some(&admin), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = app.json("GET", "/api/maintenance/due", Some(&tech), None).await;
    assert_eq!(status, StatusCode::OK);
    let due = body["data"].as_array().unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["asset_name"], "Mine");

    let (status, body) = app
        .json("GET", &format!("/api/assets/{fresh}/latest-log"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["asset_id"], fresh);
    assert_eq!(body["data"]["latest_log"]["service_date"], "2021-01-01");

    let (status, body) = app
        .json("GET", &format!("/api/assets/{bare}/latest-log"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["latest_log"].is_null());

    let (status, _) = app
        .json("GET", "/api/assets/9999/latest-log", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn monthly_cost_totals_the_current_month() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let asset = app.create_asset(&admin, json!({ "name": "Chiller" })).await;

    let today = days_from_today(0);
    app.add_log(&admin, asset, json!({ "service_date": today, "cost": 75.5 }))
        .await;
    app.add_log(&admin, asset, json!({ "service_date": today, "cost": 24.5 }))
        .await;
    app.add_log(&admin, asset, json!({ "service_date": "2019-01-01", "cost": 999.0 }))
        .await;

    let (status, body) = app
        .json("GET", "/api/reports/monthly-cost", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let now = today_at_offset(TZ_OFFSET_MINUTES);
    let months = body["data"].as_array().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0]["year"], chrono::Datelike::year(&now));
    assert_eq!(months[0]["month"], chrono::Datelike::month(&now));
    assert_eq!(months[0]["total_cost"], 100.0);
}

#[tokio::test]
async fn warranty_window_includes_both_ends() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for (name, offset) in [("Past", -1), ("Today", 0), ("Edge", 10), ("Late", 11)] {
        app.create_asset(
            &admin,
            json!({ "name": name, "warranty_end": days_from_today(offset) }),
        )
        .await;
    }

    let (status, body) = app
        .json("GET", "/api/reports/warranty-expiring?days=10", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let mut names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Edge", "Today"]);

    let (_, body) = app
        .json("GET", "/api/reports/warranty-expiring", Some(&admin), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    for bad in ["-1", "soon"] {
        let (status, body) = app
            .json(
                "GET",
                &format!("/api/reports/warranty-expiring?days={bad}"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "days={bad}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn log_export_has_header_and_filename() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let asset = app.create_asset(&admin, json!({ "name": "Lift" })).await;
    let log = app
        .add_log(
            &admin,
            asset,
            json!({
                "description": "Belt, replaced",
                "cost": 12.5,
                "service_date": "2025-03-01",
                "next_service_due": "2025-09-01"
            }),
        )
        .await;

    let (status, disposition, text) = app.download("/api/reports/logs/export", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert!(disposition.contains("maintenance_logs.csv"));

    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("ID,Asset ID,Service Date,Description,Parts Used,Cost,Technician ID,Next Service Due,Created At")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with(&format!("{log},{asset},2025-03-01,\"Belt, replaced\",")));
    assert!(row.contains(",2025-09-01,"));
    assert!(lines.next().is_none());
}

#[tokio::test]
async fn bulk_import_suffixes_names_and_rejects_bad_rows() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/admin/users/bulk",
            Some(&admin),
            Some(json!({
                "users": [
                    { "name": "John Smith", "email": "john@example.com" },
                    { "name": "John Smith", "email": "john.s@example.com" },
                    { "name": "John Again", "email": "john@example.com" },
                    { "name": "Role Less", "email": "role@example.com", "role": "OWNER" },
                    { "name": "Name Clash", "email": "clash@example.com", "username": "john.smith" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let created = body["data"]["created"].as_array().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["row"], 1);
    assert_eq!(created[0]["username"], "john.smith");
    assert_eq!(created[1]["row"], 2);
    assert_eq!(created[1]["username"], "john.smith2");

    let errors: Vec<(i64, &str)> = body["data"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["row"].as_i64().unwrap(), e["error"].as_str().unwrap()))
        .collect();
    assert_eq!(
        errors,
        vec![
            (3, "email already exists"),
            (4, "invalid role"),
            (5, "username already exists"),
        ]
    );

    assert_eq!(app.store.users().count().await.unwrap(), 3);
}

#[tokio::test]
async fn each_mutation_writes_one_audit_row() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, _) = app.tech(&admin, "tech1@example.com").await;

    let asset = app
        .create_asset(&admin, json!({ "name": "Van", "assigned_user_id": tech_id }))
        .await;
    let (status, _) = app
        .json(
            "PUT",
            &format!("/api/assets/{asset}"),
            Some(&admin),
            Some(json!({ "assigned_user_id": null, "location": "Depot" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let kept = app.create_asset(&admin, json!({ "name": "Crane" })).await;
    let log = app
        .add_log(&admin, kept, json!({ "description": "Inspection" }))
        .await;
    let (status, _) = app
        .json(
            "PUT",
            &format!("/api/maintenance/{log}"),
            Some(&admin),
            Some(json!({ "description": "Full inspection" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json("DELETE", &format!("/api/assets/{asset}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let audit = app.store.audit();
    let expected = [
        (audit_entity::ASSET, AuditAction::Create, 2),
        (audit_entity::ASSET, AuditAction::Update, 1),
        (audit_entity::ASSET, AuditAction::Delete, 1),
        (audit_entity::MAINTENANCE_LOG, AuditAction::Create, 1),
        (audit_entity::MAINTENANCE_LOG, AuditAction::Update, 1),
        (audit_entity::USER, AuditAction::Create, 1),
        // admin once, the technician once in `tech()`
        (audit_entity::USER, AuditAction::Login, 2),
    ];
    for (entity, action, count) in expected {
        assert_eq!(
            audit.count_for(entity, action).await.unwrap(),
            count,
            "{entity} {}",
            action.as_str()
        );
    }

    let (status, body) = app
        .json("GET", "/api/audit?entity=asset", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    let actions: Vec<&str> = items.iter().map(|i| i["action"].as_str().unwrap()).collect();
    assert_eq!(actions, vec!["DELETE", "CREATE", "UPDATE", "CREATE"]);

    assert_eq!(items[0]["entity_id"], asset);
    assert_eq!(items[0]["changes"]["name"], "Van");
    assert_eq!(items[0]["changes"]["logs_deleted"], 0);

    let update = items[2]["changes"].as_object().unwrap();
    assert_eq!(update.len(), 2, "{update:?}");
    assert_eq!(update.get("assigned_user_id"), Some(&Value::Null));
    assert_eq!(update["location"], "Depot");

    let (_, body) = app
        .json("GET", "/api/audit?entity=user", Some(&admin), None)
        .await;
    let logins = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|i| i["action"] == "LOGIN")
        .count();
    assert_eq!(logins, 2);
}
