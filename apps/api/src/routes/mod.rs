pub mod health;

use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use serde_json::Value;

use crate::crm::handlers;
use crate::errors::{AppJson, AppPath};
use crate::models::RecordKind;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/health/system", get(health::system_health_handler))
        // Companies
        .route(
            "/api/companies",
            get(handlers::handle_list_companies).post(handlers::handle_create_company),
        )
        .route(
            "/api/companies/import",
            post(handlers::handle_import_companies),
        )
        .route("/api/companies/:id", delete(handlers::handle_delete_company))
        .route("/api/stats", get(handlers::handle_stats))
        .route(
            "/api/notifications",
            post(handlers::handle_send_notification),
        );

    // Contacts, job offers, employees and tasks share one set of handlers
    for kind in RecordKind::ALL {
        let base = format!("/api/{}", kind.path_segment());
        router = router
            .route(
                &base,
                get(move |state: State<AppState>| handlers::handle_list_records(state, kind)).post(
                    move |state: State<AppState>, body: AppJson<Value>| {
                        handlers::handle_create_record(state, kind, body)
                    },
                ),
            )
            .route(
                &format!("{base}/:id"),
                delete(move |state: State<AppState>, id: AppPath<i64>| {
                    handlers::handle_delete_record(state, kind, id)
                }),
            );
    }

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::email::{testing::fake_sendgrid, EmailClient};
    use crate::store::JsonStore;

    const BOUNDARY: &str = "diversia-test-boundary";

    fn app(dir: &TempDir) -> Router {
        let path = dir.path().join("crm.json");
        let state = AppState::new(
            Arc::new(JsonStore::new(&path)),
            Config::with_data_file(&path),
        );
        build_router(state)
    }

    /// State with email fully configured but pointed at `endpoint`.
    fn state_with_email(dir: &TempDir, api_key: Option<&str>, endpoint: String) -> AppState {
        let path = dir.path().join("crm.json");
        let mut config = Config::with_data_file(&path);
        config.sendgrid_api_key = api_key.map(str::to_string);
        config.notify_email = Some("admin@diversia.es".to_string());
        let mut state = AppState::new(Arc::new(JsonStore::new(&path)), config.clone());
        state.email =
            EmailClient::new(config.sendgrid_api_key, config.email_from).with_endpoint(endpoint);
        state
    }

    fn raw_json_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn csv_upload(csv: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"empresas.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .uri("/api/companies/import")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&app(&dir), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_company_lifecycle() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let (status, created) = send(
            &app,
            json_req(
                "POST",
                "/api/companies",
                json!({"name": "Acme", "email": "rrhh@acme.es", "city": "Madrid"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);
        assert_eq!(created["sector"], "No especificado");

        let (_, second) = send(
            &app,
            json_req("POST", "/api/companies", json!({"name": "Globex"})),
        )
        .await;
        assert_eq!(second["id"], 2);

        let (status, list) = send(&app, get_req("/api/companies")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 2);

        let (status, _) = send(&app, delete_req("/api/companies/1")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, stats) = send(&app, get_req("/api/stats")).await;
        assert_eq!(stats["total_companies"], 1);
    }

    #[tokio::test]
    async fn test_create_company_requires_name() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            &app(&dir),
            json_req("POST", "/api/companies", json!({"email": "a@b.es"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_delete_unknown_company_is_404_and_keeps_data() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, json_req("POST", "/api/companies", json!({"name": "Acme"}))).await;

        let (status, body) = send(&app, delete_req("/api/companies/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (_, list) = send(&app, get_req("/api/companies")).await;
        assert_eq!(list["total"], 1);
    }

    #[tokio::test]
    async fn test_csv_import_adds_valid_rows() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        send(&app, json_req("POST", "/api/companies", json!({"name": "Existing"}))).await;

        let csv = "Empresa,Email,Sector,Ciudad\r\nAcme,a@acme.es,Banca,Madrid\r\n,x@y.es,,\r\nGlobex,,,Sevilla";
        let (status, body) = send(&app, csv_upload(csv)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);
        assert_eq!(body["skipped"].as_array().unwrap().len(), 1);
        assert_eq!(body["total_companies"], 3);
    }

    #[tokio::test]
    async fn test_csv_import_without_name_column_is_400() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(&app(&dir), csv_upload("email\r\na@b.es")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_record_collections() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let (status, offer) = send(
            &app,
            json_req(
                "POST",
                "/api/job-offers",
                json!({"title": "Data analyst", "company_id": 1, "remote": true}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(offer["id"], 1);
        assert_eq!(offer["title"], "Data analyst");

        let (_, offers) = send(&app, get_req("/api/job-offers")).await;
        assert_eq!(offers["total"], 1);
        let (_, tasks) = send(&app, get_req("/api/tasks")).await;
        assert_eq!(tasks["total"], 0);

        let (status, _) = send(&app, delete_req("/api/employees/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, delete_req("/api/job-offers/1")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_record_body_must_be_object() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(
            &app(&dir),
            json_req("POST", "/api/contacts", json!(["not", "an", "object"])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_notification_without_api_key_is_not_sent() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            &app(&dir),
            json_req(
                "POST",
                "/api/notifications",
                json!({"template": "candidate_welcome", "to": "ana@example.com", "name": "Ana"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], false);
    }

    #[tokio::test]
    async fn test_notification_rejects_bad_recipient() {
        let dir = TempDir::new().unwrap();
        let (status, _) = send(
            &app(&dir),
            json_req(
                "POST",
                "/api/notifications",
                json!({"template": "company_welcome", "to": "nobody"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_system_health_reports_store() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(&app(&dir), get_req("/api/health/system")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage_backend"], "json");
        assert_eq!(body["email_configured"], false);
    }

    #[tokio::test]
    async fn test_system_health_degraded_on_corrupt_store() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("crm.json"), "{broken").unwrap();
        let (status, body) = send(&app(&dir), get_req("/api/health/system")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["storage_ok"], false);
    }

    #[tokio::test]
    async fn test_null_company_name_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            &app(&dir),
            json_req("POST", "/api/companies", json!({"name": null})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        for uri in ["/api/companies", "/api/contacts", "/api/notifications"] {
            let (status, body) = send(&app, raw_json_req(uri, "{not json")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_notification_template_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            &app(&dir),
            json_req(
                "POST",
                "/api/notifications",
                json!({"template": "bogus", "to": "ana@example.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);
        for uri in ["/api/companies/abc", "/api/tasks/abc"] {
            let (status, body) = send(&app, delete_req(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_import_without_multipart_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(
            &app(&dir),
            raw_json_req("/api/companies/import", r#"{"file": "a.csv"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_new_company_emails_contact_and_admin() {
        let dir = TempDir::new().unwrap();
        let (endpoint, seen) = fake_sendgrid(StatusCode::ACCEPTED).await;
        let app = build_router(state_with_email(&dir, Some("SG.test"), endpoint));

        let (status, _) = send(
            &app,
            json_req(
                "POST",
                "/api/companies",
                json!({"name": "Acme", "email": "rrhh@acme.es"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        // Emails go out on a background task
        for _ in 0..100 {
            if seen.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let bodies = seen.lock().unwrap();
        let mut recipients: Vec<String> = bodies
            .iter()
            .map(|b| b["personalizations"][0]["to"][0]["email"].as_str().unwrap().to_string())
            .collect();
        recipients.sort();
        assert_eq!(recipients, vec!["admin@diversia.es", "rrhh@acme.es"]);
        assert!(bodies
            .iter()
            .any(|b| b["subject"] == "Nueva empresa registrada: Acme"));
    }

    #[tokio::test]
    async fn test_new_company_without_api_key_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let (endpoint, seen) = fake_sendgrid(StatusCode::ACCEPTED).await;
        let app = build_router(state_with_email(&dir, None, endpoint));

        let (status, _) = send(
            &app,
            json_req(
                "POST",
                "/api/companies",
                json!({"name": "Acme", "email": "rrhh@acme.es"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(seen.lock().unwrap().is_empty());
    }
}
