//! End-to-end tests over a loopback socket
//!
//! Each test starts its own server on an ephemeral port with a fresh
//! database in a temporary directory.

use clap::Parser;
use janani_setu::config::Args;
use janani_setu::db::CareDb;
use janani_setu::server::{serve, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

const SECRET: &str = "test-secret-for-integration-0123456789";

struct TestServer {
    base: String,
    client: reqwest::Client,
    _temp: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("janani.db");
        let args = Args::try_parse_from([
            "janani-setu",
            "--listen",
            "127.0.0.1:0",
            "--database-path",
            db_path.to_str().unwrap(),
            "--jwt-secret",
            SECRET,
            "--allowed-origin",
            "https://janani.example",
        ])
        .unwrap();

        let db = Arc::new(CareDb::open(&args.database_path).unwrap());
        let state = Arc::new(AppState::new(args, db).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state));

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _temp: temp,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(&self, path: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn register_and_login(&self, role_path: &str, mut body: Value, email: &str) -> String {
        body["email"] = json!(email);
        body["password"] = json!("s3cret-pass");
        let (status, _) = self.post(&format!("/api/register/{}", role_path), body, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, login) = self
            .post("/api/login", json!({ "email": email, "password": "s3cret-pass" }), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        login["token"].as_str().unwrap().to_string()
    }

    /// Care-store id of the only mother with this name
    async fn mother_id(&self, worker_token: &str, name: &str) -> String {
        let (status, mothers) = self.get("/api/care/mothers", Some(worker_token)).await;
        assert_eq!(status, StatusCode::OK);
        mothers
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["name"] == name)
            .map(|m| m["id"].as_str().unwrap().to_string())
            .unwrap()
    }
}

fn mother_body(name: &str) -> Value {
    json!({
        "full_name": name,
        "age": 25,
        "phone_number": "9876543210",
        "village": "Hulimavu",
        "location": "Bangalore South",
        "blood_group": "O+",
        "pre_existing_conditions": "{\"conditions\":[],\"otherCondition\":\"\",\"lastUpdated\":\"\"}",
        "lmp_date": "2025-08-15"
    })
}

#[tokio::test]
async fn test_liveness_endpoints() {
    let server = TestServer::start().await;

    let resp = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "JananiSetu Backend Server is Running!");

    let (status, health) = server.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["healthy"], true);
    assert_eq!(health["mothers_loaded"], 0);
}

#[tokio::test]
async fn test_cors_preflight_uses_configured_origin() {
    let server = TestServer::start().await;
    let resp = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/api/login"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "https://janani.example"
    );
}

#[tokio::test]
async fn test_register_and_login_mother() {
    let server = TestServer::start().await;

    let mut body = mother_body("Priya Sharma");
    body["email"] = json!("priya@example.com");
    body["password"] = json!("pw-123456");
    let (status, registered) = server.post("/api/register/mother", body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["message"], "Mother registered successfully");
    assert!(registered["id"].as_i64().is_some());

    let (status, login) = server
        .post("/api/login", json!({ "email": "priya@example.com", "password": "pw-123456" }), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["role"], "mother");
    assert!(login["token"].as_str().is_some());

    let (status, health) = server.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["mothers_loaded"], 1);
}

#[tokio::test]
async fn test_login_failures_are_generic_401() {
    let server = TestServer::start().await;
    server
        .register_and_login("father", json!({ "father_name": "Rahul" }), "rahul@example.com")
        .await;

    let (status, wrong) = server
        .post("/api/login", json!({ "email": "rahul@example.com", "password": "nope" }), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(wrong.get("token").is_none());

    let (status, unknown) = server
        .post("/api/login", json!({ "email": "ghost@example.com", "password": "nope" }), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error"], unknown["error"]);
}

#[tokio::test]
async fn test_registration_validation_and_conflict() {
    let server = TestServer::start().await;

    let (status, _) = server
        .post("/api/register/father", json!({ "father_name": "Rahul", "password": "pw" }), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post(
            "/api/register/healthworker",
            json!({ "full_name": "Lakshmi", "email": "lakshmi@example.com" }),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let worker = json!({
        "full_name": "Lakshmi",
        "anganwadi_location": "Hulimavu",
        "email": "lakshmi@example.com",
        "password": "pw"
    });
    let (status, _) = server.post("/api/register/healthworker", worker.clone(), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, conflict) = server.post("/api/register/healthworker", worker, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["code"], "CONFLICT");
}

#[tokio::test]
async fn test_list_mothers_requires_health_worker() {
    let server = TestServer::start().await;
    let mother = server
        .register_and_login("mother", mother_body("Priya Sharma"), "priya@example.com")
        .await;
    let worker = server
        .register_and_login("healthworker", json!({ "full_name": "Lakshmi" }), "lakshmi@example.com")
        .await;

    let (status, _) = server.get("/api/mothers", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server.get("/api/mothers", Some(&mother)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rows) = server.get("/api/mothers", Some(&worker)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], "priya@example.com");
    assert_eq!(rows[0]["lmp_date"], "2025-08-15");
}

#[tokio::test]
async fn test_care_flow_alerts_and_verification() {
    let server = TestServer::start().await;
    let mother = server
        .register_and_login("mother", mother_body("Priya Sharma"), "priya@example.com")
        .await;
    let other_mother = server
        .register_and_login("mother", mother_body("Anita Devi"), "anita@example.com")
        .await;
    let father = server
        .register_and_login("father", json!({ "father_name": "Rahul" }), "rahul@example.com")
        .await;
    let worker = server
        .register_and_login("healthworker", json!({ "full_name": "Lakshmi" }), "lakshmi@example.com")
        .await;

    let id = server.mother_id(&worker, "Priya Sharma").await;

    // Mothers only see their own record
    let (status, record) = server.get(&format!("/api/care/mothers/{}", id), Some(&mother)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["bp"], "120/80");
    assert_eq!(record["due_date"], "2026-05-22");
    let (status, _) = server
        .get(&format!("/api/care/mothers/{}", id), Some(&other_mother))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Abnormal weight gain alerts the worker
    let (status, change) = server
        .post(&format!("/api/care/mothers/{}/weight", id), json!({ "weight": 64.0 }), Some(&mother))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["abnormal"], true);

    let (status, _) = server
        .post(&format!("/api/care/mothers/{}/weight", id), json!({ "weight": -1.0 }), Some(&mother))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Critical symptom reaches worker and father
    let (status, assessment) = server
        .post(
            &format!("/api/care/mothers/{}/symptoms", id),
            json!({ "symptoms": ["Convulsions"] }),
            Some(&mother),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assessment["urgency"], "CRITICAL");

    let (_, father_inbox) = server.get("/api/care/notifications", Some(&father)).await;
    assert_eq!(father_inbox["unread"], 1);
    assert_eq!(father_inbox["notifications"][0]["severity"], "urgent");

    let (_, worker_inbox) = server.get("/api/care/notifications", Some(&worker)).await;
    assert_eq!(worker_inbox["unread"], 2);
    let first_id = worker_inbox["notifications"][0]["id"].as_u64().unwrap();
    let (status, _) = server
        .post(&format!("/api/care/notifications/{}/read", first_id), json!({}), Some(&worker))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, worker_inbox) = server.get("/api/care/notifications", Some(&worker)).await;
    assert_eq!(worker_inbox["unread"], 1);

    // Only workers verify
    let (status, _) = server
        .post(&format!("/api/care/mothers/{}/verify", id), json!({}), Some(&father))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, verified) = server
        .post(&format!("/api/care/mothers/{}/verify", id), json!({}), Some(&worker))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(verified["mcp_number"].as_str().unwrap().starts_with("MCP-"));

    let (status, report) = server.get("/api/care/report", Some(&worker)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 2);
    assert_eq!(report["high_risk"], 1);
    assert_eq!(report["verified"], 1);
    assert_eq!(report["pending"], 1);
}

#[tokio::test]
async fn test_family_endpoints() {
    let server = TestServer::start().await;
    server
        .register_and_login("mother", mother_body("Kavita Gowda"), "kavita@example.com")
        .await;
    let father = server
        .register_and_login("father", json!({ "father_name": "Suresh" }), "suresh@example.com")
        .await;
    let worker = server
        .register_and_login("healthworker", json!({ "full_name": "Lakshmi" }), "lakshmi@example.com")
        .await;
    let id = server.mother_id(&worker, "Kavita Gowda").await;

    let (status, record) = server
        .post(&format!("/api/care/mothers/{}/transport", id), json!({}), Some(&father))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["transport_ready"], true);

    let (status, tasks) = server.get("/api/care/father-tasks", Some(&father)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 6);
    let (status, task) = server
        .post("/api/care/father-tasks/1/toggle", json!({}), Some(&father))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["done"], true);

    let (status, msg) = server
        .post("/api/care/chat", json!({ "message": "Is the ANC visit on Monday?" }), Some(&father))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(msg["from"], "father");
    let (status, _) = server
        .post("/api/care/chat", json!({ "message": "" }), Some(&worker))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.get("/api/care/visits", Some(&father)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, visit) = server
        .post(
            "/api/care/visits",
            json!({ "mother_id": id, "date": "2025-11-30", "notes": "Home visit", "kind": "home" }),
            Some(&worker),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(visit["kind"], "home");
}

#[tokio::test]
async fn test_mother_finds_own_record() {
    let server = TestServer::start().await;
    let father = server
        .register_and_login("father", json!({ "father_name": "Rahul" }), "rahul@example.com")
        .await;

    let mut body = mother_body("Priya Sharma");
    body["email"] = json!("priya@example.com");
    body["password"] = json!("s3cret-pass");
    let (status, registered) = server.post("/api/register/mother", body, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, login) = server
        .post("/api/login", json!({ "email": "priya@example.com", "password": "s3cret-pass" }), None)
        .await;
    let mother = login["token"].as_str().unwrap().to_string();
    let worker = server
        .register_and_login("healthworker", json!({ "full_name": "Lakshmi" }), "lakshmi@example.com")
        .await;

    let (status, me) = server.get("/api/care/me", Some(&mother)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Priya Sharma");
    assert_eq!(me["user_id"], registered["id"]);
    let id = me["id"].as_str().unwrap().to_string();
    assert_ne!(id, registered["id"].to_string());

    let (status, _) = server.get("/api/care/me", Some(&father)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // One-decimal readings exactly 3 kg apart are a normal gain
    for weight in [61.4, 64.4] {
        let (status, change) = server
            .post(&format!("/api/care/mothers/{}/weight", id), json!({ "weight": weight }), Some(&mother))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(change["abnormal"], false);
    }

    let (status, readiness) = server
        .post(
            &format!("/api/care/mothers/{}/delivery-readiness", id),
            json!({ "practiced": ["Breathing"], "stress_level": 4 }),
            Some(&mother),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["practiced"][0], "Breathing");
    assert_eq!(readiness["score"], 0);
    let (status, _) = server
        .post(
            &format!("/api/care/mothers/{}/delivery-readiness", id),
            json!({ "stress_level": 4 }),
            Some(&father),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Worker attention list flags missed ANC
    let (status, attention) = server.get("/api/care/attention", Some(&worker)).await;
    assert_eq!(status, StatusCode::OK);
    let flagged = attention.as_array().unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0]["attention"], json!(["missed_anc"]));
    let (status, _) = server.get("/api/care/attention", Some(&mother)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A father cannot clear the worker's alert
    server
        .post(
            &format!("/api/care/mothers/{}/symptoms", id),
            json!({ "symptoms": ["Headache"] }),
            Some(&mother),
        )
        .await;
    let (_, worker_inbox) = server.get("/api/care/notifications", Some(&worker)).await;
    assert_eq!(worker_inbox["unread"], 1);
    let alert_id = worker_inbox["notifications"][0]["id"].as_u64().unwrap();
    let (status, _) = server
        .post(&format!("/api/care/notifications/{}/read", alert_id), json!({}), Some(&father))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, worker_inbox) = server.get("/api/care/notifications", Some(&worker)).await;
    assert_eq!(worker_inbox["unread"], 1);
}
