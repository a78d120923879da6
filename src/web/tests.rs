use super::*;
use crate::auth::middleware::API_KEY_HEADER;
use crate::auth::{Auth, Permission, RateLimit};
use crate::email::RecordingEmailSender;
use crate::storage::connect;
use reqwest::StatusCode;
use serde_json::{json, Value};

const ADMIN_KEY: &str = "admin-key";
const READER_KEY: &str = "reader-key";

struct TestServer {
    base: String,
    client: reqwest::Client,
    email: Arc<RecordingEmailSender>,
}

impl TestServer {
    async fn start() -> Self {
        let auth = Auth::new_with_memory_storage();
        for (key, permission) in [(ADMIN_KEY, Permission::Admin), (READER_KEY, Permission::Read)] {
            auth.create_api_key(
                key.to_string(),
                vec![permission],
                RateLimit { requests_per_minute: 1_000 },
                None,
                Some(key.to_string()),
            )
            .unwrap();
        }

        let email = Arc::new(RecordingEmailSender::default());
        let pool = connect("sqlite::memory:").await.unwrap();
        let ctx = AppContext::build(pool, auth, email.clone(), "billing@acme.test".to_string())
            .await
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = handlers::router(Arc::new(ctx));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            email,
        }
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(key) = key {
            request = request.header(API_KEY_HEADER, key);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.call(reqwest::Method::GET, path, Some(ADMIN_KEY), None).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(reqwest::Method::POST, path, Some(ADMIN_KEY), Some(body)).await
    }

    async fn create_contact(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/contacts",
                json!({ "name": name, "email": format!("{}@example.com", name.to_lowercase()) }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_invoice(&self, contact_id: &str) -> Value {
        let (status, body) = self
            .post(
                "/invoices",
                json!({
                    "contact_id": contact_id,
                    "lines": [{ "description": "Design", "quantity": 2, "unit_price_cents": 1500 }],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let server = TestServer::start().await;
    let (status, body) = server.call(reqwest::Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_requests_need_api_key() {
    let server = TestServer::start().await;

    let (status, body) = server.call(reqwest::Method::GET, "/contacts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = server
        .call(reqwest::Method::GET, "/contacts", Some("wrong"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .call(reqwest::Method::GET, "/contacts", Some(READER_KEY), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .call(
            reqwest::Method::POST,
            "/contacts",
            Some(READER_KEY),
            Some(json!({ "name": "Ada", "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .call(reqwest::Method::GET, "/auth/api-keys", Some(READER_KEY), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_contact_pages() {
    let server = TestServer::start().await;
    for name in ["Ada", "Bob", "Cy", "Dan", "Eve"] {
        server.create_contact(name).await;
    }

    let (status, body) = server.get("/contacts?page_index=2&page_size=2").await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["page_index"], 2);
    assert_eq!(page["page_size"], 2);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["has_previous_page"], true);
    assert_eq!(page["has_next_page"], true);
    let names: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Cy", "Dan"]);

    // camelCase parameters and defaults
    let (_, body) = server.get("/contacts?pageIndex=3&pageSize=2").await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["has_next_page"], false);

    let (_, body) = server.get("/contacts").await;
    assert_eq!(body["data"]["page_index"], 1);
    assert_eq!(body["data"]["page_size"], 10);
    assert_eq!(body["data"]["total_pages"], 1);
    assert_eq!(body["data"]["has_previous_page"], false);
}

#[tokio::test]
async fn test_invalid_paging_is_bad_request() {
    let server = TestServer::start().await;

    for query in ["page_size=0", "page_size=-5", "page_index=0"] {
        let (status, body) = server.get(&format!("/contacts?{}", query)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "query {}", query);
        assert!(body["error"].as_str().unwrap().contains("invalid argument"));
    }

    let (status, _) = server.get("/invoices?page_size=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests_use_envelope() {
    let server = TestServer::start().await;

    for path in ["/contacts?page_size=abc", "/invoices?status=bogus", "/invoices?page_index=1.5"] {
        let response = server
            .client
            .get(format!("{}{}", server.base, path))
            .header(API_KEY_HEADER, ADMIN_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path {}", path);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], Value::Null);
        assert!(body["error"].is_string());
    }

    let response = server
        .client
        .post(format!("{}/contacts", server.base))
        .header(API_KEY_HEADER, ADMIN_KEY)
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    // well-formed JSON with the wrong shape
    let (status, body) = server.post("/invoices", json!({ "lines": "none" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = server.post("/auth/api-keys", json!({ "name": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_empty_listing() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/invoices?page_index=4").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!([]));
    assert_eq!(body["data"]["total_pages"], 0);
    assert_eq!(body["data"]["has_previous_page"], true);
    assert_eq!(body["data"]["has_next_page"], false);
}

#[tokio::test]
async fn test_invoice_flow() {
    let server = TestServer::start().await;
    let contact_id = server.create_contact("Ada").await;
    let invoice = server.create_invoice(&contact_id).await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    assert_eq!(invoice["number"], "INV-000001");
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["total_cents"], 3000);

    let (status, body) = server.get(&format!("/invoices/{}", invoice_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], invoice_id.as_str());

    let (status, body) = server.post(&format!("/invoices/{}/send", invoice_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(server.email.sent().len(), 1);

    let (status, _) = server
        .post(&format!("/invoices/{}/status", invoice_id), json!({ "status": "draft" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server
        .post(&format!("/invoices/{}/status", invoice_id), json!({ "status": "paid" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let (_, body) = server.get("/invoices?status=paid").await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    let (_, body) = server.get("/invoices?status=draft&page_size=5").await;
    assert_eq!(body["data"]["items"], json!([]));

    let (status, _) = server
        .call(
            reqwest::Method::DELETE,
            &format!("/contacts/{}", contact_id),
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_contact_invoices_listing() {
    let server = TestServer::start().await;
    let ada = server.create_contact("Ada").await;
    let bob = server.create_contact("Bob").await;
    for _ in 0..3 {
        server.create_invoice(&ada).await;
    }
    server.create_invoice(&bob).await;

    let (status, body) = server
        .get(&format!("/contacts/{}/invoices?page_size=2", ada))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    let (_, body) = server.get(&format!("/invoices?contact_id={}", bob)).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, _) = server.get("/contacts/contact-missing/invoices").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_and_missing_resources() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/contacts", json!({ "name": "", "email": "ada@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = server.get("/contacts/contact-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server.get("/invoices/invoice-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .post("/invoices", json!({ "contact_id": "contact-missing", "lines": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_key_management() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/auth/api-keys", json!({ "name": "ci", "permissions": ["read"] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["data"]["key"].as_str().unwrap().to_string();

    let (status, _) = server
        .call(reqwest::Method::GET, "/invoices", Some(&key), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .call(
            reqwest::Method::DELETE,
            &format!("/auth/api-keys/{}", key),
            Some(ADMIN_KEY),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .call(reqwest::Method::GET, "/invoices", Some(&key), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
