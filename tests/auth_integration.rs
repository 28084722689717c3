use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use tokengate::auth::{AuthService, SigningKey, TokenCodec};
use tokengate::configuration::{AuthSettings, RateLimitSettings};
use tokengate::startup::run;
use tokengate::store::{InMemoryStore, RefreshStore, Stores};

const SIGNING_KEY: &str = "integration-test-signing-key";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    pub client: reqwest::Client,
}

fn auth_settings(rotate_refresh_tokens: bool) -> AuthSettings {
    AuthSettings {
        signing_key: SIGNING_KEY.to_string(),
        access_token_ttl_seconds: 900,
        refresh_token_ttl_seconds: 604_800,
        rotate_refresh_tokens,
        hash_cost: tokengate::auth::MIN_HASH_COST,
    }
}

fn spawn_app_with(rotate_refresh_tokens: bool, burst: u32) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryStore::new());
    let stores = Stores {
        principals: store.clone(),
        refresh_tokens: store.clone(),
    };
    let auth = AuthService::new(&stores, &auth_settings(rotate_refresh_tokens))
        .expect("Failed to build auth service");
    let rate_limit = RateLimitSettings {
        requests_per_second: 0.001,
        burst,
    };

    let server = run(listener, stores, auth, &rate_limit).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(false, 1_000)
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register(&self, email: &str, password: &str) -> i64 {
        let response = self
            .post(
                "/auth/register",
                &json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "phone_number": "+1234567890",
                    "email": email,
                    "password": password
                }),
            )
            .await;
        assert_eq!(201, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        body["id"].as_i64().expect("id in response")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    async fn login_tokens(&self, email: &str, password: &str) -> (String, String) {
        let response = self.login(email, password).await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn refresh(&self, user_id: i64, refresh_token: &str) -> reqwest::Response {
        self.post(
            "/auth/refresh",
            &json!({ "user_id": user_id, "refresh_token": refresh_token }),
        )
        .await
    }

    async fn logout(&self, user_id: i64, access_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/logout", self.address))
            .bearer_auth(access_token)
            .json(&json!({ "user_id": user_id }))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_with_identifier() {
    let app = spawn_app();

    let id = app.register("a@x.com", "pw1234").await;

    assert!(id > 0);
}

#[tokio::test]
async fn register_via_users_route_also_creates_principal() {
    let app = spawn_app();

    let response = app
        .post(
            "/users",
            &json!({
                "first_name": "Grace",
                "last_name": "Hopper",
                "email": "grace@example.com",
                "password": "cobol1959"
            }),
        )
        .await;

    assert_eq!(201, response.status().as_u16());
    app.login_tokens("grace@example.com", "cobol1959").await;
}

#[tokio::test]
async fn register_returns_400_for_invalid_payloads() {
    let app = spawn_app();

    let test_cases = vec![
        (json!({"last_name": "L", "email": "a@x.com", "password": "pw1234"}), "missing first name"),
        (json!({"first_name": "A", "last_name": "L", "email": "notanemail", "password": "pw1234"}), "bad email"),
        (json!({"first_name": "A", "last_name": "L", "email": "a@x.com"}), "missing password"),
        (json!({"first_name": "A", "last_name": "L", "email": "a@x.com", "password": "pw1234", "phone_number": "12ab"}), "bad phone"),
        (json!({"first_name": "A", "last_name": "L", "email": "a@x.com", "password": 12}), "password of wrong type"),
    ];

    for (body, description) in test_cases {
        let response = app.post("/auth/register", &body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload had {}.",
            description
        );
    }
}

#[tokio::test]
async fn register_reports_every_failing_field() {
    let app = spawn_app();

    let response = app
        .post("/auth/register", &json!({ "email": "nope" }))
        .await;
    assert_eq!(400, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap();
    for field in ["first_name", "last_name", "email", "password"] {
        assert!(message.contains(field), "{} missing from {}", field, message);
    }
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app();
    app.register("a@x.com", "pw1234").await;

    let response = app
        .post(
            "/auth/register",
            &json!({"first_name": "A", "last_name": "L", "email": "a@x.com", "password": "pw5678"}),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

// --- Login ---

#[tokio::test]
async fn login_returns_verifiable_tokens() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;

    let (access_token, refresh_token) = app.login_tokens("a@x.com", "pw1234").await;

    assert!(!access_token.is_empty());
    assert!(!refresh_token.is_empty());

    let codec = TokenCodec::new(
        SigningKey::new(SIGNING_KEY).unwrap(),
        chrono::Duration::minutes(15),
    );
    assert_eq!(codec.verify(&access_token), Ok(id));

    // only the hash of the refresh token is persisted
    let record = app
        .store
        .find_latest_valid_refresh_record(id, chrono::Utc::now())
        .await
        .unwrap()
        .expect("refresh record stored");
    assert_ne!(record.token_hash, refresh_token);
    assert!(tokengate::auth::verify_secret(&record.token_hash, &refresh_token));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.register("a@x.com", "pw1234").await;

    let wrong_password = app.login("a@x.com", "wrong").await;
    let unknown_email = app.login("nobody@x.com", "pw1234").await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let first: Value = wrong_password.json().await.unwrap();
    let second: Value = unknown_email.json().await.unwrap();
    assert_eq!(first["message"], second["message"]);
    assert_eq!(first["code"], second["code"]);
}

#[tokio::test]
async fn login_with_malformed_json_returns_400() {
    let app = spawn_app();

    let response = app
        .client
        .post(&format!("{}/auth/login", app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn repeated_login_keeps_single_refresh_record() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;

    let (_, first) = app.login_tokens("a@x.com", "pw1234").await;
    let (_, second) = app.login_tokens("a@x.com", "pw1234").await;

    assert_eq!(app.store.refresh_record_count(id).await, 1);
    assert_eq!(401, app.refresh(id, &first).await.status().as_u16());
    assert_eq!(200, app.refresh(id, &second).await.status().as_u16());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_returns_new_access_token_only() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;
    let (_, refresh_token) = app.login_tokens("a@x.com", "pw1234").await;

    let response = app.refresh(id, &refresh_token).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert!(body["access_token"].as_str().is_some());
    assert!(body.get("refresh_token").is_none());

    // without rotation the same refresh token keeps working
    assert_eq!(200, app.refresh(id, &refresh_token).await.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_tampered_token() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;
    let (_, refresh_token) = app.login_tokens("a@x.com", "pw1234").await;

    let mut tampered = refresh_token.clone().into_bytes();
    tampered[0] = if tampered[0] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    for candidate in [tampered.as_str(), "", "not-a-token"] {
        let response = app.refresh(id, candidate).await;
        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert!(body.get("access_token").is_none());
    }
}

#[tokio::test]
async fn refresh_rejects_token_of_another_principal() {
    let app = spawn_app();
    let alice = app.register("alice@x.com", "pw1234").await;
    let bob = app.register("bob@x.com", "pw1234").await;
    let (_, alice_token) = app.login_tokens("alice@x.com", "pw1234").await;
    app.login_tokens("bob@x.com", "pw1234").await;

    assert_eq!(401, app.refresh(bob, &alice_token).await.status().as_u16());
    assert_eq!(200, app.refresh(alice, &alice_token).await.status().as_u16());
}

#[tokio::test]
async fn refresh_rotates_when_enabled() {
    let app = spawn_app_with(true, 1_000);
    let id = app.register("a@x.com", "pw1234").await;
    let (_, original) = app.login_tokens("a@x.com", "pw1234").await;

    let response = app.refresh(id, &original).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let rotated = body["refresh_token"].as_str().expect("rotated token").to_string();
    assert_ne!(rotated, original);

    assert_eq!(401, app.refresh(id, &original).await.status().as_u16());
    assert_eq!(200, app.refresh(id, &rotated).await.status().as_u16());
}

// --- Logout ---

#[tokio::test]
async fn logout_then_refresh_is_rejected() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;
    let (access_token, refresh_token) = app.login_tokens("a@x.com", "pw1234").await;

    let response = app.logout(id, &access_token).await;
    assert_eq!(204, response.status().as_u16());

    assert_eq!(401, app.refresh(id, &refresh_token).await.status().as_u16());
}

#[tokio::test]
async fn logout_is_idempotent() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;
    let (access_token, _) = app.login_tokens("a@x.com", "pw1234").await;

    assert_eq!(204, app.logout(id, &access_token).await.status().as_u16());
    assert_eq!(204, app.logout(id, &access_token).await.status().as_u16());
}

#[tokio::test]
async fn logout_requires_access_token() {
    let app = spawn_app();

    let response = app
        .post("/auth/logout", &json!({ "user_id": 1 }))
        .await;

    assert_eq!(401, response.status().as_u16());
}

// --- Admission ---

#[tokio::test]
async fn protected_routes_reject_bad_authorization_headers() {
    let app = spawn_app();
    let url = format!("{}/users", app.address);

    let test_cases = vec![
        (None, "missing header"),
        (Some("InvalidToken".to_string()), "no bearer prefix"),
        (Some("Bearer invalidtoken".to_string()), "garbage token"),
    ];

    for (header, description) in test_cases {
        let mut request = app.client.get(&url);
        if let Some(value) = header {
            request = request.header("Authorization", value);
        }
        let response = request.send().await.unwrap();

        assert_eq!(401, response.status().as_u16(), "expected 401 for {}", description);
    }
}

#[tokio::test]
async fn protected_routes_reject_token_signed_with_other_key() {
    let app = spawn_app();
    let foreign = TokenCodec::new(
        SigningKey::new("some-other-key").unwrap(),
        chrono::Duration::minutes(15),
    )
    .issue(1)
    .unwrap();

    let response = app
        .client
        .get(&format!("{}/users", app.address))
        .bearer_auth(foreign)
        .send()
        .await
        .unwrap();

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn profile_crud_with_valid_token() {
    let app = spawn_app();
    let id = app.register("a@x.com", "pw1234").await;
    let (access_token, _) = app.login_tokens("a@x.com", "pw1234").await;
    let user_url = format!("{}/users/{}", app.address, id);

    let listed: Value = app
        .client
        .get(&format!("{}/users", app.address))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(listed[0].get("password_hash").is_none());

    let fetched = app.client.get(&user_url).bearer_auth(&access_token).send().await.unwrap();
    assert_eq!(200, fetched.status().as_u16());
    let fetched: Value = fetched.json().await.unwrap();
    assert_eq!(fetched["email"], "a@x.com");

    let updated = app
        .client
        .put(&user_url)
        .bearer_auth(&access_token)
        .json(&json!({"first_name": "Augusta", "last_name": "King", "email": "a@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, updated.status().as_u16());
    let updated: Value = updated.json().await.unwrap();
    assert_eq!(updated["first_name"], "Augusta");

    let invalid = app
        .client
        .put(&user_url)
        .bearer_auth(&access_token)
        .json(&json!({"first_name": "", "last_name": "King", "email": "bad"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, invalid.status().as_u16());

    let deleted = app.client.delete(&user_url).bearer_auth(&access_token).send().await.unwrap();
    assert_eq!(204, deleted.status().as_u16());

    let missing = app.client.get(&user_url).bearer_auth(&access_token).send().await.unwrap();
    assert_eq!(404, missing.status().as_u16());
}

// --- Rate limiting ---

#[tokio::test]
async fn login_is_rate_limited_beyond_burst() {
    let burst = 3;
    let app = spawn_app_with(false, burst);

    let mut statuses = Vec::new();
    for _ in 0..=burst {
        let response = app.login("nobody@x.com", "pw1234").await;
        statuses.push(response.status().as_u16());
    }

    assert!(statuses.contains(&429), "statuses: {:?}", statuses);
    assert_eq!(statuses.iter().filter(|s| **s == 401).count(), burst as usize);
}

#[tokio::test]
async fn rate_limit_response_has_no_retry_after() {
    let app = spawn_app_with(false, 1);

    app.login("nobody@x.com", "pw1234").await;
    let response = app.login("nobody@x.com", "pw1234").await;

    assert_eq!(429, response.status().as_u16());
    assert!(response.headers().get("retry-after").is_none());
}

#[tokio::test]
async fn protected_routes_are_not_rate_limited() {
    let app = spawn_app_with(false, 2);
    app.register("a@x.com", "pw1234").await;
    let (access_token, _) = app.login_tokens("a@x.com", "pw1234").await;

    for _ in 0..5 {
        let response = app
            .client
            .get(&format!("{}/users", app.address))
            .bearer_auth(&access_token)
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
    }
}
