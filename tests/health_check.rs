/// Smoke tests for the server wiring

use std::net::TcpListener;
use tokengate::auth::AuthService;
use tokengate::configuration::{AuthSettings, RateLimitSettings};
use tokengate::startup::run;
use tokengate::store::Stores;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let stores = Stores::in_memory();
    let auth = AuthService::new(
        &stores,
        &AuthSettings {
            signing_key: "health-check-key".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604_800,
            rotate_refresh_tokens: false,
            hash_cost: tokengate::auth::MIN_HASH_COST,
        },
    )
    .expect("Failed to build auth service");
    let rate_limit = RateLimitSettings {
        requests_per_second: 100.0,
        burst: 100,
    };

    let server = run(listener, stores, auth, &rate_limit).expect("Failed to create server");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/does-not-exist", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
