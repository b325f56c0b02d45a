use std::sync::Arc;
use std::time::Duration;

use foodnova_auth::{
    ApiRequest, AuthError, AuthEvent, CredentialPair, GatewayOptions, HttpGateway,
    RequestContext, TokenStore,
};
use foodnova_storage::Storage;
use futures_util::future::join_all;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token(role: &str, generation: u32) -> String {
    let claims = json!({
        "sub": "42",
        "email": "ada@example.com",
        "role": role,
        "type": "access",
        "gen": generation,
        "exp": 4102444800u64,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

fn gateway_with(server: &MockServer, options: GatewayOptions) -> Arc<HttpGateway> {
    let tokens = TokenStore::new(Storage::in_memory());
    Arc::new(
        HttpGateway::new(
            &format!("{}/api", server.uri()),
            reqwest::Client::new(),
            tokens,
            options,
        )
        .unwrap(),
    )
}

fn gateway(server: &MockServer) -> Arc<HttpGateway> {
    gateway_with(server, GatewayOptions::default())
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
async fn test_attaches_stored_access_token() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    let access = token("customer", 1);
    gateway
        .tokens()
        .save(&CredentialPair::new(access.clone(), "refresh-1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .and(header("Authorization", bearer(&access).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let orders: Vec<Value> = gateway.execute(ApiRequest::get("/orders/my")).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_non_401_passes_through_unchanged() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);

    Mock::given(method("POST"))
        .and(path("/api/admin/categories"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Category already exists"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = ApiRequest::post("/admin/categories")
        .json(&json!({"name": "Grains"}))
        .unwrap();

    let response = gateway.send(request.clone()).await.unwrap();
    assert_eq!(response.status().as_u16(), 400);

    match gateway.execute::<Value>(request).await {
        Err(AuthError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Category already exists");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    let mut events = gateway.on_auth_event();
    let old = token("customer", 1);
    let new = token("customer", 2);
    gateway
        .tokens()
        .save(&CredentialPair::new(old.clone(), "refresh-1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .and(header("Authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .and(header("Authorization", bearer(&new).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refresh_token": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": &new,
            "refresh_token": "refresh-2",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orders: Vec<Value> = gateway.execute(ApiRequest::get("/orders/my")).await.unwrap();

    assert_eq!(orders.len(), 1);
    let stored = gateway.tokens().read().unwrap();
    assert_eq!(stored.access_token.as_deref(), Some(new.as_str()));
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::TokenRefreshed);
}

#[tokio::test]
async fn test_failed_refresh_clears_credentials_and_expires_session() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    let mut events = gateway.on_auth_event();
    gateway
        .tokens()
        .save(&CredentialPair::new(token("admin", 1), "stale-refresh"))
        .unwrap();
    assert_eq!(gateway.tokens().current_role().as_deref(), Some("admin"));

    Mock::given(method("GET"))
        .and(path("/api/admin/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid refresh token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway.execute::<Value>(ApiRequest::get("/admin/orders")).await;

    match result {
        Err(AuthError::Unauthorized { message }) => assert_eq!(message, "Token expired"),
        other => panic!("expected unauthorized, got {other:?}"),
    }
    assert_eq!(gateway.tokens().current_role(), None);
    assert!(!gateway.tokens().has_access_token());
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::SessionExpired {
            redirect_to: "/login".to_string()
        }
    );
}

#[tokio::test]
async fn test_no_refresh_token_means_no_refresh_call() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);

    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = gateway.send(ApiRequest::get("/orders/my")).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_retried_request_does_not_loop() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    gateway
        .tokens()
        .save(&CredentialPair::new(token("customer", 1), "refresh-1"))
        .unwrap();

    // rejects every token, including the refreshed one
    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Nope"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token("customer", 2),
            "refresh_token": "refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway.send(ApiRequest::get("/orders/my")).await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_request_already_marked_retried_is_terminal() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    gateway
        .tokens()
        .save(&CredentialPair::new(token("customer", 1), "refresh-1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/orders/7"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = ApiRequest::get("/orders/7").with_context(RequestContext { retried: true });
    assert!(gateway.send(request).await.is_err());
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    let old = token("customer", 1);
    let new = token("customer", 2);
    gateway
        .tokens()
        .save(&CredentialPair::new(old.clone(), "refresh-1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("Authorization", bearer(&old).as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("Authorization", bearer(&new).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": &new, "refresh_token": "refresh-2"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let calls = (0..5).map(|_| {
        let gateway = gateway.clone();
        async move {
            gateway
                .execute::<Vec<Value>>(ApiRequest::get("/products"))
                .await
        }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
}

#[tokio::test]
async fn test_logout_during_refresh_discards_new_credentials() {
    let server = MockServer::start().await;
    let gateway = gateway(&server);
    gateway
        .tokens()
        .save(&CredentialPair::new(token("customer", 1), "refresh-1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": token("customer", 2),
                    "refresh_token": "refresh-2"
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let pending = {
        let gateway = gateway.clone();
        tokio::spawn(async move { gateway.send(ApiRequest::get("/orders/my")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    gateway.tokens().clear().unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    assert!(!gateway.tokens().has_access_token());
    assert_eq!(gateway.tokens().refresh_token().unwrap(), None);
}

#[tokio::test]
async fn test_hung_refresh_times_out() {
    let server = MockServer::start().await;
    let gateway = gateway_with(
        &server,
        GatewayOptions::default()
            .with_refresh_timeout(Duration::from_millis(100))
            .with_login_path("/account/login"),
    );
    let mut events = gateway.on_auth_event();
    gateway
        .tokens()
        .save(&CredentialPair::new(token("customer", 1), "refresh-1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/orders/my"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = gateway.send(ApiRequest::get("/orders/my")).await.unwrap_err();

    assert!(matches!(err, AuthError::RefreshTimeout));
    assert!(!gateway.tokens().has_access_token());
    assert_eq!(
        events.try_recv().unwrap(),
        AuthEvent::SessionExpired {
            redirect_to: "/account/login".to_string()
        }
    );
}

#[tokio::test]
async fn test_invalid_base_url_is_rejected() {
    let result = HttpGateway::new(
        "not a url",
        reqwest::Client::new(),
        TokenStore::new(Storage::in_memory()),
        GatewayOptions::default(),
    );
    assert!(matches!(result, Err(AuthError::Url(_))));
}
