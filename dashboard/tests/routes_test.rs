use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use gateway_client::GatewayError;
use relay_common::{HealthSnapshot, RecentSessions, SessionEntry};
use relay_dashboard::app;
use relay_dashboard::test_util::{create_test_state, test_config, StubGateway};
use relay_dashboard::Config;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: &str = "alice@example.com";

async fn send(
    config: Config,
    gateway: Arc<StubGateway>,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let router = app(create_test_state(config, gateway));

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn main_session_snapshot() -> HealthSnapshot {
    let now = chrono::Utc::now().timestamp_millis();
    HealthSnapshot {
        heartbeat_seconds: Some(30),
        sessions: Some(RecentSessions {
            recent: vec![SessionEntry {
                key: Some("agent:main:main".to_string()),
                updated_at: Some(now - 5 * 60_000),
                model: Some("claude".to_string()),
                total_tokens: Some(1500),
                input_tokens: Some(1000),
                output_tokens: Some(500),
                percent_used: Some(0.75),
                remaining_tokens: Some(198_500),
                context_tokens: Some(200_000),
            }],
        }),
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let (status, body) = send(
        test_config(),
        Arc::new(StubGateway::new()),
        Method::GET,
        "/health",
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    for (method, uri) in [
        (Method::POST, "/api/chat-send"),
        (Method::GET, "/api/status"),
        (Method::GET, "/api/costs"),
        (Method::POST, "/api/web-search"),
        (Method::GET, "/cockpit"),
    ] {
        let gateway = Arc::new(StubGateway::new());
        let (status, body) = send(test_config(), gateway.clone(), method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"], "Missing Authorization header");
        assert!(gateway.sent().is_empty());
    }
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let (status, _) = send(
        test_config(),
        Arc::new(StubGateway::new()),
        Method::GET,
        "/api/status",
        Some("garbage"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_allow_list_forbids_other_users() {
    let mut config = test_config();
    config.auth.allowed_emails = Some("Alice@Example.com, bob@example.com".to_string());

    let (status, _) = send(
        config.clone(),
        Arc::new(StubGateway::new()),
        Method::GET,
        "/api/status",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        config.clone(),
        Arc::new(StubGateway::new()),
        Method::GET,
        "/api/status",
        Some("mallory@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = send(
        config,
        Arc::new(StubGateway::new()),
        Method::GET,
        "/api/status",
        Some("anonymous"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_chat_send_relays_text() {
    let gateway = Arc::new(StubGateway::new().with_chat(Ok("Hello back".to_string())));
    let (status, body) = send(
        test_config(),
        gateway.clone(),
        Method::POST,
        "/api/chat-send",
        Some(USER),
        Some(r#"{"text":"Hello"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"reply": "Hello back"}));
    assert_eq!(gateway.sent(), vec!["Hello".to_string()]);
}

#[tokio::test]
async fn test_chat_send_rejects_invalid_text() {
    for body in [r#"{}"#, r#"{"text":""}"#, r#"{"text":5}"#, "nope"] {
        let gateway = Arc::new(StubGateway::new());
        let (status, json) = send(
            test_config(),
            gateway.clone(),
            Method::POST,
            "/api/chat-send",
            Some(USER),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(json["error"], "Invalid text");
        assert!(gateway.sent().is_empty());
    }
}

#[tokio::test]
async fn test_chat_send_gateway_failure() {
    let gateway = Arc::new(StubGateway::new().with_chat(Err(GatewayError::ChallengeTimeout)));
    let (status, body) = send(
        test_config(),
        gateway,
        Method::POST,
        "/api/chat-send",
        Some(USER),
        Some(r#"{"text":"Hello"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("No connect challenge received"));
    assert!(error.contains("status page"));
}

#[tokio::test]
async fn test_status_reports_main_session() {
    let gateway = Arc::new(StubGateway::new().with_health(Ok(main_session_snapshot())));
    let (status, body) = send(
        test_config(),
        gateway,
        Method::GET,
        "/api/status",
        Some(USER),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);
    assert_eq!(body["lastHeartbeat"], "30s interval");
    assert_eq!(body["mainSession"]["ageMin"], 5);
    assert_eq!(body["mainSession"]["model"], "claude");
    assert_eq!(body["mainSession"]["remainingTokens"], 198_500);
}

#[tokio::test]
async fn test_status_and_costs_follow_configured_session_key() {
    let mut snapshot = main_session_snapshot();
    if let Some(sessions) = snapshot.sessions.as_mut() {
        sessions.recent.push(SessionEntry {
            key: Some("agent:ops:main".to_string()),
            model: Some("ops-model".to_string()),
            total_tokens: Some(42),
            ..Default::default()
        });
    }

    let mut config = test_config();
    config.gateway.session_key = "agent:ops:main".to_string();

    let gateway = Arc::new(StubGateway::new().with_health(Ok(snapshot)));
    let (status, body) = send(
        config.clone(),
        gateway.clone(),
        Method::GET,
        "/api/status",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mainSession"]["model"], "ops-model");
    assert_eq!(body["mainSession"]["totalTokens"], 42);

    let (status, body) = send(config, gateway, Method::GET, "/api/costs", Some(USER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["costs"]["model"], "ops-model");
    assert_eq!(body["costs"]["totalTokens"], 42);
    assert_eq!(body["costs"]["inputTokens"], 0);
}

#[tokio::test]
async fn test_status_gateway_failure() {
    let gateway = Arc::new(StubGateway::new().with_health(Err(GatewayError::Timeout)));
    let (status, body) = send(
        test_config(),
        gateway,
        Method::GET,
        "/api/status",
        Some(USER),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Request timeout", "connected": false}));
}

#[tokio::test]
async fn test_costs() {
    let gateway = Arc::new(StubGateway::new().with_health(Ok(main_session_snapshot())));
    let (status, body) = send(
        test_config(),
        gateway,
        Method::GET,
        "/api/costs",
        Some(USER),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"costs": {
            "totalTokens": 1500,
            "inputTokens": 1000,
            "outputTokens": 500,
            "percentUsed": 0.75,
            "model": "claude",
            "contextTokens": 200000
        }})
    );
}

#[tokio::test]
async fn test_costs_without_session_and_on_failure() {
    let (status, body) = send(
        test_config(),
        Arc::new(StubGateway::new()),
        Method::GET,
        "/api/costs",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"costs": {"totalTokens": 0}}));

    let gateway = Arc::new(
        StubGateway::new().with_health(Err(GatewayError::Connect("invalid token".to_string()))),
    );
    let (status, body) = send(
        test_config(),
        gateway,
        Method::GET,
        "/api/costs",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"costs": {"error": "Connect failed: invalid token"}}));
}

#[tokio::test]
async fn test_web_search_proxies_to_tavily() {
    let tavily = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({
            "api_key": "tvly-key",
            "query": "rust",
            "max_results": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "A language.",
            "results": [{"title": "Rust", "url": "https://rust-lang.org", "content": "fast", "score": 0.98}]
        })))
        .expect(1)
        .mount(&tavily)
        .await;

    let mut config = test_config();
    config.search.base_url = tavily.uri();
    config.search.tavily_api_key = Some("tvly-key".to_string());

    let (status, body) = send(
        config,
        Arc::new(StubGateway::new()),
        Method::POST,
        "/api/web-search",
        Some(USER),
        Some(r#"{"query":" rust ","maxResults":99}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "query": "rust",
            "answer": "A language.",
            "results": [{"title": "Rust", "url": "https://rust-lang.org", "content": "fast", "score": 0.98}]
        })
    );
}

#[tokio::test]
async fn test_web_search_errors() {
    // No key configured.
    let (status, body) = send(
        test_config(),
        Arc::new(StubGateway::new()),
        Method::POST,
        "/api/web-search",
        Some(USER),
        Some(r#"{"query":"rust"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Missing TAVILY_API_KEY");

    let tavily = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&tavily)
        .await;

    let mut config = test_config();
    config.search.base_url = tavily.uri();
    config.search.tavily_api_key = Some("tvly-key".to_string());

    let (status, body) = send(
        config.clone(),
        Arc::new(StubGateway::new()),
        Method::POST,
        "/api/web-search",
        Some(USER),
        Some(r#"{"query":"   "}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing query");

    let (status, body) = send(
        config,
        Arc::new(StubGateway::new()),
        Method::POST,
        "/api/web-search",
        Some(USER),
        Some(r#"{"query":"rust"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Tavily error (429): slow down");
}

#[tokio::test]
async fn test_cockpit_redirect() {
    let mut config = test_config();
    config.cockpit.gateway_ui_url = Some("https://gateway.example.com/ui".to_string());

    let router = app(create_test_state(config, Arc::new(StubGateway::new())));
    let request = Request::builder()
        .uri("/cockpit")
        .header(header::AUTHORIZATION, format!("Bearer {}", USER))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://gateway.example.com/ui"
    );
}

#[tokio::test]
async fn test_cockpit_unconfigured() {
    let (status, body) = send(
        test_config(),
        Arc::new(StubGateway::new()),
        Method::GET,
        "/cockpit",
        Some(USER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Missing GATEWAY_UI_URL");
}
