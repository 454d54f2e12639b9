use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use summarize::api::handler::{handle, remaining_time};
use summarize::clients::{CompletionBackend, IdentityProvider};
use summarize::core::config::AppConfig;
use summarize::core::models::{AssistantMessage, CompletionPrompt};
use summarize::core::state::AppState;
use summarize::errors::SummarizeError;

enum Reply {
    Message(&'static str),
    Fail(&'static str),
    Hang,
}

/// Completion backend that records every prompt it receives.
struct StubCompletion {
    reply: Reply,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for StubCompletion {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<AssistantMessage, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.text.clone());
        match self.reply {
            Reply::Message(content) => Ok(AssistantMessage::assistant(content)),
            Reply::Fail(detail) => Err(SummarizeError::UpstreamFailure(detail.to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(AssistantMessage::assistant("too late"))
            }
        }
    }
}

/// Maps `token-<id>` to user `<id>`.
struct PrefixIdentity;

#[async_trait]
impl IdentityProvider for PrefixIdentity {
    async fn verify_token(&self, token: &str) -> Result<String, SummarizeError> {
        token
            .strip_prefix("token-")
            .map(ToString::to_string)
            .ok_or_else(|| SummarizeError::Unauthorized("Invalid token".to_string()))
    }
}

fn config(vars: &[(&str, &str)]) -> AppConfig {
    let mut map: HashMap<String, String> = HashMap::new();
    map.insert("OPENAI_API_KEY".into(), "sk-test".into());
    map.insert("SUPABASE_URL".into(), "https://project.supabase.co".into());
    map.insert("SUPABASE_ANON_KEY".into(), "anon".into());
    for (k, v) in vars {
        map.insert((*k).to_string(), (*v).to_string());
    }
    AppConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
}

fn state(vars: &[(&str, &str)], completion: Arc<StubCompletion>) -> AppState {
    let identity: Arc<dyn IdentityProvider> = Arc::new(PrefixIdentity);
    AppState::with_clients(config(vars), completion, Some(identity))
}

fn event(body: &Value, headers: &Value) -> Value {
    json!({
        "httpMethod": "POST",
        "headers": headers,
        "body": body.to_string()
    })
}

fn weather_body() -> Value {
    json!({ "question": "What is the weather?", "answers": ["sunny", "rainy", "cold"] })
}

fn body_json(response: &Value) -> Value {
    serde_json::from_str(response["body"].as_str().expect("string body")).expect("json body")
}

#[tokio::test]
async fn test_end_to_end_unauthenticated_relay() {
    let stub = StubCompletion::new(Reply::Message("Mostly wet weather."));
    let state = state(&[], stub.clone());

    let response = handle(&state, &event(&weather_body(), &json!({})), None).await;

    assert_eq!(response["statusCode"], 200);
    assert_eq!(
        body_json(&response),
        json!({ "role": "assistant", "content": "Mostly wet weather." })
    );
    assert_eq!(stub.calls(), 1);
    assert_eq!(
        stub.prompts.lock().unwrap()[0],
        "Describe and summarize the following list of answers to the question \
         \"What is the weather?\" as accurately and concisely as possible: sunny,rainy,cold"
    );
}

#[tokio::test]
async fn test_chat_envelope_content_is_returned() {
    let stub = StubCompletion::new(Reply::Message("X"));
    let state = state(&[("COMPLETION_SHAPE", "chat")], stub.clone());

    let response = handle(&state, &event(&weather_body(), &json!({})), None).await;

    assert_eq!(response["statusCode"], 200);
    assert_eq!(body_json(&response), json!({ "role": "assistant", "content": "X" }));
}

#[tokio::test]
async fn test_malformed_bodies_never_call_upstream() {
    let stub = StubCompletion::new(Reply::Message("unused"));
    let state = state(&[], stub.clone());

    let bodies = [
        json!({ "answers": ["a"] }),
        json!({ "question": "Q" }),
        json!({ "question": "Q", "answers": [] }),
    ];
    for body in &bodies {
        let response = handle(&state, &event(body, &json!({})), None).await;
        assert_eq!(response["statusCode"], 400, "body: {body}");
        assert_eq!(body_json(&response)["error"], "MalformedRequest");
    }

    let raw = json!({ "httpMethod": "POST", "headers": {}, "body": "{not json" });
    let response = handle(&state, &raw, None).await;
    assert_eq!(response["statusCode"], 400);

    let missing = json!({ "httpMethod": "POST", "headers": {} });
    let response = handle(&state, &missing, None).await;
    assert_eq!(response["statusCode"], 400);

    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_bearer_mode_rejects_missing_and_malformed_headers() {
    let stub = StubCompletion::new(Reply::Message("unused"));
    let state = state(&[("AUTH_MODE", "bearer")], stub.clone());

    for headers in [
        json!({}),
        json!({ "Authorization": "token-user-1" }),
        json!({ "Authorization": "Bearer" }),
        json!({ "Authorization": "Bearer not-a-known-token" }),
    ] {
        let response = handle(&state, &event(&weather_body(), &headers), None).await;
        assert_eq!(response["statusCode"], 401, "headers: {headers}");
        assert_eq!(body_json(&response)["error"], "Unauthorized");
    }

    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_bearer_mode_accepts_verified_token() {
    let stub = StubCompletion::new(Reply::Message("ok"));
    let state = state(&[("AUTH_MODE", "bearer")], stub.clone());

    let headers = json!({ "authorization": "Bearer token-user-1" });
    let response = handle(&state, &event(&weather_body(), &headers), None).await;

    assert_eq!(response["statusCode"], 200);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_strict_mode_rejects_identity_mismatch() {
    let stub = StubCompletion::new(Reply::Message("ok"));
    let state = state(&[("AUTH_MODE", "strict")], stub.clone());
    let headers = json!({ "Authorization": "Bearer token-user-1" });

    let mut body = weather_body();
    body["userId"] = json!("user-2");
    let response = handle(&state, &event(&body, &headers), None).await;
    assert_eq!(response["statusCode"], 401);
    assert_eq!(stub.calls(), 0);

    body["userId"] = json!("user-1");
    let response = handle(&state, &event(&body, &headers), None).await;
    assert_eq!(response["statusCode"], 200);
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_upstream_failure_becomes_500() {
    let stub = StubCompletion::new(Reply::Fail("status 503: overloaded"));
    let state = state(&[], stub.clone());

    let response = handle(&state, &event(&weather_body(), &json!({})), None).await;

    assert_eq!(response["statusCode"], 500);
    let body = body_json(&response);
    assert_eq!(body["error"], "UpstreamFailure");
    assert!(body["detail"].as_str().unwrap().contains("overloaded"));
    assert!(!response.to_string().contains("sk-test"));
}

#[tokio::test]
async fn test_deadline_abandons_completion_call() {
    let stub = StubCompletion::new(Reply::Hang);
    let state = state(&[], stub.clone());

    let response = handle(
        &state,
        &event(&weather_body(), &json!({})),
        Some(Duration::from_millis(20)),
    )
    .await;

    assert_eq!(response["statusCode"], 500);
    assert_eq!(body_json(&response)["error"], "UpstreamTimeout");
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_base64_body_is_decoded() {
    let stub = StubCompletion::new(Reply::Message("decoded"));
    let state = state(&[], stub.clone());

    let payload = json!({
        "requestContext": { "http": { "method": "POST" } },
        "headers": {},
        "isBase64Encoded": true,
        "body": STANDARD.encode(weather_body().to_string())
    });
    let response = handle(&state, &payload, None).await;

    assert_eq!(response["statusCode"], 200);
    assert_eq!(body_json(&response)["content"], "decoded");
}

#[tokio::test]
async fn test_cors_headers_on_success_and_failure() {
    let stub = StubCompletion::new(Reply::Message("ok"));
    let state = state(
        &[("AUTH_MODE", "bearer"), ("CORS_ALLOW_ORIGIN", "*")],
        stub.clone(),
    );

    let ok = handle(
        &state,
        &event(&weather_body(), &json!({ "Authorization": "Bearer token-u" })),
        None,
    )
    .await;
    let denied = handle(&state, &event(&weather_body(), &json!({})), None).await;

    for response in [&ok, &denied] {
        assert_eq!(response["headers"]["Access-Control-Allow-Origin"], "*");
        assert!(response["headers"]["Access-Control-Allow-Headers"].is_string());
        assert!(response["headers"]["Access-Control-Allow-Methods"].is_string());
    }
    assert_eq!(ok["statusCode"], 200);
    assert_eq!(denied["statusCode"], 401);
}

#[tokio::test]
async fn test_no_cors_headers_without_origin() {
    let stub = StubCompletion::new(Reply::Message("ok"));
    let state = state(&[], stub);

    let response = handle(&state, &event(&weather_body(), &json!({})), None).await;
    assert!(response["headers"].get("Access-Control-Allow-Origin").is_none());
}

#[tokio::test]
async fn test_preflight_and_method_routing() {
    let stub = StubCompletion::new(Reply::Message("unused"));
    let state = state(&[("CORS_ALLOW_ORIGIN", "https://app.example.com")], stub.clone());

    let preflight = json!({ "httpMethod": "OPTIONS", "headers": {} });
    let response = handle(&state, &preflight, None).await;
    assert_eq!(response["statusCode"], 204);
    assert_eq!(
        response["headers"]["Access-Control-Allow-Origin"],
        "https://app.example.com"
    );

    let get = json!({ "requestContext": { "http": { "method": "GET" } }, "headers": {} });
    let response = handle(&state, &get, None).await;
    assert_eq!(response["statusCode"], 405);
    assert_eq!(response["headers"]["Allow"], "POST, OPTIONS");

    assert_eq!(stub.calls(), 0);
}

#[test]
fn test_remaining_time() {
    assert_eq!(remaining_time(0), None);
    assert_eq!(remaining_time(1), Some(Duration::ZERO));

    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    let remaining = remaining_time(now_ms + 10_000).unwrap();
    assert!(remaining <= Duration::from_millis(9_500));
    assert!(remaining > Duration::from_millis(8_000));
}

/// Identity provider that never answers.
struct HangingIdentity;

#[async_trait]
impl IdentityProvider for HangingIdentity {
    async fn verify_token(&self, _token: &str) -> Result<String, SummarizeError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("user-1".to_string())
    }
}

#[tokio::test]
async fn test_deadline_bounds_identity_verification() {
    let stub = StubCompletion::new(Reply::Message("unused"));
    let identity: Arc<dyn IdentityProvider> = Arc::new(HangingIdentity);
    let state = AppState::with_clients(
        config(&[("AUTH_MODE", "bearer")]),
        stub.clone(),
        Some(identity),
    );
    let headers = json!({ "Authorization": "Bearer token-user-1" });

    let response = tokio::time::timeout(
        Duration::from_secs(2),
        handle(&state, &event(&weather_body(), &headers), Some(Duration::from_millis(20))),
    )
    .await
    .expect("handler should answer before the outer timeout");

    assert_eq!(response["statusCode"], 500);
    assert_eq!(body_json(&response)["error"], "UpstreamTimeout");
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn test_joined_string_answers_reach_the_prompt() {
    let stub = StubCompletion::new(Reply::Message("ok"));
    let state = state(&[], stub.clone());

    let body = json!({ "question": "What is the weather?", "answers": "sunny,rainy" });
    let response = handle(&state, &event(&body, &json!({})), None).await;

    assert_eq!(response["statusCode"], 200);
    assert!(stub.prompts.lock().unwrap()[0].ends_with("as possible: sunny,rainy"));
}
