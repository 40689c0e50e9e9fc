//! HTTP Routes
//!
//! axum surface of the gateway: the chat completion endpoint, a health
//! probe, and permissive CORS on every response.

use crate::api::completion::ChatRequest;
use crate::error::{GatewayError, Result};
use crate::Gateway;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{middleware, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Methods advertised to browsers
pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Headers OpenAI SDKs and browsers send
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, OpenAI-Beta, x-stainless-os, x-stainless-arch, x-stainless-lang, x-stainless-runtime, x-stainless-runtime-version, x-stainless-package-version";

/// Build the gateway application
pub fn app(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/v1/chat/completions", any(chat_completions))
        .route("/chat/completions", any(chat_completions))
        .route("/health", get(health))
        .layer(middleware::map_response(apply_cors))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

async fn apply_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    response
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat_completions(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    match handle(&gateway, &method, &headers, &body).await {
        Ok(response) => response,
        Err(err) => {
            if let GatewayError::Internal(ref msg) = err {
                error!(error = %msg, "Gateway error");
            }
            err.into_response()
        }
    }
}

async fn handle(
    gateway: &Gateway,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response> {
    if method != Method::POST {
        return Err(GatewayError::MethodNotAllowed);
    }

    gateway.authorize(headers)?;

    let request = ChatRequest::from_slice(body)?;
    let completion = gateway.complete(request).await?;

    Ok((completion.status, Json(completion.body)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::Value;
    use tower::ServiceExt;

    const TOKEN: &str = "gw-token";

    fn test_app(
        gemini_url: Option<String>,
        gemini_keys: &[&str],
        cerebras_url: Option<String>,
        cerebras_keys: &[&str],
    ) -> Router {
        let mut config = GatewayConfig::default();
        config.allowed_keys = vec![TOKEN.to_string()];
        config.gemini.api_keys = gemini_keys.iter().map(|k| k.to_string()).collect();
        config.cerebras.api_keys = cerebras_keys.iter().map(|k| k.to_string()).collect();
        if let Some(url) = gemini_url {
            config.gemini.url = url;
        }
        if let Some(url) = cerebras_url {
            config.cerebras.url = url;
        }
        app(Arc::new(Gateway::new(&config).unwrap()))
    }

    fn cerebras_app(server: &ServerGuard, keys: &[&str]) -> Router {
        test_app(None, &[], Some(format!("{}/v1/chat/completions", server.url())), keys)
    }

    fn post(body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/v1/chat/completions")
            .header("authorization", format!("Bearer {TOKEN}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    fn chat(model: &str) -> Value {
        json!({"model": model, "messages": [{"role": "user", "content": "hi"}]})
    }

    #[tokio::test]
    async fn test_preflight_gets_cors() {
        let app = test_app(None, &[], None, &[]);
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/v1/chat/completions")
            .body(Body::empty())
            .unwrap();

        let (status, headers, _) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            CORS_ALLOW_METHODS
        );
        assert!(headers
            .get(ACCESS_CONTROL_ALLOW_HEADERS)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("x-stainless-os"));
    }

    #[tokio::test]
    async fn test_non_post_is_rejected() {
        let app = test_app(None, &[], None, &[]);
        let request = Request::builder()
            .method(Method::GET)
            .uri("/v1/chat/completions")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(app, request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }

    #[tokio::test]
    async fn test_auth_checked_before_any_upstream_call() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let missing = Request::builder()
            .method(Method::POST)
            .uri("/v1/chat/completions")
            .body(Body::from(chat("llama").to_string()))
            .unwrap();
        let (status, _, body) = send(cerebras_app(&server, &["c1"]), missing).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Missing Authorization header");
        assert_eq!(body["error"]["type"], "authentication_error");

        let wrong = Request::builder()
            .method(Method::POST)
            .uri("/v1/chat/completions")
            .header("authorization", "Bearer nope")
            .body(Body::from(chat("llama").to_string()))
            .unwrap();
        let (status, _, body) = send(cerebras_app(&server, &["c1"]), wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid API Key");

        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let app = test_app(None, &[], None, &["c1"]);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/chat/completions")
            .header("authorization", format!("Bearer {TOKEN}"))
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_success_is_relayed() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer c1")
            .match_header("user-agent", Matcher::Regex("Mozilla/5.0".to_string()))
            .match_body(Matcher::PartialJson(json!({
                "model": "llama",
                "stream": false,
                "temperature": 0.5
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"chatcmpl-1","choices":[{"message":{"role":"assistant","content":"hello"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let mut request = chat("llama");
        request["stream"] = json!(true);
        request["temperature"] = json!(0.5);

        let (status, headers, body) = send(cerebras_app(&server, &["c1"]), post(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "chatcmpl-1");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_boolean_stream_is_forwarded_as_false() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama",
                "messages": [],
                "stream": false
            })))
            .with_status(200)
            .with_body(r#"{"id":"chatcmpl-2"}"#)
            .expect(1)
            .create_async()
            .await;

        let request = json!({"model": "llama", "messages": [], "stream": "yes"});
        let (status, _, body) = send(cerebras_app(&server, &["c1"]), post(request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "chatcmpl-2");
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_messages_are_forwarded() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({"model": "llama", "messages": null})))
            .with_status(200)
            .with_body(r#"{"id":"chatcmpl-3"}"#)
            .expect(1)
            .create_async()
            .await;

        let request = json!({"model": "llama", "messages": null});
        let (status, _, _) = send(cerebras_app(&server, &["c1"]), post(request)).await;
        assert_eq!(status, StatusCode::OK);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_key_is_rotated() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer limited")
            .with_status(429)
            .with_body("slow down")
            .expect_at_most(1)
            .create_async()
            .await;
        let good = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer good")
            .with_status(200)
            .with_body(r#"{"id":"ok"}"#)
            .expect(1)
            .create_async()
            .await;

        let (status, _, body) =
            send(cerebras_app(&server, &["limited", "good"]), post(chat("llama"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "ok");
        limited.assert_async().await;
        good.assert_async().await;
    }

    #[tokio::test]
    async fn test_all_keys_unauthorized() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("bad key")
            .expect(3)
            .create_async()
            .await;

        let (status, _, body) =
            send(cerebras_app(&server, &["a", "b", "c"]), post(chat("llama"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "api_key_error");
        assert_eq!(body["error"]["message"], "All API keys are exhausted or invalid");
        assert_eq!(body["error"]["details"], "bad key");
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_server_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("model overloaded")
            .expect(1)
            .create_async()
            .await;

        let (status, _, body) =
            send(cerebras_app(&server, &["a", "b", "c"]), post(chat("llama"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "upstream_error");
        assert_eq!(body["error"]["message"], "Upstream Error: model overloaded");
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_json_success_is_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let (status, _, body) = send(cerebras_app(&server, &["a"]), post(chat("llama"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "server_error");
    }

    #[tokio::test]
    async fn test_missing_provider_keys() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (status, _, body) = send(cerebras_app(&server, &[]), post(chat("llama"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "server_configuration_error");
        assert_eq!(body["error"]["message"], "No Cerebras API Keys configured on server");
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_gemini_3_gets_reasoning_effort() {
        let mut server = Server::new_async().await;
        let with_effort = server
            .mock("POST", "/gemini")
            .match_header("authorization", "Bearer g1")
            .match_body(Matcher::PartialJson(json!({
                "model": "gemini-3-pro",
                "reasoning_effort": "high"
            })))
            .with_status(200)
            .with_body(r#"{"id":"g3"}"#)
            .expect(1)
            .create_async()
            .await;

        let app = test_app(Some(format!("{}/gemini", server.url())), &["g1"], None, &[]);
        let (status, _, body) = send(app, post(chat("gemini-3-pro"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "g3");
        with_effort.assert_async().await;
    }

    #[tokio::test]
    async fn test_older_gemini_has_no_reasoning_effort() {
        let mut server = Server::new_async().await;
        let upstream = server
            .mock("POST", "/gemini")
            .match_body(Matcher::Json(json!({
                "model": "gemini-2-flash",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": false
            })))
            .with_status(200)
            .with_body(r#"{"id":"g2"}"#)
            .expect(1)
            .create_async()
            .await;

        let app = test_app(Some(format!("{}/gemini", server.url())), &["g1"], None, &[]);
        let (status, _, _) = send(app, post(chat("gemini-2-flash"))).await;
        assert_eq!(status, StatusCode::OK);
        upstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_service_unavailable() {
        let app = test_app(
            None,
            &[],
            Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            &["a", "b"],
        );

        let (status, _, body) = send(app, post(chat("llama"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["type"], "service_unavailable_error");
        assert_eq!(body["error"]["message"], "All API key attempts failed");
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app(None, &[], None, &[]);
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }
}
