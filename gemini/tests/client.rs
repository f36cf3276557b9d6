#![allow(clippy::expect_used)]

use pretty_assertions::assert_eq;
use prompttalk_core::backend::GenerationBackend;
use prompttalk_gemini::GeminiClient;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

const MODEL: &str = "gemini-1.5-flash";

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new(&server.uri(), Some("test-key".to_string()), MODEL)
}

#[tokio::test]
async fn sends_prompt_and_assembles_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "say hi"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello"}, {"text": " world"}]}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let generated = client.generate("say hi").await.expect("request succeeds");
    assert_eq!(generated.text, "Hello world");
}

#[tokio::test]
async fn http_error_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "quota exceeded"}
            })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate("say hi").await.expect_err("request fails");
    let reason = err.to_string();
    assert!(reason.contains("429"), "unexpected reason: {reason}");
    assert!(
        reason.contains("quota exceeded"),
        "unexpected reason: {reason}"
    );
}

#[tokio::test]
async fn candidate_free_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate("say hi").await.expect_err("request fails");
    assert!(
        err.to_string().contains("no candidate text"),
        "unexpected reason: {err}"
    );
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{MODEL}:generateContent")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.generate("say hi").await.expect_err("request fails");
    assert!(
        err.to_string().contains("malformed response body"),
        "unexpected reason: {err}"
    );
}
