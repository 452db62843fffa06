//! HTTP-level provider tests against a mocked wire surface.

use graphloom_core::traits::Classifier;
use graphloom_core::ClassifierError;
use graphloom_llm::{
    ChainClassifier, LlmProvider, OpenAiProvider, ProviderKind, ProviderRegistry, ProviderSettings,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": { "type": { "type": "string", "enum": ["Person", "Concept"] } },
        "required": ["type"],
        "additionalProperties": false,
    })
}

#[tokio::test]
async fn openai_provider_parses_structured_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "{\"type\":\"Person\",\"confidence\":0.9}" }
            }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(
        ProviderKind::OpenAi,
        "sk-test".into(),
        "gpt-4o-mini".into(),
        Some(server.uri()),
    );
    let response = provider
        .invoke_structured("classify Ada Lovelace", &schema())
        .await
        .unwrap();
    assert_eq!(response["type"], "Person");
}

#[tokio::test]
async fn rate_limits_are_retried_then_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "{\"type\":\"Concept\"}" } }]
        })))
        .mount(&server)
        .await;

    let registry = ProviderRegistry::new(ProviderSettings {
        openai_api_key: Some("sk-test".into()),
        openai_base_url: Some(server.uri()),
        ..ProviderSettings::default()
    });
    let classifier = ChainClassifier::new(vec![ProviderKind::OpenAi], None, registry);

    let info = classifier.ensure().await.unwrap();
    assert_eq!(info.provider, "openai");
    let response = classifier.classify("classify", &schema()).await.unwrap();
    assert_eq!(response["type"], "Concept");
}

#[tokio::test]
async fn malformed_content_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "not json at all" } }]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(
        ProviderKind::OpenAi,
        "sk-test".into(),
        "gpt-4o-mini".into(),
        Some(server.uri()),
    );
    let err = provider.invoke_structured("classify", &schema()).await.unwrap_err();
    assert!(matches!(err, ClassifierError::InvalidResponse(_)));
}

#[tokio::test]
async fn chain_falls_through_to_the_first_constructible_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "{\"type\":\"Person\"}" } }]
        })))
        .mount(&server)
        .await;

    // Gemini has no key and cannot build; DeepSeek can.
    let registry = ProviderRegistry::new(ProviderSettings {
        deepseek_api_key: Some("ds-test".into()),
        deepseek_base_url: Some(server.uri()),
        ..ProviderSettings::default()
    });
    let classifier = ChainClassifier::new(
        vec![ProviderKind::Gemini, ProviderKind::DeepSeek],
        Some("deepseek-chat".into()),
        registry,
    );

    let info = classifier.ensure().await.unwrap();
    assert_eq!(info.provider, "deepseek");
    assert_eq!(info.model, "deepseek-chat");
    let response = classifier.classify("classify", &schema()).await.unwrap();
    assert_eq!(response["type"], "Person");
}

#[tokio::test]
async fn exhausted_chain_reports_provider_init_failed() {
    let registry = ProviderRegistry::new(ProviderSettings::default());
    let classifier = ChainClassifier::new(
        vec![ProviderKind::Gemini, ProviderKind::OpenAi],
        None,
        registry,
    );

    let err = classifier.ensure().await.unwrap_err();
    assert_eq!(err.reason, "provider-init-failed");
    // The unavailability is sticky for the session.
    let err = classifier.ensure().await.unwrap_err();
    assert_eq!(err.reason, "provider-init-failed");
}
