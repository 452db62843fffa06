//! Gemini structured-output client.

use crate::provider::{LlmProvider, ProviderKind};
use async_trait::async_trait;
use graphloom_core::ClassifierError;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, ClassifierError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|err| ClassifierError::Http(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| ClassifierError::InvalidResponse(err.to_string()))?;
        let text = payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("missing candidate text".to_string())
            })?;
        serde_json::from_str(text)
            .map_err(|err| ClassifierError::InvalidResponse(format!("candidate is not json: {err}")))
    }
}

pub(crate) fn classify_status(status: reqwest::StatusCode, body: String) -> ClassifierError {
    let message = format!("{status}: {body}");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ClassifierError::RateLimited(message)
    } else if status.is_server_error() {
        ClassifierError::Unavailable(message)
    } else {
        ClassifierError::Http(message)
    }
}
