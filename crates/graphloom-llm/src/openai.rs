//! OpenAI-compatible structured-output client (OpenAI and DeepSeek).

use crate::gemini::classify_status;
use crate::provider::{LlmProvider, ProviderKind};
use async_trait::async_trait;
use graphloom_core::ClassifierError;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OpenAiProvider {
    kind: ProviderKind,
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        kind: ProviderKind,
        api_key: String,
        model: String,
        base_url: Option<String>,
    ) -> Self {
        Self {
            kind,
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke_structured(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> Result<Value, ClassifierError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "classification",
                    "schema": schema,
                    "strict": true,
                },
            },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("missing choice content".to_string())
            })?;
        serde_json::from_str(content)
            .map_err(|err| ClassifierError::InvalidResponse(format!("content is not json: {err}")))
    }
}
