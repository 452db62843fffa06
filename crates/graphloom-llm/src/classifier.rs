//! Provider-chain classifier: lazily resolves the first constructible
//! provider and reuses it for every classification in the run.

use crate::provider::{LlmProvider, ProviderKind, ProviderRegistry};
use crate::retry::{with_retries, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use async_trait::async_trait;
use graphloom_core::traits::{Classifier, ClassifierInfo};
use graphloom_core::{ClassifierError, ClassifierUnavailable};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Walks the configured chain on first use; `provider-init-failed` is
/// reported only after every provider refused to construct.
pub struct ChainClassifier {
    chain: Vec<ProviderKind>,
    requested_model: Option<String>,
    registry: ProviderRegistry,
    resolved: OnceCell<Result<Resolved, ClassifierUnavailable>>,
}

struct Resolved {
    provider: Box<dyn LlmProvider>,
    info: ClassifierInfo,
}

impl ChainClassifier {
    pub fn new(
        chain: Vec<ProviderKind>,
        requested_model: Option<String>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            chain,
            requested_model,
            registry,
            resolved: OnceCell::new(),
        }
    }

    async fn resolved(&self) -> &Result<Resolved, ClassifierUnavailable> {
        self.resolved
            .get_or_init(|| async {
                if self.chain.is_empty() {
                    return Err(ClassifierUnavailable::new("missing-provider"));
                }
                for kind in &self.chain {
                    match self.registry.build(*kind, self.requested_model.as_deref()) {
                        Ok(provider) => {
                            let info = ClassifierInfo {
                                provider: kind.to_string(),
                                model: provider.model_name().to_string(),
                            };
                            debug!(provider = %kind, model = %info.model, "classifier resolved");
                            return Ok(Resolved { provider, info });
                        }
                        Err(reason) => {
                            warn!(provider = %kind, reason, "provider failed to initialize");
                        }
                    }
                }
                Err(ClassifierUnavailable::new("provider-init-failed"))
            })
            .await
    }
}

#[async_trait]
impl Classifier for ChainClassifier {
    async fn ensure(&self) -> Result<ClassifierInfo, ClassifierUnavailable> {
        match self.resolved().await {
            Ok(resolved) => Ok(resolved.info.clone()),
            Err(unavailable) => Err(unavailable.clone()),
        }
    }

    async fn classify(&self, prompt: &str, schema: &Value) -> Result<Value, ClassifierError> {
        let resolved = match self.resolved().await {
            Ok(resolved) => resolved,
            Err(unavailable) => {
                return Err(ClassifierError::Unavailable(unavailable.reason.clone()))
            }
        };
        with_retries(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, || {
            resolved.provider.invoke_structured(prompt, schema)
        })
        .await
    }
}
