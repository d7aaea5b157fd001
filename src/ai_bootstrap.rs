// src/ai_bootstrap.rs
use std::time::Duration;

use tracing::{info, warn};

use crate::analyze::ai_adapter::{ask, build_client_from_config, DynTextGenerator};
use crate::config::llm::LlmConfig;

pub struct LlmRuntime {
    pub cfg: LlmConfig,
    pub client: DynTextGenerator,
}

impl LlmRuntime {
    pub fn from_config(cfg: &LlmConfig) -> Self {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            provider = %cfg.provider,
            enabled = cfg.enabled,
            key_len = cfg.api_key.len(),
            "text generation config loaded"
        );
        let client = build_client_from_config(cfg);
        if !client.is_available() {
            warn!("text generation unavailable, all steps use deterministic fallbacks");
        }
        Self {
            cfg: cfg.clone(),
            client,
        }
    }

    /// One tiny call to surface credential problems at startup. Never fails.
    pub async fn quick_probe(&self) -> bool {
        if !self.client.is_available() {
            return false;
        }
        let timeout = Duration::from_secs(self.cfg.timeout_secs.max(1));
        match ask(self.client.as_ref(), "Reply with the single word: ok", timeout).await {
            Ok(out) => {
                info!(provider = self.client.provider_name(), len = out.len(), "text generation probe ok");
                true
            }
            Err(e) => {
                warn!(provider = self.client.provider_name(), error = %e, "text generation probe failed");
                false
            }
        }
    }
}
