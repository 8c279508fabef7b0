//! Inference Proxy
//!
//! Privileged side of the boundary: resolves settings, builds the prompt,
//! calls the model and turns every outcome into a response envelope.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SettingsStore;
use crate::core::{prompts, ChatModel};
use crate::error::{DraftError, DraftResult, MISSING_API_KEY_MESSAGE};
use crate::ipc::{ProcessRequest, ProcessResponse};

pub struct InferenceProxy {
    settings: Arc<dyn SettingsStore>,
    model: Arc<dyn ChatModel>,
}

impl InferenceProxy {
    pub fn new(settings: Arc<dyn SettingsStore>, model: Arc<dyn ChatModel>) -> Self {
        Self { settings, model }
    }

    /// Rewrite the selection described by `request`
    pub async fn process(&self, request: &ProcessRequest) -> DraftResult<String> {
        let settings = self.settings.load().await?;
        if !settings.has_api_key() {
            return Err(DraftError::Config(MISSING_API_KEY_MESSAGE.to_string()));
        }

        let context = &request.selection_context;
        if context.selected.trim().is_empty() {
            return Err(DraftError::Ipc("request carries an empty selection".to_string()));
        }

        let prompt = prompts::build(
            context,
            &request.action_prompt,
            request.system_prompt.as_deref(),
            request.page_context.as_ref(),
        );

        info!(
            "🦊 Rewriting {} chars via {} ({})",
            context.selected.chars().count(),
            self.model.name(),
            settings.model
        );

        let replacement = self.model.invoke(&settings, &prompt).await?;
        let replacement = replacement.trim();
        if replacement.is_empty() {
            return Err(DraftError::Provider(
                "Model returned an empty replacement".to_string(),
            ));
        }
        Ok(replacement.to_string())
    }

    /// Process a request and wrap the outcome; never fails
    pub async fn handle(&self, request: ProcessRequest) -> ProcessResponse {
        let seq_id = request.seq_id;
        match self.process(&request).await {
            Ok(result) => ProcessResponse::ok(seq_id, result),
            Err(e) => {
                warn!("❌ Request {} failed: {}", seq_id, e);
                ProcessResponse::failure(seq_id, e.user_message())
            }
        }
    }

    /// (API key configured, model name) for status probes
    pub async fn status(&self) -> (bool, String) {
        match self.settings.load().await {
            Ok(settings) => (settings.has_api_key(), settings.model),
            Err(e) => {
                warn!("Failed to read settings for status: {}", e);
                (false, String::new())
            }
        }
    }
}
