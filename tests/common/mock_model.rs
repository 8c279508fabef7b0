//! Mock Chat Model for Testing
//!
//! Records every prompt and answers with a scripted reply, optionally
//! holding the answer until the test releases it.

use async_trait::async_trait;
use draftyfox::config::Settings;
use draftyfox::core::{ChatModel, Prompt};
use draftyfox::error::{DraftError, DraftResult};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

#[derive(Debug)]
pub struct MockModel {
    /// All prompts the model was invoked with
    pub prompts: Arc<Mutex<Vec<Prompt>>>,
    reply: Result<String, String>,
    gate: Option<Arc<Semaphore>>,
}

impl MockModel {
    /// Model that answers `text`
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            reply: Ok(text.to_string()),
            gate: None,
        })
    }

    /// Model that fails with a provider error
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            reply: Err(message.to_string()),
            gate: None,
        })
    }

    /// Model that answers `text` once a permit is added to the returned gate
    pub fn gated(text: &str) -> (Arc<Self>, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let model = Arc::new(Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            reply: Ok(text.to_string()),
            gate: Some(gate.clone()),
        });
        (model, gate)
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.lock().unwrap().last().cloned()
    }

    /// Yield until the model has been called `n` times
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn invoke(&self, _settings: &Settings, prompt: &Prompt) -> DraftResult<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("gate closed")
                .forget();
        }
        self.reply.clone().map_err(DraftError::Provider)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_model_records_prompts() {
        let model = MockModel::replying("ok");
        let prompt = Prompt {
            system: "s".to_string(),
            user: "u".to_string(),
        };
        let reply = model.invoke(&Settings::default(), &prompt).await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(model.call_count(), 1);
        assert_eq!(model.last_prompt(), Some(prompt));
    }
}
