#![allow(dead_code)]

pub mod mock_model;

pub use mock_model::MockModel;

use draftyfox::actions::CustomPrompt;
use draftyfox::agent::PageAgent;
use draftyfox::config::{MemorySettingsStore, Settings};
use draftyfox::dom::{Document, Element, ElementId, SharedDocument};
use draftyfox::ipc::{LocalChannel, ProxyChannel};
use draftyfox::proxy::InferenceProxy;
use std::sync::Arc;

pub fn settings(api_key: &str, custom_prompts: Vec<CustomPrompt>) -> Arc<MemorySettingsStore> {
    Arc::new(MemorySettingsStore::new(Settings {
        api_key: api_key.to_string(),
        custom_prompts,
        ..Settings::default()
    }))
}

/// An agent wired to a mock model through the in-process channel
pub struct TestContext {
    pub agent: PageAgent,
    pub document: SharedDocument,
    pub model: Arc<MockModel>,
    pub settings: Arc<MemorySettingsStore>,
}

impl TestContext {
    pub fn new(document: Document, model: Arc<MockModel>) -> Self {
        Self::with_settings(document, model, settings("sk-test", Vec::new()))
    }

    pub fn with_settings(
        document: Document,
        model: Arc<MockModel>,
        settings: Arc<MemorySettingsStore>,
    ) -> Self {
        let proxy = Arc::new(InferenceProxy::new(settings.clone(), model.clone()));
        let (channel, _handle) = LocalChannel::spawn(proxy);
        Self::with_channel(document, model, settings, Arc::new(channel))
    }

    pub fn with_channel(
        document: Document,
        model: Arc<MockModel>,
        settings: Arc<MemorySettingsStore>,
        channel: Arc<dyn ProxyChannel>,
    ) -> Self {
        let document = document.into_shared();
        let agent = PageAgent::new(document.clone(), channel, settings.clone());
        Self {
            agent,
            document,
            model,
            settings,
        }
    }

    pub fn value(&self, id: ElementId) -> String {
        let doc = self.document.lock().unwrap();
        doc.element(id).unwrap().control().unwrap().value().to_string()
    }

    pub fn cursor(&self, id: ElementId) -> (usize, usize) {
        let doc = self.document.lock().unwrap();
        doc.element(id).unwrap().control().unwrap().selection()
    }

    pub fn select(&self, id: ElementId, start: usize, end: usize) {
        let mut doc = self.document.lock().unwrap();
        doc.focus(id);
        doc.element_mut(id)
            .unwrap()
            .control_mut()
            .unwrap()
            .set_selection_range(start, end);
    }
}

/// Page with one focused text input
pub fn page_with_input(value: &str) -> (Document, ElementId) {
    let mut doc = Document::new("Compose", "https://example.com/compose");
    let id = doc.insert(Element::input("text", value).with_name("subject"));
    doc.focus(id);
    (doc, id)
}
