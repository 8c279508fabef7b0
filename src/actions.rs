//! Text Actions
//!
//! Built-in transformations, the free-form custom instruction, and the
//! user's saved custom prompts.

use serde::{Deserialize, Serialize};

/// Saved actions shown in the menu, at most
pub const MAX_SAVED_ACTIONS: usize = 4;

/// Appended to custom instructions so the model answers with text only
const CUSTOM_SUFFIX: &str = " Return only the result, nothing else.";

/// A named transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub label: String,
    pub prompt: String,
}

/// A user-defined prompt as stored in settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPrompt {
    pub name: String,
    pub prompt: String,
}

/// Built-in actions: (id, label, prompt)
const BUILTIN: &[(&str, &str, &str)] = &[
    (
        "paraphrase",
        "Paraphrase",
        "Paraphrase the following text while keeping the same meaning. Return only the paraphrased text, nothing else.",
    ),
    (
        "shorten",
        "Shorten",
        "Shorten the following text while preserving its core meaning. Be concise. Return only the shortened text, nothing else.",
    ),
    (
        "expand",
        "Expand",
        "Expand the following text with more detail and context. Return only the expanded text, nothing else.",
    ),
    (
        "improve",
        "Improve",
        "Improve the phrasing and clarity of the following text. Fix grammar and make it more professional. Return only the improved text, nothing else.",
    ),
];

/// The fixed action set, in menu order
pub fn builtin_actions() -> Vec<Action> {
    BUILTIN
        .iter()
        .map(|(id, label, prompt)| Action {
            id: id.to_string(),
            label: label.to_string(),
            prompt: prompt.to_string(),
        })
        .collect()
}

pub fn builtin(id: &str) -> Option<Action> {
    builtin_actions().into_iter().find(|a| a.id == id)
}

/// Action for a free-form instruction typed into the menu.
///
/// Returns `None` for blank input.
pub fn custom_instruction(text: &str) -> Option<Action> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(Action {
        id: "custom".to_string(),
        label: "Custom".to_string(),
        prompt: format!("{text}{CUSTOM_SUFFIX}"),
    })
}

/// Menu actions for saved prompts, first [`MAX_SAVED_ACTIONS`] only
pub fn saved_actions(prompts: &[CustomPrompt]) -> Vec<Action> {
    prompts
        .iter()
        .take(MAX_SAVED_ACTIONS)
        .enumerate()
        .map(|(i, p)| Action {
            id: format!("saved-{i}"),
            label: p.name.clone(),
            prompt: p.prompt.clone(),
        })
        .collect()
}
