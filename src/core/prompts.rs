//! Prompt Construction
//!
//! Builds the system prompt and the delimited user message sent to the
//! model for a rewrite request.

use crate::capture::SelectionContext;
use crate::page_context::PageContext;

/// Base instructions used when the agent does not supply its own
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a writing assistant embedded in the user's web browser. \
The user has selected part of a text they are editing and wants it rewritten. \
Rewrite only the selected text so that it reads naturally in place between the text before and the text after it. \
Keep the language of the original unless told otherwise. \
Do not add quotes, explanations, or commentary.";

/// Appended to the system prompt when the provider is asked for structured output
pub const STRUCTURED_OUTPUT_INSTRUCTION: &str = "Respond with a JSON object of the form \
{\"replacement\": \"...\"} whose only field holds the rewritten selected text.";

/// Prompt pair for one model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// System prompt ending with the structured-output instruction
    pub fn structured_system(&self) -> String {
        format!("{}\n\n{}", self.system, STRUCTURED_OUTPUT_INSTRUCTION)
    }
}

fn fenced(label: &str, text: &str) -> String {
    let body = if text.is_empty() { "(empty)" } else { text };
    format!("{label}:\n\"\"\"\n{body}\n\"\"\"")
}

fn page_block(page: &PageContext) -> String {
    let (intro, label) = if page.is_chat {
        (
            format!(
                "The user is writing a message in a chat conversation on \"{}\" ({}). \
Match the tone of the conversation.",
                page.title, page.url
            ),
            "Recent conversation for reference:",
        )
    } else {
        (
            format!(
                "The user is editing text on the web page \"{}\" ({}). \
Use the page content only as background.",
                page.title, page.url
            ),
            "Page content for reference:",
        )
    };
    if page.text.is_empty() {
        return intro;
    }
    format!("{intro} {label}\n\"\"\"\n{}\n\"\"\"", page.text)
}

/// System prompt: base instructions, the action, then optional page context
pub fn build_system_prompt(
    base: Option<&str>,
    action_prompt: &str,
    page: Option<&PageContext>,
) -> String {
    let base = base
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut prompt = format!("{base}\n\nInstruction: {}", action_prompt.trim());
    if let Some(page) = page {
        prompt.push_str("\n\n");
        prompt.push_str(&page_block(page));
    }
    prompt
}

/// User message with the selection and its surroundings clearly delimited
pub fn build_user_message(context: &SelectionContext) -> String {
    [
        fenced("Text before the selection (context only, do not rewrite)", &context.before),
        fenced("Selected text to modify", &context.selected),
        fenced("Text after the selection (context only, do not rewrite)", &context.after),
    ]
    .join("\n\n")
}

pub fn build(
    context: &SelectionContext,
    action_prompt: &str,
    system_prompt: Option<&str>,
    page: Option<&PageContext>,
) -> Prompt {
    Prompt {
        system: build_system_prompt(system_prompt, action_prompt, page),
        user: build_user_message(context),
    }
}
