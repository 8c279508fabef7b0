//! Page Context
//!
//! Read-only snapshot of the hosting page sent with each request so the
//! model can match the tone of the surrounding page or conversation.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::dom::Document;
use crate::utils::text::{char_len, tail};

/// Maximum characters of page text sent to the model
pub const PAGE_TEXT_LIMIT: usize = 4000;

/// Hosts whose pages are conversations rather than documents
const CHAT_HOSTS: &[&str] = &[
    "chatgpt.com",
    "chat.openai.com",
    "claude.ai",
    "gemini.google.com",
    "app.slack.com",
    "discord.com",
    "web.whatsapp.com",
    "web.telegram.org",
    "messenger.com",
    "teams.microsoft.com",
    "mail.google.com",
    "linkedin.com",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub title: String,
    pub url: String,
    /// Page body text; when truncated, the most recent characters are kept
    pub text: String,
    pub is_chat: bool,
}

impl PageContext {
    /// Build a fresh snapshot of the page
    pub fn from_document(doc: &Document) -> Self {
        let text = doc.body_text.trim();
        let text = if char_len(text) > PAGE_TEXT_LIMIT {
            tail(text, PAGE_TEXT_LIMIT)
        } else {
            text
        };
        Self {
            title: doc.title.clone(),
            url: doc.url.clone(),
            text: text.to_string(),
            is_chat: is_chat_url(&doc.url),
        }
    }
}

/// Check whether a URL points at a known chat or messaging app
pub fn is_chat_url(url: &str) -> bool {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return false;
    };
    CHAT_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{h}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_detection_follows_url_parsing() {
        assert!(is_chat_url("https://claude.ai\\chat\\1"));
        assert!(is_chat_url("https://user@discord.com:443/channels/1"));
        assert!(!is_chat_url("https://example.com/?next=https://claude.ai/"));
        assert!(!is_chat_url("claude.ai/chat"));
        assert!(!is_chat_url("not a url"));
    }

    #[test]
    fn test_chat_detection() {
        assert!(is_chat_url("https://app.slack.com/client/T1/C2"));
        assert!(is_chat_url("https://www.linkedin.com/messaging/"));
        assert!(is_chat_url("https://CHATGPT.com/c/abc"));
        assert!(!is_chat_url("https://example.com/blog"));
        assert!(!is_chat_url("https://notclaude.ai/"));
    }

    #[test]
    fn test_text_truncation_keeps_tail() {
        let mut doc = Document::new("Thread", "https://discord.com/channels/1/2");
        doc.body_text = format!("{}{}", "old ".repeat(2000), "latest message");
        let ctx = PageContext::from_document(&doc);
        assert_eq!(char_len(&ctx.text), PAGE_TEXT_LIMIT);
        assert!(ctx.text.ends_with("latest message"));
        assert!(ctx.is_chat);
    }

    #[test]
    fn test_short_text_kept() {
        let mut doc = Document::new("Docs", "https://example.com");
        doc.body_text = "  Short page.  ".to_string();
        let ctx = PageContext::from_document(&doc);
        assert_eq!(ctx.text, "Short page.");
        assert!(!ctx.is_chat);
        assert_eq!(ctx.title, "Docs");
    }
}
