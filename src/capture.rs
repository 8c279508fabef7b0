//! Selection Context Capture
//!
//! Snapshots the selected text of an eligible element together with a
//! bounded window of surrounding text for the model.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{Document, ElementId, TextRange};
use crate::eligibility::{classify, Capability};
use crate::utils::text::{char_len, char_slice, chars_before, chars_from, head, tail};

/// Maximum characters of context kept on each side of the selection
pub const CONTEXT_WINDOW: usize = 500;

/// Snapshot of a text selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionContext {
    /// Exact selected substring, never blank
    pub selected: String,
    /// Up to [`CONTEXT_WINDOW`] characters immediately before the selection
    pub before: String,
    /// Up to [`CONTEXT_WINDOW`] characters immediately after the selection
    pub after: String,
    /// Character offsets into the control value; `None` for rich text
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub is_rich_text: bool,
}

/// A captured context plus what the replacement engine needs to find the span again
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSelection {
    pub context: SelectionContext,
    /// Rich-text range as it was at capture time
    pub range: Option<TextRange>,
}

/// Capture the current selection of `element`.
///
/// Returns `None` for missing, collapsed or whitespace-only selections and
/// for elements that are not editable.
pub fn capture(doc: &Document, element: ElementId) -> Option<CapturedSelection> {
    let el = doc.element(element)?;
    let captured = match classify(el) {
        Capability::PlainControl => capture_control(doc, element),
        Capability::RichTextRegion => capture_rich_text(doc, element),
        Capability::NotEditable => None,
    };
    if let Some(c) = &captured {
        debug!(
            "✂️ Captured {} chars (rich_text={}, before={}, after={})",
            char_len(&c.context.selected),
            c.context.is_rich_text,
            char_len(&c.context.before),
            char_len(&c.context.after)
        );
    }
    captured
}

fn capture_control(doc: &Document, element: ElementId) -> Option<CapturedSelection> {
    let control = doc.element(element)?.control()?;
    let (start, end) = control.selection();
    let value = control.value();
    if start >= end || end > char_len(value) {
        return None;
    }

    let selected = char_slice(value, start, end);
    if selected.trim().is_empty() {
        return None;
    }

    Some(CapturedSelection {
        context: SelectionContext {
            selected: selected.to_string(),
            before: tail(chars_before(value, start), CONTEXT_WINDOW).to_string(),
            after: head(chars_from(value, end), CONTEXT_WINDOW).to_string(),
            start: Some(start),
            end: Some(end),
            is_rich_text: false,
        },
        range: None,
    })
}

fn capture_rich_text(doc: &Document, element: ElementId) -> Option<CapturedSelection> {
    let range = doc.selection().filter(|r| r.element == element)?;
    if range.is_collapsed() {
        return None;
    }
    let region = doc.element(element)?.rich_text_body()?;
    let selected = region.text_between(range.start, range.end)?;
    if selected.trim().is_empty() {
        return None;
    }

    // Context comes from the nearest container holding both ends of the range:
    // the text node itself, or the whole region when the range spans nodes.
    let (before, after) = if range.start.node == range.end.node {
        let node = &region.nodes()[range.start.node];
        (
            chars_before(node, range.start.offset).to_string(),
            chars_from(node, range.end.offset).to_string(),
        )
    } else {
        (region.text_before(range.start), region.text_after(range.end))
    };

    Some(CapturedSelection {
        context: SelectionContext {
            selected,
            before: tail(&before, CONTEXT_WINDOW).to_string(),
            after: head(&after, CONTEXT_WINDOW).to_string(),
            start: None,
            end: None,
            is_rich_text: true,
        },
        range: Some(range),
    })
}
