//! Replacement Engine
//!
//! Splices model output back into the element the selection came from and
//! leaves the cursor right after the inserted text.

use tracing::{debug, warn};

use crate::capture::CapturedSelection;
use crate::dom::{Document, DomEvent, ElementId, NodePoint, TextRange};
use crate::eligibility::{classify, Capability};
use crate::error::{DraftError, DraftResult};
use crate::utils::text::{char_len, chars_before, chars_from, splice};

const TARGET_GONE: &str = "The edited field is no longer on the page.";
const SELECTION_CHANGED: &str =
    "The selected text changed while DraftyFox was working. Nothing was replaced.";

/// Replace the captured span of `target` with `replacement`
pub fn apply(
    doc: &mut Document,
    target: ElementId,
    selection: &CapturedSelection,
    replacement: &str,
) -> DraftResult<()> {
    let capability = doc
        .element(target)
        .map(classify)
        .ok_or_else(|| DraftError::Replace(TARGET_GONE.to_string()))?;

    match (capability, selection.context.is_rich_text) {
        (Capability::PlainControl, false) => replace_in_control(doc, target, selection, replacement),
        (Capability::RichTextRegion, true) => {
            replace_in_rich_text(doc, target, selection, replacement)
        }
        _ => Err(DraftError::Replace(TARGET_GONE.to_string())),
    }
}

/// `value[..start] + replacement + value[end..]` using the captured offsets.
///
/// Offsets are not re-validated against the current value beyond clamping;
/// edits made elsewhere in the field while the request was in flight shift
/// the target span.
fn replace_in_control(
    doc: &mut Document,
    target: ElementId,
    selection: &CapturedSelection,
    replacement: &str,
) -> DraftResult<()> {
    let (Some(start), Some(end)) = (selection.context.start, selection.context.end) else {
        return Err(DraftError::Replace(TARGET_GONE.to_string()));
    };
    let control = doc
        .element_mut(target)
        .and_then(|e| e.control_mut())
        .ok_or_else(|| DraftError::Replace(TARGET_GONE.to_string()))?;

    let len = char_len(control.value());
    if end > len {
        warn!("⚠️ Field shrank from under the selection ({} > {}), clamping", end, len);
    }
    let start = start.min(len);
    let end = end.min(len).max(start);

    let value = splice(control.value(), start, end, replacement);
    control.set_value(value);
    let cursor = start + char_len(replacement);
    control.set_selection_range(cursor, cursor);

    doc.dispatch(DomEvent::Input {
        target,
        bubbles: true,
    });
    debug!("✍️ Replaced chars {}..{} in field, cursor at {}", start, end, cursor);
    Ok(())
}

/// Delete the captured range and insert the replacement as a new text node.
///
/// The captured range is used instead of whatever is selected now, and only
/// if it still covers the originally selected text.
fn replace_in_rich_text(
    doc: &mut Document,
    target: ElementId,
    selection: &CapturedSelection,
    replacement: &str,
) -> DraftResult<()> {
    let range = selection
        .range
        .filter(|r| r.element == target)
        .ok_or_else(|| DraftError::Replace(TARGET_GONE.to_string()))?;
    let region = doc
        .element_mut(target)
        .and_then(|e| e.rich_text_body_mut())
        .ok_or_else(|| DraftError::Replace(TARGET_GONE.to_string()))?;

    if region.text_between(range.start, range.end).as_deref()
        != Some(selection.context.selected.as_str())
    {
        warn!("⚠️ Rich-text selection changed during request, not replacing");
        return Err(DraftError::Replace(SELECTION_CHANGED.to_string()));
    }

    let nodes = region.nodes_mut();
    let left = chars_before(&nodes[range.start.node], range.start.offset).to_string();
    let right = chars_from(&nodes[range.end.node], range.end.offset).to_string();

    let mut new_nodes = Vec::with_capacity(3);
    if !left.is_empty() {
        new_nodes.push(left);
    }
    let inserted = range.start.node + new_nodes.len();
    new_nodes.push(replacement.to_string());
    if !right.is_empty() {
        new_nodes.push(right);
    }
    nodes.splice(range.start.node..=range.end.node, new_nodes);

    // Collapse the live selection after the inserted node
    doc.set_selection(TextRange::caret(
        target,
        NodePoint::new(inserted, char_len(replacement)),
    ));
    doc.dispatch(DomEvent::Input {
        target,
        bubbles: true,
    });
    debug!("✍️ Replaced rich-text range, inserted node {}", inserted);
    Ok(())
}
