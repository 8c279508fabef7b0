//! Page Document Model
//!
//! In-memory view of the hosting page that the agent reads and edits:
//! elements with their values and selections, the live rich-text
//! selection, the viewport, and the change events dispatched to the page.
//! A host binding keeps this in sync with the real page.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::utils::text::{char_len, char_slice, chars_before, chars_from};

/// Document shared between the host page, the user and the agent
pub type SharedDocument = Arc<Mutex<Document>>;

/// Handle to an element inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// Bounding box in viewport (client) coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Visible window size plus scroll offsets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// Single-line input or textarea state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextControl {
    value: String,
    selection_start: usize,
    selection_end: usize,
}

impl TextControl {
    pub fn new(value: &str) -> Self {
        let end = char_len(value);
        Self {
            value: value.to_string(),
            selection_start: end,
            selection_end: end,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value; like a browser, the cursor moves to the end
    pub fn set_value(&mut self, value: String) {
        let end = char_len(&value);
        self.value = value;
        self.selection_start = end;
        self.selection_end = end;
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.selection_start, self.selection_end)
    }

    /// Set the selection in characters, clamped to the value length
    pub fn set_selection_range(&mut self, start: usize, end: usize) {
        let len = char_len(&self.value);
        let end = end.min(len);
        self.selection_start = start.min(end);
        self.selection_end = end;
    }

    pub fn selected_text(&self) -> &str {
        char_slice(&self.value, self.selection_start, self.selection_end)
    }
}

/// Position inside a rich-text region: text node index plus character offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePoint {
    pub node: usize,
    pub offset: usize,
}

impl NodePoint {
    pub fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Content-editable region, flattened to its text nodes in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichText {
    nodes: Vec<String>,
}

impl RichText {
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<String> {
        &mut self.nodes
    }

    /// Full text content of the region
    pub fn text(&self) -> String {
        self.nodes.concat()
    }

    /// Check that a point addresses an existing node and offset
    pub fn contains_point(&self, point: NodePoint) -> bool {
        self.nodes
            .get(point.node)
            .is_some_and(|n| point.offset <= char_len(n))
    }

    /// Text between two points, `None` if either point is invalid
    pub fn text_between(&self, start: NodePoint, end: NodePoint) -> Option<String> {
        if !self.contains_point(start) || !self.contains_point(end) || start > end {
            return None;
        }
        if start.node == end.node {
            return Some(char_slice(&self.nodes[start.node], start.offset, end.offset).to_string());
        }
        let mut out = chars_from(&self.nodes[start.node], start.offset).to_string();
        for node in &self.nodes[start.node + 1..end.node] {
            out.push_str(node);
        }
        out.push_str(chars_before(&self.nodes[end.node], end.offset));
        Some(out)
    }

    /// Text from the start of the region up to a point
    pub fn text_before(&self, point: NodePoint) -> String {
        let mut out: String = self.nodes[..point.node.min(self.nodes.len())].concat();
        if let Some(node) = self.nodes.get(point.node) {
            out.push_str(chars_before(node, point.offset));
        }
        out
    }

    /// Text from a point to the end of the region
    pub fn text_after(&self, point: NodePoint) -> String {
        let Some(node) = self.nodes.get(point.node) else {
            return String::new();
        };
        let mut out = chars_from(node, point.offset).to_string();
        for node in &self.nodes[point.node + 1..] {
            out.push_str(node);
        }
        out
    }
}

/// Live text selection inside a rich-text region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub element: ElementId,
    pub start: NodePoint,
    pub end: NodePoint,
}

impl TextRange {
    pub fn new(element: ElementId, start: NodePoint, end: NodePoint) -> Self {
        Self {
            element,
            start,
            end,
        }
    }

    /// Collapsed range at a single point
    pub fn caret(element: ElementId, at: NodePoint) -> Self {
        Self::new(element, at, at)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Element content, by kind
#[derive(Debug, Clone, PartialEq)]
pub enum ElementBody {
    Control(TextControl),
    RichText(RichText),
    Empty,
}

/// A page element with the attributes the agent inspects
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Declared `type` attribute, inputs only
    pub input_type: Option<String>,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub autocomplete: Option<String>,
    pub content_editable: bool,
    pub rect: Rect,
    pub body: ElementBody,
}

impl Element {
    fn with_tag(tag: &str, body: ElementBody) -> Self {
        Self {
            tag: tag.to_lowercase(),
            input_type: None,
            name: String::new(),
            id: String::new(),
            placeholder: String::new(),
            autocomplete: None,
            content_editable: false,
            rect: Rect::default(),
            body,
        }
    }

    /// `<input type=...>` with an initial value
    pub fn input(input_type: &str, value: &str) -> Self {
        let mut el = Self::with_tag("input", ElementBody::Control(TextControl::new(value)));
        el.input_type = Some(input_type.to_string());
        el
    }

    pub fn textarea(value: &str) -> Self {
        Self::with_tag("textarea", ElementBody::Control(TextControl::new(value)))
    }

    /// `<div contenteditable>` holding the given text nodes
    pub fn rich_text<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut el = Self::with_tag("div", ElementBody::RichText(RichText::new(nodes)));
        el.content_editable = true;
        el
    }

    /// Any other element (buttons, plain divs, ...)
    pub fn other(tag: &str) -> Self {
        Self::with_tag(tag, ElementBody::Empty)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn with_autocomplete(mut self, autocomplete: &str) -> Self {
        self.autocomplete = Some(autocomplete.to_string());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn control(&self) -> Option<&TextControl> {
        match &self.body {
            ElementBody::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn control_mut(&mut self) -> Option<&mut TextControl> {
        match &mut self.body {
            ElementBody::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn rich_text_body(&self) -> Option<&RichText> {
        match &self.body {
            ElementBody::RichText(r) => Some(r),
            _ => None,
        }
    }

    pub fn rich_text_body_mut(&mut self) -> Option<&mut RichText> {
        match &mut self.body {
            ElementBody::RichText(r) => Some(r),
            _ => None,
        }
    }
}

/// Events dispatched to the page on behalf of the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    /// `input` event, as fired by a real keystroke
    Input { target: ElementId, bubbles: bool },
}

/// The hosting page
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub title: String,
    pub url: String,
    pub body_text: String,
    pub viewport: Viewport,
    elements: Vec<Element>,
    focused: Option<ElementId>,
    selection: Option<TextRange>,
    events: Vec<DomEvent>,
}

impl Document {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    /// Wrap in the shared handle used by the agent
    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    pub fn focus(&mut self, id: ElementId) {
        if self.element(id).is_some() {
            self.focused = Some(id);
        }
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// Currently focused element
    pub fn active_element(&self) -> Option<ElementId> {
        self.focused
    }

    /// Live rich-text selection, if any
    pub fn selection(&self) -> Option<TextRange> {
        self.selection
    }

    pub fn set_selection(&mut self, range: TextRange) {
        self.selection = Some(range);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn dispatch(&mut self, event: DomEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    /// Drain dispatched events for delivery to page listeners
    pub fn take_events(&mut self) -> Vec<DomEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_control_selection_clamped() {
        let mut c = TextControl::new("hello");
        assert_eq!(c.selection(), (5, 5));
        c.set_selection_range(2, 99);
        assert_eq!(c.selection(), (2, 5));
        assert_eq!(c.selected_text(), "llo");
        c.set_selection_range(4, 1);
        assert_eq!(c.selection(), (1, 1));
    }

    #[test]
    fn test_rich_text_between_nodes() {
        let rt = RichText::new(["Hello ", "brave ", "world"]);
        assert_eq!(rt.text(), "Hello brave world");
        let s = NodePoint::new(0, 2);
        let e = NodePoint::new(2, 3);
        assert_eq!(rt.text_between(s, e).as_deref(), Some("llo brave wor"));
        assert_eq!(rt.text_before(s), "He");
        assert_eq!(rt.text_after(e), "ld");
        assert!(rt.text_between(e, s).is_none());
        assert!(rt.text_between(s, NodePoint::new(5, 0)).is_none());
    }

    #[test]
    fn test_focus_ignores_unknown_element() {
        let mut doc = Document::new("t", "https://example.com");
        doc.focus(ElementId(3));
        assert!(doc.active_element().is_none());
        let id = doc.insert(Element::textarea("x"));
        doc.focus(id);
        assert_eq!(doc.active_element(), Some(id));
    }
}
