//! Action Menu
//!
//! Model of the floating menu: its content, position, loading state and
//! transient error. One `MenuSession` exists per open menu.

use std::time::{Duration, Instant};

use crate::actions::{builtin_actions, Action};
use crate::capture::CapturedSelection;
use crate::dom::{ElementId, Viewport};

/// Distance kept between the menu and the viewport edges
pub const MENU_MARGIN: f64 = 10.0;
/// Gap between the anchor point and the menu
pub const ANCHOR_OFFSET: f64 = 10.0;
/// How long an error stays visible
pub const ERROR_TTL: Duration = Duration::from_secs(3);

const BUTTONS_PER_ROW: usize = 2;
const MENU_WIDTH: f64 = 220.0;
const ROW_HEIGHT: f64 = 34.0;
const LABEL_HEIGHT: f64 = 18.0;
const PADDING: f64 = 8.0;

/// Identifies a menu session; a new selection gets a new id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Top-left corner in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuPosition {
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuSize {
    pub width: f64,
    pub height: f64,
}

/// Place a menu of `size` below the anchor, keeping it inside the viewport.
///
/// Anchor coordinates are viewport-relative; the result is page-relative.
pub fn position_menu(anchor_x: f64, anchor_y: f64, size: MenuSize, viewport: &Viewport) -> MenuPosition {
    let mut left = anchor_x;
    let mut top = anchor_y + ANCHOR_OFFSET;

    if left + size.width > viewport.width - MENU_MARGIN {
        left = viewport.width - size.width - MENU_MARGIN;
    }
    if left < MENU_MARGIN {
        left = MENU_MARGIN;
    }

    // Flip above the anchor when there is no room below
    if top + size.height > viewport.height - MENU_MARGIN {
        top = anchor_y - size.height - ANCHOR_OFFSET;
    }
    if top < MENU_MARGIN {
        top = MENU_MARGIN;
    }

    MenuPosition {
        left: left + viewport.scroll_x,
        top: top + viewport.scroll_y,
    }
}

/// Everything the menu shows when it is not loading
#[derive(Debug, Clone, PartialEq)]
pub struct MenuContent {
    /// Built-in actions, two per row
    pub rows: Vec<Vec<Action>>,
    /// Text of the custom instruction input; `None` while hidden
    pub custom_input: Option<String>,
    /// Saved custom actions, empty until fetched
    pub saved: Vec<Action>,
}

impl MenuContent {
    fn new() -> Self {
        Self {
            rows: builtin_actions()
                .chunks(BUTTONS_PER_ROW)
                .map(<[Action]>::to_vec)
                .collect(),
            custom_input: None,
            saved: Vec::new(),
        }
    }

    /// Rendered size estimate used for viewport clamping
    pub fn estimated_size(&self) -> MenuSize {
        let mut height = PADDING * 2.0 + ROW_HEIGHT * (self.rows.len() + 1) as f64;
        if self.custom_input.is_some() {
            height += ROW_HEIGHT;
        }
        if !self.saved.is_empty() {
            height += LABEL_HEIGHT + ROW_HEIGHT;
        }
        MenuSize {
            width: MENU_WIDTH,
            height,
        }
    }
}

/// What the menu currently displays
#[derive(Debug, Clone, PartialEq)]
pub enum MenuView<'a> {
    /// Request in flight; every control is gone
    Loading,
    Ready {
        content: &'a MenuContent,
        error: Option<&'a str>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct MenuError {
    message: String,
    expires_at: Instant,
}

/// An open menu bound to one captured selection
#[derive(Debug, Clone)]
pub struct MenuSession {
    pub id: SessionId,
    /// Element the selection was captured from
    pub target: ElementId,
    pub selection: CapturedSelection,
    anchor: (f64, f64),
    viewport: Viewport,
    position: MenuPosition,
    content: MenuContent,
    loading: bool,
    error: Option<MenuError>,
}

impl MenuSession {
    pub fn new(
        id: SessionId,
        target: ElementId,
        selection: CapturedSelection,
        anchor: (f64, f64),
        viewport: Viewport,
    ) -> Self {
        let content = MenuContent::new();
        let position = position_menu(anchor.0, anchor.1, content.estimated_size(), &viewport);
        Self {
            id,
            target,
            selection,
            anchor,
            viewport,
            position,
            content,
            loading: false,
            error: None,
        }
    }

    pub fn position(&self) -> MenuPosition {
        self.position
    }

    pub fn content(&self) -> &MenuContent {
        &self.content
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn reposition(&mut self) {
        self.position = position_menu(
            self.anchor.0,
            self.anchor.1,
            self.content.estimated_size(),
            &self.viewport,
        );
    }

    /// Show the saved actions once the settings fetch resolves
    pub fn set_saved_actions(&mut self, saved: Vec<Action>) {
        if saved.is_empty() {
            return;
        }
        self.content.saved = saved;
        self.reposition();
    }

    /// Reveal the custom instruction input.
    ///
    /// Returns false if it was already visible.
    pub fn reveal_custom_input(&mut self) -> bool {
        if self.content.custom_input.is_some() {
            return false;
        }
        self.content.custom_input = Some(String::new());
        self.reposition();
        true
    }

    pub fn set_custom_text(&mut self, text: &str) {
        if let Some(input) = self.content.custom_input.as_mut() {
            *input = text.to_string();
        }
    }

    pub fn custom_text(&self) -> Option<&str> {
        self.content.custom_input.as_deref()
    }

    /// Enter the loading state.
    ///
    /// Returns false while another request is already in flight, which keeps
    /// every control disabled until it resolves.
    pub fn begin_request(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.error = None;
        true
    }

    /// Restore the previous content and show `message` for [`ERROR_TTL`]
    pub fn fail(&mut self, message: String, now: Instant) {
        self.loading = false;
        self.error = Some(MenuError {
            message,
            expires_at: now + ERROR_TTL,
        });
    }

    /// Drop the error once it has expired
    pub fn expire_error(&mut self, now: Instant) {
        if self.error.as_ref().is_some_and(|e| now >= e.expires_at) {
            self.error = None;
        }
    }

    pub fn view(&self, now: Instant) -> MenuView<'_> {
        if self.loading {
            return MenuView::Loading;
        }
        MenuView::Ready {
            content: &self.content,
            error: self
                .error
                .as_ref()
                .filter(|e| now < e.expires_at)
                .map(|e| e.message.as_str()),
        }
    }
}
