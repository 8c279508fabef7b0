//! Page Agent Controller
//!
//! Owns the single menu session, reacts to page events, sends rewrite
//! requests and applies their results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::menu::{MenuSession, SessionId};
use super::replace;
use crate::actions::{builtin, custom_instruction, saved_actions, Action};
use crate::capture::capture;
use crate::config::SettingsStore;
use crate::dom::SharedDocument;
use crate::eligibility;
use crate::ipc::{ProcessRequest, ProcessResponse, ProxyChannel};
use crate::page_context::PageContext;

/// Keys the agent cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Other(String),
}

/// Page events forwarded by the host
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// Pointer released at viewport coordinates
    MouseUp { x: f64, y: f64, in_menu: bool },
    MouseDown { in_menu: bool },
    KeyDown(Key),
    /// Any scroll anywhere in the document
    Scroll,
    /// Keyboard shortcut asking for the menu at the focused element
    Shortcut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Opened(SessionId),
    Dismissed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Replacement spliced in, menu closed
    Applied,
    /// Error shown in the menu
    Failed(String),
    /// Response arrived after its session closed
    Dropped,
    /// No such session, or a request is already in flight
    Ignored,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Base system prompt sent with each request; the proxy default if `None`
    pub system_prompt: Option<String>,
    /// Send a page snapshot along with the selection
    pub include_page_context: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            include_page_context: true,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The page-context agent
pub struct PageAgent {
    document: SharedDocument,
    channel: Arc<dyn ProxyChannel>,
    settings: Arc<dyn SettingsStore>,
    options: AgentOptions,
    session: Mutex<Option<MenuSession>>,
    next_session_id: AtomicU64,
}

impl PageAgent {
    pub fn new(
        document: SharedDocument,
        channel: Arc<dyn ProxyChannel>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            document,
            channel,
            settings,
            options: AgentOptions::default(),
            session: Mutex::new(None),
            next_session_id: AtomicU64::new(1),
        }
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// React to a page event
    pub async fn handle_event(&self, event: PageEvent) -> EventOutcome {
        match event {
            PageEvent::MouseUp { in_menu: true, .. } | PageEvent::MouseDown { in_menu: true } => {
                EventOutcome::Unchanged
            }
            PageEvent::MouseUp { x, y, .. } => self.open_at(Some((x, y))).await,
            PageEvent::Shortcut => self.open_at(None).await,
            PageEvent::MouseDown { in_menu: false }
            | PageEvent::KeyDown(Key::Escape)
            | PageEvent::Scroll => {
                if self.dismiss() {
                    EventOutcome::Dismissed
                } else {
                    EventOutcome::Unchanged
                }
            }
            PageEvent::KeyDown(_) => EventOutcome::Unchanged,
        }
    }

    async fn open_at(&self, pointer: Option<(f64, f64)>) -> EventOutcome {
        match self.open_menu(pointer) {
            Some(id) => {
                self.load_saved_actions(id).await;
                EventOutcome::Opened(id)
            }
            None if self.dismiss() => EventOutcome::Dismissed,
            None => EventOutcome::Unchanged,
        }
    }

    /// Open a menu for the focused element's selection.
    ///
    /// Anchored at `pointer`, or below the element when `None`. Any previous
    /// session is replaced. Returns `None` when the element is ineligible or
    /// nothing is selected.
    pub fn open_menu(&self, pointer: Option<(f64, f64)>) -> Option<SessionId> {
        let (target, selection, anchor, viewport) = {
            let doc = lock(&self.document);
            let target = doc.active_element()?;
            let element = doc.element(target)?;
            if !eligibility::check(element).allows_menu() {
                debug!("Focused element is not eligible for rewriting");
                return None;
            }
            let selection = capture(&doc, target)?;
            let anchor = pointer.unwrap_or((element.rect.x, element.rect.bottom()));
            (target, selection, anchor, doc.viewport)
        };

        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        let session = MenuSession::new(id, target, selection, anchor, viewport);
        *lock(&self.session) = Some(session);
        info!("🦊 Menu {} opened", id.0);
        Some(id)
    }

    /// Fetch saved prompts and add them to the menu if it is still open
    pub async fn load_saved_actions(&self, id: SessionId) {
        let prompts = match self.settings.load().await {
            Ok(settings) => settings.custom_prompts,
            Err(e) => {
                warn!("Failed to load saved prompts: {}", e);
                return;
            }
        };
        if let Some(session) = lock(&self.session).as_mut().filter(|s| s.id == id) {
            session.set_saved_actions(saved_actions(&prompts));
        }
    }

    /// Close the menu; returns false if none was open
    pub fn dismiss(&self) -> bool {
        let closed = lock(&self.session).take();
        if let Some(session) = &closed {
            debug!("Menu {} dismissed", session.id.0);
        }
        closed.is_some()
    }

    pub fn current_session(&self) -> Option<SessionId> {
        lock(&self.session).as_ref().map(|s| s.id)
    }

    /// Inspect the open session
    pub fn with_session<R>(&self, f: impl FnOnce(&MenuSession) -> R) -> Option<R> {
        lock(&self.session).as_ref().map(f)
    }

    /// Drop menu errors whose display time is over
    pub fn tick(&self, now: Instant) {
        if let Some(session) = lock(&self.session).as_mut() {
            session.expire_error(now);
        }
    }

    pub fn reveal_custom_input(&self, id: SessionId) -> bool {
        lock(&self.session)
            .as_mut()
            .filter(|s| s.id == id && !s.is_loading())
            .is_some_and(|s| s.reveal_custom_input())
    }

    pub fn set_custom_text(&self, id: SessionId, text: &str) {
        if let Some(session) = lock(&self.session).as_mut().filter(|s| s.id == id) {
            session.set_custom_text(text);
        }
    }

    /// Run a built-in action by id
    pub async fn run_builtin(&self, id: SessionId, action_id: &str) -> ActionOutcome {
        match builtin(action_id) {
            Some(action) => self.run_action(id, action).await,
            None => ActionOutcome::Ignored,
        }
    }

    /// Submit the custom instruction typed into the menu
    pub async fn submit_custom(&self, id: SessionId) -> ActionOutcome {
        let text = self
            .with_session(|s| (s.id == id).then(|| s.custom_text().map(str::to_string)))
            .flatten()
            .flatten();
        match text.as_deref().and_then(custom_instruction) {
            Some(action) => self.run_action(id, action).await,
            None => ActionOutcome::Ignored,
        }
    }

    /// Send the session's selection with `action` and apply the result
    pub async fn run_action(&self, id: SessionId, action: Action) -> ActionOutcome {
        let request = {
            let mut guard = lock(&self.session);
            let Some(session) = guard.as_mut().filter(|s| s.id == id) else {
                return ActionOutcome::Ignored;
            };
            if !session.begin_request() {
                debug!("Menu {} already has a request in flight", id.0);
                return ActionOutcome::Ignored;
            }
            let page_context = self
                .options
                .include_page_context
                .then(|| PageContext::from_document(&lock(&self.document)));
            ProcessRequest {
                seq_id: 0,
                selection_context: session.selection.context.clone(),
                action_prompt: action.prompt.clone(),
                system_prompt: self.options.system_prompt.clone(),
                page_context,
            }
        };

        info!("⚡ Running '{}' for menu {}", action.label, id.0);
        let outcome = self
            .channel
            .send(request)
            .await
            .and_then(ProcessResponse::into_result);

        let mut guard = lock(&self.session);
        let Some(session) = guard.as_mut().filter(|s| s.id == id) else {
            debug!("Menu {} closed before its response arrived, dropping it", id.0);
            return ActionOutcome::Dropped;
        };

        let applied = outcome.and_then(|replacement| {
            let mut doc = lock(&self.document);
            replace::apply(&mut doc, session.target, &session.selection, &replacement)
        });

        if let Err(e) = applied {
            let message = e.user_message();
            warn!("❌ Menu {} action failed: {}", id.0, e);
            session.fail(message.clone(), Instant::now());
            return ActionOutcome::Failed(message);
        }

        *guard = None;
        info!("✅ Menu {} applied its replacement", id.0);
        ActionOutcome::Applied
    }
}
