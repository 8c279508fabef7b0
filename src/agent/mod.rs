//! Page-Context Agent
//!
//! In-page half of DraftyFox: detects eligible selections, keeps the action
//! menu, captures selection context, sends rewrite requests and splices the
//! results back into the page.

pub mod controller;
pub mod menu;
pub mod replace;

pub use controller::{ActionOutcome, AgentOptions, EventOutcome, Key, PageAgent, PageEvent};
pub use menu::{MenuPosition, MenuSession, MenuView, SessionId};
