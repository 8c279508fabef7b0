//! DraftyFox Library
//!
//! Select text in an editable field, pick a rewrite action, and have the
//! selection replaced in place by a language model.

pub mod actions;
pub mod agent;
pub mod audit;
pub mod capture;
pub mod config;
pub mod core;
pub mod dom;
pub mod eligibility;
pub mod error;
pub mod ipc;
pub mod page_context;
pub mod proxy;
pub mod utils;
