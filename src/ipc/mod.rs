//! IPC (Inter-Process Communication) Module
//!
//! Carries rewrite requests from the page agent to the inference proxy.
//! Two transports share the `ProxyChannel` interface: an in-process tokio
//! channel and a Unix socket speaking newline-delimited JSON.

pub mod client;
pub mod local;
pub mod messages;
pub mod server;

pub use client::IpcClient;
pub use local::LocalChannel;
pub use messages::*;
pub use server::IpcServer;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DraftResult;

/// What a transport reports when nothing is listening on the other side
pub(crate) const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";

/// Largest request line the socket transport accepts, newline included
pub const MAX_REQUEST_BYTES: usize = 256 * 1024;

static NEXT_SEQ_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_seq_id() -> u64 {
    NEXT_SEQ_ID.fetch_add(1, Ordering::SeqCst)
}

/// Asynchronous request/response channel to the inference proxy
#[async_trait]
pub trait ProxyChannel: Send + Sync {
    /// Send a request and wait for its correlated response.
    ///
    /// The channel assigns `seq_id`. An unreachable proxy yields
    /// `DraftError::ProxyUnreachable`.
    async fn send(&self, request: ProcessRequest) -> DraftResult<ProcessResponse>;
}

/// Get the Unix socket path for IPC
pub fn socket_path() -> PathBuf {
    let user = std::env::var("USER").unwrap_or_else(|_| "draftyfox".to_string());
    PathBuf::from(format!("/tmp/draftyfox-{}.sock", user))
}
