//! IPC Server
//!
//! Unix socket server hosting the inference proxy.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{socket_path, IpcRequest, IpcResponse, ProcessResponse, MAX_REQUEST_BYTES};
use crate::error::{DraftResult, SELECTION_TOO_LARGE_MESSAGE};
use crate::proxy::InferenceProxy;

/// Sent back for request lines that do not parse
const UNREADABLE_REQUEST_MESSAGE: &str = "The inference proxy could not read the request.";

/// Minimum spacing between accepted requests
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// State shared by all connection handlers
struct Shared {
    proxy: Arc<InferenceProxy>,
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
    audit_log: Option<PathBuf>,
}

/// IPC Server for the inference proxy
pub struct IpcServer {
    path: PathBuf,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
    min_interval: Duration,
    audit_log: Option<PathBuf>,
}

impl IpcServer {
    /// Create new IPC server bound to `path` once started
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            task: None,
            min_interval: DEFAULT_MIN_INTERVAL,
            audit_log: None,
        }
    }

    /// Append one line per processed request to this file
    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    /// Change the rate limit; `Duration::ZERO` disables it
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start serving `proxy` on the socket
    pub async fn start(&mut self, proxy: Arc<InferenceProxy>) -> DraftResult<()> {
        // Clean up stale socket
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }

        let listener = UnixListener::bind(&self.path)?;

        // Owner-only access: the socket carries the user's text
        let mut perms = fs::metadata(&self.path)?.permissions();
        perms.set_mode(0o600);
        if let Err(e) = fs::set_permissions(&self.path, perms) {
            warn!("⚠️ Failed to set strict IPC socket permissions: {}", e);
        } else {
            debug!("🔒 IPC socket permissions set to 0600");
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let path = self.path.clone();
        let shared = Arc::new(Shared {
            proxy,
            last_request: Mutex::new(None),
            min_interval: self.min_interval,
            audit_log: self.audit_log.clone(),
        });

        info!("🔌 IPC server listening on {:?}", path);

        let handle = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => {
                            let shared = shared.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, shared).await {
                                    warn!("IPC client error: {}", e);
                                }
                            });
                        }
                        Err(e) => warn!("IPC accept error: {}", e),
                    },
                    _ = shutdown.notified() => break,
                }
            }

            let _ = fs::remove_file(&path);
            info!("🔌 IPC server stopped");
        });

        self.task = Some(handle);
        Ok(())
    }

    /// Stop the server and wait for the accept loop to exit
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
        if let Some(handle) = self.task.take() {
            let _ = handle.await;
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for IpcServer {
    fn default() -> Self {
        Self::new(socket_path())
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.take() {
            handle.abort();
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Returns false when the previous request was accepted too recently
fn admit(shared: &Shared) -> bool {
    if shared.min_interval.is_zero() {
        return true;
    }
    let mut last = shared
        .last_request
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if last.is_some_and(|t| t.elapsed() < shared.min_interval) {
        return false;
    }
    *last = Some(Instant::now());
    true
}

/// Handle a single client connection: one request line, one response line
async fn handle_client(mut stream: UnixStream, shared: Arc<Shared>) -> DraftResult<()> {
    let mut line = String::new();
    {
        let mut reader = BufReader::new(&mut stream).take(MAX_REQUEST_BYTES as u64);
        reader.read_line(&mut line).await?;
    }

    if line.is_empty() {
        return Ok(());
    }
    if !line.ends_with('\n') {
        warn!("⚠️ IPC request exceeded {} bytes, rejecting", MAX_REQUEST_BYTES);
        let rejection = ProcessResponse::failure(0, SELECTION_TOO_LARGE_MESSAGE);
        return write_response(&mut stream, &IpcResponse::ProcessResult(rejection)).await;
    }

    let request: IpcRequest = match serde_json::from_str(line.trim()) {
        Ok(request) => request,
        Err(e) => {
            warn!("⚠️ Malformed IPC request: {}", e);
            let rejection = ProcessResponse::failure(0, UNREADABLE_REQUEST_MESSAGE);
            return write_response(&mut stream, &IpcResponse::ProcessResult(rejection)).await;
        }
    };
    debug!("📨 IPC request seq {}", request.seq_id());

    let response = match request {
        IpcRequest::ProcessText(req) => {
            let seq_id = req.seq_id;
            let selected_chars = req.selection_context.selected.chars().count();
            let response = if admit(&shared) {
                shared.proxy.handle(req).await
            } else {
                warn!("⚠️ IPC rate limit triggered - rejecting request");
                ProcessResponse::failure(seq_id, "Too many requests. Try again in a moment.")
            };
            if let Some(path) = &shared.audit_log {
                let entry = format!(
                    "process_text seq={} selected_chars={} success={}",
                    seq_id, selected_chars, response.success
                );
                if let Err(e) = crate::audit::append(path, &entry) {
                    warn!("Failed to write audit log: {}", e);
                }
            }
            IpcResponse::ProcessResult(response)
        }
        IpcRequest::StatusRequest { seq_id } => {
            let (configured, model) = shared.proxy.status().await;
            IpcResponse::StatusResponse {
                seq_id,
                configured,
                model,
            }
        }
    };

    write_response(&mut stream, &response).await
}

async fn write_response(stream: &mut UnixStream, response: &IpcResponse) -> DraftResult<()> {
    let response_json = serde_json::to_string(response)? + "\n";
    stream.write_all(response_json.as_bytes()).await?;
    Ok(())
}
