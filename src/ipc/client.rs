//! IPC Client
//!
//! Unix socket client used by the page agent side.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::{
    next_seq_id, socket_path, IpcRequest, IpcResponse, ProcessRequest, ProcessResponse,
    ProxyChannel, MAX_REQUEST_BYTES, NO_RECEIVER,
};
use crate::error::{DraftError, DraftResult, SELECTION_TOO_LARGE_MESSAGE};

/// Map an io error from an open connection to a fixed transport failure
fn transport_error(e: std::io::Error) -> DraftError {
    match e.kind() {
        ErrorKind::ConnectionReset | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
            DraftError::ProxyUnreachable(format!("connection to the inference proxy lost ({e})"))
        }
        _ => DraftError::Io(e),
    }
}

/// IPC client for the inference proxy socket
#[derive(Debug, Clone)]
pub struct IpcClient {
    path: PathBuf,
    timeout: Duration,
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new(socket_path())
    }
}

impl IpcClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: Duration::from_secs(90),
        }
    }

    /// Set how long to wait for a response
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the proxy is running
    pub async fn is_proxy_running(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        UnixStream::connect(&self.path).await.is_ok()
    }

    /// Request proxy status: (API key configured, model)
    pub async fn status(&self) -> DraftResult<(bool, String)> {
        let seq_id = next_seq_id();
        match self.roundtrip(&IpcRequest::StatusRequest { seq_id }).await? {
            IpcResponse::StatusResponse {
                configured, model, ..
            } => Ok((configured, model)),
            other => Err(DraftError::Ipc(format!(
                "unexpected response to status request: {:?}",
                other
            ))),
        }
    }

    async fn connect(&self) -> DraftResult<UnixStream> {
        UnixStream::connect(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::ConnectionRefused => {
                DraftError::ProxyUnreachable(format!("{NO_RECEIVER} ({e})"))
            }
            _ => DraftError::Io(e),
        })
    }

    /// Send one request and read one correlated response
    async fn roundtrip(&self, request: &IpcRequest) -> DraftResult<IpcResponse> {
        let request_json = serde_json::to_string(request)? + "\n";
        if request_json.len() > MAX_REQUEST_BYTES {
            warn!(
                "⚠️ IPC request is {} bytes, over the {} byte limit",
                request_json.len(),
                MAX_REQUEST_BYTES
            );
            return Err(DraftError::Rejected(SELECTION_TOO_LARGE_MESSAGE.to_string()));
        }

        let exchange = async {
            let mut stream = self.connect().await?;
            stream
                .write_all(request_json.as_bytes())
                .await
                .map_err(transport_error)?;

            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).await.map_err(transport_error)?;

            if line.trim().is_empty() {
                return Err(DraftError::ProxyUnreachable(
                    "The message port closed before a response was received.".to_string(),
                ));
            }

            let response: IpcResponse = serde_json::from_str(line.trim())?;
            debug!("📨 IPC response for seq {}", response.seq_id());
            Ok::<_, DraftError>(response)
        };

        let response = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| DraftError::Ipc("timed out waiting for the inference proxy".to_string()))??;

        // The server answers requests it could not read with sequence 0
        if let IpcResponse::ProcessResult(ProcessResponse {
            seq_id: 0,
            success: false,
            error,
            ..
        }) = &response
        {
            let message = error
                .clone()
                .unwrap_or_else(|| "Failed to process text".to_string());
            return Err(DraftError::Rejected(message));
        }

        if response.seq_id() != request.seq_id() {
            warn!(
                "⚠️ IPC sequence ID mismatch: expected {}, got {}",
                request.seq_id(),
                response.seq_id()
            );
            return Err(DraftError::Ipc(format!(
                "sequence ID mismatch: expected {}, got {}",
                request.seq_id(),
                response.seq_id()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProxyChannel for IpcClient {
    async fn send(&self, mut request: ProcessRequest) -> DraftResult<ProcessResponse> {
        request.seq_id = next_seq_id();
        match self.roundtrip(&IpcRequest::ProcessText(request)).await? {
            IpcResponse::ProcessResult(response) => Ok(response),
            other => Err(DraftError::Ipc(format!(
                "unexpected response to process request: {:?}",
                other
            ))),
        }
    }
}
