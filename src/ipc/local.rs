//! In-process channel
//!
//! The agent and the proxy run as tasks in one runtime and exchange
//! envelopes over tokio channels: an mpsc queue for requests and a oneshot
//! per request for the reply.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{next_seq_id, ProcessRequest, ProcessResponse, ProxyChannel, NO_RECEIVER};
use crate::error::{DraftError, DraftResult};
use crate::proxy::InferenceProxy;

/// A request paired with the slot its response goes into
pub type Envelope = (ProcessRequest, oneshot::Sender<ProcessResponse>);

/// Sending half used by the page agent
#[derive(Debug, Clone)]
pub struct LocalChannel {
    tx: mpsc::Sender<Envelope>,
}

impl LocalChannel {
    /// Create a channel and its receiving half
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// Create a channel served by `proxy` on a background task
    pub fn spawn(proxy: Arc<InferenceProxy>) -> (Self, JoinHandle<()>) {
        let (channel, rx) = Self::new(16);
        let handle = tokio::spawn(serve(rx, proxy));
        (channel, handle)
    }
}

/// Answer envelopes until every sender is gone.
///
/// Each request runs on its own task so a slow model call does not hold up
/// the queue.
pub async fn serve(mut rx: mpsc::Receiver<Envelope>, proxy: Arc<InferenceProxy>) {
    info!("🔌 Local proxy channel ready");
    while let Some((request, reply)) = rx.recv().await {
        let proxy = proxy.clone();
        tokio::spawn(async move {
            let response = proxy.handle(request).await;
            if reply.send(response).is_err() {
                debug!("Requester went away before the response arrived");
            }
        });
    }
    info!("🔌 Local proxy channel closed");
}

#[async_trait]
impl ProxyChannel for LocalChannel {
    async fn send(&self, mut request: ProcessRequest) -> DraftResult<ProcessResponse> {
        let seq_id = next_seq_id();
        request.seq_id = seq_id;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| DraftError::ProxyUnreachable(NO_RECEIVER.to_string()))?;

        let response = reply_rx.await.map_err(|_| {
            DraftError::ProxyUnreachable(
                "The message port closed before a response was received.".to_string(),
            )
        })?;

        if response.seq_id != seq_id {
            return Err(DraftError::Ipc(format!(
                "sequence ID mismatch: expected {}, got {}",
                seq_id, response.seq_id
            )));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SelectionContext;
    use crate::error::PROXY_UNREACHABLE_MESSAGE;

    fn request() -> ProcessRequest {
        ProcessRequest {
            seq_id: 0,
            selection_context: SelectionContext {
                selected: "x".to_string(),
                before: String::new(),
                after: String::new(),
                start: Some(0),
                end: Some(1),
                is_rich_text: false,
            },
            action_prompt: "p".to_string(),
            system_prompt: None,
            page_context: None,
        }
    }

    #[tokio::test]
    async fn test_receiver_gone_is_unreachable() {
        let (channel, rx) = LocalChannel::new(1);
        drop(rx);
        let err = channel.send(request()).await.unwrap_err();
        assert!(matches!(err, DraftError::ProxyUnreachable(_)));
        assert_eq!(err.user_message(), PROXY_UNREACHABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_reply_dropped_is_unreachable() {
        let (channel, mut rx) = LocalChannel::new(1);
        tokio::spawn(async move {
            // Receive and drop the reply slot without answering
            let _ = rx.recv().await;
        });
        let err = channel.send(request()).await.unwrap_err();
        assert!(matches!(err, DraftError::ProxyUnreachable(_)));
    }

    #[tokio::test]
    async fn test_mismatched_seq_id_rejected() {
        let (channel, mut rx) = LocalChannel::new(1);
        tokio::spawn(async move {
            if let Some((req, reply)) = rx.recv().await {
                let _ = reply.send(ProcessResponse::ok(req.seq_id + 1000, "y".to_string()));
            }
        });
        let err = channel.send(request()).await.unwrap_err();
        assert!(matches!(err, DraftError::Ipc(_)));
    }

    #[tokio::test]
    async fn test_correlated_reply() {
        let (channel, mut rx) = LocalChannel::new(1);
        tokio::spawn(async move {
            if let Some((req, reply)) = rx.recv().await {
                let _ = reply.send(ProcessResponse::ok(req.seq_id, "y".to_string()));
            }
        });
        let resp = channel.send(request()).await.expect("response");
        assert_eq!(resp.into_result().expect("ok"), "y");
    }
}
