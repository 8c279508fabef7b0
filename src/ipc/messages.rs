//! IPC Message Types
//!
//! JSON-serializable messages for page agent ↔ inference proxy communication.

use serde::{Deserialize, Serialize};

use crate::capture::SelectionContext;
use crate::error::{DraftError, DraftResult};
use crate::page_context::PageContext;

/// Rewrite request for one selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Assigned by the channel when the request is sent
    #[serde(default)]
    pub seq_id: u64,
    pub selection_context: SelectionContext,
    pub action_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_context: Option<PageContext>,
}

/// Outcome of a rewrite request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub seq_id: u64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    pub fn ok(seq_id: u64, result: String) -> Self {
        Self {
            seq_id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(seq_id: u64, error: impl Into<String>) -> Self {
        Self {
            seq_id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Unwrap into the replacement text or a user-facing error
    pub fn into_result(self) -> DraftResult<String> {
        match (self.success, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(DraftError::Provider(
                "Inference proxy returned no result".to_string(),
            )),
            (false, _) => Err(DraftError::Provider(
                self.error
                    .unwrap_or_else(|| "Failed to process text".to_string()),
            )),
        }
    }
}

/// Request types sent from agent to proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcRequest {
    /// Rewrite the selection
    #[serde(rename = "process_text")]
    ProcessText(ProcessRequest),

    /// Check that the proxy is alive
    #[serde(rename = "status_request")]
    StatusRequest { seq_id: u64 },
}

impl IpcRequest {
    pub fn seq_id(&self) -> u64 {
        match self {
            IpcRequest::ProcessText(req) => req.seq_id,
            IpcRequest::StatusRequest { seq_id } => *seq_id,
        }
    }
}

/// Response types sent from proxy to agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcResponse {
    #[serde(rename = "process_result")]
    ProcessResult(ProcessResponse),

    #[serde(rename = "status_response")]
    StatusResponse {
        seq_id: u64,
        /// An API key is configured
        configured: bool,
        model: String,
    },
}

impl IpcResponse {
    pub fn seq_id(&self) -> u64 {
        match self {
            IpcResponse::ProcessResult(resp) => resp.seq_id,
            IpcResponse::StatusResponse { seq_id, .. } => *seq_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProcessRequest {
        ProcessRequest {
            seq_id: 7,
            selection_context: SelectionContext {
                selected: "world".to_string(),
                before: "Hello ".to_string(),
                after: String::new(),
                start: Some(6),
                end: Some(11),
                is_rich_text: false,
            },
            action_prompt: "Shorten.".to_string(),
            system_prompt: None,
            page_context: None,
        }
    }

    #[test]
    fn test_process_request_serialize() {
        let json = serde_json::to_string(&IpcRequest::ProcessText(request())).unwrap();
        assert!(json.contains("\"type\":\"process_text\""));
        assert!(json.contains("\"seq_id\":7"));
        assert!(json.contains("\"selected\":\"world\""));
        assert!(!json.contains("system_prompt"));
    }

    #[test]
    fn test_status_request_parse() {
        let req: IpcRequest =
            serde_json::from_str(r#"{"type":"status_request","seq_id":3}"#).unwrap();
        assert_eq!(req.seq_id(), 3);
    }

    #[test]
    fn test_response_shapes() {
        let ok = serde_json::to_string(&ProcessResponse::ok(1, "Earth".to_string())).unwrap();
        assert!(ok.contains("\"success\":true"));
        assert!(!ok.contains("error"));

        let fail = ProcessResponse::failure(2, "No key");
        assert_eq!(fail.clone().into_result().unwrap_err().user_message(), "No key");
        let json = serde_json::to_string(&IpcResponse::ProcessResult(fail)).unwrap();
        assert!(json.contains("\"type\":\"process_result\""));
        assert!(!json.contains("\"result\""));
    }
}
