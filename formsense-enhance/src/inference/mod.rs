//! Remote Inference Adapter
//!
//! Thin transport between the model-backed enhancer and a local inference host.
//!
//! # Components
//! - **InferenceBackend** - trait for `send_prompt` / `test_connection`
//! - **OllamaClient** - HTTP implementation for an Ollama-compatible host
//! - **prompt** - builds the field-classification prompt
//! - **response** - extracts a structured result from free-form model text

pub mod ollama_client;
pub mod prompt;
pub mod response;

pub use ollama_client::OllamaClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request sent to the inference host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub model: String,
    pub prompt: String,
}

/// Raw completion returned by the inference host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResponse {
    pub response: String,
}

/// Result of a connectivity probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Failure reason when not connected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn connected() -> Self {
        Self {
            connected: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            error: Some(error.into()),
        }
    }
}

/// Transport-level failure
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Host unreachable or connection dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Host returned a non-success status
    #[error("Inference host returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON
    #[error("Failed to decode inference response: {0}")]
    Decode(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Inference host capability used by the model-backed enhancer
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Send one prompt and wait for the full completion
    async fn send_prompt(&self, request: &PromptRequest) -> Result<PromptResponse, InferenceError>;

    /// Probe whether the host is reachable; never fails
    async fn test_connection(&self) -> ConnectionStatus;

    /// Point the backend at a different host; takes effect on the next request
    fn set_host(&self, host: &str);

    /// Current host address
    fn host(&self) -> String;
}

// ============================================================================
// Mock Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted reply
    pub enum Reply {
        Text(String),
        Fail,
        /// Reply with text after a delay
        Delayed(Duration, String),
    }

    /// Backend replaying scripted replies in order; repeats the last one
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Reply>>,
        pub requests: Mutex<Vec<PromptRequest>>,
        host: Mutex<String>,
    }

    impl ScriptedBackend {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                host: Mutex::new("http://mock".to_string()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        async fn send_prompt(
            &self,
            request: &PromptRequest,
        ) -> Result<PromptResponse, InferenceError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                if replies.len() > 1 {
                    replies.pop_front()
                } else {
                    replies.front().map(|r| match r {
                        Reply::Text(t) => Reply::Text(t.clone()),
                        Reply::Fail => Reply::Fail,
                        Reply::Delayed(d, t) => Reply::Delayed(*d, t.clone()),
                    })
                }
            };
            match reply {
                Some(Reply::Text(response)) => Ok(PromptResponse { response }),
                Some(Reply::Delayed(delay, response)) => {
                    tokio::time::sleep(delay).await;
                    Ok(PromptResponse { response })
                }
                Some(Reply::Fail) | None => {
                    Err(InferenceError::Network("connection refused".to_string()))
                }
            }
        }

        async fn test_connection(&self) -> ConnectionStatus {
            ConnectionStatus::connected()
        }

        fn set_host(&self, host: &str) {
            *self.host.lock().unwrap() = host.to_string();
        }

        fn host(&self) -> String {
            self.host.lock().unwrap().clone()
        }
    }
}
