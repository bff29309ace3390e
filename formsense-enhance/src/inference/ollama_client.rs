//! Ollama Client
//!
//! HTTP transport for an Ollama-compatible inference host.
//!
//! # API Reference
//! - `POST {host}/api/generate` with `{"model", "prompt", "stream": false}`
//!   returns `{"response": "..."}`
//! - `GET {host}/api/tags` lists installed models (used as the connectivity probe)
//!
//! The host address is held behind a lock so it can be changed at runtime
//! without rebuilding the enhancer that owns this client.

use super::{ConnectionStatus, InferenceBackend, InferenceError, PromptRequest, PromptResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Transport-level ceiling; the enhancer applies its own, shorter deadline
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the connectivity probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Ollama HTTP client
pub struct OllamaClient {
    http_client: Client,
    host: RwLock<String>,
}

impl OllamaClient {
    /// Create a client for `host` (e.g. `http://localhost:11434`)
    ///
    /// # Errors
    /// Returns `InferenceError::Client` if the HTTP client cannot be built.
    pub fn new(host: impl Into<String>) -> Result<Self, InferenceError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            host: RwLock::new(normalize_host(&host.into())),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host(), path)
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('/').to_string()
}

#[async_trait]
impl InferenceBackend for OllamaClient {
    async fn send_prompt(&self, request: &PromptRequest) -> Result<PromptResponse, InferenceError> {
        let url = self.url("/api/generate");
        debug!(
            url = %url,
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Sending prompt"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&GenerateRequest {
                model: &request.model,
                prompt: &request.prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| InferenceError::Network(format!("Inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<PromptResponse>()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))
    }

    async fn test_connection(&self) -> ConnectionStatus {
        let url = self.url("/api/tags");
        match self.http_client.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => ConnectionStatus::connected(),
            Ok(response) => {
                let status = response.status();
                warn!(url = %url, status = %status, "Inference host probe returned error status");
                ConnectionStatus::failed(format!("Inference host returned {}", status))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Inference host unreachable");
                ConnectionStatus::failed(e.to_string())
            }
        }
    }

    fn set_host(&self, host: &str) {
        let host = normalize_host(host);
        debug!(host = %host, "Inference host updated");
        match self.host.write() {
            Ok(mut guard) => *guard = host,
            Err(poisoned) => *poisoned.into_inner() = host,
        }
    }

    fn host(&self) -> String {
        match self.host.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_normalized_and_updatable() {
        let client = OllamaClient::new("http://localhost:11434/ ").unwrap();
        assert_eq!(client.host(), "http://localhost:11434");
        assert_eq!(client.url("/api/tags"), "http://localhost:11434/api/tags");

        client.set_host("http://10.0.0.2:11434/");
        assert_eq!(client.host(), "http://10.0.0.2:11434");
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_disconnected() {
        // Port 9 (discard) is almost never listening on loopback
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        let status = client.test_connection().await;
        assert!(!status.connected);
        assert!(status.error.is_some());
    }
}
