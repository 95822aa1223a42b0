use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::core::{Config, DialogueReply, DialogueRequest, FlowRequest, FlowStep};
use crate::dialogue::{DialogueError, DialogueService};
use crate::server::web::HealthResponse;

/// HTTP client for the dialogue service (`POST {base}/dialogue`).
#[derive(Debug, Clone)]
pub struct DialogueClient {
    base_url: String,
    client: Client,
}

impl DialogueClient {
    /// `timeout` of `None` lets requests run until the service answers.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = match config.dialogue.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(config.dialogue.base_url.clone(), timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the service is up by probing `/health`
    pub async fn is_server_running(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(2))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Health check failed: {}", response.status()));
        }
        Ok(response.json().await?)
    }

    /// Advance a guided flow by one step
    pub async fn flow_next(&self, request: &FlowRequest) -> Result<FlowStep> {
        let url = format!("{}/flow/next", self.base_url);
        tracing::debug!("Making POST request to: {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        tracing::debug!("POST /flow/next response status: {}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Flow request failed: {} - {}", status, error_text));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("Failed to parse flow response: {}", e))
    }
}

#[async_trait]
impl DialogueService for DialogueClient {
    async fn exchange(&self, request: DialogueRequest) -> Result<DialogueReply, DialogueError> {
        let url = format!("{}/dialogue", self.base_url);
        tracing::debug!(
            "POST /dialogue session={} tool={:?} history={} opener={}",
            request.session_id,
            request.tool,
            request.history.len(),
            request.is_opener()
        );

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        tracing::debug!("POST /dialogue response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            tracing::error!("Dialogue request failed with status {}: {}", status, body);
            return Err(DialogueError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(DialogueReply::from_body(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = DialogueClient::new("http://localhost:8000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_from_config_uses_dialogue_base_url() {
        let mut config = Config::default();
        config.dialogue.base_url = "http://10.0.0.2:9000".to_string();
        config.dialogue.request_timeout_secs = 0;
        let client = DialogueClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.2:9000");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_transport_error() {
        let client =
            DialogueClient::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        assert!(!client.is_server_running().await);

        let result = client
            .exchange(DialogueRequest::opener(crate::core::Tool::Debrief, "current"))
            .await;
        assert!(matches!(result, Err(DialogueError::Transport(_))));
    }
}
