use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::config::ServerConfig;
use crate::core::FlowRegistry;

#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<FlowRegistry>,
}

impl AppState {
    pub fn new(flows: FlowRegistry) -> Self {
        Self {
            flows: Arc::new(flows),
        }
    }

    /// Built-in flows plus whatever `flows_dir` adds or overrides.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let mut flows = FlowRegistry::builtin()?;
        if let Some(dir) = &config.flows_dir {
            let loaded = flows.load_dir(dir)?;
            tracing::info!("Loaded {} flows from {}", loaded, dir.display());
        }
        Ok(Self::new(flows))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub flows: Vec<String>,
}
