//! REST client for a live pipeline agent
//!
//! Thin blocking wrapper over the agent's `/rest/v1` endpoints. Every call
//! maps one-to-one to a [`PipelineAgent`] operation; HTTP status errors are
//! surfaced as [`PipedeckError::Http`] and handled (not retried) by the
//! controller.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use crate::agent::PipelineAgent;
use crate::config::ControllerSettings;
use crate::error::{PipedeckError, Result};
use crate::types::{Definitions, PipelineConfig, PipelineInfo, PipelineStatus};

/// Blocking HTTP implementation of [`PipelineAgent`]
pub struct HttpAgent {
    base_url: String,
    client: Client,
}

impl HttpAgent {
    /// Create a client for the agent at `base_url` (e.g. `http://localhost:18630`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PipedeckError::Http)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Create a client from persisted controller settings
    pub fn from_settings(settings: &ControllerSettings) -> Result<Self> {
        Self::new(settings.agent_url.clone(), settings.request_timeout())
    }

    /// Build a full endpoint URL under the versioned REST root
    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Pipeline names may contain spaces; they travel as one path segment
    fn pipeline_path(name: &str, suffix: &str) -> String {
        format!("pipeline/{}{}", urlencoding::encode(name), suffix)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }
}

impl PipelineAgent for HttpAgent {
    fn definitions(&self) -> Result<Definitions> {
        self.get_json("definitions")
    }

    fn pipelines(&self) -> Result<Vec<PipelineInfo>> {
        self.get_json("pipelines")
    }

    fn pipeline_status(&self) -> Result<PipelineStatus> {
        self.get_json("pipeline/status")
    }

    fn pipeline_config(&self, name: &str) -> Result<PipelineConfig> {
        self.get_json(&Self::pipeline_path(name, ""))
    }

    fn save_pipeline_config(&self, name: &str, config: &PipelineConfig) -> Result<PipelineConfig> {
        let response = self
            .client
            .post(self.url(&Self::pipeline_path(name, "")))
            .json(config)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    fn export_pipeline_config(&self, name: &str) -> Result<()> {
        // Fire-and-forget: the body is the exported JSON, which the host
        // environment turns into a download. Here only delivery matters.
        self.client
            .get(self.url(&Self::pipeline_path(name, "/export")))
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        let agent = HttpAgent::new("http://localhost:18630/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            agent.url("definitions"),
            "http://localhost:18630/rest/v1/definitions"
        );
    }

    #[test]
    fn test_pipeline_path_encodes_name() {
        assert_eq!(
            HttpAgent::pipeline_path("orders v2", "/export"),
            "pipeline/orders%20v2/export"
        );
    }
}
