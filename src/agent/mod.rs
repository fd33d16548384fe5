//! Pipeline agent access
//!
//! This module provides a common trait for everything the designer needs from
//! the remote pipeline agent, with two implementations:
//!
//! - [`HttpAgent`] - REST/JSON client for a live agent
//! - [`MockAgent`] - In-memory agent for testing (feature-gated)
//!
//! The controller only ever sees `Arc<dyn PipelineAgent>`, so tests and the
//! host application pick the transport. All operations are blocking; the
//! controller runs them either inline (loads) or on short-lived helper
//! threads (saves, exports) so its own loop never stalls on the network.

pub mod http;
#[cfg(feature = "mock-agent")]
pub mod mock;

pub use http::HttpAgent;
#[cfg(feature = "mock-agent")]
pub use mock::MockAgent;

use crate::error::Result;
use crate::types::{Definitions, PipelineConfig, PipelineInfo, PipelineStatus};

/// Unified interface to the remote pipeline agent
///
/// Implementations must be `Send + Sync` so saves can run on helper threads
/// while the controller keeps processing commands.
#[cfg_attr(test, mockall::automock)]
pub trait PipelineAgent: Send + Sync {
    /// Fetch the pipeline schema and the stage-library catalog
    fn definitions(&self) -> Result<Definitions>;

    /// List all pipelines known to the agent
    fn pipelines(&self) -> Result<Vec<PipelineInfo>>;

    /// Fetch the name and run state of the agent's active pipeline
    fn pipeline_status(&self) -> Result<PipelineStatus>;

    /// Fetch the full configuration of one pipeline
    fn pipeline_config(&self, name: &str) -> Result<PipelineConfig>;

    /// Persist a configuration; the agent returns the stored copy and may
    /// reassign its `uuid`
    fn save_pipeline_config(&self, name: &str, config: &PipelineConfig) -> Result<PipelineConfig>;

    /// Trigger a configuration export on the agent; the download itself is
    /// handled by the host environment
    fn export_pipeline_config(&self, name: &str) -> Result<()>;
}
