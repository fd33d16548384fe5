//! Mock pipeline agent for testing
//!
//! In-memory [`PipelineAgent`] implementation for exercising the controller
//! without a live agent. Saves behave like the real thing: the stored copy is
//! returned with a freshly assigned `uuid`, an optional artificial delay keeps
//! the save "in flight" long enough for coalescing tests, and single failures
//! can be injected.
//!
//! # Enabling
//!
//! The mock agent is only available when the `mock-agent` feature is enabled:
//!
//! ```bash
//! cargo test --features mock-agent
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use uuid::Uuid;

use crate::agent::PipelineAgent;
use crate::error::{PipedeckError, Result};
use crate::types::{
    ConfigDefinition, Definitions, PipelineConfig, PipelineDefinition, PipelineInfo,
    PipelineState, PipelineStatus, StageDefinition, StageInstance, StageType, StageUiInfo,
};

struct MockAgentState {
    definitions: Definitions,
    pipelines: Vec<PipelineInfo>,
    status: PipelineStatus,
    configs: HashMap<String, PipelineConfig>,
    save_delay: Duration,
    fail_next_save: bool,
    save_count: u64,
}

/// In-memory agent with one seeded pipeline (`dev`) and a three-entry
/// stage library
pub struct MockAgent {
    state: Mutex<MockAgentState>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    pub fn new() -> Self {
        let config = Self::sample_pipeline("dev");
        let status = PipelineStatus {
            name: "dev".to_string(),
            state: PipelineState::Edited,
        };

        let mut configs = HashMap::new();
        let pipelines = vec![config.info.clone()];
        configs.insert(config.info.name.clone(), config);

        Self {
            state: Mutex::new(MockAgentState {
                definitions: Self::sample_definitions(),
                pipelines,
                status,
                configs,
                save_delay: Duration::ZERO,
                fail_next_save: false,
                save_count: 0,
            }),
        }
    }

    /// Keep saves "in flight" for `delay` before they complete
    pub fn with_save_delay(self, delay: Duration) -> Self {
        self.lock().save_delay = delay;
        self
    }

    /// Register another pipeline with the agent
    pub fn with_pipeline(self, config: PipelineConfig) -> Self {
        {
            let mut state = self.lock();
            state.pipelines.push(config.info.clone());
            state.configs.insert(config.info.name.clone(), config);
        }
        self
    }

    /// Report `name` as the running pipeline
    pub fn with_running(self, name: &str) -> Self {
        self.lock().status = PipelineStatus {
            name: name.to_string(),
            state: PipelineState::Running,
        };
        self
    }

    /// Make the next save fail with an agent error
    pub fn fail_next_save(&self) {
        self.lock().fail_next_save = true;
    }

    /// Number of completed save calls (successful or failed)
    pub fn save_count(&self) -> u64 {
        self.lock().save_count
    }

    /// Stored copy of a pipeline's configuration, if any
    pub fn stored_config(&self, name: &str) -> Option<PipelineConfig> {
        self.lock().configs.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockAgentState> {
        // A poisoned lock only means another test thread panicked mid-call;
        // the state is still usable for assertions.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A minimal two-stage pipeline wired by one lane
    pub fn sample_pipeline(name: &str) -> PipelineConfig {
        let uuid = Uuid::new_v4();
        let reader = StageInstance {
            instance_name: "devsource_1".to_string(),
            stage_name: "dev-random-source".to_string(),
            stage_version: "1.0.0".to_string(),
            configuration: Vec::new(),
            ui_info: StageUiInfo::new(StageType::Source),
            input_lanes: Vec::new(),
            output_lanes: vec!["devsource_1_out".to_string()],
        };
        let writer = StageInstance {
            instance_name: "trash_1".to_string(),
            stage_name: "trash-target".to_string(),
            stage_version: "1.0.0".to_string(),
            configuration: Vec::new(),
            ui_info: StageUiInfo::new(StageType::Target),
            input_lanes: vec!["devsource_1_out".to_string()],
            output_lanes: Vec::new(),
        };

        PipelineConfig {
            uuid,
            info: PipelineInfo {
                name: name.to_string(),
                description: None,
                uuid,
                last_modified: None,
            },
            configuration: vec![],
            ui_info: serde_json::Value::Null,
            stages: vec![reader, writer],
            issues: Vec::new(),
        }
    }

    fn sample_definitions() -> Definitions {
        let stage_defn = |name: &str, label: &str, stage_type| StageDefinition {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            label: Some(label.to_string()),
            stage_type,
            config_definitions: Vec::new(),
        };

        Definitions {
            pipeline: vec![PipelineDefinition {
                config_definitions: vec![ConfigDefinition {
                    name: "deliveryGuarantee".to_string(),
                    label: Some("Delivery Guarantee".to_string()),
                    default_value: serde_json::Value::String("AT_LEAST_ONCE".to_string()),
                }],
            }],
            stages: vec![
                stage_defn("dev-random-source", "Dev Random Source", StageType::Source),
                stage_defn("field-masker", "Field Masker", StageType::Processor),
                stage_defn("trash-target", "Trash", StageType::Target),
            ],
        }
    }
}

impl PipelineAgent for MockAgent {
    fn definitions(&self) -> Result<Definitions> {
        Ok(self.lock().definitions.clone())
    }

    fn pipelines(&self) -> Result<Vec<PipelineInfo>> {
        Ok(self.lock().pipelines.clone())
    }

    fn pipeline_status(&self) -> Result<PipelineStatus> {
        Ok(self.lock().status.clone())
    }

    fn pipeline_config(&self, name: &str) -> Result<PipelineConfig> {
        self.lock()
            .configs
            .get(name)
            .cloned()
            .ok_or_else(|| PipedeckError::Agent(format!("pipeline '{}' not found", name)))
    }

    fn save_pipeline_config(&self, name: &str, config: &PipelineConfig) -> Result<PipelineConfig> {
        let delay = self.lock().save_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.lock();
        state.save_count += 1;

        if state.fail_next_save {
            state.fail_next_save = false;
            return Err(PipedeckError::Agent("simulated save failure".to_string()));
        }

        let mut stored = config.clone();
        stored.uuid = Uuid::new_v4();
        stored.info.uuid = stored.uuid;
        stored.info.name = name.to_string();
        state.configs.insert(name.to_string(), stored.clone());

        if let Some(entry) = state.pipelines.iter_mut().find(|p| p.name == name) {
            *entry = stored.info.clone();
        }

        Ok(stored)
    }

    fn export_pipeline_config(&self, name: &str) -> Result<()> {
        if self.lock().configs.contains_key(name) {
            Ok(())
        } else {
            Err(PipedeckError::Agent(format!(
                "pipeline '{}' not found",
                name
            )))
        }
    }
}
