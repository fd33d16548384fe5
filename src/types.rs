//! Core data types for the pipeline designer
//!
//! This module contains the wire-level data structures exchanged with the
//! pipeline agent and shared between the controller and the host UI.
//!
//! # Main Types
//!
//! - [`PipelineConfig`] - The full configuration of one pipeline (stages, issues, uuid)
//! - [`StageInstance`] - One configured stage inside a pipeline, wired by lane names
//! - [`PipelineInfo`] - List entry / `info` block for a pipeline
//! - [`PipelineStatus`] - Name and run state of the agent's active pipeline
//! - [`Definitions`] - Pipeline schema plus the stage-library catalog
//!
//! # Lanes
//!
//! Stages do not reference each other directly. A stage declares named output
//! lanes and named input lanes; two stages are connected when an output lane
//! name of one appears among the input lane names of another. Edge derivation
//! from these names lives in [`crate::graph`].
//!
//! All types serialize with the agent's camelCase field names and compare with
//! `PartialEq`, which is what the controller's edit detection relies on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of processing a stage performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageType {
    /// Produces records; a valid pipeline needs at least one
    Source,
    /// Transforms records between lanes
    Processor,
    /// Terminal stage writing records out
    Target,
}

/// Run state of a pipeline on the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Edited,
    Running,
    Stopped,
    Finished,
    Error,
}

/// Name + state pair reported by the agent's status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub name: String,
    pub state: PipelineState,
}

impl PipelineStatus {
    /// True when this status reports the named pipeline as running
    pub fn is_running(&self, pipeline_name: &str) -> bool {
        self.name == pipeline_name && self.state == PipelineState::Running
    }
}

/// A single named configuration attribute; values are opaque to the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueLevel {
    Error,
    Warning,
}

impl Default for IssueLevel {
    fn default() -> Self {
        IssueLevel::Error
    }
}

/// A validation issue reported by the agent
///
/// Pipeline-level issues carry no `instance_name`; stage-level issues name
/// the offending stage instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub level: IssueLevel,
    pub message: String,
}

/// Display metadata attached to a stage instance by the designer canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUiInfo {
    pub stage_type: StageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_pos: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_pos: Option<f64>,
}

impl StageUiInfo {
    pub fn new(stage_type: StageType) -> Self {
        Self {
            stage_type,
            label: None,
            description: None,
            x_pos: None,
            y_pos: None,
        }
    }
}

/// One configured stage inside a pipeline
///
/// `instance_name` is unique within its parent configuration and is the key
/// the detail pane reconciler matches on across reloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInstance {
    pub instance_name: String,
    pub stage_name: String,
    pub stage_version: String,
    #[serde(default)]
    pub configuration: Vec<ConfigEntry>,
    pub ui_info: StageUiInfo,
    #[serde(default)]
    pub input_lanes: Vec<String>,
    #[serde(default)]
    pub output_lanes: Vec<String>,
}

impl StageInstance {
    /// True when this instance is a source stage
    pub fn is_source(&self) -> bool {
        self.ui_info.stage_type == StageType::Source
    }
}

/// Pipeline list entry, also embedded as the `info` block of a configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// The full configuration of one pipeline
///
/// Owned by the controller for the active pipeline and replaced wholesale on
/// load or save response. The agent may reassign `uuid` on save; a stale
/// `uuid` is how concurrent writers are detected server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub uuid: Uuid,
    pub info: PipelineInfo,
    #[serde(default)]
    pub configuration: Vec<ConfigEntry>,
    #[serde(default)]
    pub ui_info: serde_json::Value,
    #[serde(default)]
    pub stages: Vec<StageInstance>,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl PipelineConfig {
    /// Look up a stage instance by its unique name
    pub fn stage(&self, instance_name: &str) -> Option<&StageInstance> {
        self.stages
            .iter()
            .find(|s| s.instance_name == instance_name)
    }
}

/// Schema for one configuration attribute in a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub default_value: serde_json::Value,
}

/// Stage-library catalog entry, keyed by `(name, version)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub stage_type: StageType,
    #[serde(default)]
    pub config_definitions: Vec<ConfigDefinition>,
}

impl StageDefinition {
    /// True when this entry describes the given stage instance
    pub fn matches(&self, instance: &StageInstance) -> bool {
        self.name == instance.stage_name && self.version == instance.stage_version
    }
}

/// Pipeline-level configuration schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    #[serde(default)]
    pub config_definitions: Vec<ConfigDefinition>,
}

/// Everything the definitions endpoint returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub pipeline: Vec<PipelineDefinition>,
    #[serde(default)]
    pub stages: Vec<StageDefinition>,
}
