//! Detail pane selection and reconciliation
//!
//! The detail pane shows exactly one entity at a time: either the pipeline
//! itself or one stage instance. Stage selections are keyed by
//! `instance_name`, never by position, so a selection survives the working
//! copy being replaced wholesale by a load or save response, as long as an
//! instance with the same name still exists in the new stage list.

use crate::types::{
    PipelineConfig, PipelineDefinition, StageDefinition, StageInstance,
};

/// What the detail pane is pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailSelection {
    /// Pipeline-level configuration
    Pipeline,
    /// One stage instance, keyed by its unique name
    Stage { instance_name: String },
}

impl DetailSelection {
    pub fn stage(instance_name: impl Into<String>) -> Self {
        DetailSelection::Stage {
            instance_name: instance_name.into(),
        }
    }
}

/// Resolved view of the current selection, sent to the host UI
///
/// Resolution pairs the selected entity with its configuration schema: the
/// pipeline definition for pipeline-level selection, or the stage-library
/// entry matching `(stage_name, stage_version)` for a stage. A stage whose
/// library entry is missing still renders, just without a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailPaneState {
    Pipeline {
        config: PipelineConfig,
        definition: PipelineDefinition,
    },
    Stage {
        instance: StageInstance,
        definition: Option<StageDefinition>,
    },
}

/// Decide what the detail pane shows after a configuration reload
///
/// Rules, in order:
/// 1. no prior selection → the pipeline;
/// 2. prior selection was the pipeline → still the pipeline;
/// 3. prior selection was a stage → the instance with the same name in the
///    new stage list, or the pipeline when that instance is gone.
pub fn reconcile(prev: Option<&DetailSelection>, config: &PipelineConfig) -> DetailSelection {
    match prev {
        None | Some(DetailSelection::Pipeline) => DetailSelection::Pipeline,
        Some(DetailSelection::Stage { instance_name }) => {
            if config.stage(instance_name).is_some() {
                DetailSelection::stage(instance_name.clone())
            } else {
                DetailSelection::Pipeline
            }
        }
    }
}

/// Resolve a selection against the current config and catalogs
pub fn resolve(
    selection: &DetailSelection,
    config: &PipelineConfig,
    pipeline_definition: &PipelineDefinition,
    stage_library: &[StageDefinition],
) -> DetailPaneState {
    match selection {
        DetailSelection::Pipeline => DetailPaneState::Pipeline {
            config: config.clone(),
            definition: pipeline_definition.clone(),
        },
        DetailSelection::Stage { instance_name } => match config.stage(instance_name) {
            Some(instance) => DetailPaneState::Stage {
                instance: instance.clone(),
                definition: stage_library
                    .iter()
                    .find(|d| d.matches(instance))
                    .cloned(),
            },
            // Callers reconcile before resolving, so a dangling name only
            // happens when the two race; degrade to the pipeline view.
            None => DetailPaneState::Pipeline {
                config: config.clone(),
                definition: pipeline_definition.clone(),
            },
        },
    }
}
