//! Designer controller
//!
//! The controller owns the working copy of the active pipeline configuration
//! and runs on its own thread, communicating with the host UI through typed
//! messages over crossbeam channels:
//!
//! - [`ControllerCommand`] - Messages sent from the UI to the controller
//!   (selection, edits, import/export, preview, status)
//! - [`ControllerEvent`] - Messages sent from the controller to the UI
//!   (graph refreshes, detail pane state, errors)
//! - [`UiBridge`] - UI-side handle for sending commands and receiving events
//! - [`DesignerController`] - Entry point that owns the worker loop
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipedeck::agent::HttpAgent;
//! use pipedeck::config::ControllerSettings;
//! use pipedeck::controller::{ControllerEvent, DesignerController};
//!
//! let settings = ControllerSettings::load_or_default();
//! let agent = Arc::new(HttpAgent::from_settings(&settings)?);
//! let (controller, bridge) = DesignerController::new(settings, agent);
//!
//! std::thread::spawn(move || controller.run());
//!
//! // UI loop
//! for event in bridge.drain() {
//!     match event {
//!         ControllerEvent::GraphUpdated { stages, edges, .. } => {
//!             // redraw the canvas
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod autosave;
pub mod selection;
pub mod worker;

pub use autosave::AutosaveState;
pub use selection::{DetailPaneState, DetailSelection};
pub use worker::ControllerWorker;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::agent::PipelineAgent;
use crate::config::ControllerSettings;
use crate::graph::Edge;
use crate::types::{
    Issue, PipelineConfig, PipelineInfo, PipelineStatus, StageDefinition, StageInstance,
};

/// Channel capacity for commands (UI → controller)
pub const CMD_CHANNEL_CAPACITY: usize = 256;
/// Channel capacity for events (controller → UI)
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Message sent from the UI to the controller
#[derive(Debug, Clone)]
pub enum ControllerCommand {
    /// The user edited the working copy; carries the full edited
    /// configuration for deep comparison against the current one
    ConfigEdited(PipelineConfig),
    /// A stage node was clicked on the canvas
    NodeSelected(String),
    /// The canvas selection was cleared
    NodeSelectionCleared,
    /// A pipeline was picked in the pipeline list; `None` means no
    /// pipelines exist
    PipelineSelected(Option<PipelineInfo>),
    /// Move the detail pane to a stage and highlight it on the canvas
    /// (used by the preview pane)
    FocusStage(String),
    /// Enter preview mode; `next_batch` advances the source offset
    StartPreview { next_batch: bool },
    /// Leave preview mode
    ClosePreview,
    /// Trigger a configuration export on the agent
    ExportPipeline,
    /// Import modal resolved with a raw configuration body; a cancelled
    /// modal simply never sends this
    ImportPipeline(serde_json::Value),
    /// The agent's pipeline status changed
    StatusChanged(PipelineStatus),
    /// Show or hide the stage library panel
    ToggleLibraryPanel,
    /// Toggle detail pane minimization (clears maximization)
    MinimizeDetailPane,
    /// Toggle detail pane maximization (clears minimization)
    MaximizeDetailPane,
    /// Shut down the controller
    Shutdown,
}

/// Message sent from the controller to the UI
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Full graph refresh for the canvas
    GraphUpdated {
        stages: Vec<StageInstance>,
        edges: Vec<Edge>,
        issues: Vec<Issue>,
        source_exists: bool,
        /// The stage the canvas had highlighted before the refresh, when
        /// there was one to restore
        previous_selection: Option<StageInstance>,
    },
    /// The detail pane should now show this entity
    DetailPane(DetailPaneState),
    /// The canvas should highlight this node
    SelectNode(StageInstance),
    /// Preview mode entered
    PreviewStarted { next_batch: bool },
    /// Preview mode left
    PreviewClosed,
    /// Stage library loaded, split by stage type
    LibraryLoaded {
        sources: Vec<StageDefinition>,
        processors: Vec<StageDefinition>,
        targets: Vec<StageDefinition>,
    },
    /// Pipeline list refreshed
    PipelinesLoaded(Vec<PipelineInfo>),
    /// The derived "active pipeline is running" flag changed
    RunningChanged(bool),
    /// Pane chrome flags changed
    LayoutChanged(PaneLayout),
    /// An agent call failed; the UI shows it and the controller stays alive
    AgentError(String),
    /// The controller is shutting down
    Shutdown,
}

/// Visibility flags for the designer's pane chrome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneLayout {
    pub hide_library_panel: bool,
    pub minimize_detail_pane: bool,
    pub maximize_detail_pane: bool,
}

impl Default for PaneLayout {
    fn default() -> Self {
        Self {
            hide_library_panel: true,
            minimize_detail_pane: false,
            maximize_detail_pane: false,
        }
    }
}

/// UI-side handle for communicating with the controller thread
pub struct UiBridge {
    /// Receiver for controller events
    pub event_rx: Receiver<ControllerEvent>,
    /// Sender for commands to the controller
    pub cmd_tx: Sender<ControllerCommand>,
}

impl UiBridge {
    /// Try to receive a single event without blocking
    pub fn try_recv(&self) -> Option<ControllerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Drain all pending events
    pub fn drain(&self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Send a command to the controller
    pub fn send_command(&self, cmd: ControllerCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn config_edited(&self, config: PipelineConfig) {
        let _ = self.cmd_tx.send(ControllerCommand::ConfigEdited(config));
    }

    pub fn node_selected(&self, instance_name: impl Into<String>) {
        let _ = self
            .cmd_tx
            .send(ControllerCommand::NodeSelected(instance_name.into()));
    }

    pub fn clear_node_selection(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::NodeSelectionCleared);
    }

    pub fn select_pipeline(&self, info: Option<PipelineInfo>) {
        let _ = self.cmd_tx.send(ControllerCommand::PipelineSelected(info));
    }

    pub fn focus_stage(&self, instance_name: impl Into<String>) {
        let _ = self
            .cmd_tx
            .send(ControllerCommand::FocusStage(instance_name.into()));
    }

    pub fn start_preview(&self, next_batch: bool) {
        let _ = self
            .cmd_tx
            .send(ControllerCommand::StartPreview { next_batch });
    }

    pub fn close_preview(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::ClosePreview);
    }

    pub fn export_pipeline(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::ExportPipeline);
    }

    pub fn import_pipeline(&self, body: serde_json::Value) {
        let _ = self.cmd_tx.send(ControllerCommand::ImportPipeline(body));
    }

    pub fn status_changed(&self, status: PipelineStatus) {
        let _ = self.cmd_tx.send(ControllerCommand::StatusChanged(status));
    }

    pub fn toggle_library_panel(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::ToggleLibraryPanel);
    }

    pub fn minimize_detail_pane(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::MinimizeDetailPane);
    }

    pub fn maximize_detail_pane(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::MaximizeDetailPane);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::Shutdown);
    }
}

/// The designer controller that runs on its own thread
pub struct DesignerController {
    settings: ControllerSettings,
    agent: Arc<dyn PipelineAgent>,
    cmd_rx: Receiver<ControllerCommand>,
    event_tx: Sender<ControllerEvent>,
    running: Arc<AtomicBool>,
}

impl DesignerController {
    /// Create a controller and its UI bridge
    pub fn new(
        settings: ControllerSettings,
        agent: Arc<dyn PipelineAgent>,
    ) -> (Self, UiBridge) {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);

        let controller = Self {
            settings,
            agent,
            cmd_rx,
            event_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let bridge = UiBridge { event_rx, cmd_tx };

        (controller, bridge)
    }

    /// Run the controller loop until shutdown
    pub fn run(self) {
        let mut worker = ControllerWorker::new(
            self.settings,
            self.agent,
            self.cmd_rx,
            self.event_tx,
            self.running,
        );
        worker.run();
    }

    /// Get a handle to stop the controller
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
