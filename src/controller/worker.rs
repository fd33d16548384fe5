//! Controller worker loop
//!
//! This module contains the main loop that runs on the controller thread and
//! owns all designer state: the working copy of the active pipeline
//! configuration, the pipeline list, the stage library, the detail pane
//! selection, and the autosave machine. It communicates with the host UI
//! through crossbeam channels.
//!
//! # Responsibilities
//!
//! The worker handles:
//!
//! - **Bootstrap**: loads definitions, pipeline list, and status, then the
//!   active pipeline's configuration
//! - **Command processing**: reacts to UI commands (selection, edits,
//!   import/export, preview, status)
//! - **Graph publication**: recomputes edges and the source flag on every
//!   configuration change and pushes them to the canvas
//! - **Selection reconciliation**: keeps the detail pane pointing at a live
//!   entity across configuration reloads
//! - **Autosave**: debounces edits, runs saves on helper threads, coalesces
//!   edits that arrive mid-save into one follow-up
//!
//! # Suspension points
//!
//! Configuration loads run inline; the loop has nothing better to do until
//! the pipeline is there. Saves and exports run on short-lived helper
//! threads and post [`AgentReply`] messages back into the loop, so the
//! working copy can keep absorbing edits while a save is in flight. Helper
//! threads never touch worker state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};

use crate::agent::PipelineAgent;
use crate::config::ControllerSettings;
use crate::controller::autosave::AutosaveState;
use crate::controller::selection::{self, DetailPaneState, DetailSelection};
use crate::controller::{ControllerCommand, ControllerEvent, PaneLayout};
use crate::error::{PipedeckError, Result};
use crate::graph::derive_graph;
use crate::types::{
    PipelineConfig, PipelineDefinition, PipelineInfo, PipelineState, PipelineStatus,
    StageDefinition, StageType,
};

/// Upper bound on one idle wait; keeps the loop responsive to the stop flag
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Channel capacity for helper-thread replies
const REPLY_CHANNEL_CAPACITY: usize = 16;

/// Result of an agent call that ran on a helper thread
enum AgentReply {
    SaveFinished {
        /// Save generation the request belonged to; replies from a
        /// superseded pipeline are discarded
        generation: u64,
        result: Result<PipelineConfig>,
    },
}

/// The worker that runs the controller loop
pub struct ControllerWorker {
    settings: ControllerSettings,
    agent: Arc<dyn PipelineAgent>,
    /// Command receiver from the UI
    cmd_rx: Receiver<ControllerCommand>,
    /// Event sender to the UI
    event_tx: Sender<ControllerEvent>,
    /// Helper-thread reply channel
    reply_tx: Sender<AgentReply>,
    reply_rx: Receiver<AgentReply>,
    /// Running flag
    running: Arc<AtomicBool>,

    /// Pipeline-level configuration schema
    pipeline_definition: Option<PipelineDefinition>,
    /// Stage-library catalog
    stage_library: Vec<StageDefinition>,
    /// Known pipelines; entries refreshed on every config publication
    pipelines: Vec<PipelineInfo>,
    /// Info block of the pipeline being edited
    active_config_info: Option<PipelineInfo>,
    /// Working copy of the active pipeline's configuration
    pipeline_config: Option<PipelineConfig>,
    /// What the detail pane currently shows
    selection: Option<DetailSelection>,
    /// Autosave machine
    autosave: AutosaveState,
    /// One-shot flag: the next `ConfigEdited` is the echo of a programmatic
    /// write-back, not a user edit
    ignore_update: bool,
    /// Bumped whenever a different pipeline takes over the working copy
    save_generation: u64,
    /// Last known agent status
    status: Option<PipelineStatus>,
    /// Derived: the active pipeline is the one running on the agent
    is_running: bool,
    /// Preview mode flag
    preview_mode: bool,
    /// Pane chrome flags
    layout: PaneLayout,
    /// Last agent failure, kept as a single-element list for display
    http_errors: Vec<String>,
}

impl ControllerWorker {
    /// Create a new controller worker
    pub fn new(
        settings: ControllerSettings,
        agent: Arc<dyn PipelineAgent>,
        cmd_rx: Receiver<ControllerCommand>,
        event_tx: Sender<ControllerEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let (reply_tx, reply_rx) = bounded(REPLY_CHANNEL_CAPACITY);

        Self {
            settings,
            agent,
            cmd_rx,
            event_tx,
            reply_tx,
            reply_rx,
            running,
            pipeline_definition: None,
            stage_library: Vec::new(),
            pipelines: Vec::new(),
            active_config_info: None,
            pipeline_config: None,
            selection: None,
            autosave: AutosaveState::Idle,
            ignore_update: false,
            save_generation: 0,
            status: None,
            is_running: false,
            preview_mode: false,
            layout: PaneLayout::default(),
            http_errors: Vec::new(),
        }
    }

    /// Last agent failure, kept as a single-element list for display
    pub fn http_errors(&self) -> &[String] {
        &self.http_errors
    }

    /// True when the active pipeline is the one running on the agent
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// True while preview mode is active
    pub fn preview_mode(&self) -> bool {
        self.preview_mode
    }

    /// Run the main controller loop
    pub fn run(&mut self) {
        tracing::info!("Pipeline designer controller started");

        self.bootstrap();

        while self.running.load(Ordering::SeqCst) {
            self.process_commands();
            self.process_replies();
            self.flush_due_autosave();

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.idle_wait();
        }

        let _ = self.event_tx.send(ControllerEvent::Shutdown);
        tracing::info!("Pipeline designer controller stopped");
    }

    /// Initial load: definitions, pipeline list, status, then the active
    /// pipeline's configuration
    ///
    /// The active pipeline is the one a RUNNING status names; otherwise the
    /// first in the list; otherwise none. Any agent failure leaves the
    /// controller alive with an error published.
    fn bootstrap(&mut self) {
        let definitions = match self.agent.definitions() {
            Ok(d) => d,
            Err(e) => return self.record_agent_error(e),
        };
        let pipelines = match self.agent.pipelines() {
            Ok(p) => p,
            Err(e) => return self.record_agent_error(e),
        };
        let status = match self.agent.pipeline_status() {
            Ok(s) => s,
            Err(e) => return self.record_agent_error(e),
        };

        self.pipeline_definition = definitions.pipeline.into_iter().next();
        self.stage_library = definitions.stages;
        self.publish_library();

        self.pipelines = pipelines;
        self.send_event(ControllerEvent::PipelinesLoaded(self.pipelines.clone()));

        let active = if status.state == PipelineState::Running {
            self.pipelines.iter().find(|p| p.name == status.name).cloned()
        } else {
            self.pipelines.first().cloned()
        };
        self.status = Some(status);

        match active {
            Some(info) => {
                self.active_config_info = Some(info.clone());
                self.load_pipeline_config(&info.name);
            }
            None => self.refresh_running_flag(),
        }
    }

    /// Split the stage library by type and publish it
    fn publish_library(&mut self) {
        let by_type = |stage_type: StageType| -> Vec<StageDefinition> {
            self.stage_library
                .iter()
                .filter(|s| s.stage_type == stage_type)
                .cloned()
                .collect()
        };

        self.send_event(ControllerEvent::LibraryLoaded {
            sources: by_type(StageType::Source),
            processors: by_type(StageType::Processor),
            targets: by_type(StageType::Target),
        });
    }

    /// Process pending commands from the UI
    fn process_commands(&mut self) {
        loop {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Process pending helper-thread replies
    fn process_replies(&mut self) {
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.handle_reply(reply);
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::ConfigEdited(config) => {
                self.handle_config_edited(config);
            }
            ControllerCommand::NodeSelected(instance_name) => {
                self.update_detail_pane(Some(&instance_name));
            }
            ControllerCommand::NodeSelectionCleared => {
                self.update_detail_pane(None);
            }
            ControllerCommand::PipelineSelected(info) => {
                self.handle_pipeline_selected(info);
            }
            ControllerCommand::FocusStage(instance_name) => {
                let instance = self
                    .pipeline_config
                    .as_ref()
                    .and_then(|c| c.stage(&instance_name))
                    .cloned();
                if let Some(instance) = instance {
                    self.send_event(ControllerEvent::SelectNode(instance));
                    self.update_detail_pane(Some(&instance_name));
                }
            }
            ControllerCommand::StartPreview { next_batch } => {
                self.preview_mode = true;
                self.send_event(ControllerEvent::PreviewStarted { next_batch });
            }
            ControllerCommand::ClosePreview => {
                self.preview_mode = false;
                self.send_event(ControllerEvent::PreviewClosed);
            }
            ControllerCommand::ExportPipeline => {
                self.handle_export();
            }
            ControllerCommand::ImportPipeline(body) => {
                self.handle_import(body);
            }
            ControllerCommand::StatusChanged(status) => {
                self.status = Some(status);
                self.refresh_running_flag();
            }
            ControllerCommand::ToggleLibraryPanel => {
                self.layout.hide_library_panel = !self.layout.hide_library_panel;
                self.publish_layout();
            }
            ControllerCommand::MinimizeDetailPane => {
                self.layout.maximize_detail_pane = false;
                self.layout.minimize_detail_pane = !self.layout.minimize_detail_pane;
                self.publish_layout();
            }
            ControllerCommand::MaximizeDetailPane => {
                self.layout.minimize_detail_pane = false;
                self.layout.maximize_detail_pane = !self.layout.maximize_detail_pane;
                self.publish_layout();
            }
            ControllerCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Change detection for user edits
    ///
    /// The suppression flag is consumed first: right after the controller
    /// writes the working copy back to the UI, the echo coming in through
    /// this command must not arm another save cycle.
    fn handle_config_edited(&mut self, config: PipelineConfig) {
        if self.ignore_update {
            self.ignore_update = false;
            return;
        }

        if self.pipeline_config.is_none() {
            return;
        }
        if self.pipeline_config.as_ref() == Some(&config) {
            return;
        }

        self.pipeline_config = Some(config);
        self.autosave
            .note_edit(Instant::now(), self.settings.autosave_delay());
    }

    /// Switch the working copy to another pipeline (or to none)
    ///
    /// Pending edits and any in-flight save belong to the pipeline being
    /// left behind: the deadline is dropped and the save generation bumped
    /// so a late reply cannot overwrite the new working copy.
    fn handle_pipeline_selected(&mut self, info: Option<PipelineInfo>) {
        self.autosave.reset();
        self.save_generation += 1;

        match info {
            Some(info) => {
                self.active_config_info = Some(info.clone());
                self.load_pipeline_config(&info.name);
            }
            None => {
                self.ignore_update = true;
                self.pipeline_config = None;
                self.active_config_info = None;
                self.selection = None;
                self.refresh_running_flag();
            }
        }
    }

    /// Fetch a pipeline's configuration and publish it
    fn load_pipeline_config(&mut self, name: &str) {
        match self.agent.pipeline_config(name) {
            Ok(config) => self.update_graph(config),
            Err(e) => self.record_agent_error(e),
        }
    }

    /// Fire-and-forget export on a helper thread
    fn handle_export(&mut self) {
        let Some(info) = &self.active_config_info else {
            return;
        };

        let agent = Arc::clone(&self.agent);
        let name = info.name.clone();
        std::thread::spawn(move || {
            if let Err(e) = agent.export_pipeline_config(&name) {
                tracing::warn!("Export of pipeline '{}' failed: {}", name, e);
            }
        });
    }

    /// Merge an imported configuration body in and save it immediately
    ///
    /// The donor `uuid` is discarded in favor of the working copy's, so the
    /// agent accepts the import as the next revision of the open pipeline.
    /// The imported body supersedes unsaved local edits.
    fn handle_import(&mut self, body: serde_json::Value) {
        if self.autosave.is_saving() {
            tracing::warn!("Import ignored: a save is in flight");
            return;
        }
        let Some(current) = &self.pipeline_config else {
            return;
        };

        match serde_json::from_value::<PipelineConfig>(body) {
            Ok(mut imported) => {
                imported.uuid = current.uuid;
                self.autosave.reset();
                self.begin_save(imported);
            }
            Err(e) => self.record_agent_error(PipedeckError::Serialization(e)),
        }
    }

    /// Start the debounced save once its deadline passes
    fn flush_due_autosave(&mut self) {
        if !self.autosave.due(Instant::now()) {
            return;
        }

        match self.pipeline_config.clone() {
            Some(config) => self.begin_save(config),
            None => self.autosave.reset(),
        }
    }

    /// Issue a save request on a helper thread
    ///
    /// No-op while another save is in flight; the dirty flag set by
    /// `note_edit` covers the snapshot instead.
    fn begin_save(&mut self, config: PipelineConfig) {
        let Some(info) = &self.active_config_info else {
            return;
        };
        if !self.autosave.begin_save() {
            return;
        }

        let agent = Arc::clone(&self.agent);
        let name = info.name.clone();
        let generation = self.save_generation;
        let reply_tx = self.reply_tx.clone();

        tracing::debug!("Saving pipeline '{}'", name);
        std::thread::spawn(move || {
            let result = agent.save_pipeline_config(&name, &config);
            let _ = reply_tx.send(AgentReply::SaveFinished { generation, result });
        });
    }

    /// Handle a helper-thread reply
    fn handle_reply(&mut self, reply: AgentReply) {
        match reply {
            AgentReply::SaveFinished { generation, result } => {
                if generation != self.save_generation {
                    tracing::debug!("Discarding save reply for a superseded pipeline");
                    return;
                }
                self.handle_save_finished(result);
            }
        }
    }

    /// Fold a save response back into the designer
    ///
    /// When edits landed while the save was in flight, exactly one follow-up
    /// save is issued with the current working copy carrying the
    /// server-assigned `uuid`; what the canvas sees is the server response
    /// with those newer local edits layered on top.
    fn handle_save_finished(&mut self, result: Result<PipelineConfig>) {
        let dirty_again = self.autosave.finish_save();

        let saved = match result {
            Ok(saved) => saved,
            Err(e) => {
                // Guard cleared, debounce not re-armed: the next edit is
                // what triggers another attempt.
                return self.record_agent_error(e);
            }
        };

        match self.pipeline_config.clone() {
            Some(mut follow_up) if dirty_again => {
                follow_up.uuid = saved.uuid;

                let mut merged = saved;
                merged.configuration = follow_up.configuration.clone();
                merged.ui_info = follow_up.ui_info.clone();
                merged.stages = follow_up.stages.clone();

                self.begin_save(follow_up);
                self.update_graph(merged);
            }
            _ => self.update_graph(saved),
        }
    }

    /// Publish a configuration: derive the graph, reconcile the selection,
    /// and replace the working copy
    fn update_graph(&mut self, config: PipelineConfig) {
        // The UI will echo this write-back as a ConfigEdited command.
        self.ignore_update = true;

        // Stage the canvas had highlighted, resolved against the outgoing
        // working copy so the view can restore it.
        let previous_selection = match (&self.selection, &self.pipeline_config) {
            (Some(DetailSelection::Stage { instance_name }), Some(old)) => {
                old.stage(instance_name).cloned()
            }
            _ => None,
        };

        if let Some(entry) = self
            .pipelines
            .iter_mut()
            .find(|p| p.name == config.info.name)
        {
            *entry = config.info.clone();
        }
        self.active_config_info = Some(config.info.clone());

        let graph = derive_graph(&config.stages);
        self.send_event(ControllerEvent::GraphUpdated {
            stages: config.stages.clone(),
            edges: graph.edges,
            issues: config.issues.clone(),
            source_exists: graph.source_exists,
            previous_selection,
        });

        let selection = selection::reconcile(self.selection.as_ref(), &config);
        let pane = self.resolve_pane(&selection, &config);
        self.selection = Some(selection);
        self.pipeline_config = Some(config);
        self.send_event(ControllerEvent::DetailPane(pane));

        self.refresh_running_flag();
    }

    /// Explicit detail pane selection: a stage by name, or the pipeline
    fn update_detail_pane(&mut self, instance_name: Option<&str>) {
        let Some(config) = self.pipeline_config.clone() else {
            return;
        };

        let selection = match instance_name {
            Some(name) => {
                if config.stage(name).is_none() {
                    tracing::warn!("Selected stage '{}' is not in the working copy", name);
                    return;
                }
                DetailSelection::stage(name)
            }
            None => DetailSelection::Pipeline,
        };

        let pane = self.resolve_pane(&selection, &config);
        self.selection = Some(selection);
        self.send_event(ControllerEvent::DetailPane(pane));
    }

    /// Pair a selection with its configuration schema
    fn resolve_pane(&self, selection: &DetailSelection, config: &PipelineConfig) -> DetailPaneState {
        let definition = self.pipeline_definition.clone().unwrap_or_default();
        selection::resolve(selection, config, &definition, &self.stage_library)
    }

    /// Recompute the derived running flag and publish it on change
    fn refresh_running_flag(&mut self) {
        let running = match (&self.status, &self.pipeline_config) {
            (Some(status), Some(config)) => status.is_running(&config.info.name),
            _ => false,
        };

        if running != self.is_running {
            self.is_running = running;
            self.send_event(ControllerEvent::RunningChanged(running));
        }
    }

    /// Record an agent failure and keep going
    fn record_agent_error(&mut self, error: PipedeckError) {
        let message = error.to_string();
        tracing::error!("{}", message);
        self.http_errors = vec![message.clone()];
        self.send_event(ControllerEvent::AgentError(message));
    }

    fn publish_layout(&mut self) {
        self.send_event(ControllerEvent::LayoutChanged(self.layout.clone()));
    }

    fn send_event(&self, event: ControllerEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Block until a command, a reply, or the next deadline
    fn idle_wait(&mut self) {
        enum Wakeup {
            Command(ControllerCommand),
            Reply(AgentReply),
            CommandsClosed,
            Tick,
        }

        let timeout = self
            .autosave
            .time_until_due(Instant::now())
            .unwrap_or(IDLE_TICK)
            .min(IDLE_TICK);

        let wakeup = select! {
            recv(self.cmd_rx) -> cmd => match cmd {
                Ok(cmd) => Wakeup::Command(cmd),
                Err(_) => Wakeup::CommandsClosed,
            },
            recv(self.reply_rx) -> reply => match reply {
                Ok(reply) => Wakeup::Reply(reply),
                Err(_) => Wakeup::Tick,
            },
            default(timeout) => Wakeup::Tick,
        };

        match wakeup {
            Wakeup::Command(cmd) => self.handle_command(cmd),
            Wakeup::Reply(reply) => self.handle_reply(reply),
            Wakeup::CommandsClosed => self.running.store(false, Ordering::SeqCst),
            Wakeup::Tick => {}
        }
    }
}
