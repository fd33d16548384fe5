//! # pipedeck: Pipeline Designer Controller
//!
//! A UI-agnostic controller core for a stage-based data-pipeline designer.
//! It owns the working copy of the active pipeline configuration, talks to a
//! remote pipeline agent, derives the stage graph from lane names, keeps the
//! detail pane selection alive across reloads, and debounces autosave.
//!
//! ## Architecture
//!
//! - **Controller**: Owns all designer state on its own thread and processes
//!   typed commands from the host UI
//! - **Agent**: `PipelineAgent` trait with a REST implementation and an
//!   in-memory mock for tests
//! - **Graph**: Edge derivation from output/input lane-name matching
//! - **Communication**: Crossbeam channels for thread-safe message transfer
//!
//! The host environment supplies rendering, routing, and modal dialogs; the
//! controller only deals in [`controller::ControllerCommand`] and
//! [`controller::ControllerEvent`] values.
//!
//! ## Configuration
//!
//! Controller settings (agent endpoint, autosave timing) are stored in the
//! platform-appropriate data directory under `dev.pipedeck`:
//!
//! - **Linux**: `~/.local/share/dev.pipedeck/`
//! - **macOS**: `~/Library/Application Support/dev.pipedeck/`
//! - **Windows**: `%APPDATA%\dev.pipedeck\`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipedeck::{
//!     agent::HttpAgent,
//!     config::ControllerSettings,
//!     controller::{ControllerEvent, DesignerController},
//! };
//!
//! fn main() -> pipedeck::Result<()> {
//!     let settings = ControllerSettings::load_or_default();
//!     let agent = Arc::new(HttpAgent::from_settings(&settings)?);
//!
//!     let (controller, bridge) = DesignerController::new(settings, agent);
//!     std::thread::spawn(move || controller.run());
//!
//!     // Host UI loop: push edits in, pull graph refreshes out.
//!     loop {
//!         for event in bridge.drain() {
//!             match event {
//!                 ControllerEvent::GraphUpdated { stages, edges, .. } => {
//!                     // redraw the canvas
//!                 }
//!                 ControllerEvent::Shutdown => return Ok(()),
//!                 _ => {}
//!             }
//!         }
//!     }
//! }
//! ```

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod types;

// Re-export commonly used types
pub use agent::{HttpAgent, PipelineAgent};
pub use config::ControllerSettings;
pub use controller::{
    ControllerCommand, ControllerEvent, DesignerController, DetailPaneState, DetailSelection,
    UiBridge,
};
pub use error::{PipedeckError, Result};
pub use graph::{derive_graph, Edge, PipelineGraph};
pub use types::{PipelineConfig, PipelineInfo, PipelineStatus, StageInstance};
