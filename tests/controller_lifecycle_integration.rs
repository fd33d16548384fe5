//! Integration tests for the controller lifecycle
//!
//! These tests validate the complete designer workflow against the mock
//! agent: bootstrap, pipeline switching, node selection, preview, and
//! shutdown.

#![cfg(feature = "mock-agent")]

mod common;

use std::sync::Arc;
use std::thread::JoinHandle;

use pipedeck::agent::MockAgent;
use pipedeck::config::ControllerSettings;
use pipedeck::controller::{
    ControllerEvent, DesignerController, DetailPaneState, UiBridge,
};
use pipedeck::types::{PipelineState, PipelineStatus};

use common::{drain, init_tracing, wait_for_event};

fn start_controller(agent: Arc<MockAgent>) -> (UiBridge, JoinHandle<()>) {
    init_tracing();
    let settings = ControllerSettings {
        autosave_delay_ms: 30,
        ..Default::default()
    };
    let (controller, bridge) = DesignerController::new(settings, agent);
    let handle = std::thread::spawn(move || controller.run());
    (bridge, handle)
}

#[test]
fn test_startup_and_shutdown() {
    let agent = Arc::new(MockAgent::new());
    let (bridge, handle) = start_controller(agent);

    bridge.shutdown();

    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::Shutdown));
    assert!(handle.join().is_ok(), "controller thread should exit cleanly");
}

#[test]
fn test_bootstrap_publishes_designer_state() {
    let agent = Arc::new(MockAgent::new());
    let (bridge, handle) = start_controller(agent);

    let library = wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::LibraryLoaded { .. })
    });
    match library {
        ControllerEvent::LibraryLoaded {
            sources,
            processors,
            targets,
        } => {
            assert_eq!(sources.len(), 1);
            assert_eq!(processors.len(), 1);
            assert_eq!(targets.len(), 1);
        }
        _ => unreachable!(),
    }

    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::PipelinesLoaded(p) if p.len() == 1 && p[0].name == "dev")
    });

    let graph = wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::GraphUpdated { .. })
    });
    match graph {
        ControllerEvent::GraphUpdated {
            stages,
            edges,
            source_exists,
            ..
        } => {
            assert_eq!(stages.len(), 2);
            assert_eq!(edges.len(), 1);
            assert_eq!(edges[0].source.instance_name, "devsource_1");
            assert_eq!(edges[0].target.instance_name, "trash_1");
            assert!(source_exists);
        }
        _ => unreachable!(),
    }

    // First load: no prior selection, so the pipeline itself is shown.
    let pane = wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));
    assert!(matches!(
        pane,
        ControllerEvent::DetailPane(DetailPaneState::Pipeline { ref config, .. })
            if config.info.name == "dev"
    ));

    bridge.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_bootstrap_prefers_running_pipeline() {
    let agent = Arc::new(
        MockAgent::new()
            .with_pipeline(MockAgent::sample_pipeline("orders"))
            .with_running("orders"),
    );
    let (bridge, handle) = start_controller(agent);

    let pane = wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));
    assert!(matches!(
        pane,
        ControllerEvent::DetailPane(DetailPaneState::Pipeline { ref config, .. })
            if config.info.name == "orders"
    ));
    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::RunningChanged(true))
    });

    bridge.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_pipeline_switch_loads_new_config() {
    let agent = Arc::new(MockAgent::new().with_pipeline(MockAgent::sample_pipeline("orders")));
    let orders_info = agent.stored_config("orders").unwrap().info;
    let (bridge, handle) = start_controller(agent);

    // Bootstrap settles on the detail pane for "dev".
    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));

    bridge.select_pipeline(Some(orders_info));

    wait_for_event(&bridge, |e| {
        matches!(
            e,
            ControllerEvent::DetailPane(DetailPaneState::Pipeline { config, .. })
                if config.info.name == "orders"
        )
    });

    bridge.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_node_selection_round_trip() {
    let agent = Arc::new(MockAgent::new());
    let (bridge, handle) = start_controller(agent);

    // Bootstrap emits exactly one detail pane event; consume it.
    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));
    drain(&bridge);

    bridge.node_selected("devsource_1");
    let pane = wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));
    match pane {
        ControllerEvent::DetailPane(DetailPaneState::Stage {
            instance,
            definition,
        }) => {
            assert_eq!(instance.instance_name, "devsource_1");
            assert_eq!(definition.unwrap().name, "dev-random-source");
        }
        other => panic!("expected stage pane, got {:?}", other),
    }

    bridge.clear_node_selection();
    let pane = wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));
    assert!(matches!(
        pane,
        ControllerEvent::DetailPane(DetailPaneState::Pipeline { .. })
    ));

    bridge.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_focus_stage_highlights_canvas_node() {
    let agent = Arc::new(MockAgent::new());
    let (bridge, handle) = start_controller(agent);

    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::DetailPane(_)));
    drain(&bridge);

    bridge.focus_stage("trash_1");
    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::SelectNode(instance) if instance.instance_name == "trash_1")
    });
    wait_for_event(&bridge, |e| {
        matches!(
            e,
            ControllerEvent::DetailPane(DetailPaneState::Stage { instance, .. })
                if instance.instance_name == "trash_1"
        )
    });

    bridge.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_status_commands_drive_running_flag() {
    let agent = Arc::new(MockAgent::new());
    let (bridge, handle) = start_controller(agent);

    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::GraphUpdated { .. }));

    bridge.status_changed(PipelineStatus {
        name: "dev".to_string(),
        state: PipelineState::Running,
    });
    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::RunningChanged(true))
    });

    bridge.status_changed(PipelineStatus {
        name: "dev".to_string(),
        state: PipelineState::Stopped,
    });
    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::RunningChanged(false))
    });

    bridge.shutdown();
    handle.join().unwrap();
}

#[test]
fn test_preview_and_layout_events() {
    let agent = Arc::new(MockAgent::new());
    let (bridge, handle) = start_controller(agent);

    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::GraphUpdated { .. }));

    bridge.start_preview(false);
    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::PreviewStarted { next_batch: false })
    });
    bridge.close_preview();
    wait_for_event(&bridge, |e| matches!(e, ControllerEvent::PreviewClosed));

    bridge.toggle_library_panel();
    wait_for_event(&bridge, |e| {
        matches!(e, ControllerEvent::LayoutChanged(layout) if !layout.hide_library_panel)
    });

    bridge.shutdown();
    handle.join().unwrap();
}
