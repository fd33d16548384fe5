//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

use std::sync::Once;
use std::time::{Duration, Instant};

use pipedeck::controller::{ControllerEvent, UiBridge};

static TRACING: Once = Once::new();

/// Initialize test logging once; honors `RUST_LOG`
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Default wait for controller events in integration tests
pub fn event_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Block until an event matching `predicate` arrives, or panic on timeout
///
/// Non-matching events are discarded; tests that care about ordering should
/// drain and inspect the full list instead.
pub fn wait_for_event<F>(bridge: &UiBridge, mut predicate: F) -> ControllerEvent
where
    F: FnMut(&ControllerEvent) -> bool,
{
    let deadline = Instant::now() + event_timeout();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match bridge.event_rx.recv_timeout(remaining) {
            Ok(event) if predicate(&event) => return event,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for controller event"),
        }
    }
}

/// Drain whatever events are currently queued
pub fn drain(bridge: &UiBridge) -> Vec<ControllerEvent> {
    bridge.drain()
}
