//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use crossbeam_channel::Receiver;
use vispipe::pipeline::{NodeId, Pipeline, PipelineEvent};

/// Drain every event currently queued on `rx`.
pub fn drain(rx: &Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    rx.try_iter().collect()
}

/// Number of `DataChanged` events for `id` in `events`.
pub fn data_changed_for(events: &[PipelineEvent], id: NodeId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::DataChanged(n) if *n == id))
        .count()
}

/// Assert the running flag of every listed node.
pub fn assert_running(pipeline: &Pipeline, ids: &[NodeId], expected: bool) {
    for &id in ids {
        let node = pipeline.get(id).expect("node exists");
        assert_eq!(
            node.is_running(),
            expected,
            "Expected {} ({:?}) running = {}",
            node.name(),
            id,
            expected
        );
    }
}
