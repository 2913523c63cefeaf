//! Notifications from the pipeline to its observers.
//!
//! Every subscriber gets its own unbounded crossbeam channel. Emission is a
//! synchronous send performed after the state change completed, so a
//! receiver never observes a half-applied update. Disconnected receivers are
//! pruned on the next emission.

use crate::pipeline::id::NodeId;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Messages broadcast by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A node's output changed (the `data_changed` signal).
    DataChanged(NodeId),

    /// A node finished starting.
    Started(NodeId),

    /// A node finished stopping.
    Stopped(NodeId),

    /// A child was attached through the structural-change hook.
    ChildAdded { parent: NodeId, child: NodeId },

    /// A child was detached through the structural-change hook.
    ChildRemoved { parent: NodeId, child: NodeId },

    /// A child failed to start; its parent carried on.
    StartFailed { node: NodeId, message: String },
}

/// Fan-out of [`PipelineEvent`]s.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<PipelineEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(&mut self, event: PipelineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
