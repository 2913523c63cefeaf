//! Mock construction helpers

use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use vispipe::pipeline::{Component, DataOutput, PipelineError, PipelineResult};

/// What a [`RecordingComponent`] saw, shared with the test.
#[derive(Debug, Default)]
pub struct Recording {
    pub calls: Vec<String>,
    /// Type names of the outputs delivered through `on_input_changed`.
    pub inputs: Vec<Option<String>>,
}

pub type Log = Rc<RefCell<Recording>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Recording::default()))
}

/// Component that logs every hook call, tagged with its label.
pub struct RecordingComponent {
    label: String,
    log: Log,
    fail_start: bool,
    fail_stop: bool,
}

impl RecordingComponent {
    pub fn new(label: &str, log: &Log) -> Self {
        Self {
            label: label.to_string(),
            log: Rc::clone(log),
            fail_start: false,
            fail_stop: false,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Component> {
        Box::new(self)
    }
}

impl Component for RecordingComponent {
    fn type_name(&self) -> &str {
        "Recording"
    }

    fn on_start(&mut self) -> PipelineResult<()> {
        self.log.borrow_mut().calls.push(format!("start {}", self.label));
        if self.fail_start {
            return Err(PipelineError::component("Recording", format!("{} refused to start", self.label)));
        }
        Ok(())
    }

    fn on_stop(&mut self) -> PipelineResult<()> {
        self.log.borrow_mut().calls.push(format!("stop {}", self.label));
        if self.fail_stop {
            return Err(PipelineError::component("Recording", format!("{} refused to stop", self.label)));
        }
        Ok(())
    }

    fn on_input_changed(&mut self, input: Option<&DataOutput>) {
        let mut log = self.log.borrow_mut();
        log.calls.push(format!("input {}", self.label));
        log.inputs.push(input.map(|o| o.type_name.clone()));
    }

    fn save_state(&self) -> Value {
        json!({ "label": self.label })
    }
}

/// Calls recorded so far.
pub fn calls(log: &Log) -> Vec<String> {
    log.borrow().calls.clone()
}
