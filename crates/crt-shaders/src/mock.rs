//! Mock pipeline compiler for testing
//!
//! Provides a MockCompiler that implements [`PipelineCompiler`] without a
//! GPU. It records every compile, failure and release so tests can check
//! exactly which handles were created and dropped, and it can be told to
//! fail specific compiles.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ShaderError;
use crate::pipeline::{Blend, PipelineCompiler, PipelineDescriptor, ResourceBinding};

/// Record of a compiler call or handle release for test inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// A pipeline with this label was built
    Compiled(String),
    /// Compilation of this label was made to fail
    Failed(String),
    /// The handle for this label was dropped
    Released(String),
}

/// Owned copy of the interesting parts of a [`PipelineDescriptor`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDescriptor {
    pub label: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub instance_stride: Option<u64>,
    pub step_mode: wgpu::VertexStepMode,
    pub bindings: Vec<ResourceBinding>,
    pub blend: Blend,
}

impl From<&PipelineDescriptor<'_>> for RecordedDescriptor {
    fn from(desc: &PipelineDescriptor<'_>) -> Self {
        Self {
            label: desc.label.to_string(),
            vertex_source: desc.vertex_source.to_string(),
            fragment_source: desc.fragment_source.to_string(),
            instance_stride: desc.instance.as_ref().map(|layout| layout.array_stride),
            step_mode: desc.step_mode,
            bindings: desc.bindings.to_vec(),
            blend: desc.blend,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    events: Vec<MockEvent>,
    descriptors: Vec<RecordedDescriptor>,
    attempts: usize,
    live: usize,
}

/// When a compile should fail
#[derive(Debug, Clone)]
enum FailRule {
    Label(String),
    Attempt(usize),
    SourceContains(String),
}

/// A compiler that records calls instead of touching a GPU
///
/// Clones share the same recording, so a test can keep one clone while the
/// code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MockCompiler {
    state: Rc<RefCell<MockState>>,
    rules: Vec<FailRule>,
}

impl MockCompiler {
    /// Create a compiler where every compile succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any compile with exactly this label
    pub fn fail_on_label(mut self, label: impl Into<String>) -> Self {
        self.rules.push(FailRule::Label(label.into()));
        self
    }

    /// Fail the compile attempt with this zero-based index
    pub fn fail_on_attempt(mut self, attempt: usize) -> Self {
        self.rules.push(FailRule::Attempt(attempt));
        self
    }

    /// Fail any compile whose fragment source contains `marker`
    pub fn fail_on_source(mut self, marker: impl Into<String>) -> Self {
        self.rules.push(FailRule::SourceContains(marker.into()));
        self
    }

    /// Stop failing; the recording is kept
    pub fn clear_failures(&mut self) {
        self.rules.clear();
    }

    /// All recorded events in order
    pub fn events(&self) -> Vec<MockEvent> {
        self.state.borrow().events.clone()
    }

    /// Forget recorded events and descriptors
    pub fn clear_events(&self) {
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.descriptors.clear();
    }

    /// Labels of every successful compile, in order
    pub fn compiled(&self) -> Vec<String> {
        self.labels(|event| match event {
            MockEvent::Compiled(label) => Some(label),
            _ => None,
        })
    }

    /// Labels of every released handle, in order
    pub fn released(&self) -> Vec<String> {
        self.labels(|event| match event {
            MockEvent::Released(label) => Some(label),
            _ => None,
        })
    }

    /// Number of handles compiled and not yet dropped
    pub fn live_count(&self) -> usize {
        self.state.borrow().live
    }

    /// Total compile attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.state.borrow().attempts
    }

    /// Descriptor of the most recent compile attempt
    pub fn last_descriptor(&self) -> Option<RecordedDescriptor> {
        self.state.borrow().descriptors.last().cloned()
    }

    /// Every descriptor seen, in order
    pub fn descriptors(&self) -> Vec<RecordedDescriptor> {
        self.state.borrow().descriptors.clone()
    }

    fn labels(&self, pick: impl Fn(&MockEvent) -> Option<&String>) -> Vec<String> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| pick(event).cloned())
            .collect()
    }

    fn should_fail(&self, attempt: usize, desc: &PipelineDescriptor<'_>) -> bool {
        self.rules.iter().any(|rule| match rule {
            FailRule::Label(label) => label == desc.label,
            FailRule::Attempt(n) => *n == attempt,
            FailRule::SourceContains(marker) => desc.fragment_source.contains(marker.as_str()),
        })
    }
}

impl PipelineCompiler for MockCompiler {
    type Pipeline = MockPipeline;

    fn compile(&self, desc: &PipelineDescriptor<'_>) -> Result<MockPipeline, ShaderError> {
        let attempt = {
            let mut state = self.state.borrow_mut();
            state.descriptors.push(RecordedDescriptor::from(desc));
            state.attempts += 1;
            state.attempts - 1
        };

        let mut state = self.state.borrow_mut();
        if self.should_fail(attempt, desc) {
            state.events.push(MockEvent::Failed(desc.label.to_string()));
            return Err(ShaderError::compile(desc.label, "mock compile failure"));
        }

        state.events.push(MockEvent::Compiled(desc.label.to_string()));
        state.live += 1;
        Ok(MockPipeline {
            label: desc.label.to_string(),
            state: Rc::clone(&self.state),
        })
    }
}

/// Handle returned by [`MockCompiler`]; dropping it records a release
#[derive(Debug)]
pub struct MockPipeline {
    label: String,
    state: Rc<RefCell<MockState>>,
}

impl MockPipeline {
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.live -= 1;
        state.events.push(MockEvent::Released(self.label.clone()));
    }
}
