// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-process backend for tests and headless runs.
//!
//! Handles are cheap clones over shared state so a test can keep one while
//! the pipeline owns another.

use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use super::ExecutionBackend;
use crate::core::bus::{self, BusMessage, BusReceiver, BusSender, MessageSource};
use crate::core::error::{PipelineError, Result};
use crate::core::graph::{GraphNode, NodeId, Pad, PadRef};
use crate::core::media::{Format, SeekFlags};
use crate::core::state::{ReadinessState, StateChangeReturn, StateQuery};

/// How transitions into Paused or Playing complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionMode {
    /// Settle before `set_state` returns.
    #[default]
    Sync,
    /// Stay pending until [`SimulatedBackend::complete_pending`].
    Async,
    /// Refuse the transition.
    Fail,
}

/// Calls the pipeline made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    SetState(ReadinessState),
    Seek {
        format: Format,
        flags: SeekFlags,
        position: i64,
    },
    Attach(NodeId),
    Detach(NodeId),
    Link(PadRef, PadRef),
    Unlink(PadRef, PadRef),
}

struct SimulatedState {
    bus: BusSender,
    current: ReadinessState,
    pending: Option<ReadinessState>,
    mode: TransitionMode,
    scripted: VecDeque<StateChangeReturn>,
    position: i64,
    duration: Option<i64>,
    reject_seeks: bool,
    fail_next_attach: bool,
    attached: BTreeSet<NodeId>,
    links: Vec<(PadRef, PadRef)>,
    calls: Vec<BackendCall>,
}

impl SimulatedState {
    fn post(&self, message: BusMessage) {
        if self.bus.send(message).is_err() {
            tracing::debug!("[SimulatedBackend] Bus receiver dropped");
        }
    }

    fn post_state_changed(&self, old: ReadinessState) {
        self.post(BusMessage::StateChanged {
            source: MessageSource::Pipeline,
            old,
            new: self.current,
            pending: self.pending,
        });
    }
}

#[derive(Clone)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedBackend {
    /// Create a backend and the bus it reports on.
    pub fn new() -> (Self, BusReceiver) {
        let (sender, receiver) = bus::channel();
        let backend = Self {
            state: Arc::new(Mutex::new(SimulatedState {
                bus: sender,
                current: ReadinessState::Null,
                pending: None,
                mode: TransitionMode::Sync,
                scripted: VecDeque::new(),
                position: 0,
                duration: None,
                reject_seeks: false,
                fail_next_attach: false,
                attached: BTreeSet::new(),
                links: Vec::new(),
                calls: Vec::new(),
            })),
        };
        (backend, receiver)
    }

    pub fn set_transition_mode(&self, mode: TransitionMode) {
        self.state.lock().mode = mode;
    }

    /// Force the outcome of the next `set_state` call.
    pub fn script_next(&self, outcome: StateChangeReturn) {
        self.state.lock().scripted.push_back(outcome);
    }

    /// Finish an in-flight transition and post its completion.
    pub fn complete_pending(&self) -> bool {
        let mut state = self.state.lock();
        let Some(target) = state.pending.take() else {
            return false;
        };
        let old = state.current;
        state.current = target;
        state.post_state_changed(old);
        true
    }

    /// Move to `target` without the pipeline asking and without posting.
    pub fn drift_to(&self, target: ReadinessState) {
        let mut state = self.state.lock();
        state.current = target;
        state.pending = None;
    }

    pub fn state(&self) -> ReadinessState {
        self.state.lock().current
    }

    pub fn pending(&self) -> Option<ReadinessState> {
        self.state.lock().pending
    }

    pub fn set_position(&self, position: i64) {
        self.state.lock().position = position;
    }

    pub fn advance_position(&self, delta: i64) {
        let mut state = self.state.lock();
        state.position = state.position.saturating_add(delta);
    }

    /// Set the duration and post `DurationChanged`.
    pub fn set_duration(&self, duration: Option<i64>) {
        let mut state = self.state.lock();
        state.duration = duration;
        state.post(BusMessage::DurationChanged);
    }

    pub fn reject_seeks(&self, reject: bool) {
        self.state.lock().reject_seeks = reject;
    }

    pub fn fail_next_attach(&self) {
        self.state.lock().fail_next_attach = true;
    }

    pub fn emit_pad_added(&self, node: NodeId, pad: Pad) {
        self.state.lock().post(BusMessage::PadAdded { node, pad });
    }

    pub fn emit_pad_removed(&self, node: NodeId, pad: impl Into<String>) {
        self.state.lock().post(BusMessage::PadRemoved {
            node,
            pad: pad.into(),
        });
    }

    pub fn post_eos(&self) {
        self.state.lock().post(BusMessage::Eos);
    }

    pub fn post_error(&self, source: MessageSource, message: impl Into<String>, debug: Option<String>) {
        self.state.lock().post(BusMessage::Error {
            source,
            message: message.into(),
            debug,
        });
    }

    pub fn post_warning(&self, source: MessageSource, message: impl Into<String>, debug: Option<String>) {
        self.state.lock().post(BusMessage::Warning {
            source,
            message: message.into(),
            debug,
        });
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn seeks(&self) -> Vec<BackendCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Seek { .. }))
            .cloned()
            .collect()
    }

    pub fn attached_nodes(&self) -> Vec<NodeId> {
        self.state.lock().attached.iter().copied().collect()
    }

    pub fn link_count(&self) -> usize {
        self.state.lock().links.len()
    }
}

impl ExecutionBackend for SimulatedBackend {
    fn set_state(&mut self, target: ReadinessState) -> StateChangeReturn {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::SetState(target));

        let outcome = match state.scripted.pop_front() {
            Some(outcome) => outcome,
            None => match state.mode {
                TransitionMode::Fail => StateChangeReturn::Failure,
                // Downward transitions always complete synchronously
                TransitionMode::Async if target > state.current && target.is_active() => {
                    StateChangeReturn::Async
                }
                _ => StateChangeReturn::Success,
            },
        };

        let old = state.current;
        match outcome {
            StateChangeReturn::Success | StateChangeReturn::NoPreroll => {
                state.current = target;
                state.pending = None;
                state.post_state_changed(old);
            }
            StateChangeReturn::Async => {
                state.pending = Some(target);
                state.post_state_changed(old);
            }
            StateChangeReturn::Failure => {}
        }
        outcome
    }

    fn query_state(&mut self) -> StateQuery {
        let state = self.state.lock();
        StateQuery {
            result: if state.pending.is_some() {
                StateChangeReturn::Async
            } else {
                StateChangeReturn::Success
            },
            current: state.current,
            pending: state.pending,
        }
    }

    fn query_position(&mut self, format: Format) -> Option<i64> {
        let state = self.state.lock();
        (format == Format::Time && state.current.is_active()).then_some(state.position)
    }

    fn query_duration(&mut self, format: Format) -> Option<i64> {
        let state = self.state.lock();
        if format == Format::Time {
            state.duration
        } else {
            None
        }
    }

    fn seek(&mut self, format: Format, flags: SeekFlags, position: i64) -> bool {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Seek {
            format,
            flags,
            position,
        });
        if state.reject_seeks || !state.current.is_active() {
            return false;
        }
        state.position = position;
        true
    }

    fn attach_node(&mut self, id: NodeId, _node: &GraphNode) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_next_attach {
            state.fail_next_attach = false;
            return Err(PipelineError::new(format!("Backend refused to attach {}", id)));
        }
        state.calls.push(BackendCall::Attach(id));
        state.attached.insert(id);
        Ok(())
    }

    fn detach_node(&mut self, id: NodeId) {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Detach(id));
        state.attached.remove(&id);
        state.links.retain(|(src, sink)| src.node != id && sink.node != id);
    }

    fn link(&mut self, src: &PadRef, sink: &PadRef) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(BackendCall::Link(src.clone(), sink.clone()));
        state.links.push((src.clone(), sink.clone()));
        Ok(())
    }

    fn unlink(&mut self, src: &PadRef, sink: &PadRef) {
        let mut state = self.state.lock();
        state
            .calls
            .push(BackendCall::Unlink(src.clone(), sink.clone()));
        state.links.retain(|(s, k)| !(s == src && k == sink));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_transition_posts_state_changed() {
        let (mut backend, mut rx) = SimulatedBackend::new();
        assert_eq!(
            backend.set_state(ReadinessState::Ready),
            StateChangeReturn::Success
        );
        assert_eq!(backend.state(), ReadinessState::Ready);
        assert_eq!(
            rx.try_recv().unwrap(),
            BusMessage::StateChanged {
                source: MessageSource::Pipeline,
                old: ReadinessState::Null,
                new: ReadinessState::Ready,
                pending: None,
            }
        );
    }

    #[test]
    fn test_async_transition_completes_later() {
        let (mut backend, mut rx) = SimulatedBackend::new();
        backend.set_transition_mode(TransitionMode::Async);

        assert_eq!(
            backend.set_state(ReadinessState::Paused),
            StateChangeReturn::Async
        );
        assert!(!backend.query_state().is_settled());
        // Pending notification
        assert!(rx.try_recv().is_ok());

        assert!(backend.complete_pending());
        assert_eq!(backend.state(), ReadinessState::Paused);
        assert!(backend.query_state().is_settled());
        assert!(matches!(
            rx.try_recv().unwrap(),
            BusMessage::StateChanged {
                new: ReadinessState::Paused,
                pending: None,
                ..
            }
        ));
        assert!(!backend.complete_pending());
    }

    #[test]
    fn test_async_mode_keeps_downward_transitions_sync() {
        let (mut backend, _rx) = SimulatedBackend::new();
        backend.set_transition_mode(TransitionMode::Async);
        assert_eq!(
            backend.set_state(ReadinessState::Ready),
            StateChangeReturn::Success
        );
    }

    #[test]
    fn test_scripted_failure() {
        let (mut backend, _rx) = SimulatedBackend::new();
        backend.script_next(StateChangeReturn::Failure);
        assert_eq!(
            backend.set_state(ReadinessState::Ready),
            StateChangeReturn::Failure
        );
        assert_eq!(backend.state(), ReadinessState::Null);
        assert_eq!(
            backend.set_state(ReadinessState::Ready),
            StateChangeReturn::Success
        );
    }

    #[test]
    fn test_position_only_when_active() {
        let (mut backend, _rx) = SimulatedBackend::new();
        backend.set_position(10);
        assert_eq!(backend.query_position(Format::Time), None);
        backend.set_state(ReadinessState::Paused);
        assert_eq!(backend.query_position(Format::Time), Some(10));
        assert_eq!(backend.query_position(Format::Bytes), None);
    }

    #[test]
    fn test_advance_position_saturates() {
        let (mut backend, _rx) = SimulatedBackend::new();
        backend.set_state(ReadinessState::Paused);
        backend.set_position(i64::MAX - 1);
        backend.advance_position(10);
        assert_eq!(backend.query_position(Format::Time), Some(i64::MAX));
    }

    #[test]
    fn test_seek_moves_position_unless_rejected() {
        let (mut backend, _rx) = SimulatedBackend::new();
        backend.set_state(ReadinessState::Playing);
        assert!(backend.seek(Format::Time, SeekFlags::FLUSH, 42));
        assert_eq!(backend.query_position(Format::Time), Some(42));

        backend.reject_seeks(true);
        assert!(!backend.seek(Format::Time, SeekFlags::FLUSH, 7));
        assert_eq!(backend.query_position(Format::Time), Some(42));
        assert_eq!(backend.seeks().len(), 2);
    }
}
