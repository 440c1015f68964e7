// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The engine: owns the running graph and its readiness state.
//!
//! Operations are split across files as `impl Pipeline` blocks:
//! - this file: construction, state control, position and seeking
//! - `registry.rs`: components and actions
//! - `graph_manager.rs`: subgraphs, fan-outs and buffering links
//! - `bridge.rs`: dispatch of backend bus messages

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::position::PositionPoller;
use crate::core::action::ActionHandle;
use crate::core::backend::ExecutionBackend;
use crate::core::component::{Component, ComponentId};
use crate::core::config::EngineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::graph::{Graph, NodeId};
use crate::core::media::{Format, MediaStream, SeekFlags};
use crate::core::pubsub::{Notification, NotificationBus, PipelineListener};
use crate::core::state::{ReadinessState, StateChangeReturn};

static PIPELINE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identity of a pipeline instance; components and actions record the one
/// they are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(u64);

impl PipelineId {
    pub(crate) fn generate() -> Self {
        Self(PIPELINE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipeline_{}", self.0)
    }
}

pub(crate) type StreamKey = (ComponentId, MediaStream);

pub struct Pipeline {
    pub(super) id: PipelineId,
    pub(super) config: EngineConfig,
    pub(super) backend: Box<dyn ExecutionBackend>,
    pub(super) graph: Graph,
    pub(super) cached_state: ReadinessState,
    pub(super) notifications: NotificationBus,
    pub(super) poller: PositionPoller,

    pub(super) actions: Vec<ActionHandle>,
    pub(super) components: Vec<Component>,
    pub(super) subgraphs: HashMap<ComponentId, NodeId>,
    pub(super) fan_outs: HashMap<StreamKey, NodeId>,
    pub(super) buffering_links: HashMap<StreamKey, NodeId>,
    /// Producers whose discovered pads are dispatched to actions.
    pub(super) watched: HashSet<ComponentId>,
}

impl Pipeline {
    pub fn new(config: EngineConfig, backend: impl ExecutionBackend + 'static) -> Self {
        let id = PipelineId::generate();
        tracing::info!("[Pipeline] Created {}", id);
        Self {
            id,
            poller: PositionPoller::new(config.poll_interval()),
            config,
            backend: Box::new(backend),
            graph: Graph::new(),
            cached_state: ReadinessState::Null,
            notifications: NotificationBus::new(),
            actions: Vec::new(),
            components: Vec::new(),
            subgraphs: HashMap::new(),
            fan_outs: HashMap::new(),
            buffering_links: HashMap::new(),
            watched: HashSet::new(),
        }
    }

    /// Wrap in the shared handle the driver expects.
    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn subscribe(&mut self, listener: Arc<Mutex<dyn PipelineListener>>) {
        self.notifications.subscribe(listener);
    }

    pub fn subscribe_channel(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<Notification> {
        self.notifications.subscribe_channel()
    }

    pub(super) fn emit(&mut self, notification: Notification) {
        self.notifications.emit(notification);
    }

    // ---------------------------------------------------------------------
    // State control
    // ---------------------------------------------------------------------

    /// State as last observed, without asking the backend.
    pub fn cached_state(&self) -> ReadinessState {
        self.cached_state
    }

    /// Request a transition to `target`.
    ///
    /// `Async` means the cached state is unchanged until the backend posts
    /// completion on the bus.
    pub fn set_state(&mut self, target: ReadinessState) -> Result<StateChangeReturn> {
        if target == self.cached_state {
            tracing::debug!("[Pipeline] {} already in {}", self.id, target);
            return Ok(StateChangeReturn::Success);
        }

        tracing::info!(
            "[Pipeline] {} changing state {} -> {}",
            self.id,
            self.cached_state,
            target
        );
        let outcome = self.backend.set_state(target);
        match outcome {
            StateChangeReturn::Failure => {
                return Err(PipelineError::new(format!(
                    "Failure changing state of the pipeline to {}",
                    target
                )));
            }
            StateChangeReturn::Success | StateChangeReturn::NoPreroll => {
                self.settle_state(target);
            }
            StateChangeReturn::Async => {
                tracing::debug!("[Pipeline] {} transition to {} is pending", self.id, target);
            }
        }
        Ok(outcome)
    }

    /// Ask the backend for its live state, reconciling the cache when the
    /// backend has settled somewhere else.
    pub fn query_state(&mut self) -> ReadinessState {
        let query = self.backend.query_state();
        if query.is_settled() && query.current != self.cached_state {
            tracing::debug!(
                "[Pipeline] {} drifted {} -> {}",
                self.id,
                self.cached_state,
                query.current
            );
            self.settle_state(query.current);
        }
        query.current
    }

    pub fn play(&mut self) -> Result<StateChangeReturn> {
        self.set_state(ReadinessState::Playing)
    }

    pub fn pause(&mut self) -> Result<StateChangeReturn> {
        self.set_state(ReadinessState::Paused)
    }

    pub fn stop(&mut self) -> Result<StateChangeReturn> {
        self.set_state(ReadinessState::Ready)
    }

    /// Record a settled state. Toggles polling and notifies.
    pub(super) fn settle_state(&mut self, state: ReadinessState) {
        if state == self.cached_state {
            return;
        }
        self.cached_state = state;
        self.poller.follow_state(state);
        tracing::info!("[Pipeline] {} is now {}", self.id, state);
        self.emit(Notification::StateChanged { state });
    }

    pub(super) fn require_topology_changes(&self, what: &str) -> Result<()> {
        if !self.cached_state.allows_topology_changes() {
            return Err(PipelineError::new(format!(
                "Pipeline not in Null/Ready ({}), can not {}",
                self.cached_state, what
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Position and seeking
    // ---------------------------------------------------------------------

    pub fn query_position(&mut self, format: Format) -> Result<i64> {
        self.backend
            .query_position(format)
            .ok_or_else(|| PipelineError::new("Couldn't get position"))
    }

    pub fn query_duration(&mut self, format: Format) -> Result<i64> {
        self.backend
            .query_duration(format)
            .ok_or_else(|| PipelineError::new("Couldn't get duration"))
    }

    /// Emit `position` periodically while Paused or Playing.
    ///
    /// `None` uses the configured interval. Idempotent: a second call keeps
    /// the first interval.
    pub fn enable_position_polling(&mut self, interval: Option<Duration>) {
        let interval = interval.unwrap_or_else(|| self.config.poll_interval());
        let state = self.query_state();
        if self.poller.enable(interval, state) {
            tracing::debug!(
                "[Pipeline] {} position polling every {:?}",
                self.id,
                interval
            );
        }
    }

    pub fn disable_position_polling(&mut self) {
        self.poller.disable();
    }

    /// Whether the poll timer is armed right now.
    pub fn is_polling(&self) -> bool {
        self.poller.is_armed()
    }

    pub fn next_position_poll(&self) -> Option<tokio::time::Instant> {
        self.poller.deadline()
    }

    /// Run a due poll: query the position and emit it.
    pub fn poll_position(&mut self) -> Option<i64> {
        if !self.poller.fire(tokio::time::Instant::now()) {
            return None;
        }
        match self.backend.query_position(Format::Time) {
            Some(position) => {
                self.emit(Notification::Position { position });
                Some(position)
            }
            None => {
                tracing::trace!("[Pipeline] {} position unavailable", self.id);
                None
            }
        }
    }

    /// Flushing seek to an absolute position.
    ///
    /// Emits `position` with the requested target as soon as the backend
    /// accepts the seek.
    pub fn seek(&mut self, position: i64, format: Format) -> Result<()> {
        let position = self.clamp_seek_target(position, format);
        tracing::debug!("[Pipeline] {} seek to {} ({:?})", self.id, position, format);

        self.poller.suspend();
        let accepted = self.backend.seek(format, SeekFlags::FLUSH, position);
        self.poller.follow_state(self.cached_state);

        if !accepted {
            return Err(PipelineError::new("seek failed"));
        }
        self.emit(Notification::Position { position });
        Ok(())
    }

    /// Seek by `delta` nanoseconds from the current position.
    pub fn seek_relative(&mut self, delta: i64) -> Result<()> {
        let current = self.query_position(Format::Time)?;
        self.seek(current.saturating_add(delta), Format::Time)
    }

    fn clamp_seek_target(&mut self, position: i64, format: Format) -> i64 {
        if format != Format::Time {
            return position;
        }
        let position = position.max(0);
        if !self.config.seek_clamp_to_duration {
            return position;
        }
        match self.backend.query_duration(Format::Time) {
            Some(duration) if position > duration => duration,
            _ => position,
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("state", &self.cached_state)
            .field("components", &self.components.len())
            .field("actions", &self.actions.len())
            .field("nodes", &self.graph.node_count())
            .finish()
    }
}
