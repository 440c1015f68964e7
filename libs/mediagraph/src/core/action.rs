// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Actions: external controllers that claim components and decide which
//! discovered streams get wired.

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::component::Component;
use crate::core::error::ActionError;
use crate::core::media::MediaStream;
use crate::core::pipeline::{LinkContext, PipelineId};

static ACTION_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ActionId(u64);

impl ActionId {
    fn generate() -> Self {
        Self(ACTION_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "action_{}", self.0)
    }
}

/// Controller claiming a set of producers and consumers.
///
/// The engine calls into an action on the thread that owns the pipeline,
/// one call at a time.
pub trait Action: Send {
    fn is_active(&self) -> bool;

    fn producers(&self) -> &[Component];

    fn consumers(&self) -> &[Component];

    fn remove_producers(&mut self, component: &Component);

    fn remove_consumers(&mut self, component: &Component);

    /// A producer this action claims discovered `stream`.
    ///
    /// Return `true` if the action took care of it. `ctx` gives access to
    /// fan-outs, buffering links and linking between them.
    fn handle_new_stream(
        &mut self,
        _ctx: &mut LinkContext<'_>,
        _producer: &Component,
        _stream: &MediaStream,
    ) -> bool {
        false
    }

    /// Stop shaping the graph. Called by `Pipeline::release`.
    fn deactivate(&mut self) -> Result<(), ActionError> {
        Ok(())
    }

    /// Let go of the engine the action was bound to.
    fn unbind_pipeline(&mut self) -> Result<(), ActionError> {
        if self.is_active() {
            return Err(ActionError::StillActive);
        }
        Ok(())
    }
}

struct ActionInner {
    id: ActionId,
    type_id: TypeId,
    type_name: &'static str,
    binding: Mutex<Option<PipelineId>>,
    action: Mutex<Box<dyn Action>>,
}

/// Shared handle to a registered action. Clones share identity.
#[derive(Clone)]
pub struct ActionHandle {
    inner: Arc<ActionInner>,
}

impl ActionHandle {
    pub fn new<A: Action + 'static>(action: A) -> Self {
        Self {
            inner: Arc::new(ActionInner {
                id: ActionId::generate(),
                type_id: TypeId::of::<A>(),
                type_name: std::any::type_name::<A>(),
                binding: Mutex::new(None),
                action: Mutex::new(Box::new(action)),
            }),
        }
    }

    pub fn id(&self) -> ActionId {
        self.inner.id
    }

    /// Concrete type of the wrapped action.
    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    pub fn pipeline_binding(&self) -> Option<PipelineId> {
        *self.inner.binding.lock()
    }

    pub(crate) fn set_pipeline_binding(&self, binding: Option<PipelineId>) {
        *self.inner.binding.lock() = binding;
    }

    /// Direct access to the wrapped action.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Action>> {
        self.inner.action.lock()
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_active()
    }

    pub fn producers(&self) -> Vec<Component> {
        self.lock().producers().to_vec()
    }

    pub fn consumers(&self) -> Vec<Component> {
        self.lock().consumers().to_vec()
    }

    pub fn claims_producer(&self, component: &Component) -> bool {
        self.lock().producers().contains(component)
    }

    /// Whether the action lists `component` as producer or consumer.
    pub fn references(&self, component: &Component) -> bool {
        let action = self.lock();
        action.producers().contains(component) || action.consumers().contains(component)
    }
}

impl PartialEq for ActionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ActionHandle {}

impl std::fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle")
            .field("id", &self.inner.id)
            .field("type", &self.inner.type_name)
            .finish()
    }
}
