// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Producer and consumer components.
//!
//! A [`Component`] is a cheap, cloneable handle; clones share identity. The
//! engine asks the component's [`SubgraphFactory`] for one live subgraph
//! instance while the component is registered.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::error::Result;
use crate::core::graph::{GraphNode, Pad};
use crate::core::media::MediaStream;
use crate::core::pipeline::PipelineId;

static COMPONENT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn generate() -> Self {
        Self(COMPONENT_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component_{}", self.0)
    }
}

/// Closed set of component capabilities.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    /// Produces one or more streams, discovered at runtime.
    Producer {
        /// Natural duration in nanoseconds, if known.
        default_duration: Option<i64>,
    },
    /// Accepts exactly one stream.
    Consumer { stream: MediaStream },
}

/// Description of a subgraph instance to attach to the running graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SubgraphTemplate {
    pub name: String,
    /// Pads present at creation. Producers may add more at runtime.
    pub pads: Vec<Pad>,
}

impl SubgraphTemplate {
    pub fn new(name: impl Into<String>, pads: Vec<Pad>) -> Self {
        Self {
            name: name.into(),
            pads,
        }
    }
}

/// Builds and tears down the subgraph instance backing a component.
pub trait SubgraphFactory: Send {
    fn make_subgraph(&mut self) -> Result<SubgraphTemplate>;

    /// Called once the instance has left the running graph.
    fn release_subgraph(&mut self, _node: &GraphNode) {}
}

/// Factory that hands out the same template every time.
#[derive(Debug, Clone)]
pub struct StaticSubgraphFactory {
    template: SubgraphTemplate,
}

impl StaticSubgraphFactory {
    pub fn new(template: SubgraphTemplate) -> Self {
        Self { template }
    }
}

impl SubgraphFactory for StaticSubgraphFactory {
    fn make_subgraph(&mut self) -> Result<SubgraphTemplate> {
        Ok(self.template.clone())
    }
}

struct ComponentInner {
    id: ComponentId,
    name: String,
    kind: ComponentKind,
    factory: Mutex<Box<dyn SubgraphFactory>>,
    binding: Mutex<Option<PipelineId>>,
}

#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        factory: impl SubgraphFactory + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                id: ComponentId::generate(),
                name: name.into(),
                kind,
                factory: Mutex::new(Box::new(factory)),
                binding: Mutex::new(None),
            }),
        }
    }

    pub fn producer(name: impl Into<String>, factory: impl SubgraphFactory + 'static) -> Self {
        Self::new(
            name,
            ComponentKind::Producer {
                default_duration: None,
            },
            factory,
        )
    }

    pub fn consumer(
        name: impl Into<String>,
        stream: MediaStream,
        factory: impl SubgraphFactory + 'static,
    ) -> Self {
        Self::new(name, ComponentKind::Consumer { stream }, factory)
    }

    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.inner.kind
    }

    pub fn is_producer(&self) -> bool {
        matches!(self.inner.kind, ComponentKind::Producer { .. })
    }

    pub fn is_consumer(&self) -> bool {
        matches!(self.inner.kind, ComponentKind::Consumer { .. })
    }

    pub fn default_duration(&self) -> Option<i64> {
        match &self.inner.kind {
            ComponentKind::Producer { default_duration } => *default_duration,
            ComponentKind::Consumer { .. } => None,
        }
    }

    /// The stream a consumer accepts.
    pub fn accepted_stream(&self) -> Option<&MediaStream> {
        match &self.inner.kind {
            ComponentKind::Consumer { stream } => Some(stream),
            ComponentKind::Producer { .. } => None,
        }
    }

    /// Engine this component is registered on, if any.
    pub fn pipeline_binding(&self) -> Option<PipelineId> {
        *self.inner.binding.lock()
    }

    pub(crate) fn set_pipeline_binding(&self, binding: Option<PipelineId>) {
        *self.inner.binding.lock() = binding;
    }

    pub(crate) fn make_subgraph(&self) -> Result<SubgraphTemplate> {
        self.inner.factory.lock().make_subgraph()
    }

    pub(crate) fn release_subgraph(&self, node: &GraphNode) {
        self.inner.factory.lock().release_subgraph(node);
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Component {}

impl std::hash::Hash for Component {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .finish()
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.inner.name, self.inner.id)
    }
}
