// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::component::ComponentId;
use crate::core::config::BufferingConfig;
use crate::core::media::{Caps, MediaStream};

static NODE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Handle to a node in the running graph.
///
/// The graph reuses slots of removed nodes, but every node gets a serial
/// that is never handed out again. A handle to a removed node therefore
/// never resolves to the node that took over its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    serial: u64,
    pub(super) index: NodeIndex,
}

impl NodeId {
    pub(super) fn generate(index: NodeIndex) -> Self {
        Self {
            serial: NODE_COUNTER.fetch_add(1, Ordering::SeqCst),
            index,
        }
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.serial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadDirection {
    /// Produces data.
    Src,
    /// Consumes data.
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadPresence {
    /// Exists for the whole life of the node.
    #[default]
    Always,
    /// Appears at runtime once the node discovers a stream.
    Sometimes,
    /// Created on demand through [`Graph::request_pad`](super::Graph::request_pad).
    Request,
}

/// Connection point on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pad {
    pub name: String,
    pub direction: PadDirection,
    #[serde(default)]
    pub presence: PadPresence,
    pub caps: Caps,
}

impl Pad {
    pub fn src(name: impl Into<String>, caps: Caps) -> Self {
        Self {
            name: name.into(),
            direction: PadDirection::Src,
            presence: PadPresence::Always,
            caps,
        }
    }

    pub fn sink(name: impl Into<String>, caps: Caps) -> Self {
        Self {
            name: name.into(),
            direction: PadDirection::Sink,
            presence: PadPresence::Always,
            caps,
        }
    }

    pub fn with_presence(mut self, presence: PadPresence) -> Self {
        self.presence = presence;
        self
    }
}

/// What a node stands for in the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Live subgraph instance of a registered component.
    Subgraph { component: ComponentId },
    /// Distribution point after a producer stream.
    FanOut {
        producer: ComponentId,
        stream: MediaStream,
    },
    /// Queue in front of a consumer stream.
    BufferingLink {
        consumer: ComponentId,
        stream: MediaStream,
        limits: BufferingConfig,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Subgraph { .. } => "subgraph",
            Self::FanOut { .. } => "fan-out",
            Self::BufferingLink { .. } => "buffering-link",
        }
    }
}

/// Node weight stored in the running graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub name: String,
    pub kind: NodeKind,
    pub pads: Vec<Pad>,
    next_request_pad: u32,
}

impl GraphNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, pads: Vec<Pad>) -> Self {
        Self {
            name: name.into(),
            kind,
            pads,
            next_request_pad: 0,
        }
    }

    pub fn pad(&self, name: &str) -> Option<&Pad> {
        self.pads.iter().find(|p| p.name == name)
    }

    pub fn src_pads(&self) -> impl Iterator<Item = &Pad> {
        self.pads
            .iter()
            .filter(|p| p.direction == PadDirection::Src)
    }

    pub fn sink_pads(&self) -> impl Iterator<Item = &Pad> {
        self.pads
            .iter()
            .filter(|p| p.direction == PadDirection::Sink)
    }

    pub(crate) fn next_request_pad_name(&mut self) -> String {
        let name = format!("src_{}", self.next_request_pad);
        self.next_request_pad += 1;
        name
    }
}
