// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Messages posted by the execution backend for the pipeline to dispatch.

use tokio::sync::mpsc;

use crate::core::graph::{NodeId, Pad};
use crate::core::state::ReadinessState;

/// Element that posted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageSource {
    /// The top-level pipeline.
    Pipeline,
    /// A node inside the running graph.
    Node(NodeId),
}

impl std::fmt::Display for MessageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pipeline => write!(f, "pipeline"),
            Self::Node(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Eos,
    StateChanged {
        source: MessageSource,
        old: ReadinessState,
        new: ReadinessState,
        pending: Option<ReadinessState>,
    },
    Error {
        source: MessageSource,
        message: String,
        debug: Option<String>,
    },
    Warning {
        source: MessageSource,
        message: String,
        debug: Option<String>,
    },
    /// Duration changed; re-query it.
    DurationChanged,
    PadAdded {
        node: NodeId,
        pad: Pad,
    },
    PadRemoved {
        node: NodeId,
        pad: String,
    },
}

impl BusMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Eos => "eos",
            Self::StateChanged { .. } => "state-changed",
            Self::Error { .. } => "error",
            Self::Warning { .. } => "warning",
            Self::DurationChanged => "duration-changed",
            Self::PadAdded { .. } => "pad-added",
            Self::PadRemoved { .. } => "pad-removed",
        }
    }
}

pub type BusSender = mpsc::UnboundedSender<BusMessage>;
pub type BusReceiver = mpsc::UnboundedReceiver<BusMessage>;

/// Create the bus connecting a backend to its pipeline.
pub fn channel() -> (BusSender, BusReceiver) {
    mpsc::unbounded_channel()
}
