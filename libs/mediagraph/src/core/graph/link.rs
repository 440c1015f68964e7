// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicU64, Ordering};

use super::node::NodeId;

static LINK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a pad-to-pad link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(u64);

impl LinkId {
    pub(crate) fn generate() -> Self {
        Self(LINK_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link_{}", self.0)
    }
}

/// A pad addressed by node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PadRef {
    pub node: NodeId,
    pub pad: String,
}

impl PadRef {
    pub fn new(node: NodeId, pad: impl Into<String>) -> Self {
        Self {
            node,
            pad: pad.into(),
        }
    }
}

impl std::fmt::Display for PadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.pad)
    }
}

/// Edge weight: which src pad feeds which sink pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLink {
    pub id: LinkId,
    pub src_pad: String,
    pub sink_pad: String,
}
