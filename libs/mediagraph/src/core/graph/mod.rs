// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#[allow(clippy::module_inception)]
mod graph;
mod link;
mod node;

#[cfg(test)]
mod graph_tests;

pub use graph::Graph;
pub use link::{GraphLink, LinkId, PadRef};
pub use node::{GraphNode, NodeId, NodeKind, Pad, PadDirection, PadPresence};
