// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Seam between the pipeline and whatever actually moves media.

mod simulated;

pub use simulated::{BackendCall, SimulatedBackend, TransitionMode};

use crate::core::error::Result;
use crate::core::graph::{GraphNode, NodeId, PadRef};
use crate::core::media::{Format, SeekFlags};
use crate::core::state::{ReadinessState, StateChangeReturn, StateQuery};

/// Execution engine driven by a [`Pipeline`](crate::core::Pipeline).
///
/// Asynchronous outcomes (state completion, discovered pads, errors) are
/// reported on the bus the backend was created with, never through return
/// values.
pub trait ExecutionBackend: Send {
    fn set_state(&mut self, target: ReadinessState) -> StateChangeReturn;

    fn query_state(&mut self) -> StateQuery;

    fn query_position(&mut self, format: Format) -> Option<i64>;

    fn query_duration(&mut self, format: Format) -> Option<i64>;

    /// Returns `false` if the seek was rejected.
    fn seek(&mut self, format: Format, flags: SeekFlags, position: i64) -> bool;

    fn attach_node(&mut self, id: NodeId, node: &GraphNode) -> Result<()>;

    fn detach_node(&mut self, id: NodeId);

    fn link(&mut self, src: &PadRef, sink: &PadRef) -> Result<()>;

    fn unlink(&mut self, src: &PadRef, sink: &PadRef);
}
