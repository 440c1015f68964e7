// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Readiness state machine types
//!
//! - `ReadinessState` - how much of the graph is allocated/active
//! - `StateChangeReturn` - outcome of a transition request
//! - `StateQuery` - live answer from the execution backend
//!
//! ```text
//! Null ──► Ready ──► Paused ──► Playing
//!   ▲        ▲         │           │
//!   └────────┴─────────┴───────────┘
//! ```
//!
//! Topology may only change in `Null` or `Ready`; consumers are the single
//! exception and may be attached while `Paused` or `Playing`.

use serde::{Deserialize, Serialize};

/// Readiness of the whole processing graph, ordered by how much is
/// allocated and running.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    /// Nothing allocated.
    #[default]
    Null,
    /// Resources allocated, no data flowing.
    Ready,
    /// Data prerolled, clock stopped.
    Paused,
    /// Data flowing, clock running.
    Playing,
}

impl ReadinessState {
    /// Graph topology can be mutated freely.
    pub fn allows_topology_changes(&self) -> bool {
        matches!(self, Self::Null | Self::Ready)
    }

    /// Paused or Playing. Position polling only runs in these states.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Paused | Self::Playing)
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Ready => write!(f, "Ready"),
            Self::Paused => write!(f, "Paused"),
            Self::Playing => write!(f, "Playing"),
        }
    }
}

/// Outcome of asking the backend to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeReturn {
    /// The transition completed before the call returned.
    Success,
    /// The transition continues in the background; completion arrives as a
    /// `StateChanged` bus message.
    Async,
    /// Completed, but the graph cannot preroll (live sources).
    NoPreroll,
    /// The transition was refused.
    Failure,
}

impl StateChangeReturn {
    /// Success and NoPreroll both settle immediately.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success | Self::NoPreroll)
    }
}

/// Live state reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateQuery {
    pub result: StateChangeReturn,
    pub current: ReadinessState,
    /// Target of an in-flight transition, if any.
    pub pending: Option<ReadinessState>,
}

impl StateQuery {
    pub fn settled(current: ReadinessState) -> Self {
        Self {
            result: StateChangeReturn::Success,
            current,
            pending: None,
        }
    }

    /// No transition in flight and the query itself did not fail.
    pub fn is_settled(&self) -> bool {
        self.result != StateChangeReturn::Failure && self.pending.is_none()
    }
}
