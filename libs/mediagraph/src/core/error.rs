// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use crate::core::graph::NodeId;

/// The single recoverable failure kind raised by the engine.
///
/// Every public operation either completes or returns this error before
/// mutating the graph or the registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct PipelineError {
    reason: String,
}

impl PipelineError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Unrecoverable conditions reported by bus dispatch.
///
/// These have no defined recovery; the driver stops dispatching when one is
/// reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("connection point '{pad}' was removed from {node}; dynamic removal is unsupported")]
    ConnectionPointRemoved { node: NodeId, pad: String },
}

/// Failures reported by an [`Action`](crate::core::Action) when the engine
/// asks it to let go of its pipeline binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("action is still active")]
    StillActive,

    #[error("action refused to unbind: {0}")]
    Refused(String),
}
