// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::Serialize;

use crate::core::action::ActionId;
use crate::core::component::ComponentId;
use crate::core::error::Result;
use crate::core::media::MediaStream;
use crate::core::state::ReadinessState;

/// Receives pipeline notifications in emission order.
pub trait PipelineListener: Send {
    fn on_notification(&mut self, notification: &Notification) -> Result<()>;
}

/// Everything a pipeline tells its observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notification {
    ActionAdded {
        action: ActionId,
    },
    ActionRemoved {
        action: ActionId,
    },
    ComponentAdded {
        component: ComponentId,
    },
    ComponentRemoved {
        component: ComponentId,
    },
    StateChanged {
        state: ReadinessState,
    },
    /// Current position in nanoseconds.
    Position {
        position: i64,
    },
    DurationChanged {
        duration: i64,
    },
    /// A producer discovered a stream no action claimed.
    UnhandledStream {
        component: ComponentId,
        stream: MediaStream,
    },
    Eos,
    Error {
        message: String,
        detail: Option<String>,
        /// Element that reported the error.
        source: String,
    },
    Warning {
        message: String,
        detail: Option<String>,
        source: String,
    },
}

impl Notification {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ActionAdded { .. } => "action-added",
            Self::ActionRemoved { .. } => "action-removed",
            Self::ComponentAdded { .. } => "component-added",
            Self::ComponentRemoved { .. } => "component-removed",
            Self::StateChanged { .. } => "state-changed",
            Self::Position { .. } => "position",
            Self::DurationChanged { .. } => "duration-changed",
            Self::UnhandledStream { .. } => "unhandled-stream",
            Self::Eos => "eos",
            Self::Error { .. } => "error",
            Self::Warning { .. } => "warning",
        }
    }
}
