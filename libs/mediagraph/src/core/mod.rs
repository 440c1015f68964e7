// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod action;
pub mod backend;
pub mod bus;
pub mod component;
pub mod config;
pub mod driver;
pub mod error;
pub mod graph;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod pubsub;
pub mod state;

pub use action::{Action, ActionHandle, ActionId};
pub use backend::{BackendCall, ExecutionBackend, SimulatedBackend, TransitionMode};
pub use bus::{BusMessage, BusReceiver, BusSender, MessageSource};
pub use component::{
    Component, ComponentId, ComponentKind, StaticSubgraphFactory, SubgraphFactory, SubgraphTemplate,
};
pub use config::{BufferingConfig, EngineConfig};
pub use driver::PipelineDriver;
pub use error::{ActionError, FatalError, PipelineError, Result};
pub use graph::{
    Graph, GraphLink, GraphNode, LinkId, NodeId, NodeKind, Pad, PadDirection, PadPresence, PadRef,
};
pub use logging::init_logging;
pub use media::{
    pad_compatible_stream, resolve_stream_from_caps, Caps, CapsStructure, CapsValue, Format,
    MediaStream, SeekFlags, StreamKind, MSECOND, SECOND,
};
pub use pipeline::{LinkContext, Pipeline, PipelineId, PositionPoller};
pub use pubsub::{ChannelListener, Notification, NotificationBus, PipelineListener};
pub use state::{ReadinessState, StateChangeReturn, StateQuery};
