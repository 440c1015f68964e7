// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Dynamic media graph engine.
//!
//! Owns a running processing graph, drives its readiness state machine and
//! materializes fan-out and buffering nodes on demand for the actions that
//! wire producers to consumers.

#![allow(clippy::type_complexity)] // Complex types are clear in context

pub mod core;

pub use core::{
    init_logging, Action, ActionError, ActionHandle, ActionId, BackendCall, BufferingConfig,
    BusMessage, BusReceiver, BusSender, Caps, CapsValue, ChannelListener, Component, ComponentId,
    ComponentKind, EngineConfig, ExecutionBackend, FatalError, Format, Graph, GraphLink, GraphNode,
    LinkContext, LinkId, MediaStream, MessageSource, NodeId, NodeKind, Notification,
    NotificationBus, Pad, PadDirection, PadPresence, PadRef, Pipeline, PipelineDriver,
    PipelineError, PipelineId, PipelineListener, ReadinessState, Result, SeekFlags,
    SimulatedBackend, StateChangeReturn, StateQuery, StaticSubgraphFactory, StreamKind,
    SubgraphFactory, SubgraphTemplate, TransitionMode, SECOND,
};
