// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod bridge;
mod graph_manager;
mod link_context;
#[allow(clippy::module_inception)]
mod pipeline;
mod position;
mod registry;


pub use link_context::LinkContext;
pub use pipeline::{Pipeline, PipelineId};
pub use position::PositionPoller;
