// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::Pipeline;
use crate::core::component::Component;
use crate::core::error::Result;
use crate::core::graph::{LinkId, NodeId};
use crate::core::media::MediaStream;
use crate::core::state::ReadinessState;

/// What an action may touch while handling a newly discovered stream.
///
/// Registries are out of reach; only graph resources can be requested.
pub struct LinkContext<'a> {
    pipeline: &'a mut Pipeline,
}

impl<'a> LinkContext<'a> {
    pub(super) fn new(pipeline: &'a mut Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn state(&self) -> ReadinessState {
        self.pipeline.cached_state()
    }

    pub fn ensure_subgraph(&mut self, component: &Component) -> Result<NodeId> {
        self.pipeline.ensure_subgraph(component)
    }

    pub fn ensure_fan_out(
        &mut self,
        producer: &Component,
        stream: &MediaStream,
    ) -> Result<Option<NodeId>> {
        self.pipeline.ensure_fan_out(producer, stream)
    }

    pub fn ensure_buffering_link(
        &mut self,
        consumer: &Component,
        stream: &MediaStream,
    ) -> Result<NodeId> {
        self.pipeline.ensure_buffering_link(consumer, stream)
    }

    pub fn connect(&mut self, fan_out: NodeId, buffering_link: NodeId) -> Result<LinkId> {
        self.pipeline.connect(fan_out, buffering_link)
    }
}
