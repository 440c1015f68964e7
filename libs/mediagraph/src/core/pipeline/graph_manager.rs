// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! On-demand subgraphs, fan-outs and buffering links.
//!
//! Fan-outs are keyed by (producer, stream) and live while something
//! downstream is linked to them. Buffering links are keyed by
//! (consumer, stream), one per key.

use super::pipeline::StreamKey;
use super::Pipeline;
use crate::core::component::Component;
use crate::core::error::{PipelineError, Result};
use crate::core::graph::{GraphNode, LinkId, NodeId, NodeKind, Pad, PadRef};
use crate::core::media::{Caps, MediaStream};

impl Pipeline {
    // ---------------------------------------------------------------------
    // Subgraph instances
    // ---------------------------------------------------------------------

    /// Existing subgraph instance of `component`, if one was created.
    pub fn subgraph(&self, component: &Component) -> Result<Option<NodeId>> {
        self.require_registered(component)?;
        Ok(self.subgraphs.get(&component.id()).copied())
    }

    /// Subgraph instance of `component`, created on first use.
    ///
    /// Producer instances can only be created in Null or Ready; consumer
    /// instances may join a live pipeline.
    pub fn ensure_subgraph(&mut self, component: &Component) -> Result<NodeId> {
        if let Some(node) = self.subgraph(component)? {
            return Ok(node);
        }
        if component.pipeline_binding().is_some_and(|owner| owner != self.id) {
            return Err(PipelineError::new(format!(
                "{} is bound to another pipeline",
                component
            )));
        }
        if component.is_producer() {
            self.require_topology_changes("create a producer subgraph")?;
        }

        let template = component.make_subgraph().map_err(|e| {
            PipelineError::new(format!("Failed to create subgraph for {}: {}", component, e))
        })?;
        let node = GraphNode::new(
            template.name,
            NodeKind::Subgraph {
                component: component.id(),
            },
            template.pads,
        );
        let id = self.attach(node)?;

        self.subgraphs.insert(component.id(), id);
        if component.is_producer() {
            self.watch(component);
        }
        tracing::debug!("[GraphManager] Created subgraph {} for {}", id, component);
        Ok(id)
    }

    /// Tear down the subgraph instance of `component`.
    ///
    /// Refused while fan-outs or buffering links are still built on it.
    pub fn release_subgraph(&mut self, component: &Component) -> Result<()> {
        self.require_topology_changes("release a subgraph")?;
        let Some(node) = self.subgraph(component)? else {
            return Ok(());
        };
        let id = component.id();
        if self.fan_outs.keys().any(|(owner, _)| *owner == id)
            || self.buffering_links.keys().any(|(owner, _)| *owner == id)
        {
            return Err(PipelineError::new(format!(
                "{} still has fan-outs or buffering links attached",
                component
            )));
        }
        self.teardown_subgraph(component, node);
        Ok(())
    }

    fn teardown_subgraph(&mut self, component: &Component, node: NodeId) {
        self.subgraphs.remove(&component.id());
        self.unwatch(component);
        if let Some(weight) = self.detach(node) {
            component.release_subgraph(&weight);
        }
        tracing::debug!("[GraphManager] Released subgraph {} of {}", node, component);
    }

    // ---------------------------------------------------------------------
    // Fan-outs
    // ---------------------------------------------------------------------

    /// Existing fan-out for (`producer`, `stream`).
    pub fn fan_out(&self, producer: &Component, stream: &MediaStream) -> Result<Option<NodeId>> {
        self.require_producer(producer)?;
        Ok(self.fan_outs.get(&(producer.id(), stream.clone())).copied())
    }

    /// Fan-out for (`producer`, `stream`), created if the producer exposes
    /// exactly one matching src pad.
    ///
    /// `Ok(None)` means the stream has not been discovered yet; retry after
    /// the producer reports a new pad. If the matching pad already feeds a
    /// fan-out of this producer, that fan-out is returned.
    pub fn ensure_fan_out(
        &mut self,
        producer: &Component,
        stream: &MediaStream,
    ) -> Result<Option<NodeId>> {
        if let Some(node) = self.fan_out(producer, stream)? {
            return Ok(Some(node));
        }
        self.require_topology_changes("create a fan-out")?;

        let created_subgraph = self.subgraph(producer)?.is_none();
        let source = self.ensure_subgraph(producer)?;

        let pads = self.graph.find_compatible_outgoing_pads(source, stream);
        let pad_name = match pads.as_slice() {
            [] => {
                tracing::debug!(
                    "[GraphManager] {} has no pad for {} yet",
                    producer,
                    stream
                );
                self.watch(producer);
                return Ok(None);
            }
            [single] => single.clone(),
            _ => {
                if created_subgraph {
                    self.teardown_subgraph(producer, source);
                }
                return Err(PipelineError::new(format!(
                    "ambiguous connection point: {} has {} pads for {}",
                    producer,
                    pads.len(),
                    stream
                )));
            }
        };

        let src = PadRef::new(source, pad_name);
        if let Some(peer) = self.graph.peer(&src) {
            // Already distributed under another descriptor of the same stream
            return match self.graph.node(peer.node).map(|n| &n.kind) {
                Some(NodeKind::FanOut { producer: owner, .. }) if *owner == producer.id() => {
                    Ok(Some(peer.node))
                }
                _ => Err(PipelineError::new(format!(
                    "{} for {} is already linked to {}",
                    src, stream, peer
                ))),
            };
        }
        let caps = self.pad_caps(&src);
        let node = GraphNode::new(
            format!("fanout-{}-{}", producer.name(), stream.kind),
            NodeKind::FanOut {
                producer: producer.id(),
                stream: stream.clone(),
            },
            vec![Pad::sink("sink", caps)],
        );
        let fan_out = self.attach(node)?;
        if let Err(e) = self.link_pads(&src, &PadRef::new(fan_out, "sink")) {
            self.detach(fan_out);
            return Err(e);
        }

        self.fan_outs.insert((producer.id(), stream.clone()), fan_out);
        self.watch(producer);
        tracing::debug!(
            "[GraphManager] Created fan-out {} after {} for {}",
            fan_out,
            src,
            stream
        );
        Ok(Some(fan_out))
    }

    /// Remove the fan-out for (`producer`, `stream`) once nothing downstream
    /// uses it. A fan-out with remaining outgoing links is left alone.
    pub fn release_fan_out(&mut self, producer: &Component, stream: &MediaStream) -> Result<()> {
        self.require_topology_changes("release a fan-out")?;
        let key = (producer.id(), stream.clone());
        let Some(&node) = self.fan_outs.get(&key) else {
            return Ok(());
        };

        let downstream = self.graph.outgoing_links(node);
        if !downstream.is_empty() {
            tracing::debug!(
                "[GraphManager] Fan-out {} still feeds {} link(s)",
                node,
                downstream.len()
            );
            return Ok(());
        }

        self.remove_fan_out(&key, node);
        if !self.fan_outs.keys().any(|(owner, _)| *owner == producer.id()) {
            self.unwatch(producer);
        }
        Ok(())
    }

    /// Fan-outs as ((producer, stream), node), ordered by node.
    pub fn fan_outs(&self) -> Vec<(StreamKey, NodeId)> {
        sorted_entries(&self.fan_outs)
    }

    // ---------------------------------------------------------------------
    // Buffering links
    // ---------------------------------------------------------------------

    pub fn buffering_link(
        &self,
        consumer: &Component,
        stream: &MediaStream,
    ) -> Result<Option<NodeId>> {
        self.require_consumer(consumer)?;
        Ok(self
            .buffering_links
            .get(&(consumer.id(), stream.clone()))
            .copied())
    }

    /// Buffering link in front of the single sink pad of `consumer` that
    /// accepts `stream`.
    pub fn ensure_buffering_link(
        &mut self,
        consumer: &Component,
        stream: &MediaStream,
    ) -> Result<NodeId> {
        if let Some(node) = self.buffering_link(consumer, stream)? {
            return Ok(node);
        }
        self.require_topology_changes("create a buffering link")?;

        let created_subgraph = self.subgraph(consumer)?.is_none();
        let target = self.ensure_subgraph(consumer)?;

        let pads = self.graph.find_compatible_incoming_pads(target, stream);
        let pad_name = match pads.as_slice() {
            [single] => single.clone(),
            _ => {
                if created_subgraph {
                    self.teardown_subgraph(consumer, target);
                }
                return Err(if pads.is_empty() {
                    PipelineError::new(format!(
                        "no compatible sink pads on {} for {}",
                        consumer, stream
                    ))
                } else {
                    PipelineError::new(format!(
                        "ambiguous connection point: {} has {} sink pads for {}",
                        consumer,
                        pads.len(),
                        stream
                    ))
                });
            }
        };

        let sink = PadRef::new(target, pad_name);
        if let Some(peer) = self.graph.peer(&sink) {
            return match self.graph.node(peer.node).map(|n| &n.kind) {
                Some(NodeKind::BufferingLink { consumer: owner, .. })
                    if *owner == consumer.id() =>
                {
                    Ok(peer.node)
                }
                _ => Err(PipelineError::new(format!(
                    "{} for {} is already linked to {}",
                    sink, stream, peer
                ))),
            };
        }
        let node = GraphNode::new(
            format!("queue-{}-{}", consumer.name(), stream.kind),
            NodeKind::BufferingLink {
                consumer: consumer.id(),
                stream: stream.clone(),
                limits: self.config.buffering.clone(),
            },
            vec![
                Pad::sink("sink", stream.caps.clone()),
                Pad::src("src", Caps::any()),
            ],
        );
        let queue = self.attach(node)?;
        if let Err(e) = self.link_pads(&PadRef::new(queue, "src"), &sink) {
            self.detach(queue);
            return Err(e);
        }

        self.buffering_links
            .insert((consumer.id(), stream.clone()), queue);
        tracing::debug!(
            "[GraphManager] Created buffering link {} before {}",
            queue,
            sink
        );
        Ok(queue)
    }

    /// Remove the buffering link for (`consumer`, `stream`) and release the
    /// fan-out pad feeding it.
    pub fn release_buffering_link(
        &mut self,
        consumer: &Component,
        stream: &MediaStream,
    ) -> Result<()> {
        self.require_topology_changes("release a buffering link")?;
        let key = (consumer.id(), stream.clone());
        let Some(&node) = self.buffering_links.get(&key) else {
            return Ok(());
        };
        self.remove_buffering_link(&key, node);
        Ok(())
    }

    pub fn buffering_links(&self) -> Vec<(StreamKey, NodeId)> {
        sorted_entries(&self.buffering_links)
    }

    /// Feed `buffering_link` from a new request pad on `fan_out`.
    pub fn connect(&mut self, fan_out: NodeId, buffering_link: NodeId) -> Result<LinkId> {
        match self.graph.node(fan_out).map(|n| &n.kind) {
            Some(NodeKind::FanOut { .. }) => {}
            Some(_) => {
                return Err(PipelineError::new(format!("{} is not a fan-out", fan_out)));
            }
            None => {
                return Err(PipelineError::new(format!("{} is not in the graph", fan_out)));
            }
        }
        match self.graph.node(buffering_link).map(|n| &n.kind) {
            Some(NodeKind::BufferingLink { .. }) => {}
            Some(_) => {
                return Err(PipelineError::new(format!(
                    "{} is not a buffering link",
                    buffering_link
                )));
            }
            None => {
                return Err(PipelineError::new(format!(
                    "{} is not in the graph",
                    buffering_link
                )));
            }
        }
        let sink = PadRef::new(buffering_link, "sink");
        if self.graph.is_linked(&sink) {
            return Err(PipelineError::new(format!("{} is already connected", sink)));
        }

        let src = self.graph.request_pad(fan_out)?;
        match self.link_pads(&src, &sink) {
            Ok(link) => {
                tracing::debug!("[GraphManager] Connected {} -> {}", src, sink);
                Ok(link)
            }
            Err(e) => {
                if let Err(release) = self.graph.release_request_pad(&src) {
                    tracing::warn!("[GraphManager] {}", release);
                }
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn require_producer(&self, component: &Component) -> Result<()> {
        self.require_registered(component)?;
        if !component.is_producer() {
            return Err(PipelineError::new(format!("{} isn't a producer", component)));
        }
        Ok(())
    }

    fn require_consumer(&self, component: &Component) -> Result<()> {
        self.require_registered(component)?;
        if !component.is_consumer() {
            return Err(PipelineError::new(format!("{} isn't a consumer", component)));
        }
        Ok(())
    }

    pub(super) fn watch(&mut self, producer: &Component) {
        if self.watched.insert(producer.id()) {
            tracing::trace!("[GraphManager] Watching pads of {}", producer);
        }
    }

    fn unwatch(&mut self, producer: &Component) {
        if self.watched.remove(&producer.id()) {
            tracing::trace!("[GraphManager] Stopped watching pads of {}", producer);
        }
    }

    fn pad_caps(&self, pad: &PadRef) -> Caps {
        self.graph
            .node(pad.node)
            .and_then(|n| n.pad(&pad.pad))
            .map(|p| p.caps.clone())
            .unwrap_or_else(Caps::any)
    }

    /// Add a node to the graph and the backend, undoing the graph insert if
    /// the backend refuses.
    fn attach(&mut self, node: GraphNode) -> Result<NodeId> {
        let id = self.graph.add_node(node);
        let attached = match self.graph.node(id) {
            Some(weight) => self.backend.attach_node(id, weight),
            None => Err(PipelineError::new(format!("{} vanished from the graph", id))),
        };
        if let Err(e) = attached {
            self.graph.remove_node(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Unlink every link on `node`, then remove it from backend and graph.
    fn detach(&mut self, node: NodeId) -> Option<GraphNode> {
        let mut links = self.graph.incoming_links(node);
        links.extend(self.graph.outgoing_links(node));
        for (src, sink) in links {
            self.unlink_pads(&src, &sink);
        }
        self.backend.detach_node(node);
        self.graph.remove_node(node)
    }

    fn link_pads(&mut self, src: &PadRef, sink: &PadRef) -> Result<LinkId> {
        let link = self.graph.link(src, sink)?;
        if let Err(e) = self.backend.link(src, sink) {
            if let Err(undo) = self.graph.unlink(src, sink) {
                tracing::warn!("[GraphManager] {}", undo);
            }
            return Err(e);
        }
        Ok(link)
    }

    fn unlink_pads(&mut self, src: &PadRef, sink: &PadRef) {
        self.backend.unlink(src, sink);
        if let Err(e) = self.graph.unlink(src, sink) {
            tracing::warn!("[GraphManager] {}", e);
        }
    }

    fn remove_fan_out(&mut self, key: &StreamKey, node: NodeId) {
        self.fan_outs.remove(key);
        self.detach(node);
        tracing::debug!("[GraphManager] Removed fan-out {}", node);
    }

    fn remove_buffering_link(&mut self, key: &StreamKey, node: NodeId) {
        self.buffering_links.remove(key);

        // Give the feeding request pad back to its fan-out
        let sink = PadRef::new(node, "sink");
        if let Some(upstream) = self.graph.peer(&sink) {
            self.unlink_pads(&upstream, &sink);
            if let Err(e) = self.graph.release_request_pad(&upstream) {
                tracing::warn!("[GraphManager] {}", e);
            }
        }

        self.detach(node);
        tracing::debug!("[GraphManager] Removed buffering link {}", node);
    }

    /// Remove every node built for `component`, regardless of what still
    /// depends on it.
    pub(super) fn teardown_component_nodes(&mut self, component: &Component) {
        let id = component.id();

        let queues: Vec<_> = self
            .buffering_links
            .iter()
            .filter(|((owner, _), _)| *owner == id)
            .map(|(key, node)| (key.clone(), *node))
            .collect();
        for (key, node) in queues {
            self.remove_buffering_link(&key, node);
        }

        let tees: Vec<_> = self
            .fan_outs
            .iter()
            .filter(|((owner, _), _)| *owner == id)
            .map(|(key, node)| (key.clone(), *node))
            .collect();
        for (key, node) in tees {
            self.remove_fan_out(&key, node);
        }

        if let Some(&node) = self.subgraphs.get(&id) {
            self.teardown_subgraph(component, node);
        }
        self.unwatch(component);
    }
}

fn sorted_entries(map: &std::collections::HashMap<StreamKey, NodeId>) -> Vec<(StreamKey, NodeId)> {
    let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by_key(|(_, node)| *node);
    entries
}
