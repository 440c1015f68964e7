// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::HashMap;
use petgraph::Direction;

use crate::core::error::{PipelineError, Result};
use crate::core::media::{pad_compatible_stream, MediaStream};

use super::link::{GraphLink, LinkId, PadRef};
use super::node::{GraphNode, NodeId, NodeKind, Pad, PadDirection, PadPresence};

/// Running topology: subgraph instances, fan-outs and buffering links
/// joined pad to pad.
///
/// A pad carries at most one link. Node ids stay valid across removals of
/// other nodes; ids of removed nodes resolve to nothing.
#[derive(Debug, Default)]
pub struct Graph {
    graph: StableDiGraph<GraphNode, GraphLink>,
    /// Current occupant of each live slot.
    ids: HashMap<NodeIndex, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        let id = NodeId::generate(self.graph.add_node(node));
        self.ids.insert(id.index, id);
        id
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let index = self.resolve(id)?;
        self.ids.remove(&index);
        self.graph.remove_node(index)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.resolve(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.graph.node_weight(self.resolve(id)?)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.graph
            .node_indices()
            .filter_map(move |idx| Some((*self.ids.get(&idx)?, &self.graph[idx])))
    }

    /// Slot of `id`, unless the node was removed.
    fn resolve(&self, id: NodeId) -> Option<NodeIndex> {
        (self.ids.get(&id.index) == Some(&id)).then_some(id.index)
    }

    fn id_at(&self, index: NodeIndex) -> Option<NodeId> {
        self.ids.get(&index).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut GraphNode> {
        self.resolve(id)
            .and_then(|index| self.graph.node_weight_mut(index))
            .ok_or_else(|| PipelineError::new(format!("{} is not in the graph", id)))
    }

    fn node_ref(&self, id: NodeId) -> Result<&GraphNode> {
        self.node(id)
            .ok_or_else(|| PipelineError::new(format!("{} is not in the graph", id)))
    }

    fn pad_of(&self, pad: &PadRef) -> Result<&Pad> {
        self.node_ref(pad.node)?
            .pad(&pad.pad)
            .ok_or_else(|| PipelineError::new(format!("No pad {}", pad)))
    }

    pub fn add_pad(&mut self, node: NodeId, pad: Pad) -> Result<()> {
        let weight = self.node_mut(node)?;
        if weight.pad(&pad.name).is_some() {
            return Err(PipelineError::new(format!(
                "{} already has a pad named '{}'",
                node, pad.name
            )));
        }
        weight.pads.push(pad);
        Ok(())
    }

    /// Remove a pad, dropping its link if it has one.
    pub fn remove_pad(&mut self, node: NodeId, name: &str) -> Result<Pad> {
        let pad_ref = PadRef::new(node, name);
        self.pad_of(&pad_ref)?;
        if let Some((edge, _, _)) = self.edge_for_pad(&pad_ref) {
            self.graph.remove_edge(edge);
        }
        let weight = self.node_mut(node)?;
        let index = weight
            .pads
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| PipelineError::new(format!("No pad {}", pad_ref)))?;
        Ok(weight.pads.remove(index))
    }

    /// Create a new `src_N` request pad on a fan-out node.
    pub fn request_pad(&mut self, node: NodeId) -> Result<PadRef> {
        let weight = self.node_mut(node)?;
        let NodeKind::FanOut { stream, .. } = &weight.kind else {
            return Err(PipelineError::new(format!(
                "{} ({}) does not provide request pads",
                node,
                weight.kind.label()
            )));
        };
        let caps = stream.caps.clone();
        let name = weight.next_request_pad_name();
        weight
            .pads
            .push(Pad::src(name.clone(), caps).with_presence(PadPresence::Request));
        Ok(PadRef::new(node, name))
    }

    pub fn release_request_pad(&mut self, pad: &PadRef) -> Result<()> {
        if self.pad_of(pad)?.presence != PadPresence::Request {
            return Err(PipelineError::new(format!("{} is not a request pad", pad)));
        }
        self.remove_pad(pad.node, &pad.pad)?;
        Ok(())
    }

    /// Link a src pad to a sink pad.
    ///
    /// Both pads must exist, face the right way, be unlinked and have
    /// intersecting caps.
    pub fn link(&mut self, src: &PadRef, sink: &PadRef) -> Result<LinkId> {
        let src_pad = self.pad_of(src)?;
        let sink_pad = self.pad_of(sink)?;

        if src_pad.direction != PadDirection::Src {
            return Err(PipelineError::new(format!(
                "Source pad {} must be a src pad",
                src
            )));
        }
        if sink_pad.direction != PadDirection::Sink {
            return Err(PipelineError::new(format!(
                "Destination pad {} must be a sink pad",
                sink
            )));
        }
        if !src_pad.caps.can_intersect(&sink_pad.caps) {
            return Err(PipelineError::new(format!(
                "Incompatible caps between {} ({}) and {} ({})",
                src, src_pad.caps, sink, sink_pad.caps
            )));
        }
        for pad in [src, sink] {
            if self.edge_for_pad(pad).is_some() {
                return Err(PipelineError::new(format!("{} is already linked", pad)));
            }
        }

        let id = LinkId::generate();
        self.graph.add_edge(
            src.node.index,
            sink.node.index,
            GraphLink {
                id,
                src_pad: src.pad.clone(),
                sink_pad: sink.pad.clone(),
            },
        );
        Ok(id)
    }

    pub fn unlink(&mut self, src: &PadRef, sink: &PadRef) -> Result<GraphLink> {
        let (edge, _, _) = self
            .edge_for_pad(src)
            .filter(|&(e, _, target)| {
                self.id_at(target) == Some(sink.node) && self.graph[e].sink_pad == sink.pad
            })
            .ok_or_else(|| PipelineError::new(format!("{} is not linked to {}", src, sink)))?;
        self.graph
            .remove_edge(edge)
            .ok_or_else(|| PipelineError::new(format!("{} is not linked to {}", src, sink)))
    }

    /// The pad on the other end of `pad`'s link.
    pub fn peer(&self, pad: &PadRef) -> Option<PadRef> {
        let (edge, source, target) = self.edge_for_pad(pad)?;
        let link = &self.graph[edge];
        if source == pad.node.index && link.src_pad == pad.pad {
            Some(PadRef::new(self.id_at(target)?, link.sink_pad.clone()))
        } else {
            Some(PadRef::new(self.id_at(source)?, link.src_pad.clone()))
        }
    }

    /// Links leaving `node` as (local src pad, remote sink pad).
    pub fn outgoing_links(&self, node: NodeId) -> Vec<(PadRef, PadRef)> {
        let Some(index) = self.resolve(node) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|e| {
                Some((
                    PadRef::new(node, e.weight().src_pad.clone()),
                    PadRef::new(self.id_at(e.target())?, e.weight().sink_pad.clone()),
                ))
            })
            .collect()
    }

    /// Links entering `node` as (remote src pad, local sink pad).
    pub fn incoming_links(&self, node: NodeId) -> Vec<(PadRef, PadRef)> {
        let Some(index) = self.resolve(node) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Incoming)
            .filter_map(|e| {
                Some((
                    PadRef::new(self.id_at(e.source())?, e.weight().src_pad.clone()),
                    PadRef::new(node, e.weight().sink_pad.clone()),
                ))
            })
            .collect()
    }

    pub fn is_linked(&self, pad: &PadRef) -> bool {
        self.edge_for_pad(pad).is_some()
    }

    /// Non-request src pads of `node` that can carry `stream`, linked or not.
    pub fn find_compatible_outgoing_pads(&self, node: NodeId, stream: &MediaStream) -> Vec<String> {
        self.find_compatible_pads(node, PadDirection::Src, stream)
    }

    /// Sink pads of `node` that can accept `stream`, linked or not.
    pub fn find_compatible_incoming_pads(&self, node: NodeId, stream: &MediaStream) -> Vec<String> {
        self.find_compatible_pads(node, PadDirection::Sink, stream)
    }

    fn find_compatible_pads(
        &self,
        node: NodeId,
        direction: PadDirection,
        stream: &MediaStream,
    ) -> Vec<String> {
        let Some(weight) = self.node(node) else {
            return Vec::new();
        };
        weight
            .pads
            .iter()
            .filter(|p| p.direction == direction && p.presence != PadPresence::Request)
            .filter(|p| pad_compatible_stream(&p.name, &p.caps, stream))
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph mediagraph {\n");
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            out.push_str(&format!(
                "    n{} [label=\"{}\\n{}\"];\n",
                idx.index(),
                node.name,
                node.kind.label()
            ));
        }
        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "    n{} -> n{} [label=\"{} -> {}\"];\n",
                edge.source().index(),
                edge.target().index(),
                edge.weight().src_pad,
                edge.weight().sink_pad
            ));
        }
        out.push('}');
        out.push('\n');
        out
    }

    /// The link on `pad` as (edge, source node, target node).
    fn edge_for_pad(&self, pad: &PadRef) -> Option<(EdgeIndex, NodeIndex, NodeIndex)> {
        let direction = self.pad_of(pad).ok()?.direction;
        let index = pad.node.index;
        let edge = match direction {
            PadDirection::Src => self
                .graph
                .edges_directed(index, Direction::Outgoing)
                .find(|e| e.weight().src_pad == pad.pad),
            PadDirection::Sink => self
                .graph
                .edges_directed(index, Direction::Incoming)
                .find(|e| e.weight().sink_pad == pad.pad),
        }?;
        Some((edge.id(), edge.source(), edge.target()))
    }
}
