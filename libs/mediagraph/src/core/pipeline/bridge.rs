// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Dispatch of backend bus messages, in delivery order.

use std::ops::ControlFlow;

use super::link_context::LinkContext;
use super::Pipeline;
use crate::core::bus::{BusMessage, BusReceiver, MessageSource};
use crate::core::error::FatalError;
use crate::core::graph::{NodeId, NodeKind, Pad, PadDirection};
use crate::core::media::{resolve_stream_from_caps, Format};
use crate::core::pubsub::Notification;

impl Pipeline {
    /// Handle one bus message.
    ///
    /// `Break` carries a condition the pipeline cannot recover from; stop
    /// dispatching when it is returned.
    pub fn handle_bus_message(&mut self, message: BusMessage) -> ControlFlow<FatalError> {
        tracing::trace!("[Bridge] {} {:?}", self.id, message.name());
        match message {
            BusMessage::Eos => {
                tracing::info!("[Bridge] {} reached end of stream", self.id);
                self.emit(Notification::Eos);
            }
            BusMessage::StateChanged {
                source: MessageSource::Pipeline,
                old,
                new,
                pending,
            } => {
                tracing::debug!(
                    "[Bridge] {} state {} -> {} (pending {:?})",
                    self.id,
                    old,
                    new,
                    pending
                );
                if pending.is_none() {
                    self.settle_state(new);
                }
            }
            BusMessage::StateChanged { .. } => {}
            BusMessage::Error {
                source,
                message,
                debug,
            } => {
                tracing::error!("[Bridge] {} error from {}: {}", self.id, source, message);
                self.emit(Notification::Error {
                    message,
                    detail: debug,
                    source: source.to_string(),
                });
            }
            BusMessage::Warning {
                source,
                message,
                debug,
            } => {
                tracing::warn!("[Bridge] {} warning from {}: {}", self.id, source, message);
                self.emit(Notification::Warning {
                    message,
                    detail: debug,
                    source: source.to_string(),
                });
            }
            BusMessage::DurationChanged => match self.backend.query_duration(Format::Time) {
                Some(duration) => self.emit(Notification::DurationChanged { duration }),
                None => tracing::debug!("[Bridge] {} duration still unknown", self.id),
            },
            BusMessage::PadAdded { node, pad } => self.on_pad_added(node, pad),
            BusMessage::PadRemoved { node, pad } => {
                tracing::error!("[Bridge] {} pad {} removed from {}", self.id, pad, node);
                return ControlFlow::Break(FatalError::ConnectionPointRemoved { node, pad });
            }
        }
        ControlFlow::Continue(())
    }

    /// Dispatch everything already queued on `bus` without waiting.
    pub fn dispatch_pending(&mut self, bus: &mut BusReceiver) -> ControlFlow<FatalError> {
        while let Ok(message) = bus.try_recv() {
            self.handle_bus_message(message)?;
        }
        ControlFlow::Continue(())
    }

    fn on_pad_added(&mut self, node: NodeId, pad: Pad) {
        let owner = match self.graph.node(node).map(|n| &n.kind) {
            Some(NodeKind::Subgraph { component }) => *component,
            Some(_) => {
                tracing::warn!("[Bridge] New pad {} on {} which is not a subgraph", pad.name, node);
                return;
            }
            None => {
                tracing::debug!("[Bridge] Dropping pad {} of removed {}", pad.name, node);
                return;
            }
        };
        let is_src = pad.direction == PadDirection::Src;
        let stream = resolve_stream_from_caps(&pad.caps, Some(&pad.name));

        if let Err(e) = self.graph.add_pad(node, pad) {
            tracing::warn!("[Bridge] {}", e);
            return;
        }
        if !is_src || !self.watched.contains(&owner) {
            return;
        }
        let Some(producer) = self.components.iter().find(|c| c.id() == owner).cloned() else {
            return;
        };
        tracing::debug!("[Bridge] {} discovered {}", producer, stream);

        let claimants: Vec<_> = self
            .actions
            .iter()
            .filter(|a| a.claims_producer(&producer))
            .cloned()
            .collect();

        let mut handled = false;
        for action in claimants {
            let mut ctx = LinkContext::new(self);
            handled |= action
                .lock()
                .handle_new_stream(&mut ctx, &producer, &stream);
        }

        if !handled {
            tracing::debug!("[Bridge] No action handled {}", stream);
            self.emit(Notification::UnhandledStream {
                component: producer.id(),
                stream,
            });
        }
    }
}
