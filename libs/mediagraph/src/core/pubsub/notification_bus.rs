// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ordered, single-threaded notification fan-out.
//!
//! Listeners are held weakly and dropped once their owner lets go. Channel
//! subscribers are pruned when the receiving side closes.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use super::notifications::{Notification, PipelineListener};
use crate::core::error::{PipelineError, Result};

/// Listener that forwards into an unbounded channel.
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PipelineListener for ChannelListener {
    fn on_notification(&mut self, notification: &Notification) -> Result<()> {
        self.sender
            .send(notification.clone())
            .map_err(|_| PipelineError::new("notification receiver closed"))
    }
}

enum Subscriber {
    Listener(Weak<Mutex<dyn PipelineListener>>),
    Channel(ChannelListener),
}

impl Subscriber {
    fn is_alive(&self) -> bool {
        match self {
            Self::Listener(weak) => weak.strong_count() > 0,
            Self::Channel(channel) => !channel.is_closed(),
        }
    }
}

#[derive(Default)]
pub struct NotificationBus {
    subscribers: Vec<Subscriber>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener. The bus only keeps a weak reference.
    pub fn subscribe(&mut self, listener: Arc<Mutex<dyn PipelineListener>>) {
        self.subscribers
            .push(Subscriber::Listener(Arc::downgrade(&listener)));
    }

    /// Subscribe through a channel; dropping the receiver unsubscribes.
    pub fn subscribe_channel(&mut self) -> mpsc::UnboundedReceiver<Notification> {
        let (listener, receiver) = ChannelListener::new();
        self.subscribers.push(Subscriber::Channel(listener));
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|s| s.is_alive()).count()
    }

    /// Deliver `notification` to every live subscriber, in subscription order.
    pub fn emit(&mut self, notification: Notification) {
        tracing::trace!("[NotificationBus] {}", notification.name());
        self.subscribers.retain(Subscriber::is_alive);

        for subscriber in &mut self.subscribers {
            let result = match subscriber {
                Subscriber::Listener(weak) => match weak.upgrade() {
                    Some(listener) => listener.lock().on_notification(&notification),
                    None => Ok(()),
                },
                Subscriber::Channel(channel) => channel.on_notification(&notification),
            };
            if let Err(e) = result {
                tracing::warn!(
                    "[NotificationBus] Listener failed on '{}': {}",
                    notification.name(),
                    e
                );
            }
        }
    }
}
