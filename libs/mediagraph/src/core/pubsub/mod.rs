// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod notification_bus;
mod notifications;

pub use notification_bus::{ChannelListener, NotificationBus};
pub use notifications::{Notification, PipelineListener};
