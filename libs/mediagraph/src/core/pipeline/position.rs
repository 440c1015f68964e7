// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;
use tokio::time::Instant;

use crate::core::state::ReadinessState;

/// Periodic position polling, armed only while Paused or Playing.
///
/// The poller holds a deadline; whoever drives the pipeline sleeps until it
/// and then calls [`Pipeline::poll_position`](super::Pipeline::poll_position).
#[derive(Debug, Clone)]
pub struct PositionPoller {
    enabled: bool,
    interval: Duration,
    deadline: Option<Instant>,
}

impl PositionPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            enabled: false,
            interval,
            deadline: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `false` if polling was already enabled.
    pub fn enable(&mut self, interval: Duration, state: ReadinessState) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        self.interval = interval;
        self.follow_state(state);
        true
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.deadline = None;
    }

    /// Stop the timer but stay enabled.
    pub fn suspend(&mut self) {
        self.deadline = None;
    }

    /// Arm or disarm according to `state`. A no-op while disabled.
    pub fn follow_state(&mut self, state: ReadinessState) {
        if !self.enabled || !state.is_active() {
            self.deadline = None;
        } else if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.interval);
        }
    }

    /// Whether a poll is due at `now`. Reschedules the next one if so.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}
