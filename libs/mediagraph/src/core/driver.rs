// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Single-task event loop feeding bus messages and poll deadlines into a
//! shared pipeline.

use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::bus::BusReceiver;
use crate::core::error::FatalError;
use crate::core::pipeline::Pipeline;

pub struct PipelineDriver {
    pipeline: Arc<Mutex<Pipeline>>,
    bus: BusReceiver,
    cancel: CancellationToken,
}

impl PipelineDriver {
    pub fn new(pipeline: Arc<Mutex<Pipeline>>, bus: BusReceiver) -> Self {
        Self {
            pipeline,
            bus,
            cancel: CancellationToken::new(),
        }
    }

    pub fn pipeline(&self) -> Arc<Mutex<Pipeline>> {
        Arc::clone(&self.pipeline)
    }

    /// Cancel this token to stop [`run`](Self::run).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dispatch until cancelled, the bus closes, or a fatal error is
    /// reported.
    ///
    /// Bus messages take priority over the poll timer so a state change is
    /// observed before the poll that would follow it.
    pub async fn run(mut self) -> Result<(), FatalError> {
        let id = self.pipeline.lock().id();
        tracing::info!("[Driver] Starting for {}", id);

        loop {
            let deadline = self.pipeline.lock().next_position_poll();

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    tracing::info!("[Driver] {} cancelled", id);
                    return Ok(());
                }
                message = self.bus.recv() => {
                    let Some(message) = message else {
                        tracing::info!("[Driver] {} bus closed", id);
                        return Ok(());
                    };
                    let flow = self.pipeline.lock().handle_bus_message(message);
                    if let ControlFlow::Break(fatal) = flow {
                        tracing::error!("[Driver] {} stopping: {}", id, fatal);
                        return Err(fatal);
                    }
                }
                _ = sleep_until(deadline) => {
                    self.pipeline.lock().poll_position();
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
