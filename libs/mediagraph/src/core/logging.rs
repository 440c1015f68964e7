// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Tracing subscriber setup for binaries and tests embedding the engine.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a stdout `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"mediagraph=debug"`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_directive: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
