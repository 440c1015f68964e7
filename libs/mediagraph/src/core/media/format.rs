// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// One second in the `Time` format (nanoseconds).
pub const SECOND: i64 = 1_000_000_000;

/// One millisecond in the `Time` format.
pub const MSECOND: i64 = 1_000_000;

/// Unit of positions, durations and seek targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Nanoseconds.
    #[default]
    Time,
    Bytes,
    /// Element-specific units (frames, samples).
    Default,
    /// Parts per million of the total.
    Percent,
}

bitflags! {
    /// Flags passed along with a seek request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SeekFlags: u32 {
        /// Discard data in flight before the seek takes effect.
        const FLUSH = 1 << 0;
        const ACCURATE = 1 << 1;
        const KEY_UNIT = 1 << 2;
    }
}
