// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod caps;
mod format;
mod stream;

pub use caps::{Caps, CapsStructure, CapsValue};
pub use format::{Format, SeekFlags, MSECOND, SECOND};
pub use stream::{pad_compatible_stream, resolve_stream_from_caps, MediaStream, StreamKind};
