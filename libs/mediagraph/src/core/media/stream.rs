// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::caps::Caps;

/// Coarse media category derived from the caps media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Audio,
    Video,
    Text,
    Unknown,
}

impl StreamKind {
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type.split('/').next() {
            Some("audio") => Self::Audio,
            Some("video") | Some("image") => Self::Video,
            Some("text") | Some("subtitle") => Self::Text,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
            Self::Text => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Logical, typed stream descriptor.
///
/// Producers discover these at runtime; consumers declare one up front. When
/// `pad_name` is set the stream refers to that exact connection point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaStream {
    pub kind: StreamKind,
    pub caps: Caps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_name: Option<String>,
}

impl MediaStream {
    pub fn new(kind: StreamKind, caps: Caps) -> Self {
        Self {
            kind,
            caps,
            pad_name: None,
        }
    }

    /// Any raw video.
    pub fn video() -> Self {
        Self::new(StreamKind::Video, Caps::new_simple("video/x-raw"))
    }

    /// Any raw audio.
    pub fn audio() -> Self {
        Self::new(StreamKind::Audio, Caps::new_simple("audio/x-raw"))
    }

    pub fn with_pad_name(mut self, pad_name: impl Into<String>) -> Self {
        self.pad_name = Some(pad_name.into());
        self
    }
}

impl std::fmt::Display for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pad_name {
            Some(pad) => write!(f, "{}({}) @ {}", self.kind, self.caps, pad),
            None => write!(f, "{}({})", self.kind, self.caps),
        }
    }
}

/// Build the stream descriptor for a newly discovered connection point.
pub fn resolve_stream_from_caps(caps: &Caps, pad_name: Option<&str>) -> MediaStream {
    let kind = caps
        .media_type()
        .map(StreamKind::from_media_type)
        .unwrap_or(StreamKind::Unknown);
    MediaStream {
        kind,
        caps: caps.clone(),
        pad_name: pad_name.map(str::to_string),
    }
}

/// Whether a pad named `pad_name` with `pad_caps` can carry `stream`.
pub fn pad_compatible_stream(pad_name: &str, pad_caps: &Caps, stream: &MediaStream) -> bool {
    match &stream.pad_name {
        Some(wanted) => wanted == pad_name,
        None => pad_caps.can_intersect(&stream.caps),
    }
}
