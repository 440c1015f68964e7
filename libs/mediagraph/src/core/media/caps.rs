// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Capability sets attached to pads and streams.
//!
//! A `Caps` is either ANY or a list of structures. Two caps are compatible
//! when at least one pair of structures shares a media type and agrees on
//! every field both of them carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapsValue {
    Int(i64),
    IntRange { min: i64, max: i64 },
    Fraction(i32, i32),
    Str(String),
}

impl CapsValue {
    pub fn intersects(&self, other: &CapsValue) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(v), Self::IntRange { min, max })
            | (Self::IntRange { min, max }, Self::Int(v)) => min <= v && v <= max,
            (Self::IntRange { min: a0, max: a1 }, Self::IntRange { min: b0, max: b1 }) => {
                a0 <= b1 && b0 <= a1
            }
            (Self::Fraction(_, 0), _) | (_, Self::Fraction(_, 0)) => false,
            // Compare cross-multiplied so 30/1 and 60/2 agree
            (Self::Fraction(an, ad), Self::Fraction(bn, bd)) => {
                i64::from(*an) * i64::from(*bd) == i64::from(*bn) * i64::from(*ad)
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            return Ok(Self::Int(v));
        }
        if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            if let Some((min, max)) = inner.split_once(',') {
                if let (Ok(min), Ok(max)) = (min.trim().parse::<i64>(), max.trim().parse::<i64>()) {
                    return Ok(Self::IntRange { min, max });
                }
            }
        }
        if let Some((num, den)) = raw.split_once('/') {
            if let (Ok(n), Ok(d)) = (num.trim().parse::<i32>(), den.trim().parse::<i32>()) {
                if d == 0 {
                    return Err(PipelineError::new(format!(
                        "Fraction '{}' has a zero denominator",
                        raw
                    )));
                }
                return Ok(Self::Fraction(n, d));
            }
        }
        Ok(Self::Str(raw.to_string()))
    }
}

impl std::fmt::Display for CapsValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::IntRange { min, max } => write!(f, "[ {}, {} ]", min, max),
            Self::Fraction(n, d) => write!(f, "{}/{}", n, d),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A media type (e.g. `video/x-raw`) with optional typed fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapsStructure {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, CapsValue>,
}

impl CapsStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn intersects(&self, other: &CapsStructure) -> bool {
        if self.name != other.name {
            return false;
        }
        self.fields.iter().all(|(key, value)| {
            other
                .fields
                .get(key)
                .is_none_or(|theirs| value.intersects(theirs))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Caps {
    #[serde(default)]
    any: bool,
    #[serde(default)]
    structures: Vec<CapsStructure>,
}

impl Caps {
    /// Caps that are compatible with everything.
    pub fn any() -> Self {
        Self {
            any: true,
            structures: Vec::new(),
        }
    }

    /// Caps compatible with nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Caps with a single structure and no fields.
    pub fn new_simple(media_type: impl Into<String>) -> Self {
        Self {
            any: false,
            structures: vec![CapsStructure::new(media_type)],
        }
    }

    /// Add a field to the last structure.
    pub fn field(mut self, key: impl Into<String>, value: CapsValue) -> Self {
        if let Some(last) = self.structures.last_mut() {
            last.fields.insert(key.into(), value);
        }
        self
    }

    /// Append another structure.
    pub fn with_structure(mut self, structure: CapsStructure) -> Self {
        self.any = false;
        self.structures.push(structure);
        self
    }

    pub fn is_any(&self) -> bool {
        self.any
    }

    pub fn is_empty(&self) -> bool {
        !self.any && self.structures.is_empty()
    }

    pub fn structures(&self) -> &[CapsStructure] {
        &self.structures
    }

    /// Media type of the first structure, if any.
    pub fn media_type(&self) -> Option<&str> {
        self.structures.first().map(|s| s.name.as_str())
    }

    pub fn can_intersect(&self, other: &Caps) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.any || other.any {
            return true;
        }
        self.structures
            .iter()
            .any(|ours| other.structures.iter().any(|theirs| ours.intersects(theirs)))
    }
}

impl std::fmt::Display for Caps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.any {
            return write!(f, "ANY");
        }
        if self.structures.is_empty() {
            return write!(f, "EMPTY");
        }
        let rendered: Vec<String> = self
            .structures
            .iter()
            .map(|s| {
                let mut out = s.name.clone();
                for (key, value) in &s.fields {
                    out.push_str(&format!(", {}={}", key, value));
                }
                out
            })
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// Parses `"video/x-raw, width=320, framerate=30/1; audio/x-raw"`.
///
/// Values parse as integers, `[min, max]` ranges, fractions, then strings.
/// `ANY` and `EMPTY` are recognized verbatim.
impl FromStr for Caps {
    type Err = PipelineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "ANY" => return Ok(Self::any()),
            "EMPTY" | "" => return Ok(Self::empty()),
            _ => {}
        }

        let mut caps = Self::empty();
        for raw_structure in s.split(';') {
            let mut parts = split_fields(raw_structure).into_iter();
            let name = parts.next().map(str::trim).unwrap_or_default();
            if name.is_empty() || !name.contains('/') {
                return Err(PipelineError::new(format!(
                    "Invalid caps structure name '{}' in '{}'",
                    name, s
                )));
            }
            let mut structure = CapsStructure::new(name);
            for field in parts {
                let (key, value) = field.split_once('=').ok_or_else(|| {
                    PipelineError::new(format!("Invalid caps field '{}' in '{}'", field.trim(), s))
                })?;
                structure
                    .fields
                    .insert(key.trim().to_string(), CapsValue::parse(value)?);
            }
            caps = caps.with_structure(structure);
        }
        Ok(caps)
    }
}

/// Split on commas that are not inside a `[min, max]` range.
fn split_fields(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}
