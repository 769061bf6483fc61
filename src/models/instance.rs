// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Bounding-box instance records.
//!
//! An [`Instance`] is one observation of a tracked object at one video
//! frame. Instances are addressed by [`Position`], which is only valid
//! until the next mutation of the owning store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A coordinate value as read from the annotation file.
///
/// Integers and decimals are kept apart so that a file written back out
/// keeps the representation it was read with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Parse an integer, falling back to a decimal.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(v) = text.parse::<i64>() {
            return Some(Number::Int(v));
        }
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(Number::Float(v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Int(v) => write!(f, "{v}"),
            // keep a decimal point so the value reads back as a float
            Number::Float(v) if v.fract() == 0.0 => write!(f, "{v:.1}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

/// Address of an instance inside a store: `(track_id, instance_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub track_id: usize,
    pub instance_id: usize,
}

impl Position {
    pub fn new(track_id: usize, instance_id: usize) -> Self {
        Self {
            track_id,
            instance_id,
        }
    }
}

impl From<(usize, usize)> for Position {
    fn from((track_id, instance_id): (usize, usize)) -> Self {
        Self::new(track_id, instance_id)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.track_id, self.instance_id)
    }
}

/// One bounding box of one tracked object at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub track_id: usize,
    pub object_class: String,
    /// Position within the owning tracked object.
    pub instance_id: usize,
    pub x1: Number,
    pub y1: Number,
    pub x2: Number,
    pub y2: Number,
    pub frame_id: usize,
    /// One value per tag category.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Instance {
    /// Instance id meaning "append after the last instance".
    pub const APPEND: usize = usize::MAX;

    /// Create an instance that will be appended to its tracked object.
    pub fn new(
        track_id: usize,
        object_class: impl Into<String>,
        frame_id: usize,
        bbox: [Number; 4],
    ) -> Self {
        let [x1, y1, x2, y2] = bbox;
        Self {
            track_id,
            object_class: object_class.into(),
            instance_id: Self::APPEND,
            x1,
            y1,
            x2,
            y2,
            frame_id,
            tags: BTreeMap::new(),
        }
    }

    /// Request insertion at `instance_id` instead of appending.
    pub fn at(mut self, instance_id: usize) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn with_tag(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(category.into(), value.into());
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.track_id, self.instance_id)
    }

    /// Box corners as `[x1, y1, x2, y2]`.
    pub fn bbox(&self) -> [f64; 4] {
        [
            self.x1.as_f64(),
            self.y1.as_f64(),
            self.x2.as_f64(),
            self.y2.as_f64(),
        ]
    }

    pub fn width(&self) -> f64 {
        (self.x2.as_f64() - self.x1.as_f64()).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2.as_f64() - self.y1.as_f64()).abs()
    }
}

/// A partial update addressed to an existing instance.
///
/// Unset fields keep the current value; tags are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstancePatch {
    pub track_id: usize,
    pub instance_id: usize,
    pub x1: Option<Number>,
    pub y1: Option<Number>,
    pub x2: Option<Number>,
    pub y2: Option<Number>,
    pub frame_id: Option<usize>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl InstancePatch {
    pub fn new(position: impl Into<Position>) -> Self {
        let position = position.into();
        Self {
            track_id: position.track_id,
            instance_id: position.instance_id,
            ..Default::default()
        }
    }

    pub fn bbox(mut self, x1: Number, y1: Number, x2: Number, y2: Number) -> Self {
        self.x1 = Some(x1);
        self.y1 = Some(y1);
        self.x2 = Some(x2);
        self.y2 = Some(y2);
        self
    }

    pub fn frame(mut self, frame_id: usize) -> Self {
        self.frame_id = Some(frame_id);
        self
    }

    pub fn tag(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(category.into(), value.into());
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.track_id, self.instance_id)
    }

    /// Produce the replacement instance from the current one.
    pub fn apply(&self, base: &Instance) -> Instance {
        let mut out = base.clone();
        out.x1 = self.x1.unwrap_or(base.x1);
        out.y1 = self.y1.unwrap_or(base.y1);
        out.x2 = self.x2.unwrap_or(base.x2);
        out.y2 = self.y2.unwrap_or(base.y2);
        out.frame_id = self.frame_id.unwrap_or(base.frame_id);
        for (k, v) in &self.tags {
            out.tags.insert(k.clone(), v.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parse_prefers_int() {
        assert_eq!(Number::parse("10"), Some(Number::Int(10)));
        assert_eq!(Number::parse(" -3 "), Some(Number::Int(-3)));
        assert_eq!(Number::parse("10.5"), Some(Number::Float(10.5)));
        assert_eq!(Number::parse("1e-3"), Some(Number::Float(0.001)));
        assert_eq!(Number::parse("abc"), None);
        assert_eq!(Number::parse("NaN"), None);
    }

    #[test]
    fn test_number_display_keeps_kind() {
        assert_eq!(Number::Int(7).to_string(), "7");
        assert_eq!(Number::Float(7.0).to_string(), "7.0");
        assert_eq!(Number::Float(0.25).to_string(), "0.25");
        assert_eq!(Number::parse(&Number::Float(7.0).to_string()), Some(Number::Float(7.0)));
    }

    #[test]
    fn test_new_instance_appends_by_default() {
        let ins = Instance::new(2, "car", 5, [0.into(), 0.into(), 10.into(), 20.into()]);
        assert_eq!(ins.instance_id, Instance::APPEND);
        assert_eq!(ins.at(1).instance_id, 1);
    }

    #[test]
    fn test_box_dimensions() {
        let ins = Instance::new(0, "car", 0, [10.into(), 20.into(), 40.into(), 60.into()]);
        assert_eq!(ins.width(), 30.0);
        assert_eq!(ins.height(), 40.0);
    }

    #[test]
    fn test_patch_merges_fields() {
        let base = Instance::new(1, "car", 3, [0.into(), 0.into(), 5.into(), 5.into()])
            .at(0)
            .with_tag("view", "small");
        let patched = InstancePatch::new((1, 0)).frame(9).tag("view", "large").apply(&base);
        assert_eq!(patched.frame_id, 9);
        assert_eq!(patched.x2, Number::Int(5));
        assert_eq!(patched.tags["view"], "large");
    }
}
