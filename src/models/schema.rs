// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Allow-lists for object classes and tag values.
//!
//! A [`Schema`] is read from the dataset metadata file and decides which
//! rows and edits the annotation store accepts.

use serde::{Deserialize, Serialize};

use super::instance::Instance;

/// Unit of the box coordinates of a whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateUnit {
    /// Absolute pixel coordinates.
    #[default]
    Pixel,
    /// Fractions of the frame size in `[0, 1]`.
    Normalized,
}

/// One tag category and its allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCategory {
    pub name: String,
    pub values: Vec<String>,
}

/// Dataset metadata: scene name and allow-lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub scene: String,
    pub object_classes: Vec<String>,
    /// Tag categories, in the column order used when writing.
    #[serde(default)]
    pub tags: Vec<TagCategory>,
    #[serde(default)]
    pub unit: CoordinateUnit,
}

impl Schema {
    pub fn new(scene: impl Into<String>, object_classes: &[&str]) -> Self {
        Self {
            scene: scene.into(),
            object_classes: object_classes.iter().map(|s| s.to_string()).collect(),
            tags: Vec::new(),
            unit: CoordinateUnit::Pixel,
        }
    }

    pub fn with_tag(mut self, name: &str, values: &[&str]) -> Self {
        self.tags.push(TagCategory {
            name: name.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_unit(mut self, unit: CoordinateUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    pub fn allows_class(&self, object_class: &str) -> bool {
        self.object_classes.iter().any(|c| c == object_class)
    }

    pub fn allows_tag(&self, category: &str, value: &str) -> bool {
        self.tags
            .iter()
            .find(|t| t.name == category)
            .is_some_and(|t| t.values.iter().any(|v| v == value))
    }

    /// Check an instance against the allow-lists and the coordinate unit.
    ///
    /// Every configured category must carry an allowed value and no
    /// unknown category may appear.
    pub fn validate(&self, instance: &Instance) -> Result<(), String> {
        if !self.allows_class(&instance.object_class) {
            return Err(format!("object class {:?} is not allowed", instance.object_class));
        }
        for category in &self.tags {
            match instance.tags.get(&category.name) {
                Some(value) if self.allows_tag(&category.name, value) => {}
                Some(value) => {
                    return Err(format!(
                        "tag {}={value:?} is not one of {:?}",
                        category.name, category.values
                    ))
                }
                None => return Err(format!("missing tag {}", category.name)),
            }
        }
        if let Some(unknown) = instance
            .tags
            .keys()
            .find(|k| !self.tags.iter().any(|t| &t.name == *k))
        {
            return Err(format!("unknown tag category {unknown:?}"));
        }
        if self.unit == CoordinateUnit::Normalized
            && instance.bbox().iter().any(|v| !(0.0..=1.0).contains(v))
        {
            return Err(format!("coordinates {:?} are not normalized", instance.bbox()));
        }
        Ok(())
    }
}
