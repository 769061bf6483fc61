// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Edit payloads and change notifications of the annotation store.

use serde::{Deserialize, Serialize};

use crate::models::instance::{Instance, InstancePatch, Position};
use crate::models::tracked_object::TrackedObject;

/// Something that can be added to a store: an instance of an existing
/// tracked object, or a new tracked object holding exactly one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Instance(Instance),
    Object(TrackedObject),
}

impl Entry {
    pub fn track_id(&self) -> usize {
        match self {
            Entry::Instance(ins) => ins.track_id,
            Entry::Object(obj) => obj.track_id(),
        }
    }

    pub(crate) fn set_track_id(&mut self, track_id: usize) {
        match self {
            Entry::Instance(ins) => ins.track_id = track_id,
            Entry::Object(obj) => {
                obj.change_track_id(track_id);
            }
        }
    }
}

impl From<Instance> for Entry {
    fn from(instance: Instance) -> Self {
        Entry::Instance(instance)
    }
}

impl From<TrackedObject> for Entry {
    fn from(obj: TrackedObject) -> Self {
        Entry::Object(obj)
    }
}

/// Replacement for the instance at an existing position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Replacement {
    /// A full instance; its `(track_id, instance_id)` is the target.
    Instance(Instance),
    /// Only the given fields change.
    Patch(InstancePatch),
}

impl Replacement {
    pub fn position(&self) -> Position {
        match self {
            Replacement::Instance(ins) => ins.position(),
            Replacement::Patch(patch) => patch.position(),
        }
    }
}

impl From<Instance> for Replacement {
    fn from(instance: Instance) -> Self {
        Replacement::Instance(instance)
    }
}

impl From<InstancePatch> for Replacement {
    fn from(patch: InstancePatch) -> Self {
        Replacement::Patch(patch)
    }
}

/// One accepted mutation, sent to subscribers after the store is
/// consistent again.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Added {
        position: Position,
        entry: Entry,
    },
    Deleted {
        track_id: usize,
        instance_id: Option<usize>,
        /// The whole tracked object went away.
        object_removed: bool,
    },
    Replaced {
        instance: Instance,
    },
    Moved {
        from: Position,
        to: Position,
        entry: Entry,
    },
}

impl Change {
    pub fn kind(&self) -> &'static str {
        match self {
            Change::Added { .. } => "added",
            Change::Deleted { .. } => "deleted",
            Change::Replaced { .. } => "replaced",
            Change::Moved { .. } => "moved",
        }
    }
}
