// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Tracked objects: ordered instances sharing one track identity.

use serde::{Deserialize, Serialize};

use super::instance::Instance;
use crate::error::{Error, Result};

/// A real-world object followed across frames.
///
/// Every contained instance carries this object's `track_id` and
/// `object_class`, and its `instance_id` equals its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    track_id: usize,
    object_class: String,
    instances: Vec<Instance>,
}

impl TrackedObject {
    /// Create a tracked object from its seed instance.
    ///
    /// Identity is taken from the seed.
    pub fn new(seed: Instance) -> Self {
        let mut obj = Self {
            track_id: seed.track_id,
            object_class: seed.object_class.clone(),
            instances: Vec::with_capacity(1),
        };
        obj.add_instance(seed);
        obj
    }

    pub fn track_id(&self) -> usize {
        self.track_id
    }

    pub fn object_class(&self) -> &str {
        &self.object_class
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, instance_id: usize) -> Option<&Instance> {
        self.instances.get(instance_id)
    }

    pub fn first(&self) -> Option<&Instance> {
        self.instances.first()
    }

    pub fn last(&self) -> Option<&Instance> {
        self.instances.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        self.instances.iter()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Frame ids covered by this object, in instance order.
    pub fn frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.instances.iter().map(|i| i.frame_id)
    }

    /// Add an instance and return the position it landed at.
    ///
    /// An `instance_id` at or past the end appends; anything else inserts
    /// and shifts the following instances up.
    pub fn add_instance(&mut self, mut instance: Instance) -> usize {
        instance.track_id = self.track_id;
        instance.object_class.clone_from(&self.object_class);

        let at = instance.instance_id.min(self.instances.len());
        self.instances.insert(at, instance);
        self.reindex();
        at
    }

    /// Remove the instance at `instance_id`.
    pub fn delete(&mut self, instance_id: usize) -> Result<Instance> {
        if instance_id >= self.instances.len() {
            return Err(Error::IndexOutOfRange {
                track_id: self.track_id,
                instance_id,
                len: self.instances.len(),
            });
        }
        let removed = self.instances.remove(instance_id);
        self.reindex();
        Ok(removed)
    }

    /// Rewrite the track id here and on every instance.
    pub fn change_track_id(&mut self, track_id: usize) -> &mut Self {
        self.track_id = track_id;
        for instance in &mut self.instances {
            instance.track_id = track_id;
        }
        self
    }

    /// Reassign every `instance_id` to its current index.
    pub(crate) fn reindex(&mut self) {
        for (i, instance) in self.instances.iter_mut().enumerate() {
            instance.instance_id = i;
        }
    }

    /// Check the identity and index invariants.
    pub(crate) fn verify(&self) -> Result<()> {
        for (i, instance) in self.instances.iter().enumerate() {
            if instance.instance_id != i
                || instance.track_id != self.track_id
                || instance.object_class != self.object_class
            {
                return Err(Error::invariant(format!(
                    "track {} holds instance {:?} at index {i}",
                    self.track_id,
                    instance.position()
                )));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TrackedObject {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.instances.iter()
    }
}

impl std::ops::Index<usize> for TrackedObject {
    type Output = Instance;

    fn index(&self, instance_id: usize) -> &Instance {
        &self.instances[instance_id]
    }
}
