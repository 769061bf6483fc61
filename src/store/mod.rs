// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The annotation store.
//!
//! [`AnnotationStore`] owns every tracked object of one dataset. Objects
//! are kept in a vector whose index is the track id, so track ids are
//! always dense and contiguous from zero. Instances are addressed by
//! [`Position`]; any mutation may invalidate previously obtained
//! positions.
//!
//! Each mutation validates its input before touching state, performs the
//! structural change, runs the renumbering pass, notifies subscribers and
//! finally counts towards autosave.

mod events;
mod persistence;

pub use events::{Change, Entry, Replacement};
pub use persistence::{backup_path, rotate_backups};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::io::{serialization, table};
use crate::models::instance::{Instance, Position};
use crate::models::schema::{Schema, TagCategory};
use crate::models::tracked_object::TrackedObject;
use crate::util::broadcast::Broadcast;

/// Serializable copy of a whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub schema: Schema,
    pub objects: Vec<TrackedObject>,
}

#[derive(Debug)]
pub struct AnnotationStore {
    objects: Vec<TrackedObject>,
    schema: Schema,
    path: Option<PathBuf>,
    config: StoreConfig,
    change_count: usize,
    autosave_error: Option<Error>,
    subscribers: Broadcast<Change>,
}

impl AnnotationStore {
    /// An empty store.
    pub fn new(schema: Schema, config: StoreConfig) -> Self {
        Self {
            objects: Vec::new(),
            schema,
            path: None,
            config,
            change_count: 0,
            autosave_error: None,
            subscribers: Broadcast::new(),
        }
    }

    /// Load a store from an annotation file, which also becomes the save
    /// target.
    pub fn open(path: impl Into<PathBuf>, schema: Schema, config: StoreConfig) -> Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let mut store = Self::from_text(&text, schema, config)?;
        log::info!(
            "Loaded {} tracked objects ({} instances) from {}",
            store.len(),
            store.instance_count(),
            path.display()
        );
        store.path = Some(path);
        Ok(store)
    }

    /// Load a store from annotation text held in memory.
    ///
    /// Rows are grouped by track id in first-seen order; the groups then
    /// get dense ids in that same order.
    pub fn from_text(text: &str, schema: Schema, config: StoreConfig) -> Result<Self> {
        let rows = table::read_annotations(text, &schema)?;
        let mut store = Self::new(schema, config);
        let mut slots: HashMap<usize, usize> = HashMap::new();

        for mut instance in rows {
            match slots.get(&instance.track_id) {
                Some(&slot) => {
                    store.objects[slot].add_instance(instance);
                }
                None => {
                    let slot = store.objects.len();
                    slots.insert(instance.track_id, slot);
                    instance.track_id = slot;
                    store.objects.push(TrackedObject::new(instance));
                }
            }
        }

        store.renumber()?;
        Ok(store)
    }

    /// Rebuild a store from a snapshot, re-checking every instance.
    pub fn from_snapshot(snapshot: StoreSnapshot, config: StoreConfig) -> Result<Self> {
        let mut store = Self::new(snapshot.schema, config);
        for (i, obj) in snapshot.objects.into_iter().enumerate() {
            if obj.is_empty() {
                return Err(Error::format(i + 1, "snapshot holds an empty tracked object"));
            }
            for ins in &obj {
                store
                    .schema
                    .validate(ins)
                    .map_err(|reason| Error::format(i + 1, reason))?;
            }
            store.objects.push(obj);
        }
        store.renumber()?;
        Ok(store)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            schema: self.schema.clone(),
            objects: self.objects.clone(),
        }
    }

    /// Write a JSON or YAML snapshot, chosen by extension.
    pub fn export(&self, path: &Path) -> Result<()> {
        serialization::export_by_extension(&self.snapshot(), path)
    }

    pub fn import(path: &Path, config: StoreConfig) -> Result<Self> {
        Self::from_snapshot(serialization::import_by_extension(path)?, config)
    }

    /// Set the file written by [`save`](Self::save) and autosave.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // Queries ----------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn track_ids(&self) -> std::ops::Range<usize> {
        0..self.objects.len()
    }

    pub fn get(&self, track_id: usize) -> Option<&TrackedObject> {
        self.objects.get(track_id)
    }

    pub fn instance(&self, position: impl Into<Position>) -> Option<&Instance> {
        let position = position.into();
        self.get(position.track_id)?.get(position.instance_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedObject> {
        self.objects.iter()
    }

    /// Every instance, object by object.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.objects.iter().flat_map(|obj| obj.iter())
    }

    pub fn instance_count(&self) -> usize {
        self.objects.iter().map(TrackedObject::len).sum()
    }

    /// Instances annotated on `frame_id`, in tracked-object order.
    pub fn instances_at(&self, frame_id: usize) -> Vec<&Instance> {
        self.instances().filter(|i| i.frame_id == frame_id).collect()
    }

    /// Sorted distinct frame ids that carry at least one instance.
    pub fn frames(&self) -> Vec<usize> {
        self.instances()
            .map(|i| i.frame_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The allowed object classes.
    pub fn object_classes(&self) -> BTreeSet<&str> {
        self.schema.object_classes.iter().map(String::as_str).collect()
    }

    pub fn tags(&self) -> &[TagCategory] {
        &self.schema.tags
    }

    pub fn track_id_to_object_class_map(&self) -> BTreeMap<usize, &str> {
        self.objects
            .iter()
            .map(|obj| (obj.track_id(), obj.object_class()))
            .collect()
    }

    /// Track ids grouped by object class. Every allowed class is present,
    /// possibly with no tracks.
    pub fn object_class_mapping(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut map: BTreeMap<&str, Vec<usize>> = self
            .schema
            .object_classes
            .iter()
            .map(|c| (c.as_str(), Vec::new()))
            .collect();
        for obj in &self.objects {
            map.entry(obj.object_class()).or_default().push(obj.track_id());
        }
        map
    }

    // Notifications ----------------------------------------------------------

    /// Receive one [`Change`] per accepted mutation.
    pub fn subscribe(&mut self) -> Receiver<Change> {
        self.subscribers.subscribe()
    }

    /// The error of the last failed autosave, if it has not been taken yet.
    pub fn take_autosave_error(&mut self) -> Option<Error> {
        self.autosave_error.take()
    }

    // Mutations --------------------------------------------------------------

    /// Add an instance to an existing tracked object, or add a new tracked
    /// object holding one instance.
    ///
    /// A new object whose track id is past the end is appended; otherwise
    /// it is inserted and the following objects shift up by one.
    pub fn add(&mut self, entry: impl Into<Entry>) -> Result<Position> {
        let entry = entry.into();
        self.check_entry(&entry)?;
        let is_object = matches!(entry, Entry::Object(_));
        let position = self.insert(entry);
        let entry = self.stored_entry(position, is_object);
        log::debug!("Added {} at {position}", entry_label(&entry));
        self.commit(Change::Added { position, entry })?;
        Ok(position)
    }

    /// Delete a whole tracked object (`instance_id` of `None`) or one
    /// instance. Deleting the last instance of an object deletes the
    /// object.
    pub fn delete(&mut self, track_id: usize, instance_id: Option<usize>) -> Result<Entry> {
        let (removed, object_removed) = match instance_id {
            None => {
                self.object(track_id)?;
                (Entry::Object(self.objects.remove(track_id)), true)
            }
            Some(instance_id) => {
                let (ins, emptied) = self.remove_instance(Position::new(track_id, instance_id), true)?;
                (Entry::Instance(ins), emptied)
            }
        };
        log::debug!("Deleted track {track_id} instance {instance_id:?} (object removed: {object_removed})");
        self.commit(Change::Deleted {
            track_id,
            instance_id,
            object_removed,
        })?;
        Ok(removed)
    }

    /// Replace the instance at the replacement's position. The tracked
    /// object keeps its identity; use [`move_to`](Self::move_to) to change
    /// it.
    pub fn replace(&mut self, replacement: impl Into<Replacement>) -> Result<Position> {
        let replacement = replacement.into();
        let position = replacement.position();
        let current = self.resolve(position)?.clone();

        let mut instance = match replacement {
            Replacement::Instance(ins) => ins,
            Replacement::Patch(patch) => patch.apply(&current),
        };
        instance.track_id = position.track_id;
        instance.instance_id = position.instance_id;
        instance.object_class.clone_from(&current.object_class);
        self.check_instance(&instance)?;

        self.remove_instance(position, false)?;
        self.objects[position.track_id].add_instance(instance.clone());
        log::debug!("Replaced instance at {position}");
        self.commit(Change::Replaced { instance })?;
        Ok(position)
    }

    /// Delete the instance at `from`, then add `entry`.
    ///
    /// The entry's track id is read in the numbering from before the
    /// delete. When the delete removes a whole tracked object whose track
    /// id is below the entry's, the entry's track id is lowered by one so
    /// it still points at the same neighbour.
    pub fn move_to(&mut self, from: impl Into<Position>, entry: impl Into<Entry>) -> Result<Position> {
        let from = from.into();
        let mut entry = entry.into();
        self.resolve(from)?;
        self.check_entry(&entry)?;

        let target = entry.track_id();
        let same_object = matches!(entry, Entry::Instance(_)) && target == from.track_id;
        let removes_object = !same_object && self.objects[from.track_id].len() == 1;
        if removes_object && from.track_id < target {
            entry.set_track_id(target - 1);
        }

        self.remove_instance(from, !same_object)?;
        let is_object = matches!(entry, Entry::Object(_));
        let to = self.insert(entry);
        let entry = self.stored_entry(to, is_object);
        log::debug!("Moved {from} to {to}");
        self.commit(Change::Moved { from, to, entry })?;
        Ok(to)
    }

    /// Write the whole store to its backing file, rotating backups.
    ///
    /// On failure the in-memory state is untouched.
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoBackingFile)?;
        let text = table::write_annotations(&self.objects, &self.schema);
        persistence::save_with_backups(&path, &text, self.config.backups)?;
        self.change_count = 0;
        Ok(())
    }

    /// Render the store as annotation-table text.
    pub fn to_table(&self) -> String {
        table::write_annotations(&self.objects, &self.schema)
    }

    // Internals --------------------------------------------------------------

    fn object(&self, track_id: usize) -> Result<&TrackedObject> {
        self.objects.get(track_id).ok_or(Error::UnknownTrack(track_id))
    }

    fn resolve(&self, position: Position) -> Result<&Instance> {
        let obj = self.object(position.track_id)?;
        obj.get(position.instance_id).ok_or(Error::IndexOutOfRange {
            track_id: position.track_id,
            instance_id: position.instance_id,
            len: obj.len(),
        })
    }

    fn check_instance(&self, instance: &Instance) -> Result<()> {
        self.schema.validate(instance).map_err(Error::InvalidEdit)
    }

    /// Validate an entry against the current objects.
    fn check_entry(&self, entry: &Entry) -> Result<()> {
        match entry {
            Entry::Instance(ins) => {
                let owner = self.object(ins.track_id)?;
                let mut candidate = ins.clone();
                candidate.object_class = owner.object_class().to_string();
                self.check_instance(&candidate)
            }
            Entry::Object(obj) => {
                if obj.len() != 1 {
                    return Err(Error::InvalidEdit(format!(
                        "a new tracked object must hold exactly one instance, got {}",
                        obj.len()
                    )));
                }
                obj.iter().try_for_each(|ins| self.check_instance(ins))
            }
        }
    }

    /// Structural insert of a validated entry.
    fn insert(&mut self, entry: Entry) -> Position {
        match entry {
            Entry::Instance(ins) => {
                let track_id = ins.track_id;
                let instance_id = self.objects[track_id].add_instance(ins);
                Position::new(track_id, instance_id)
            }
            Entry::Object(obj) => {
                let at = obj.track_id().min(self.objects.len());
                self.objects.insert(at, obj);
                self.renumber_objects();
                Position::new(at, 0)
            }
        }
    }

    fn stored_entry(&self, position: Position, is_object: bool) -> Entry {
        let obj = &self.objects[position.track_id];
        if is_object {
            Entry::Object(obj.clone())
        } else {
            Entry::Instance(obj[position.instance_id].clone())
        }
    }

    /// Remove one instance. With `cascade`, an emptied object is removed
    /// too; the flag in the result tells whether that happened.
    fn remove_instance(&mut self, position: Position, cascade: bool) -> Result<(Instance, bool)> {
        self.resolve(position)?;
        let obj = &mut self.objects[position.track_id];
        let removed = obj.delete(position.instance_id)?;
        let emptied = cascade && obj.is_empty();
        if emptied {
            self.objects.remove(position.track_id);
            self.renumber_objects();
        }
        Ok((removed, emptied))
    }

    fn renumber_objects(&mut self) {
        for (i, obj) in self.objects.iter_mut().enumerate() {
            if obj.track_id() != i {
                obj.change_track_id(i);
            }
            obj.reindex();
        }
    }

    /// Restore dense track ids and instance ids, then verify them.
    fn renumber(&mut self) -> Result<()> {
        self.renumber_objects();
        for (i, obj) in self.objects.iter().enumerate() {
            if obj.track_id() != i {
                return Err(Error::invariant(format!("track {} stored at key {i}", obj.track_id())));
            }
            if obj.is_empty() {
                return Err(Error::invariant(format!("track {i} has no instances")));
            }
            obj.verify()?;
        }
        Ok(())
    }

    fn commit(&mut self, change: Change) -> Result<()> {
        self.renumber()?;
        self.subscribers.send(change);
        self.change_count += 1;
        self.autosave();
        Ok(())
    }

    fn autosave(&mut self) {
        let step = self.config.autosave_step;
        if step == 0 || self.change_count < step || self.path.is_none() {
            return;
        }
        if let Err(e) = self.save() {
            // the counter stays up so the next accepted edit retries
            log::warn!("Autosave failed: {e}");
            self.autosave_error = Some(e);
        }
    }
}

fn entry_label(entry: &Entry) -> &'static str {
    match entry {
        Entry::Instance(_) => "instance",
        Entry::Object(_) => "tracked object",
    }
}

impl<'a> IntoIterator for &'a AnnotationStore {
    type Item = &'a TrackedObject;
    type IntoIter = std::slice::Iter<'a, TrackedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.iter()
    }
}

impl std::ops::Index<usize> for AnnotationStore {
    type Output = TrackedObject;

    fn index(&self, track_id: usize) -> &TrackedObject {
        &self.objects[track_id]
    }
}

impl fmt::Display for AnnotationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => writeln!(f, "AnnotationStore {}", path.display())?,
            None => writeln!(f, "AnnotationStore (in memory)")?,
        }
        for obj in &self.objects {
            writeln!(f, "\tTrackedObject ({}, {})", obj.track_id(), obj.object_class())?;
            for ins in obj {
                let tags = ins
                    .tags
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(
                    f,
                    "\t\tInstance {}: frame {} [{}, {}, {}, {}] ({tags})",
                    ins.instance_id, ins.frame_id, ins.x1, ins.y1, ins.x2, ins.y2
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instance::Number;

    fn schema() -> Schema {
        Schema::new("road", &["car", "bus"])
    }

    fn store_with(tracks: &[usize]) -> AnnotationStore {
        let mut store = AnnotationStore::new(schema(), StoreConfig::default());
        for (frame, &track) in tracks.iter().enumerate() {
            let ins = Instance::new(track, "car", frame, [Number::Int(0); 4]);
            if track < store.len() {
                store.add(ins).unwrap();
            } else {
                store.add(TrackedObject::new(ins)).unwrap();
            }
        }
        store
    }

    #[test]
    fn test_renumber_repairs_stale_track_ids() {
        let mut store = store_with(&[0, 1, 2]);
        store.objects[1].change_track_id(7);
        store.objects.swap(0, 2);
        store.renumber().unwrap();
        assert!(store.iter().enumerate().all(|(i, o)| o.track_id() == i));
        assert!(store.instances().all(|ins| ins.track_id < 3));
    }

    #[test]
    fn test_renumber_flags_empty_objects() {
        let mut store = store_with(&[0, 1]);
        store.objects[1].delete(0).unwrap();
        assert!(matches!(store.renumber(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_autosave_without_path_keeps_counting() {
        let mut store = store_with(&[0, 0, 0, 0, 0, 0]);
        assert!(store.take_autosave_error().is_none());
        assert_eq!(store.change_count, 6);
    }

    #[test]
    fn test_display_lists_every_instance() {
        let store = store_with(&[0, 0, 1]);
        let text = store.to_string();
        assert!(text.contains("TrackedObject (0, car)"));
        assert!(text.contains("TrackedObject (1, car)"));
        assert_eq!(text.matches("Instance ").count(), 3);
    }
}
