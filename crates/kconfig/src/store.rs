//! The entry store: an ordered `(group, key) -> entry` map with flags.
//!
//! Groups and entries keep insertion order. Nothing is physically removed:
//! deletion leaves a tombstone, and tombstones only disappear when the whole
//! store is rebuilt from the sources.

use std::collections::HashMap;

use crate::{
    entry::{Entry, EntryFlags, EntryKey},
    path::{GroupPath, validate_key},
};

/// Outcome of a write against the store or a group handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// The entry was changed.
    Written,
    /// The entry already held the value; nothing changed.
    Unchanged,
    /// The entry or its group is locked; nothing changed.
    Immutable,
    /// The key failed validation; nothing changed.
    InvalidKey,
    /// The handle has no backing config; nothing changed.
    NoConfig,
}

impl WriteStatus {
    /// True when the write changed something.
    pub fn is_written(self) -> bool {
        self == Self::Written
    }
}

/// How an application write should mark the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Mark the entry dirty so the next sync persists it.
    pub dirty: bool,
    /// Flag the raw value for `$VAR` expansion.
    pub expand: bool,
    /// Tell change listeners about this entry on the next sync.
    pub notify: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            dirty: true,
            expand: false,
            notify: false,
        }
    }
}

/// The value a lookup resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Raw, unescaped value.
    pub value: String,
    /// Whether the value should be environment-expanded.
    pub expand: bool,
}

/// Entries of one group in insertion order.
#[derive(Debug, Clone, Default)]
struct GroupSlot {
    /// Path of the group.
    path: GroupPath,
    /// Locked by some source.
    immutable: bool,
    /// Entries in insertion order.
    entries: Vec<(EntryKey, Entry)>,
    /// Position of each key in `entries`.
    index: HashMap<EntryKey, usize>,
}

impl GroupSlot {
    /// Empty slot for `path`.
    fn new(path: GroupPath) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    /// Look up an entry by exact key.
    fn get(&self, key: &EntryKey) -> Option<&Entry> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Mutable lookup by exact key.
    fn get_mut(&mut self, key: &EntryKey) -> Option<&mut Entry> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Return the entry for `key`, inserting an empty one at the end if needed.
    fn entry_mut(&mut self, key: &EntryKey) -> &mut Entry {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.entries.push((key.clone(), Entry::default()));
                let i = self.entries.len() - 1;
                self.index.insert(key.clone(), i);
                i
            }
        };
        &mut self.entries[i].1
    }

    /// Tombstone every live, unlocked localized variant of `key`.
    ///
    /// With `dirty` the variants are also marked for removal from the writable
    /// source on the next sync.
    fn shadow_localized(&mut self, key: &str, dirty: bool) {
        for (k, e) in &mut self.entries {
            if k.key != key || k.locale.is_none() || e.is_immutable() || e.is_deleted() {
                continue;
            }
            e.value.clear();
            e.flags.insert(EntryFlags::DELETED);
            if dirty {
                e.flags.insert(EntryFlags::DIRTY | EntryFlags::REVERTED);
            }
        }
    }

    /// Hide localized variants of `key` behind a plain record from a later source.
    fn shadow_merged(&mut self, key: &str, writable: bool) {
        for (k, e) in &mut self.entries {
            if k.key != key || k.locale.is_none() || e.is_immutable() {
                continue;
            }
            e.value.clear();
            e.flags.insert(EntryFlags::DELETED);
            if !writable {
                e.default = None;
            }
        }
    }

    /// True when any entry in this slot is not a tombstone.
    fn has_live(&self) -> bool {
        self.entries.iter().any(|(_, e)| !e.is_deleted())
    }
}

/// Ordered map of group paths to their entries.
#[derive(Debug, Clone, Default)]
pub struct Store {
    /// Groups in insertion order.
    groups: Vec<GroupSlot>,
    /// Position of each path in `groups`.
    index: HashMap<GroupPath, usize>,
}

impl Store {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `path`, if the group was ever seen.
    fn slot(&self, path: &GroupPath) -> Option<&GroupSlot> {
        self.index.get(path).map(|&i| &self.groups[i])
    }

    /// Slot for `path`, created on demand.
    fn slot_mut(&mut self, path: &GroupPath) -> &mut GroupSlot {
        let i = match self.index.get(path) {
            Some(&i) => i,
            None => {
                self.groups.push(GroupSlot::new(path.clone()));
                let i = self.groups.len() - 1;
                self.index.insert(path.clone(), i);
                i
            }
        };
        &mut self.groups[i]
    }

    /// Get the unlocalized entry for `key`, tombstones included.
    pub fn get(&self, path: &GroupPath, key: &str) -> Option<&Entry> {
        self.get_exact(path, &EntryKey::plain(key))
    }

    /// Get the entry for an exact key, tombstones included.
    pub fn get_exact(&self, path: &GroupPath, key: &EntryKey) -> Option<&Entry> {
        self.slot(path).and_then(|s| s.get(key))
    }

    /// Resolve the effective value of `key` for a locale chain.
    ///
    /// Localized variants are tried in chain order before the plain key.
    /// Tombstones count as absent. With `search_defaults` the value contributed
    /// by the non-writable sources is returned instead of the current one.
    pub fn lookup(
        &self,
        path: &GroupPath,
        key: &str,
        locales: &[String],
        search_defaults: bool,
    ) -> Option<Resolved> {
        let slot = self.slot(path)?;
        let candidates = locales
            .iter()
            .map(|l| EntryKey::localized(key, l.as_str()))
            .chain([EntryKey::plain(key)]);
        for k in candidates {
            let Some(entry) = slot.get(&k) else {
                continue;
            };
            if search_defaults {
                if let Some(default) = &entry.default {
                    return Some(Resolved {
                        value: default.clone(),
                        expand: entry.expands(),
                    });
                }
                continue;
            }
            if !entry.is_deleted() {
                return Some(Resolved {
                    value: entry.value.clone(),
                    expand: entry.expands(),
                });
            }
        }
        None
    }

    /// Set the unlocalized `key` to `value`, optionally marking it dirty.
    pub fn set(
        &mut self,
        path: &GroupPath,
        key: &str,
        value: &str,
        mark_dirty: bool,
    ) -> WriteStatus {
        self.write(
            path,
            &EntryKey::plain(key),
            value,
            WriteOptions {
                dirty: mark_dirty,
                ..WriteOptions::default()
            },
        )
    }

    /// Application write of `value` to `key`.
    ///
    /// A locked entry or group turns the write into a no-op reported as
    /// [`WriteStatus::Immutable`]. An unlocalized write hides localized variants.
    pub fn write(
        &mut self,
        path: &GroupPath,
        key: &EntryKey,
        value: &str,
        opts: WriteOptions,
    ) -> WriteStatus {
        if validate_key(&key.key).is_err() {
            return WriteStatus::InvalidKey;
        }
        if self.is_group_immutable(path) {
            return WriteStatus::Immutable;
        }
        if let Some(existing) = self.get_exact(path, key) {
            if existing.is_immutable() {
                return WriteStatus::Immutable;
            }
            if !existing.is_deleted()
                && !existing.is_defaulted()
                && existing.value == value
                && existing.expands() == opts.expand
            {
                return WriteStatus::Unchanged;
            }
        }
        let slot = self.slot_mut(path);
        let entry = slot.entry_mut(key);
        entry.value = value.to_string();
        entry
            .flags
            .remove(EntryFlags::DELETED | EntryFlags::DEFAULTED | EntryFlags::REVERTED);
        entry.flags.set(EntryFlags::EXPAND, opts.expand);
        if opts.dirty {
            entry.flags.insert(EntryFlags::DIRTY);
        }
        if opts.notify {
            entry.flags.insert(EntryFlags::NOTIFY);
        }
        if key.locale.is_none() {
            slot.shadow_localized(&key.key, opts.dirty);
        }
        WriteStatus::Written
    }

    /// Tombstone the unlocalized `key`. Immutability is kept.
    pub fn remove(&mut self, path: &GroupPath, key: &str) -> WriteStatus {
        self.delete(path, &EntryKey::plain(key), WriteOptions::default())
    }

    /// Tombstone `key` with explicit write options.
    pub fn delete(
        &mut self,
        path: &GroupPath,
        key: &EntryKey,
        opts: WriteOptions,
    ) -> WriteStatus {
        if validate_key(&key.key).is_err() {
            return WriteStatus::InvalidKey;
        }
        if self.is_group_immutable(path) {
            return WriteStatus::Immutable;
        }
        match self.get_exact(path, key) {
            None => return WriteStatus::Unchanged,
            Some(e) if e.is_immutable() => return WriteStatus::Immutable,
            Some(e) if e.is_deleted() => return WriteStatus::Unchanged,
            Some(_) => {}
        }
        let slot = self.slot_mut(path);
        if let Some(entry) = slot.get_mut(key) {
            tombstone(entry, opts);
        }
        if key.locale.is_none() {
            slot.shadow_localized(&key.key, opts.dirty);
        }
        WriteStatus::Written
    }

    /// Restore the value contributed by the non-writable sources.
    ///
    /// The entry is marked dirty and reverted so the next sync drops it from the
    /// writable source. Without a default the entry becomes absent.
    pub fn revert(&mut self, path: &GroupPath, key: &str, notify: bool) -> WriteStatus {
        if self.is_group_immutable(path) {
            return WriteStatus::Immutable;
        }
        let k = EntryKey::plain(key);
        let Some(entry) = self.slot_mut(path).get_mut(&k) else {
            return WriteStatus::Unchanged;
        };
        if entry.is_immutable() {
            return WriteStatus::Immutable;
        }
        if entry.flags.contains(EntryFlags::REVERTED) {
            return WriteStatus::Unchanged;
        }
        match entry.default.clone() {
            Some(default) => {
                entry.value = default;
                entry.flags.remove(EntryFlags::DELETED);
                entry.flags.insert(EntryFlags::DEFAULTED);
            }
            None => {
                entry.value.clear();
                entry.flags.insert(EntryFlags::DELETED);
            }
        }
        entry.flags.insert(EntryFlags::DIRTY | EntryFlags::REVERTED);
        if notify {
            entry.flags.insert(EntryFlags::NOTIFY);
        }
        WriteStatus::Written
    }

    /// Tombstone every unlocked entry in `path` and its sub-groups.
    pub fn delete_group(&mut self, path: &GroupPath, opts: WriteOptions) -> WriteStatus {
        if self.is_group_immutable(path) {
            return WriteStatus::Immutable;
        }
        let mut changed = false;
        for slot in self.groups.iter_mut().filter(|s| s.path.starts_with(path)) {
            if slot.immutable {
                continue;
            }
            for (_, entry) in &mut slot.entries {
                if entry.is_immutable() || entry.is_deleted() {
                    continue;
                }
                tombstone(entry, opts);
                changed = true;
            }
        }
        if changed {
            WriteStatus::Written
        } else {
            WriteStatus::Unchanged
        }
    }

    /// Entries stored directly in `path`, in insertion order, tombstones included.
    pub fn entries_under(&self, path: &GroupPath) -> impl Iterator<Item = (&EntryKey, &Entry)> {
        self.slot(path)
            .into_iter()
            .flat_map(|s| s.entries.iter().map(|(k, e)| (k, e)))
    }

    /// True when `key` or its group is locked.
    pub fn is_immutable(&self, path: &GroupPath, key: &str) -> bool {
        self.is_group_immutable(path) || self.get(path, key).is_some_and(Entry::is_immutable)
    }

    /// True when `path` or any ancestor is locked.
    pub fn is_group_immutable(&self, path: &GroupPath) -> bool {
        let mut cur = Some(path.clone());
        while let Some(p) = cur {
            if self.slot(&p).is_some_and(|s| s.immutable) {
                return true;
            }
            cur = p.parent();
        }
        false
    }

    /// Lock `path` and everything beneath it.
    pub(crate) fn lock_group(&mut self, path: &GroupPath) {
        self.slot_mut(path).immutable = true;
    }

    /// Every group path the store has seen, in insertion order.
    pub fn group_paths(&self) -> impl Iterator<Item = &GroupPath> {
        self.groups.iter().map(|s| &s.path)
    }

    /// Names of the direct children of `path` that hold live entries.
    pub fn sub_groups(&self, path: &GroupPath) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for slot in &self.groups {
            let Some(name) = slot.path.child_name_under(path) else {
                continue;
            };
            if names.iter().any(|n| n == name) || !slot.has_live() {
                continue;
            }
            names.push(name.to_string());
        }
        names
    }

    /// True when `path` or a descendant holds a non-deleted entry.
    pub fn has_live_entries(&self, path: &GroupPath) -> bool {
        self.groups
            .iter()
            .any(|s| s.path.starts_with(path) && s.has_live())
    }

    /// True when any entry awaits a sync.
    pub fn is_dirty(&self) -> bool {
        self.dirty_entries().next().is_some()
    }

    /// Every dirty entry with its group path.
    pub fn dirty_entries(&self) -> impl Iterator<Item = (&GroupPath, &EntryKey, &Entry)> {
        self.groups.iter().flat_map(|s| {
            s.entries
                .iter()
                .filter(|(_, e)| e.is_dirty())
                .map(move |(k, e)| (&s.path, k, e))
        })
    }

    /// Clear the sync-related flags of every entry.
    pub fn mark_clean(&mut self) {
        for slot in &mut self.groups {
            for (_, entry) in &mut slot.entries {
                entry
                    .flags
                    .remove(EntryFlags::DIRTY | EntryFlags::REVERTED | EntryFlags::NOTIFY);
            }
        }
    }

    /// Apply one record from a source during a merge.
    ///
    /// `value` of `None` is a tombstone. Values from non-writable sources are
    /// remembered as the entry's default. Returns false when a lock blocked it.
    pub(crate) fn merge(
        &mut self,
        path: &GroupPath,
        key: &EntryKey,
        value: Option<&str>,
        flags: EntryFlags,
        writable: bool,
    ) -> bool {
        if self.is_group_immutable(path) {
            return false;
        }
        let slot = self.slot_mut(path);
        if slot.get(key).is_some_and(Entry::is_immutable) {
            return false;
        }
        if key.locale.is_none() {
            slot.shadow_merged(&key.key, writable);
        }
        let entry = slot.entry_mut(key);
        match value {
            Some(v) => {
                entry.value = v.to_string();
                entry.flags.remove(EntryFlags::DELETED);
                if !writable {
                    entry.default = Some(v.to_string());
                }
            }
            None => {
                entry.value.clear();
                entry.flags.insert(EntryFlags::DELETED);
                if !writable {
                    entry.default = None;
                }
            }
        }
        entry.flags.set(EntryFlags::DEFAULTED, !writable);
        entry
            .flags
            .set(EntryFlags::EXPAND, flags.contains(EntryFlags::EXPAND));
        entry.flags.insert(flags & EntryFlags::IMMUTABLE);
        true
    }
}

/// Turn `entry` into a tombstone carrying the given write options.
fn tombstone(entry: &mut Entry, opts: WriteOptions) {
    entry.value.clear();
    entry.flags.insert(EntryFlags::DELETED);
    entry
        .flags
        .remove(EntryFlags::DEFAULTED | EntryFlags::REVERTED | EntryFlags::EXPAND);
    if opts.dirty {
        entry.flags.insert(EntryFlags::DIRTY);
    }
    if opts.notify {
        entry.flags.insert(EntryFlags::NOTIFY);
    }
}
