//! Group handles: typed access to the entries under one group path.

use std::{
    collections::{BTreeMap, BTreeSet},
    env,
    path::PathBuf,
};

use tracing::debug;

use crate::{
    config::{Config, State, WriteFlags},
    entry::EntryKey,
    error::Result,
    path::GroupPath,
    store::{Resolved, WriteStatus},
    value::{
        FromConfig, ToConfig, expand_env, join_list, join_xdg_list, split_list, split_xdg_list,
        translate_path,
    },
};

/// A lightweight handle on one group of a config.
///
/// Handles never own entries; they hold a path and a clone of the config
/// handle. A default-constructed handle has no config: it reads defaults,
/// rejects writes with [`WriteStatus::NoConfig`] and reports `!is_valid()`.
#[derive(Debug, Clone, Default)]
pub struct Group {
    /// Owning config, `None` for an invalid handle.
    config: Option<Config>,
    /// Location of the group.
    path: GroupPath,
}

impl Group {
    /// Handle on `path` in `config`.
    pub(crate) fn new(config: Config, path: GroupPath) -> Self {
        Self {
            config: Some(config),
            path,
        }
    }

    /// True when the handle is backed by a config.
    pub fn is_valid(&self) -> bool {
        self.config.is_some()
    }

    /// The owning config.
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Location of the group.
    pub fn path(&self) -> &GroupPath {
        &self.path
    }

    /// Innermost group name, `""` for the root.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// The enclosing group, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        Some(Self {
            config: self.config.clone(),
            path: self.path.parent()?,
        })
    }

    /// A sub-group. Names must be non-empty and free of `/`.
    pub fn group(&self, name: &str) -> Result<Self> {
        Ok(Self {
            config: self.config.clone(),
            path: self.path.child(name)?,
        })
    }

    /// Run `f` against the config state, or return `fallback` for invalid handles.
    fn with<R>(&self, fallback: R, f: impl FnOnce(&mut State) -> R) -> R {
        match &self.config {
            Some(c) => c.with_state(f),
            None => fallback,
        }
    }

    /// Resolve `key` under the current read mode.
    fn resolve(&self, key: &str) -> Option<Resolved> {
        self.with(None, |st| {
            st.store
                .lookup(&self.path, key, st.locale.tags(), st.read_defaults)
        })
    }

    /// Raw value of `key` with expansion applied, or `None` when absent.
    pub fn read_raw(&self, key: &str) -> Option<String> {
        self.resolve(key).map(|r| {
            if r.expand {
                expand_env(&r.value)
            } else {
                r.value
            }
        })
    }

    /// Value the non-writable sources give `key`, if any.
    pub fn read_default_raw(&self, key: &str) -> Option<String> {
        let resolved = self.with(None, |st| {
            st.store.lookup(&self.path, key, st.locale.tags(), true)
        })?;
        Some(if resolved.expand {
            expand_env(&resolved.value)
        } else {
            resolved.value
        })
    }

    /// Typed read. Missing or unparsable values give `default`.
    pub fn read_entry<T: FromConfig>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.read_raw(key) else {
            return default;
        };
        match T::from_config(&raw) {
            Some(v) => v,
            None => {
                debug!(group = %self.path, key, raw = %raw, "value did not parse, using default");
                default
            }
        }
    }

    /// String read with a borrowed default.
    pub fn read_string(&self, key: &str, default: &str) -> String {
        self.read_raw(key).unwrap_or_else(|| default.to_string())
    }

    /// `,`-separated list read.
    pub fn read_list(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.read_raw(key) {
            Some(raw) => split_list(&raw),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Path read. The value is always environment-expanded.
    pub fn read_path_entry(&self, key: &str, default: &str) -> String {
        match self.resolve(key) {
            Some(r) => expand_env(&r.value),
            None => default.to_string(),
        }
    }

    /// `;`-separated XDG list read.
    pub fn read_xdg_list_entry(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.read_raw(key) {
            Some(raw) => split_xdg_list(&raw),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Write `value` to `key` and mark it for the next sync.
    pub fn write_entry(&self, key: &str, value: impl ToConfig) -> WriteStatus {
        self.write_entry_with(key, value, WriteFlags::default())
    }

    /// Write `value` to `key` with explicit flags.
    pub fn write_entry_with(
        &self,
        key: &str,
        value: impl ToConfig,
        flags: WriteFlags,
    ) -> WriteStatus {
        self.write_raw(key, &value.to_config(), false, flags)
    }

    /// Write a list with `,` separators.
    pub fn write_list<S: AsRef<str>>(&self, key: &str, items: &[S]) -> WriteStatus {
        self.write_raw(key, &join_list(items), false, WriteFlags::default())
    }

    /// Write a path. A leading home directory is stored as `$HOME` and the
    /// entry is flagged for expansion.
    pub fn write_path_entry(&self, key: &str, path: &str, flags: WriteFlags) -> WriteStatus {
        let home = env::var_os("HOME").map(PathBuf::from);
        self.write_raw(key, &translate_path(path, home.as_deref()), true, flags)
    }

    /// Write a `;`-separated XDG list.
    pub fn write_xdg_list_entry<S: AsRef<str>>(
        &self,
        key: &str,
        items: &[S],
        flags: WriteFlags,
    ) -> WriteStatus {
        self.write_raw(key, &join_xdg_list(items), false, flags)
    }

    /// Store a raw value.
    fn write_raw(&self, key: &str, raw: &str, expand: bool, flags: WriteFlags) -> WriteStatus {
        self.with(WriteStatus::NoConfig, |st| {
            let key = entry_key(st, key, flags);
            st.store.write(&self.path, &key, raw, flags.options(expand))
        })
    }

    /// Delete `key`. Lower-precedence values stay hidden after a sync.
    pub fn delete_entry(&self, key: &str) -> WriteStatus {
        self.delete_entry_with(key, WriteFlags::default())
    }

    /// Delete `key` with explicit flags.
    pub fn delete_entry_with(&self, key: &str, flags: WriteFlags) -> WriteStatus {
        self.with(WriteStatus::NoConfig, |st| {
            let key = entry_key(st, key, flags);
            st.store.delete(&self.path, &key, flags.options(false))
        })
    }

    /// Drop the user's value for `key`, exposing the default again.
    pub fn revert_to_default(&self, key: &str) -> WriteStatus {
        self.revert_to_default_with(key, WriteFlags::default())
    }

    /// Revert with explicit flags; only `NOTIFY` is meaningful.
    pub fn revert_to_default_with(&self, key: &str, flags: WriteFlags) -> WriteStatus {
        self.with(WriteStatus::NoConfig, |st| {
            st.store
                .revert(&self.path, key, flags.contains(WriteFlags::NOTIFY))
        })
    }

    /// Delete every entry in this group and its sub-groups.
    pub fn delete_group(&self) -> WriteStatus {
        self.delete_group_with(WriteFlags::default())
    }

    /// Delete the group with explicit flags.
    pub fn delete_group_with(&self, flags: WriteFlags) -> WriteStatus {
        self.with(WriteStatus::NoConfig, |st| {
            st.store.delete_group(&self.path, flags.options(false))
        })
    }

    /// True when this group or a sub-group holds a live entry.
    pub fn exists(&self) -> bool {
        self.with(false, |st| st.store.has_live_entries(&self.path))
    }

    /// Names of the direct sub-groups holding live entries.
    pub fn group_list(&self) -> Vec<String> {
        self.with(Vec::new(), |st| st.store.sub_groups(&self.path))
    }

    /// True when the named sub-group holds live entries.
    pub fn has_group(&self, name: &str) -> bool {
        self.group(name).is_ok_and(|g| g.exists())
    }

    /// Sorted keys with a live value in this group.
    pub fn key_list(&self) -> Vec<String> {
        self.entry_map().into_keys().collect()
    }

    /// Live entries of this group, sorted by key, values expanded.
    pub fn entry_map(&self) -> BTreeMap<String, String> {
        let keys: BTreeSet<String> = self.with(BTreeSet::new(), |st| {
            st.store
                .entries_under(&self.path)
                .filter(|(_, e)| !e.is_deleted() || st.read_defaults)
                .map(|(k, _)| k.key.clone())
                .collect()
        });
        keys.into_iter()
            .filter_map(|k| self.read_raw(&k).map(|v| (k, v)))
            .collect()
    }

    /// True when `key` resolves to a value.
    pub fn has_key(&self, key: &str) -> bool {
        self.resolve(key).is_some()
    }

    /// True when the non-writable sources give `key` a value.
    pub fn has_default(&self, key: &str) -> bool {
        self.with(false, |st| {
            st.store
                .lookup(&self.path, key, st.locale.tags(), true)
                .is_some()
        })
    }

    /// True when the group, an ancestor or the whole config is locked.
    pub fn is_immutable(&self) -> bool {
        self.with(false, |st| {
            st.immutable || st.store.is_group_immutable(&self.path)
        })
    }

    /// True when `key` cannot be written.
    pub fn is_entry_immutable(&self, key: &str) -> bool {
        self.with(false, |st| {
            st.immutable || st.store.is_immutable(&self.path, key)
        })
    }

    /// Copy every live entry of this group and its sub-groups into `target`.
    pub fn copy_to(&self, target: &Self) -> WriteStatus {
        let Some(config) = &self.config else {
            return WriteStatus::NoConfig;
        };
        let Some(dest) = &target.config else {
            return WriteStatus::NoConfig;
        };
        let entries = config.live_entries();
        let mut status = WriteStatus::Unchanged;
        for (path, key, value, expand) in entries {
            let Some(moved) = path.rebase(&self.path, &target.path) else {
                continue;
            };
            let s = dest.with_state(|st| {
                st.store
                    .write(&moved, &key, &value, WriteFlags::default().options(expand))
            });
            if s == WriteStatus::Written {
                status = s;
            }
        }
        status
    }

    /// Move `keys` into `target`: write them there and delete them here.
    pub fn move_values_to(&self, keys: &[&str], target: &Self) -> WriteStatus {
        let (Some(config), Some(dest)) = (&self.config, &target.config) else {
            return WriteStatus::NoConfig;
        };
        if config.ptr_eq(dest) && self.path == target.path {
            return WriteStatus::Unchanged;
        }
        let mut status = WriteStatus::Unchanged;
        for &key in keys {
            let Some(resolved) = self.with(None, |st| {
                st.store.lookup(&self.path, key, &[], false)
            }) else {
                continue;
            };
            let written =
                target.write_raw(key, &resolved.value, resolved.expand, WriteFlags::default());
            if written == WriteStatus::Written {
                status = written;
            }
            self.delete_entry(key);
        }
        status
    }
}

/// Key for a write, localized when the flags ask for it.
fn entry_key(st: &State, key: &str, flags: WriteFlags) -> EntryKey {
    let locale = st.locale.primary();
    if flags.contains(WriteFlags::LOCALIZED) && !locale.is_empty() {
        EntryKey::localized(key, locale)
    } else {
        EntryKey::plain(key)
    }
}
