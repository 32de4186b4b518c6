//! The config handle: one merged view over a cascade of sources.

use std::{
    collections::BTreeMap,
    fmt,
    path::{self, Path, PathBuf},
    sync::{Arc, Weak},
};

use bitflags::bitflags;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    cascade::{load_layers, merge, resolve},
    entry::{EntryFlags, EntryKey},
    error::{Diagnostic, Error, Result},
    group::Group,
    ini::{Action, Change, IniDocument, IniFile},
    locale::LocaleChain,
    path::GroupPath,
    source::{ConfigSource, Locate, OpenFlags, Precedence, SourceKind, XdgLocator},
    store::{Store, WriteOptions, WriteStatus},
};

bitflags! {
    /// How a write through a group is recorded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WriteFlags: u8 {
        /// Persist on the next sync. Without it the change is in-memory only.
        const PERSISTENT = 1 << 0;
        /// Write the variant for the config's current locale.
        const LOCALIZED = 1 << 1;
        /// Report the entry to change listeners after the next sync.
        const NOTIFY = 1 << 2;
    }
}

impl Default for WriteFlags {
    fn default() -> Self {
        Self::PERSISTENT
    }
}

impl WriteFlags {
    /// Store-level options for a write carrying these flags.
    pub(crate) fn options(self, expand: bool) -> WriteOptions {
        WriteOptions {
            dirty: self.contains(Self::PERSISTENT),
            expand,
            notify: self.contains(Self::NOTIFY),
        }
    }
}

/// What the process may do with a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// No file backs the config.
    NoAccess,
    /// Readable but locked or not writable.
    ReadOnly,
    /// The user file can be written.
    ReadWrite,
}

/// An entry reported to change listeners after a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Group of the changed entry.
    pub group: GroupPath,
    /// Key of the changed entry.
    pub key: String,
}

/// Listener invoked after a sync that persisted entries written with `NOTIFY`.
type ChangeListener = Arc<dyn Fn(&[Notice]) + Send + Sync>;

/// Mutable state behind a [`Config`] handle.
pub(crate) struct State {
    /// Config name as passed to the locator. Empty for anonymous configs.
    name: String,
    /// Which source kinds take part.
    flags: OpenFlags,
    /// Path resolution.
    locator: Arc<dyn Locate>,
    /// Source kind order.
    precedence: Precedence,
    /// Locale fallback chain.
    pub(crate) locale: LocaleChain,
    /// Runtime overlay contents.
    overlay: Option<IniDocument>,
    /// Sources found by the last resolve.
    sources: Vec<ConfigSource>,
    /// Merged entries.
    pub(crate) store: Store,
    /// Some source locked its whole file.
    pub(crate) immutable: bool,
    /// Reads return the values from the non-writable sources.
    pub(crate) read_defaults: bool,
    /// Non-fatal problems seen so far.
    diagnostics: Vec<Diagnostic>,
    /// Change listeners in registration order.
    listeners: Vec<ChangeListener>,
}

impl State {
    /// Fresh state with an empty store. Call [`State::reload`] to fill it.
    fn new(
        name: String,
        flags: OpenFlags,
        locator: Arc<dyn Locate>,
        precedence: Precedence,
        locale: LocaleChain,
    ) -> Self {
        Self {
            name,
            flags,
            locator,
            precedence,
            locale,
            overlay: None,
            sources: Vec::new(),
            store: Store::new(),
            immutable: false,
            read_defaults: false,
            diagnostics: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Path of the writable source, if any.
    fn user_path(&self) -> Option<&Path> {
        self.sources
            .iter()
            .find(|s| s.kind == SourceKind::User)
            .and_then(|s| s.path.as_deref())
    }

    /// Re-run resolution and merging, replacing the store.
    fn reload(&mut self) -> Result<()> {
        let sources = resolve(&self.name, self.flags, self.locator.as_ref(), &self.precedence)?;
        let (layers, mut diagnostics) = load_layers(&sources, self.overlay.as_ref());
        let merged = merge(&layers, &self.locale);
        diagnostics.extend(merged.diagnostics);
        debug!(
            name = %self.name,
            sources = sources.len(),
            immutable = merged.immutable,
            "loaded config"
        );
        self.sources = sources;
        self.store = merged.store;
        self.immutable = merged.immutable;
        self.diagnostics = diagnostics;
        Ok(())
    }

    /// Document edits for every dirty entry.
    fn pending_changes(&self) -> Vec<Change> {
        self.store
            .dirty_entries()
            .map(|(group, key, entry)| {
                let action = if entry.flags.contains(EntryFlags::REVERTED) {
                    Action::Remove
                } else if entry.is_deleted() {
                    if entry.default.is_some() {
                        Action::Tombstone
                    } else {
                        Action::Remove
                    }
                } else {
                    Action::Set {
                        value: entry.value.clone(),
                        expand: entry.expands(),
                    }
                };
                Change {
                    group: group.clone(),
                    key: key.clone(),
                    action,
                }
            })
            .collect()
    }
}

/// Options for opening a [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    /// Config name.
    name: String,
    /// Source kinds to include.
    flags: OpenFlags,
    /// Path resolution; the XDG layout from the environment when unset.
    locator: Option<Arc<dyn Locate>>,
    /// Source kind order.
    precedence: Precedence,
    /// Locale; the process locale when unset.
    locale: Option<LocaleChain>,
    /// Runtime overlay contents.
    overlay: Option<IniDocument>,
}

impl ConfigBuilder {
    /// Include the source kinds selected by `flags`.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Resolve paths with `locator`.
    pub fn locator(mut self, locator: impl Locate + 'static) -> Self {
        self.locator = Some(Arc::new(locator));
        self
    }

    /// Merge sources in the order given by `precedence`.
    pub fn precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Resolve localized entries for `locale`, e.g. `de_DE`.
    pub fn locale(mut self, locale: &str) -> Self {
        self.locale = Some(LocaleChain::new(locale));
        self
    }

    /// Use `text` as the runtime overlay, merged at its place in the precedence.
    pub fn overlay(mut self, text: &str) -> Self {
        self.overlay = Some(IniDocument::parse(text));
        self
    }

    /// Resolve, read and merge the sources.
    pub fn open(self) -> Result<Config> {
        let locator = self
            .locator
            .unwrap_or_else(|| Arc::new(XdgLocator::from_env()));
        let locale = self.locale.unwrap_or_else(LocaleChain::from_env);
        let mut state = State::new(self.name, self.flags, locator, self.precedence, locale);
        state.overlay = self.overlay;
        state.reload()?;
        Ok(Config {
            inner: Arc::new(Mutex::new(state)),
        })
    }
}

/// A handle on one merged configuration. Clones share the same state.
#[derive(Clone)]
pub struct Config {
    /// Shared state.
    inner: Arc<Mutex<State>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.lock();
        f.debug_struct("Config")
            .field("name", &st.name)
            .field("flags", &st.flags)
            .field("sources", &st.sources)
            .field("immutable", &st.immutable)
            .finish()
    }
}

impl Config {
    /// Start configuring a config called `name`.
    pub fn builder(name: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            name: name.into(),
            flags: OpenFlags::FULL,
            locator: None,
            precedence: Precedence::default(),
            locale: None,
            overlay: None,
        }
    }

    /// Open `name` with the XDG layout from the environment.
    pub fn open(name: &str, flags: OpenFlags) -> Result<Self> {
        Self::builder(name).flags(flags).open()
    }

    /// An in-memory config with no backing file.
    pub fn anonymous() -> Self {
        let state = State::new(
            String::new(),
            OpenFlags::SIMPLE,
            Arc::new(XdgLocator::new(PathBuf::new(), Vec::new())),
            Precedence::default(),
            LocaleChain::default(),
        );
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Run `f` with the state locked.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Weak reference for the shared registry.
    pub(crate) fn downgrade(&self) -> Weak<Mutex<State>> {
        Arc::downgrade(&self.inner)
    }

    /// Rebuild a handle from a live registry entry.
    pub(crate) fn from_inner(inner: Arc<Mutex<State>>) -> Self {
        Self { inner }
    }

    /// True when both handles share the same state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Config name. Empty for anonymous configs.
    pub fn name(&self) -> String {
        self.with_state(|st| st.name.clone())
    }

    /// Source kinds this config was opened with.
    pub fn open_flags(&self) -> OpenFlags {
        self.with_state(|st| st.flags)
    }

    /// Sources found by the last resolve, lowest precedence first.
    pub fn sources(&self) -> Vec<ConfigSource> {
        self.with_state(|st| st.sources.clone())
    }

    /// Non-fatal problems recorded while loading and syncing.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.with_state(|st| st.diagnostics.clone())
    }

    /// The top-level group.
    pub fn root(&self) -> Group {
        Group::new(self.clone(), GroupPath::root())
    }

    /// A top-level group. Names must be non-empty and free of `/`.
    pub fn group(&self, name: &str) -> Result<Group> {
        Ok(Group::new(self.clone(), GroupPath::root().child(name)?))
    }

    /// A group at an arbitrary path.
    pub fn group_at(&self, path: GroupPath) -> Group {
        Group::new(self.clone(), path)
    }

    /// Names of the top-level groups holding live entries.
    pub fn group_list(&self) -> Vec<String> {
        self.root().group_list()
    }

    /// True when the top-level group `name` holds live entries.
    pub fn has_group(&self, name: &str) -> bool {
        self.group(name).is_ok_and(|g| g.exists())
    }

    /// Live entries of the top-level group `name`, sorted by key.
    pub fn entry_map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.group(name)?.entry_map())
    }

    /// Tombstone every entry of the top-level group `name`.
    pub fn delete_group(&self, name: &str, flags: WriteFlags) -> Result<WriteStatus> {
        Ok(self.group(name)?.delete_group_with(flags))
    }

    /// Current locale tag, e.g. `de_DE`.
    pub fn locale(&self) -> String {
        self.with_state(|st| st.locale.primary().to_string())
    }

    /// Switch locale and reload. Unsynced changes are discarded.
    pub fn set_locale(&self, locale: &str) -> Result<bool> {
        let chain = LocaleChain::new(locale);
        let mut st = self.inner.lock();
        if st.locale == chain {
            return Ok(false);
        }
        st.locale = chain;
        st.reload()?;
        Ok(true)
    }

    /// Replace the runtime overlay and reload. Unsynced changes are discarded.
    pub fn set_overlay(&self, text: &str) -> Result<()> {
        let mut st = self.inner.lock();
        st.overlay = Some(IniDocument::parse(text));
        st.reload()
    }

    /// Make reads return the values contributed by the non-writable sources.
    pub fn set_read_defaults(&self, on: bool) {
        self.with_state(|st| st.read_defaults = on);
    }

    /// True when reads return default values.
    pub fn read_defaults(&self) -> bool {
        self.with_state(|st| st.read_defaults)
    }

    /// True when some source locked its whole file.
    pub fn is_immutable(&self) -> bool {
        self.with_state(|st| st.immutable)
    }

    /// True when entries await a sync.
    pub fn is_dirty(&self) -> bool {
        self.with_state(|st| st.store.is_dirty())
    }

    /// Forget pending changes without writing them. Values stay as set.
    pub fn mark_as_clean(&self) {
        self.with_state(|st| st.store.mark_clean());
    }

    /// What the process may do with this config.
    pub fn access_mode(&self) -> AccessMode {
        self.with_state(|st| match st.user_path() {
            None => AccessMode::NoAccess,
            Some(_) if st.immutable => AccessMode::ReadOnly,
            Some(p) if IniFile::new(p).is_writable() => AccessMode::ReadWrite,
            Some(_) => AccessMode::ReadOnly,
        })
    }

    /// Register a listener for entries written with [`WriteFlags::NOTIFY`].
    ///
    /// Listeners run after a sync that persisted such entries, in registration
    /// order, with the config unlocked.
    pub fn on_change(&self, listener: impl Fn(&[Notice]) + Send + Sync + 'static) {
        self.with_state(|st| st.listeners.push(Arc::new(listener)));
    }

    /// Write pending changes to the user file.
    ///
    /// Returns false for anonymous or locked configs and when the write failed;
    /// failures are logged and recorded as diagnostics.
    pub fn sync(&self) -> bool {
        match self.try_sync() {
            Ok(done) => done,
            Err(e) => {
                warn!("config sync failed: {}", e);
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                self.with_state(|st| {
                    st.diagnostics.push(Diagnostic::BackendUnavailable {
                        path,
                        message: e.to_string(),
                    });
                });
                false
            }
        }
    }

    /// Write pending changes to the user file, surfacing I/O errors.
    ///
    /// The file on disk is re-read and only the dirty entries are applied to it,
    /// so comments and concurrent edits to other keys survive. Nothing is
    /// written when no entry is dirty or the result is byte-identical.
    pub fn try_sync(&self) -> Result<bool> {
        let (notices, listeners) = {
            let mut st = self.inner.lock();
            if st.name.is_empty() || st.immutable {
                return Ok(false);
            }
            if !st.store.is_dirty() {
                return Ok(true);
            }
            let Some(path) = st.user_path().map(Path::to_path_buf) else {
                return Ok(false);
            };
            let file = IniFile::new(&path);
            let mut doc = file.load()?;
            if doc.is_immutable() {
                warn!("{} was locked on disk, not writing", path.display());
                return Ok(false);
            }
            let before = doc.serialize();
            doc.apply(&st.pending_changes());
            if doc.serialize() != before {
                file.write_atomic(&doc)?;
            } else {
                debug!("{} unchanged, skipping write", path.display());
            }
            let notices: Vec<Notice> = st
                .store
                .dirty_entries()
                .filter(|(_, _, e)| e.flags.contains(EntryFlags::NOTIFY))
                .map(|(group, key, _)| Notice {
                    group: group.clone(),
                    key: key.key.clone(),
                })
                .collect();
            st.store.mark_clean();
            (notices, st.listeners.clone())
        };
        if !notices.is_empty() {
            for listener in &listeners {
                listener(&notices);
            }
        }
        Ok(true)
    }

    /// Re-resolve and re-read every source. Unsynced changes are discarded.
    pub fn reparse_configuration(&self) -> Result<()> {
        self.inner.lock().reload()
    }

    /// Copy every live entry into a new config backed by `path`.
    ///
    /// The copy's entries are dirty, so syncing it writes the file.
    pub fn copy_to(&self, target: &Path) -> Result<Self> {
        let target = path::absolute(target).map_err(|e| Error::io(target, &e))?;
        let name = target.to_string_lossy().into_owned();
        let (locator, locale) = self.with_state(|st| (Arc::clone(&st.locator), st.locale.clone()));
        let mut state = State::new(
            name,
            OpenFlags::SIMPLE,
            locator,
            Precedence::new([SourceKind::User]),
            locale,
        );
        state.reload()?;
        let entries = self.live_entries();
        for (group, key, value, expand) in entries {
            state
                .store
                .write(&group, &key, &value, WriteFlags::PERSISTENT.options(expand));
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(state)),
        })
    }

    /// Every non-deleted entry with its group, in store order.
    pub(crate) fn live_entries(&self) -> Vec<(GroupPath, EntryKey, String, bool)> {
        self.with_state(|st| {
            let paths: Vec<GroupPath> = st.store.group_paths().cloned().collect();
            let mut out = Vec::new();
            for path in paths {
                for (key, entry) in st.store.entries_under(&path) {
                    if !entry.is_deleted() {
                        out.push((path.clone(), key.clone(), entry.value.clone(), entry.expands()));
                    }
                }
            }
            out
        })
    }
}
