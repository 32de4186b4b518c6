//! Individual configuration entries and their metadata flags.

use bitflags::bitflags;

bitflags! {
    /// Per-entry metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntryFlags: u8 {
        /// Changed in memory and not yet synced to the writable source.
        const DIRTY = 1 << 0;
        /// Locked by some source; later sources and application writes are ignored.
        const IMMUTABLE = 1 << 1;
        /// Tombstone: the key is absent in the merged view.
        const DELETED = 1 << 2;
        /// The current value came from a non-writable source.
        const DEFAULTED = 1 << 3;
        /// The raw value is subject to `$VAR` environment expansion on read.
        const EXPAND = 1 << 4;
        /// Listeners are told about this entry on the next sync.
        const NOTIFY = 1 << 5;
        /// The entry was reverted to its default and should leave the writable source.
        const REVERTED = 1 << 6;
    }
}

/// Identity of an entry within one group: key plus optional locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    /// Case-sensitive key name.
    pub key: String,
    /// Locale tag for a localized variant, e.g. `de_DE`.
    pub locale: Option<String>,
}

impl EntryKey {
    /// Key without locale.
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            locale: None,
        }
    }

    /// Localized key.
    pub fn localized(key: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            locale: Some(locale.into()),
        }
    }
}

/// A single stored value with its flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    /// Raw, unescaped string value. Empty for tombstones.
    pub value: String,
    /// Metadata flags.
    pub flags: EntryFlags,
    /// Value contributed by the non-writable sources, if any.
    pub default: Option<String>,
}

impl Entry {
    /// A fresh entry holding `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// True when the entry is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.flags.contains(EntryFlags::DELETED)
    }

    /// True when the entry is locked.
    pub fn is_immutable(&self) -> bool {
        self.flags.contains(EntryFlags::IMMUTABLE)
    }

    /// True when the entry has unsynced changes.
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(EntryFlags::DIRTY)
    }

    /// True when the current value came from a non-writable source.
    pub fn is_defaulted(&self) -> bool {
        self.flags.contains(EntryFlags::DEFAULTED)
    }

    /// True when the raw value should be environment-expanded.
    pub fn expands(&self) -> bool {
        self.flags.contains(EntryFlags::EXPAND)
    }
}
