//! Typed configuration items.

use std::{fmt, mem};

use tracing::{debug, warn};

use crate::{
    config::{Config, WriteFlags},
    group::Group,
    path::GroupPath,
    value::{FromConfig, ToConfig, join_list, split_list},
};

/// A typed item value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    UInt(u32),
    /// Signed 64-bit integer.
    LongLong(i64),
    /// Unsigned 64-bit integer.
    ULongLong(u64),
    /// Floating point.
    Double(f64),
    /// Index into an enum item's choices.
    Enum(usize),
    /// Text, password or path.
    String(String),
    /// List of strings.
    StringList(Vec<String>),
    /// List of integers.
    IntList(Vec<i32>),
}

/// One choice of an enum item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Identifier of the choice.
    pub name: String,
    /// Label stored in the file instead of `name`, if set.
    pub value: Option<String>,
}

impl Choice {
    /// Choice stored under its own name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Choice stored under a different label.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Label written to the file.
    pub fn label(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.name)
    }
}

/// Flavours of string item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// Plain text.
    Normal,
    /// Stored obscured.
    Password,
    /// Stored with `$HOME` translation and read with expansion.
    Path,
}

/// What an item holds, with the constraints of its type.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// Boolean item.
    Bool,
    /// Clamped `i32` item.
    Int {
        /// Lower bound.
        min: Option<i32>,
        /// Upper bound.
        max: Option<i32>,
    },
    /// Clamped `u32` item.
    UInt {
        /// Lower bound.
        min: Option<u32>,
        /// Upper bound.
        max: Option<u32>,
    },
    /// Clamped `i64` item.
    LongLong {
        /// Lower bound.
        min: Option<i64>,
        /// Upper bound.
        max: Option<i64>,
    },
    /// Clamped `u64` item.
    ULongLong {
        /// Lower bound.
        min: Option<u64>,
        /// Upper bound.
        max: Option<u64>,
    },
    /// Clamped `f64` item.
    Double {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// One of a fixed, ordered list of choices.
    Enum {
        /// Valid choices.
        choices: Vec<Choice>,
    },
    /// String item.
    String(StringKind),
    /// String list item.
    StringList,
    /// Integer list item.
    IntList,
}

/// Clamp `v` to optional bounds.
fn clamp<T: PartialOrd + Copy>(v: T, min: Option<T>, max: Option<T>) -> T {
    let v = match min {
        Some(m) if v < m => m,
        _ => v,
    };
    match max {
        Some(m) if v > m => m,
        _ => v,
    }
}

/// Obscure a password. The transform is its own inverse.
///
/// Characters in `0x22..=0xFFFD` map to `0x1001F - c`; everything else, and
/// anything that would land on a surrogate, is kept.
pub fn obscure(text: &str) -> String {
    text.chars()
        .map(|c| {
            let u = u32::from(c);
            if !(0x22..=0xFFFD).contains(&u) {
                return c;
            }
            char::from_u32(0x1_001F - u).unwrap_or(c)
        })
        .collect()
}

/// Listener notified with the new value.
type ItemListener = Box<dyn FnMut(&Value)>;

/// A typed value bound to one entry, with a default and change listeners.
pub struct Item {
    /// Group of the entry.
    group: GroupPath,
    /// Key of the entry.
    key: String,
    /// Identifier within a skeleton; the key unless renamed.
    name: String,
    /// Type and constraints.
    kind: ItemKind,
    /// Current in-memory value.
    value: Value,
    /// Default value.
    default: Value,
    /// Value as last read or written.
    loaded: Value,
    /// The entry was locked when last read.
    immutable: bool,
    /// Listeners in registration order.
    listeners: Vec<ItemListener>,
    /// Flags used when writing.
    write_flags: WriteFlags,
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("group", &self.group)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("default", &self.default)
            .field("immutable", &self.immutable)
            .finish()
    }
}

impl Item {
    /// Build an item. `default` must match `kind`; a mismatch is replaced by the
    /// zero value of the kind.
    pub fn new(group: GroupPath, key: impl Into<String>, kind: ItemKind, default: Value) -> Self {
        let default = if value_matches(&kind, &default) {
            default
        } else {
            warn!(?kind, ?default, "default does not match item kind");
            zero_value(&kind)
        };
        let key = key.into();
        Self {
            group,
            name: key.clone(),
            key,
            kind,
            value: default.clone(),
            loaded: default.clone(),
            default,
            immutable: false,
            listeners: Vec::new(),
            write_flags: WriteFlags::default(),
        }
    }

    /// Boolean item.
    pub fn bool(group: GroupPath, key: &str, default: bool) -> Self {
        Self::new(group, key, ItemKind::Bool, Value::Bool(default))
    }

    /// `i32` item with optional bounds.
    pub fn int(
        group: GroupPath,
        key: &str,
        default: i32,
        min: Option<i32>,
        max: Option<i32>,
    ) -> Self {
        Self::new(group, key, ItemKind::Int { min, max }, Value::Int(default))
    }

    /// `u32` item with optional bounds.
    pub fn uint(
        group: GroupPath,
        key: &str,
        default: u32,
        min: Option<u32>,
        max: Option<u32>,
    ) -> Self {
        Self::new(group, key, ItemKind::UInt { min, max }, Value::UInt(default))
    }

    /// `i64` item with optional bounds.
    pub fn long_long(
        group: GroupPath,
        key: &str,
        default: i64,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        Self::new(group, key, ItemKind::LongLong { min, max }, Value::LongLong(default))
    }

    /// `u64` item with optional bounds.
    pub fn ulong_long(
        group: GroupPath,
        key: &str,
        default: u64,
        min: Option<u64>,
        max: Option<u64>,
    ) -> Self {
        Self::new(group, key, ItemKind::ULongLong { min, max }, Value::ULongLong(default))
    }

    /// `f64` item with optional bounds.
    pub fn double(
        group: GroupPath,
        key: &str,
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::new(group, key, ItemKind::Double { min, max }, Value::Double(default))
    }

    /// Enum item defaulting to choice index `default`.
    pub fn enumeration(group: GroupPath, key: &str, choices: Vec<Choice>, default: usize) -> Self {
        Self::new(group, key, ItemKind::Enum { choices }, Value::Enum(default))
    }

    /// String item.
    pub fn string(group: GroupPath, key: &str, kind: StringKind, default: &str) -> Self {
        Self::new(group, key, ItemKind::String(kind), Value::String(default.to_string()))
    }

    /// String list item.
    pub fn string_list(group: GroupPath, key: &str, default: Vec<String>) -> Self {
        Self::new(group, key, ItemKind::StringList, Value::StringList(default))
    }

    /// Integer list item.
    pub fn int_list(group: GroupPath, key: &str, default: Vec<i32>) -> Self {
        Self::new(group, key, ItemKind::IntList, Value::IntList(default))
    }

    /// Group of the bound entry.
    pub fn group(&self) -> &GroupPath {
        &self.group
    }

    /// Key of the bound entry.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identifier within a skeleton.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the item within its skeleton.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Type and constraints.
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// Flags used when writing the entry.
    pub fn set_write_flags(&mut self, flags: WriteFlags) {
        self.write_flags = flags;
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Default value.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// True when the entry was locked when last read.
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// True when the current value equals the default.
    pub fn is_default(&self) -> bool {
        self.value == self.default
    }

    /// True when the current value differs from what was last read or written.
    pub fn is_save_needed(&self) -> bool {
        self.value != self.loaded
    }

    /// Register a listener for value changes made through this item.
    pub fn on_change(&mut self, listener: impl FnMut(&Value) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Set the current value. Listeners run in registration order when the value
    /// changes. Returns false when the value was rejected or unchanged.
    pub fn set_value(&mut self, value: Value) -> bool {
        if !value_matches(&self.kind, &value) {
            warn!(key = %self.key, ?value, "value does not match item kind");
            return false;
        }
        let value = self.constrain(value);
        if value == self.value {
            return false;
        }
        self.value = value;
        for listener in &mut self.listeners {
            listener(&self.value);
        }
        true
    }

    /// Reset the current value to the default.
    pub fn set_default(&mut self) {
        let default = self.default.clone();
        self.set_value(default);
    }

    /// Exchange the current value and the default.
    pub fn swap_default(&mut self) {
        mem::swap(&mut self.value, &mut self.default);
    }

    /// Handle on the bound group in `config`.
    fn bound_group(&self, config: &Config) -> Group {
        config.group_at(self.group.clone())
    }

    /// Load the current value from `config`, falling back to the default.
    pub fn read_config(&mut self, config: &Config) {
        let group = self.bound_group(config);
        let raw = match self.kind {
            ItemKind::String(StringKind::Path) => group
                .has_key(&self.key)
                .then(|| group.read_path_entry(&self.key, "")),
            _ => group.read_raw(&self.key),
        };
        let value = raw
            .and_then(|r| {
                let decoded = self.decode(&r);
                if decoded.is_none() {
                    debug!(key = %self.key, raw = %r, "stored value did not parse, using default");
                }
                decoded
            })
            .map_or_else(|| self.default.clone(), |v| self.constrain(v));
        self.value = value.clone();
        self.loaded = value;
        self.immutable = group.is_entry_immutable(&self.key);
    }

    /// Replace the default with the value the non-writable sources give the entry.
    pub fn read_default(&mut self, config: &Config) {
        let group = self.bound_group(config);
        if let Some(v) = group.read_default_raw(&self.key).and_then(|r| self.decode(&r)) {
            self.default = self.constrain(v);
        }
    }

    /// Push the current value to `config` if it changed since the last read.
    ///
    /// A value equal to the default, with no lower-layer default to shadow and
    /// `write_defaults` off, is reverted instead of written. Writes to a locked
    /// entry are dropped silently.
    pub fn write_config(&mut self, config: &Config, write_defaults: bool) {
        if self.value == self.loaded {
            return;
        }
        let group = self.bound_group(config);
        if self.value == self.default && !write_defaults && !group.has_default(&self.key) {
            group.revert_to_default_with(&self.key, self.write_flags);
        } else if let ItemKind::String(StringKind::Path) = self.kind {
            if let Value::String(path) = &self.value {
                group.write_path_entry(&self.key, path, self.write_flags);
            }
        } else {
            group.write_entry_with(&self.key, self.encode(&self.value), self.write_flags);
        }
        self.loaded = self.value.clone();
    }

    /// Apply the kind's bounds to `value`.
    fn constrain(&self, value: Value) -> Value {
        match (&self.kind, value) {
            (ItemKind::Int { min, max }, Value::Int(v)) => Value::Int(clamp(v, *min, *max)),
            (ItemKind::UInt { min, max }, Value::UInt(v)) => Value::UInt(clamp(v, *min, *max)),
            (ItemKind::LongLong { min, max }, Value::LongLong(v)) => {
                Value::LongLong(clamp(v, *min, *max))
            }
            (ItemKind::ULongLong { min, max }, Value::ULongLong(v)) => {
                Value::ULongLong(clamp(v, *min, *max))
            }
            (ItemKind::Double { min, max }, Value::Double(v)) => {
                Value::Double(clamp(v, *min, *max))
            }
            (ItemKind::Enum { choices }, Value::Enum(i)) if i >= choices.len() => {
                self.default.clone()
            }
            (_, v) => v,
        }
    }

    /// Parse a stored value for this item's kind.
    fn decode(&self, raw: &str) -> Option<Value> {
        Some(match &self.kind {
            ItemKind::Bool => Value::Bool(bool::from_config(raw)?),
            ItemKind::Int { .. } => Value::Int(i32::from_config(raw)?),
            ItemKind::UInt { .. } => Value::UInt(u32::from_config(raw)?),
            ItemKind::LongLong { .. } => Value::LongLong(i64::from_config(raw)?),
            ItemKind::ULongLong { .. } => Value::ULongLong(u64::from_config(raw)?),
            ItemKind::Double { .. } => Value::Double(f64::from_config(raw)?),
            ItemKind::Enum { choices } => {
                let trimmed = raw.trim();
                match choices
                    .iter()
                    .position(|c| c.label().eq_ignore_ascii_case(trimmed))
                {
                    Some(i) => Value::Enum(i),
                    None => Value::Enum(usize::from_config(trimmed)?),
                }
            }
            ItemKind::String(StringKind::Password) => Value::String(obscure(raw)),
            ItemKind::String(_) => Value::String(raw.to_string()),
            ItemKind::StringList => Value::StringList(split_list(raw)),
            ItemKind::IntList => Value::IntList(Vec::<i32>::from_config(raw)?),
        })
    }

    /// Render a value for storage.
    fn encode(&self, value: &Value) -> String {
        match (value, &self.kind) {
            (Value::Enum(i), ItemKind::Enum { choices }) => choices
                .get(*i)
                .map_or_else(|| i.to_string(), |c| c.label().to_string()),
            (Value::String(s), ItemKind::String(StringKind::Password)) => obscure(s),
            (Value::Bool(v), _) => v.to_config(),
            (Value::Int(v), _) => v.to_config(),
            (Value::UInt(v), _) => v.to_config(),
            (Value::LongLong(v), _) => v.to_config(),
            (Value::ULongLong(v), _) => v.to_config(),
            (Value::Double(v), _) => v.to_config(),
            (Value::Enum(i), _) => i.to_config(),
            (Value::String(s), _) => s.clone(),
            (Value::StringList(v), _) => join_list(v),
            (Value::IntList(v), _) => v.to_config(),
        }
    }
}

/// True when `value` is the variant `kind` holds.
fn value_matches(kind: &ItemKind, value: &Value) -> bool {
    matches!(
        (kind, value),
        (ItemKind::Bool, Value::Bool(_))
            | (ItemKind::Int { .. }, Value::Int(_))
            | (ItemKind::UInt { .. }, Value::UInt(_))
            | (ItemKind::LongLong { .. }, Value::LongLong(_))
            | (ItemKind::ULongLong { .. }, Value::ULongLong(_))
            | (ItemKind::Double { .. }, Value::Double(_))
            | (ItemKind::Enum { .. }, Value::Enum(_))
            | (ItemKind::String(_), Value::String(_))
            | (ItemKind::StringList, Value::StringList(_))
            | (ItemKind::IntList, Value::IntList(_))
    )
}

/// Zero value for `kind`.
fn zero_value(kind: &ItemKind) -> Value {
    match kind {
        ItemKind::Bool => Value::Bool(false),
        ItemKind::Int { .. } => Value::Int(0),
        ItemKind::UInt { .. } => Value::UInt(0),
        ItemKind::LongLong { .. } => Value::LongLong(0),
        ItemKind::ULongLong { .. } => Value::ULongLong(0),
        ItemKind::Double { .. } => Value::Double(0.0),
        ItemKind::Enum { .. } => Value::Enum(0),
        ItemKind::String(_) => Value::String(String::new()),
        ItemKind::StringList => Value::StringList(Vec::new()),
        ItemKind::IntList => Value::IntList(Vec::new()),
    }
}
