//! Declarative sets of typed items bound to one config.
//!
//! A [`Skeleton`] owns its items. Loading reads every item from the config,
//! saving writes back only the items whose value changed and then syncs.

mod item;

use std::fmt;

use tracing::{debug, trace};

pub use item::{Choice, Item, ItemKind, StringKind, Value, obscure};

use crate::{
    config::Config,
    error::Result,
    path::GroupPath,
};

/// Listener run after a save that wrote to the config.
type SaveListener = Box<dyn FnMut()>;

/// A set of typed items over one config.
pub struct Skeleton {
    /// Backing config.
    config: Config,
    /// Group new items are added to.
    current_group: GroupPath,
    /// Items in insertion order.
    items: Vec<Item>,
    /// Write values equal to their default instead of reverting them.
    write_defaults: bool,
    /// Items currently hold their defaults, swapped by [`Skeleton::use_defaults`].
    showing_defaults: bool,
    /// Run after a save that changed the config.
    listeners: Vec<SaveListener>,
}

impl fmt::Debug for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skeleton")
            .field("config", &self.config)
            .field("current_group", &self.current_group)
            .field("items", &self.items)
            .field("write_defaults", &self.write_defaults)
            .finish()
    }
}

impl Skeleton {
    /// Empty skeleton over `config`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            current_group: GroupPath::root(),
            items: Vec::new(),
            write_defaults: false,
            showing_defaults: false,
            listeners: Vec::new(),
        }
    }

    /// Backing config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Group that items added next are bound to, as a `/`-separated path.
    pub fn set_current_group(&mut self, group: &str) -> Result<()> {
        self.current_group = GroupPath::parse(group)?;
        Ok(())
    }

    /// Group that items added next are bound to.
    pub fn current_group(&self) -> &GroupPath {
        &self.current_group
    }

    /// Write values equal to their default instead of reverting them.
    pub fn set_write_defaults(&mut self, on: bool) {
        self.write_defaults = on;
    }

    /// Add an item and load it. An item with the same name is replaced.
    pub fn add_item(&mut self, mut item: Item) -> &mut Item {
        item.read_default(&self.config);
        item.read_config(&self.config);
        self.items.retain(|i| i.name() != item.name());
        let idx = self.items.len();
        self.items.push(item);
        &mut self.items[idx]
    }

    /// Add a boolean item in the current group.
    pub fn add_bool(&mut self, key: &str, default: bool) -> &mut Item {
        let item = Item::bool(self.current_group.clone(), key, default);
        self.add_item(item)
    }

    /// Add an `i32` item in the current group.
    pub fn add_int(&mut self, key: &str, default: i32) -> &mut Item {
        let item = Item::int(self.current_group.clone(), key, default, None, None);
        self.add_item(item)
    }

    /// Add an `f64` item in the current group.
    pub fn add_double(&mut self, key: &str, default: f64) -> &mut Item {
        let item = Item::double(self.current_group.clone(), key, default, None, None);
        self.add_item(item)
    }

    /// Add a plain string item in the current group.
    pub fn add_string(&mut self, key: &str, default: &str) -> &mut Item {
        let item = Item::string(self.current_group.clone(), key, StringKind::Normal, default);
        self.add_item(item)
    }

    /// Add a password item in the current group.
    pub fn add_password(&mut self, key: &str, default: &str) -> &mut Item {
        let item = Item::string(self.current_group.clone(), key, StringKind::Password, default);
        self.add_item(item)
    }

    /// Add a path item in the current group.
    pub fn add_path(&mut self, key: &str, default: &str) -> &mut Item {
        let item = Item::string(self.current_group.clone(), key, StringKind::Path, default);
        self.add_item(item)
    }

    /// Add a string list item in the current group.
    pub fn add_string_list(&mut self, key: &str, default: Vec<String>) -> &mut Item {
        let item = Item::string_list(self.current_group.clone(), key, default);
        self.add_item(item)
    }

    /// Add an enum item in the current group.
    pub fn add_enum(&mut self, key: &str, choices: Vec<Choice>, default: usize) -> &mut Item {
        let item = Item::enumeration(self.current_group.clone(), key, choices, default);
        self.add_item(item)
    }

    /// Item by name.
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.name() == name)
    }

    /// Mutable item by name.
    pub fn item_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.name() == name)
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Remove and return an item.
    pub fn remove_item(&mut self, name: &str) -> Option<Item> {
        let idx = self.items.iter().position(|i| i.name() == name)?;
        Some(self.items.remove(idx))
    }

    /// Drop every item.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Register a listener run after a save that wrote to the config.
    pub fn on_config_changed(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Re-read the config from its sources, then every item.
    pub fn load(&mut self) -> Result<()> {
        self.config.reparse_configuration()?;
        self.read();
        Ok(())
    }

    /// Read every item from the in-memory config.
    pub fn read(&mut self) {
        for item in &mut self.items {
            item.read_default(&self.config);
            item.read_config(&self.config);
        }
        trace!(items = self.items.len(), "skeleton read");
    }

    /// Write changed items and sync. Returns false when the sync failed.
    pub fn save(&mut self) -> bool {
        if !self.is_save_needed() {
            return true;
        }
        for item in &mut self.items {
            item.write_config(&self.config, self.write_defaults);
        }
        if !self.config.is_dirty() {
            return true;
        }
        if !self.config.sync() {
            debug!(name = %self.config.name(), "skeleton save could not sync");
            return false;
        }
        for listener in &mut self.listeners {
            listener();
        }
        true
    }

    /// Set every item to its default.
    pub fn set_defaults(&mut self) {
        for item in &mut self.items {
            item.set_default();
        }
    }

    /// Exchange current values and defaults on every item and return the
    /// previous state.
    ///
    /// Calling with `true` shows the defaults; calling again with `false`
    /// restores the values. Repeated calls with the same flag do nothing.
    pub fn use_defaults(&mut self, on: bool) -> bool {
        if on == self.showing_defaults {
            return on;
        }
        self.showing_defaults = on;
        for item in &mut self.items {
            item.swap_default();
        }
        !on
    }

    /// True when every item holds its default.
    pub fn is_defaults(&self) -> bool {
        self.items.iter().all(Item::is_default)
    }

    /// True when some item differs from what was last read or written.
    pub fn is_save_needed(&self) -> bool {
        self.items.iter().any(Item::is_save_needed)
    }

    /// True when the item named `name` is locked, or the whole config is.
    pub fn is_immutable(&self, name: &str) -> bool {
        self.config.is_immutable() || self.item(name).is_some_and(Item::is_immutable)
    }
}
