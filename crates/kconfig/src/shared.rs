//! Process-wide registry of shared configs.
//!
//! Opening the same name with the same flags returns handles on one config for
//! as long as any handle is alive. The registry only holds weak references.

use std::{
    collections::HashMap,
    env,
    path::Path,
    sync::{OnceLock, Weak},
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    config::{Config, State},
    error::Result,
    source::OpenFlags,
};

/// Registry key: config name and open flags.
type Key = (String, OpenFlags);

/// Weak references to live shared configs.
static REGISTRY: OnceLock<Mutex<HashMap<Key, Weak<Mutex<State>>>>> = OnceLock::new();

/// Override for the main config name.
static MAIN_NAME: OnceLock<Mutex<Option<String>>> = OnceLock::new();

/// Access the registry map.
fn registry() -> &'static Mutex<HashMap<Key, Weak<Mutex<State>>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Entry point for shared configs.
#[derive(Debug, Clone, Copy)]
pub struct SharedConfig;

impl SharedConfig {
    /// Open `name` (the main config when empty) shared across the process.
    pub fn open(name: &str, flags: OpenFlags) -> Result<Config> {
        let name = if name.is_empty() {
            main_config_name()
        } else {
            name.to_string()
        };
        let key = (name, flags);
        let mut map = registry().lock();
        if let Some(inner) = map.get(&key).and_then(Weak::upgrade) {
            trace!(name = %key.0, "reusing shared config");
            return Ok(Config::from_inner(inner));
        }
        map.retain(|_, weak| weak.strong_count() > 0);
        let config = Config::open(&key.0, flags)?;
        map.insert(key, config.downgrade());
        Ok(config)
    }

    /// Number of shared configs still alive.
    pub fn live_count() -> usize {
        registry()
            .lock()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

/// Name of the application's main config, `<program>rc` unless overridden.
pub fn main_config_name() -> String {
    if let Some(name) = MAIN_NAME.get().and_then(|m| m.lock().clone()) {
        return name;
    }
    let program = env::args_os()
        .next()
        .and_then(|a| {
            Path::new(&a)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "kconfig".to_string());
    format!("{program}rc")
}

/// Override the main config name for the rest of the process.
pub fn set_main_config_name(name: &str) {
    *MAIN_NAME.get_or_init(|| Mutex::new(None)).lock() = Some(name.to_string());
}
