//! Config sources and how they are located on disk.

use std::{
    collections::HashMap,
    env, fmt,
    path::{Path, PathBuf},
};

use bitflags::bitflags;

/// File name of the shared cross-application config.
pub const GLOBALS_NAME: &str = "kdeglobals";

/// The kinds of source that contribute to one config, lowest default precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Install-time vendor defaults.
    Defaults,
    /// Administrator overrides.
    System,
    /// The shared cross-application file. Read-only to every other config.
    Globals,
    /// The user's file, the only write target.
    User,
    /// In-process overlay. Never persisted.
    Runtime,
}

impl SourceKind {
    /// Every kind, lowest default precedence first.
    pub const ALL: [Self; 5] = [
        Self::Defaults,
        Self::System,
        Self::Globals,
        Self::User,
        Self::Runtime,
    ];

    /// True for the one kind that writes go to.
    pub fn is_writable(self) -> bool {
        self == Self::User
    }

    /// Lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Defaults => "defaults",
            Self::System => "system",
            Self::Globals => "globals",
            Self::User => "user",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Which source kinds a config opens beyond the user file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u8 {
        /// User file only.
        const SIMPLE = 0;
        /// Also read the shared globals file.
        const INCLUDE_GLOBALS = 1 << 0;
        /// Also read vendor defaults and administrator overrides.
        const CASCADE = 1 << 1;
        /// Everything.
        const FULL = Self::INCLUDE_GLOBALS.bits() | Self::CASCADE.bits();
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::FULL
    }
}

impl OpenFlags {
    /// True when a source of `kind` takes part in a config opened with these flags.
    pub fn includes(self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Defaults | SourceKind::System => self.contains(Self::CASCADE),
            SourceKind::Globals => self.contains(Self::INCLUDE_GLOBALS),
            SourceKind::User | SourceKind::Runtime => true,
        }
    }
}

/// One contributing source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    /// What role the source plays.
    pub kind: SourceKind,
    /// Backing file. `None` for the runtime overlay.
    pub path: Option<PathBuf>,
}

/// Ordered list of source kinds, lowest precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precedence {
    /// Kinds without duplicates.
    kinds: Vec<SourceKind>,
}

impl Default for Precedence {
    fn default() -> Self {
        Self {
            kinds: SourceKind::ALL.to_vec(),
        }
    }
}

impl Precedence {
    /// Build a precedence order. Later duplicates are ignored.
    pub fn new(kinds: impl IntoIterator<Item = SourceKind>) -> Self {
        let mut out: Vec<SourceKind> = Vec::new();
        for k in kinds {
            if !out.contains(&k) {
                out.push(k);
            }
        }
        Self { kinds: out }
    }

    /// Kinds, lowest precedence first.
    pub fn kinds(&self) -> &[SourceKind] {
        &self.kinds
    }
}

/// Resolves a config name to a file for each source kind.
pub trait Locate: fmt::Debug + Send + Sync {
    /// Path of the `kind` source for `name`, or `None` when that kind has no file.
    fn locate(&self, name: &str, kind: SourceKind) -> Option<PathBuf>;
}

/// Absolute names only resolve to the user kind.
fn locate_absolute(name: &str, kind: SourceKind) -> Option<Option<PathBuf>> {
    let p = Path::new(name);
    if !p.is_absolute() {
        return None;
    }
    Some((kind == SourceKind::User).then(|| p.to_path_buf()))
}

/// Locator following the XDG base directory layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XdgLocator {
    /// `$XDG_CONFIG_HOME`.
    config_home: PathBuf,
    /// `$XDG_CONFIG_DIRS`, most important first.
    config_dirs: Vec<PathBuf>,
    /// Vendor defaults directory, if any.
    defaults_dir: Option<PathBuf>,
    /// File name of the shared globals file.
    globals_name: String,
}

impl XdgLocator {
    /// Locator with explicit directories.
    pub fn new(config_home: impl Into<PathBuf>, config_dirs: Vec<PathBuf>) -> Self {
        Self {
            config_home: config_home.into(),
            config_dirs,
            defaults_dir: None,
            globals_name: GLOBALS_NAME.to_string(),
        }
    }

    /// Locator from `XDG_CONFIG_HOME`, `HOME` and `XDG_CONFIG_DIRS`.
    pub fn from_env() -> Self {
        let config_home = env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config")
            });
        let config_dirs = env::var("XDG_CONFIG_DIRS")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.split(':')
                    .filter(|d| !d.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_else(|| vec![PathBuf::from("/etc/xdg")]);
        Self::new(config_home, config_dirs)
    }

    /// Read vendor defaults from `dir`.
    pub fn with_defaults_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.defaults_dir = Some(dir.into());
        self
    }

    /// Use `name` as the shared globals file.
    pub fn with_globals_name(mut self, name: impl Into<String>) -> Self {
        self.globals_name = name.into();
        self
    }

    /// The user config directory.
    pub fn config_home(&self) -> &Path {
        &self.config_home
    }
}

impl Locate for XdgLocator {
    fn locate(&self, name: &str, kind: SourceKind) -> Option<PathBuf> {
        if let Some(abs) = locate_absolute(name, kind) {
            return abs;
        }
        match kind {
            SourceKind::User => Some(self.config_home.join(name)),
            SourceKind::System => self
                .config_dirs
                .iter()
                .map(|d| d.join(name))
                .find(|p| p.is_file()),
            SourceKind::Globals => {
                (name != self.globals_name).then(|| self.config_home.join(&self.globals_name))
            }
            SourceKind::Defaults => self.defaults_dir.as_ref().map(|d| d.join(name)),
            SourceKind::Runtime => None,
        }
    }
}

/// Locator with one explicit directory per source kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirLocator {
    /// Directory for each kind.
    dirs: HashMap<SourceKind, PathBuf>,
    /// File name of the shared globals file.
    globals_name: Option<String>,
}

impl DirLocator {
    /// Locator with no directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `kind` to files in `dir`.
    pub fn with(mut self, kind: SourceKind, dir: impl Into<PathBuf>) -> Self {
        self.dirs.insert(kind, dir.into());
        self
    }

    /// Use `name` as the shared globals file.
    pub fn with_globals_name(mut self, name: impl Into<String>) -> Self {
        self.globals_name = Some(name.into());
        self
    }
}

impl Locate for DirLocator {
    fn locate(&self, name: &str, kind: SourceKind) -> Option<PathBuf> {
        if let Some(abs) = locate_absolute(name, kind) {
            return abs;
        }
        let dir = self.dirs.get(&kind)?;
        if kind == SourceKind::Globals {
            let globals = self.globals_name.as_deref().unwrap_or(GLOBALS_NAME);
            return (name != globals).then(|| dir.join(globals));
        }
        Some(dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_select_kinds() {
        assert!(OpenFlags::SIMPLE.includes(SourceKind::User));
        assert!(!OpenFlags::SIMPLE.includes(SourceKind::Globals));
        assert!(OpenFlags::CASCADE.includes(SourceKind::System));
        assert!(!OpenFlags::CASCADE.includes(SourceKind::Globals));
        assert!(OpenFlags::FULL.includes(SourceKind::Defaults));
    }

    #[test]
    fn absolute_names_are_user_only() {
        let loc = XdgLocator::new("/home/u/.config", vec![PathBuf::from("/etc/xdg")]);
        assert_eq!(
            loc.locate("/tmp/app.ini", SourceKind::User),
            Some(PathBuf::from("/tmp/app.ini"))
        );
        assert_eq!(loc.locate("/tmp/app.ini", SourceKind::System), None);
        assert_eq!(
            loc.locate("apprc", SourceKind::Globals),
            Some(PathBuf::from("/home/u/.config/kdeglobals"))
        );
        assert_eq!(loc.locate("kdeglobals", SourceKind::Globals), None);
    }

    #[test]
    fn precedence_dedups() {
        let p = Precedence::new([SourceKind::User, SourceKind::System, SourceKind::User]);
        assert_eq!(p.kinds(), [SourceKind::User, SourceKind::System]);
    }
}
