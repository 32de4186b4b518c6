//! Cascading INI configuration engine.
//!
//! A [`Config`] merges several INI files, from vendor defaults up to the user's
//! own file, into one view. Reads see the highest-precedence value; writes land
//! in the user file on [`Config::sync`], editing it in place so comments and
//! unrelated lines survive. Groups, locks (`[$i]`), tombstones (`[$d]`),
//! environment expansion (`[$e]`) and localized variants (`key[de]`) follow the
//! KDE config file format.
//!
//! ```no_run
//! use kconfig::{Config, OpenFlags};
//!
//! let config = Config::open("kdeglobals", OpenFlags::FULL)?;
//! let general = config.group("General")?;
//! let bell = general.read_entry("UseSystemBell", false);
//! general.write_entry("UseSystemBell", !bell);
//! config.sync();
//! # Ok::<(), kconfig::Error>(())
//! ```
#![warn(missing_docs)]

mod cascade;
mod config;
mod entry;
mod error;
mod escape;
mod group;
mod ini;
mod locale;
mod path;
mod shared;
pub mod skeleton;
mod source;
mod store;
pub mod value;

#[cfg(test)]
mod test_document;
#[cfg(test)]
mod test_skeleton;
#[cfg(test)]
mod test_store;

pub use cascade::{Layer, Merged, load_layers, merge, resolve};
pub use config::{AccessMode, Config, ConfigBuilder, Notice, WriteFlags};
pub use entry::{Entry, EntryFlags, EntryKey};
pub use error::{Diagnostic, Error, Result};
pub use group::Group;
pub use ini::{Action, Change, IniDocument, IniFile, Record};
pub use locale::LocaleChain;
pub use path::{GroupPath, SEPARATOR};
pub use shared::{SharedConfig, main_config_name, set_main_config_name};
pub use skeleton::{Choice, Item, ItemKind, Skeleton, StringKind, Value};
pub use source::{
    ConfigSource, DirLocator, GLOBALS_NAME, Locate, OpenFlags, Precedence, SourceKind, XdgLocator,
};
pub use store::{Resolved, Store, WriteOptions, WriteStatus};
pub use value::{FromConfig, ToConfig};
