//! Command-line interface definitions for kwriteconfig.

use clap::{Parser, ValueEnum};
use kconfig::GLOBALS_NAME;
use logging::LogArgs;

/// Command-line interface for the `kwriteconfig` binary.
#[derive(Parser, Debug)]
#[command(
    name = "kwriteconfig",
    about = "Write an entry to a layered INI configuration",
    version
)]
pub struct Cli {
    /// Logging controls shared across the kconfig tools.
    #[command(flatten)]
    pub log: LogArgs,

    /// Config name or absolute path.
    #[arg(long, default_value = GLOBALS_NAME)]
    pub file: String,

    /// Group to write to; repeat for nested groups.
    #[arg(long, value_name = "GROUP")]
    pub group: Vec<String>,

    /// Key to write.
    #[arg(long)]
    pub key: String,

    /// How to store the value.
    #[arg(long = "type", value_enum, default_value_t = WriteType::String)]
    pub kind: WriteType,

    /// Delete the key instead of writing it.
    #[arg(long, conflicts_with = "value")]
    pub delete: bool,

    /// Print `group/key` for each entry the write changed.
    #[arg(long)]
    pub notify: bool,

    /// Value to store.
    #[arg(required_unless_present = "delete")]
    pub value: Option<String>,
}

/// Value encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteType {
    /// `true` or `false`.
    Bool,
    /// Path stored relative to `$HOME` when possible.
    Path,
    /// Plain string.
    String,
}
