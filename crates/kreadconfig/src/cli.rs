//! Command-line interface definitions for kreadconfig.

use clap::{Parser, ValueEnum};
use kconfig::GLOBALS_NAME;
use logging::LogArgs;

/// Command-line interface for the `kreadconfig` binary.
#[derive(Parser, Debug)]
#[command(
    name = "kreadconfig",
    about = "Read an entry from a layered INI configuration",
    version
)]
pub struct Cli {
    /// Logging controls shared across the kconfig tools.
    #[command(flatten)]
    pub log: LogArgs,

    /// Config name or absolute path.
    #[arg(long, default_value = GLOBALS_NAME)]
    pub file: String,

    /// Group to look in; repeat for nested groups.
    #[arg(long, value_name = "GROUP")]
    pub group: Vec<String>,

    /// Key to read.
    #[arg(long, required_unless_present = "json")]
    pub key: Option<String>,

    /// Value used when the key is absent.
    #[arg(long, default_value = "")]
    pub default: String,

    /// How to interpret the value.
    #[arg(long = "type", value_enum, default_value_t = ReadType::String)]
    pub kind: ReadType,

    /// Print every entry of the group as a JSON object instead.
    #[arg(long)]
    pub json: bool,
}

/// Value interpretations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReadType {
    /// Exit status 0 for true, 1 for false.
    Bool,
    /// Integer.
    Num,
    /// Integer; alias of `num`.
    Int,
    /// Path with environment expansion.
    Path,
    /// Plain string.
    String,
}
