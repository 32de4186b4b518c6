#![warn(missing_docs)]

//! Entry point for the `kreadconfig` binary.

mod cli;
mod error;

use std::{collections::BTreeMap, process};

use clap::Parser;
use kconfig::{Config, FromConfig, Group, GroupPath, OpenFlags};
use serde::Serialize;
use tracing::{debug, error};

use crate::{
    cli::{Cli, ReadType},
    error::{Error, Result},
};

/// What the command should do once the value has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    /// Print a line to stdout.
    Print(String),
    /// Print nothing; exit with this status.
    Status(i32),
}

/// JSON form of a group dump.
#[derive(Debug, Serialize)]
struct Dump<'a> {
    /// Config name as given on the command line.
    file: &'a str,
    /// Group path, `/`-separated.
    group: String,
    /// Entries sorted by key.
    entries: BTreeMap<String, String>,
}

fn main() {
    match run() {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}

/// Parse CLI arguments, install logging, and read the requested value.
fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(&cli.log.spec());

    let config = Config::open(&cli.file, OpenFlags::FULL)?;
    let group = config.group_at(GroupPath::from_names(&cli.group)?);
    debug!(file = %cli.file, group = %group.path(), "reading");

    if cli.json {
        let dump = Dump {
            file: &cli.file,
            group: group.path().to_string(),
            entries: group.entry_map(),
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(0);
    }

    let key = cli.key.as_deref().ok_or(Error::NoKey)?;
    match read(&group, key, &cli.default, cli.kind) {
        Output::Print(line) => {
            println!("{line}");
            Ok(0)
        }
        Output::Status(code) => Ok(code),
    }
}

/// Read `key` from `group` as `kind`, falling back to `default`.
fn read(group: &Group, key: &str, default: &str, kind: ReadType) -> Output {
    match kind {
        ReadType::Bool => {
            let fallback = bool::from_config(default).unwrap_or(false);
            Output::Status(if group.read_entry(key, fallback) { 0 } else { 1 })
        }
        ReadType::Num | ReadType::Int => {
            let fallback = i64::from_config(default).unwrap_or(0);
            Output::Print(group.read_entry(key, fallback).to_string())
        }
        ReadType::Path => Output::Print(group.read_path_entry(key, default)),
        ReadType::String => Output::Print(group.read_string(key, default)),
    }
}
