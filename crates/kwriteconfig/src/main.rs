#![warn(missing_docs)]

//! Entry point for the `kwriteconfig` binary.

mod cli;
mod error;

use std::{process, sync::Arc};

use clap::Parser;
use kconfig::{AccessMode, Config, FromConfig, GroupPath, OpenFlags, WriteFlags, WriteStatus};
use parking_lot::Mutex;
use tracing::{error, info};

use crate::{
    cli::{Cli, WriteType},
    error::{Error, Result},
};

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log.spec());
    match run(&cli) {
        Ok(changed) => {
            for entry in changed {
                println!("{entry}");
            }
        }
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            process::exit(err.exit_code());
        }
    }
}

/// Open the config, apply the requested write and sync it.
///
/// Returns the `group/key` of every entry the sync reported to change
/// listeners, which is empty unless `--notify` was given.
fn run(cli: &Cli) -> Result<Vec<String>> {
    let config = Config::open(&cli.file, OpenFlags::FULL)?;
    if config.access_mode() != AccessMode::ReadWrite {
        return Err(Error::NotWritable {
            file: cli.file.clone(),
        });
    }
    let group = config.group_at(GroupPath::from_names(&cli.group)?);
    if group.is_entry_immutable(&cli.key) {
        return Err(Error::Immutable {
            group: group.path().to_string(),
            key: cli.key.clone(),
        });
    }

    let changed = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut flags = WriteFlags::PERSISTENT;
    if cli.notify {
        flags |= WriteFlags::NOTIFY;
        let sink = Arc::clone(&changed);
        config.on_change(move |notices| {
            sink.lock().extend(notices.iter().map(|n| format!("{}/{}", n.group, n.key)));
        });
    }
    let status = match (&cli.value, cli.delete) {
        (_, true) | (None, _) => group.delete_entry_with(&cli.key, flags),
        (Some(value), false) => match cli.kind {
            WriteType::Bool => {
                let on = bool::from_config(value).ok_or_else(|| Error::BadBool(value.clone()))?;
                group.write_entry_with(&cli.key, on, flags)
            }
            WriteType::Path => group.write_path_entry(&cli.key, value, flags),
            WriteType::String => group.write_entry_with(&cli.key, value, flags),
        },
    };
    if status == WriteStatus::Immutable {
        return Err(Error::Immutable {
            group: group.path().to_string(),
            key: cli.key.clone(),
        });
    }
    info!(file = %cli.file, group = %group.path(), key = %cli.key, ?status, "write");
    config.try_sync()?;
    let changed = changed.lock().clone();
    Ok(changed)
}
