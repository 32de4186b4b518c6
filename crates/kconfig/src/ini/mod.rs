//! The INI persistence backend.
//!
//! [`IniDocument`] is the in-memory, line-preserving form of one file.
//! [`IniFile`] binds a document to a path and writes it back atomically.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

mod document;

pub use document::{Action, Change, IniDocument, Record};

/// An INI file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniFile {
    /// Location of the file.
    path: PathBuf,
}

impl IniFile {
    /// Bind to `path`. Nothing is read until [`IniFile::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and parse the file. A missing file is an empty document.
    pub fn load(&self) -> Result<IniDocument> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(IniDocument::parse_from(&text, Some(&self.path))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(IniDocument::default()),
            Err(e) => Err(Error::io(&self.path, &e)),
        }
    }

    /// True when the file, or the directory it would be created in, is writable.
    pub fn is_writable(&self) -> bool {
        if let Ok(meta) = fs::metadata(&self.path) {
            return meta.is_file() && !meta.permissions().readonly();
        }
        let mut dir = self.path.parent();
        while let Some(d) = dir {
            if let Ok(meta) = fs::metadata(d) {
                return meta.is_dir() && !meta.permissions().readonly();
            }
            dir = d.parent();
        }
        false
    }

    /// Persist `doc` by writing a temporary file next to the target and renaming it
    /// over the target. An empty document removes the file instead.
    pub fn write_atomic(&self, doc: &IniDocument) -> Result<()> {
        if doc.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => {
                    debug!("removed empty config file {}", self.path.display());
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::io(&self.path, &e)),
            };
        }
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, &e))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, &e))?;
        tmp.write_all(doc.serialize().as_bytes())
            .map_err(|e| Error::io(tmp.path(), &e))?;
        if let Ok(meta) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), meta.permissions())
                .map_err(|e| Error::io(tmp.path(), &e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, &e.error))?;
        debug!("wrote config file {}", self.path.display());
        Ok(())
    }
}
