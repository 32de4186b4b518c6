//! Group paths: ordered sequences of group names rooted at the config's top scope.

use std::{fmt, result::Result as StdResult, slice};

use crate::error::{Error, Result};

/// Separator used in the textual form of a [`GroupPath`].
pub const SEPARATOR: char = '/';

/// An ordered sequence of group names. The root scope is the empty path.
///
/// Names are non-empty and never contain [`SEPARATOR`] or control characters, so
/// the textual form `A/B/C` is unambiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupPath {
    /// Group names from outermost to innermost.
    names: Vec<String>,
}

impl GroupPath {
    /// The root path.
    pub const fn root() -> Self {
        Self { names: Vec::new() }
    }

    /// Build a path from individual names, validating each one.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for name in &names {
            validate_name(name).map_err(|reason| Error::malformed(names.join("/"), reason))?;
        }
        Ok(Self { names })
    }

    /// Parse the `/`-separated textual form. The empty string is the root path.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        Self::from_names(text.split(SEPARATOR))
    }

    /// Return a new path with `name` appended.
    pub fn child(&self, name: &str) -> Result<Self> {
        validate_name(name).map_err(|reason| {
            let mut shown = self.to_string();
            if !shown.is_empty() {
                shown.push(SEPARATOR);
            }
            shown.push_str(name);
            Error::malformed(shown, reason)
        })?;
        let mut names = self.names.clone();
        names.push(name.to_string());
        Ok(Self { names })
    }

    /// Return the enclosing path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.names.is_empty() {
            return None;
        }
        Some(Self {
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }

    /// Innermost name, or `""` for the root.
    pub fn name(&self) -> &str {
        self.names.last().map_or("", String::as_str)
    }

    /// Number of names in the path.
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// Iterate over the names from outermost to innermost.
    pub fn names(&self) -> slice::Iter<'_, String> {
        self.names.iter()
    }

    /// True when `self` equals `other` or lies beneath it.
    pub fn starts_with(&self, other: &Self) -> bool {
        self.names.starts_with(&other.names)
    }

    /// If `self` is strictly beneath `ancestor`, the name of the direct child of
    /// `ancestor` on the way to `self`.
    pub fn child_name_under(&self, ancestor: &Self) -> Option<&str> {
        if self.names.len() > ancestor.names.len() && self.starts_with(ancestor) {
            Some(self.names[ancestor.names.len()].as_str())
        } else {
            None
        }
    }

    /// Re-root this path: replace the `from` prefix with `to`.
    pub(crate) fn rebase(&self, from: &Self, to: &Self) -> Option<Self> {
        if !self.starts_with(from) {
            return None;
        }
        let mut names = to.names.clone();
        names.extend_from_slice(&self.names[from.names.len()..]);
        Some(Self { names })
    }

    /// Build a path from names read off disk without validation. The backend
    /// validates separately so it can report a diagnostic instead of failing.
    pub(crate) fn from_raw(names: Vec<String>) -> Self {
        Self { names }
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Check one group name against the naming rules.
pub(crate) fn validate_name(name: &str) -> StdResultReason {
    if name.is_empty() {
        return Err("group names must not be empty");
    }
    if name.contains(SEPARATOR) {
        return Err("group names must not contain '/'");
    }
    if name.chars().any(char::is_control) {
        return Err("group names must not contain control characters");
    }
    Ok(())
}

/// Check an entry key. Keys only need to be non-empty.
pub(crate) fn validate_key(key: &str) -> StdResultReason {
    if key.is_empty() {
        return Err("keys must not be empty");
    }
    Ok(())
}

/// Validation outcome carrying a static reason on failure.
pub(crate) type StdResultReason = StdResult<(), &'static str>;
