//! Line-preserving INI documents.
//!
//! Every input line is kept with its raw text so an untouched document
//! serializes back byte for byte. Edits replace, insert or drop whole lines.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use tracing::warn;

use crate::{
    entry::{EntryFlags, EntryKey},
    error::Diagnostic,
    escape::{Field, escape, unescape},
    path::{GroupPath, validate_name},
};

/// One entry line as read from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Group the entry belongs to.
    pub group: GroupPath,
    /// Key and locale tag.
    pub key: EntryKey,
    /// Unescaped value, or `None` for a `[$d]` tombstone.
    pub value: Option<String>,
    /// `IMMUTABLE` and `EXPAND` as declared by the line or its group.
    pub flags: EntryFlags,
}

/// An edit to apply to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Target group.
    pub group: GroupPath,
    /// Target key.
    pub key: EntryKey,
    /// What to do with it.
    pub action: Action,
}

/// Kinds of document edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write `key=value`, flagged `[$e]` when `expand` is set.
    Set {
        /// Unescaped value.
        value: String,
        /// Mark the value for environment expansion.
        expand: bool,
    },
    /// Write a `key[$d]` tombstone.
    Tombstone,
    /// Drop every line for the key.
    Remove,
}

/// Parsed meaning of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind {
    /// Empty or whitespace only.
    Blank,
    /// Starts with `#`.
    Comment,
    /// Lone `[$i]` before any group header.
    FileLock,
    /// `[A][B]` with an optional trailing `[$i]`.
    Header {
        /// Group the header opens.
        path: GroupPath,
        /// Declared immutable.
        immutable: bool,
    },
    /// `key[opts]=value` or `key[$d]`.
    Entry {
        /// Key and locale.
        key: EntryKey,
        /// Value, `None` for tombstones.
        value: Option<String>,
        /// Options declared on the key.
        flags: EntryFlags,
    },
    /// Skipped line.
    Malformed,
}

/// A line with its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    /// Raw text without the `\n` terminator.
    raw: String,
    /// Parsed meaning.
    kind: LineKind,
}

impl Line {
    /// Build a line from freshly formatted text.
    fn new(raw: String, kind: LineKind) -> Self {
        Self { raw, kind }
    }
}

/// A parsed INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    /// Lines in file order.
    lines: Vec<Line>,
    /// Whether the text ended with `\n`.
    trailing_newline: bool,
    /// Problems found while parsing.
    diagnostics: Vec<Diagnostic>,
}

impl IniDocument {
    /// Parse in-memory text.
    pub fn parse(text: &str) -> Self {
        Self::parse_from(text, None)
    }

    /// Parse text read from `path`; diagnostics carry the path.
    pub fn parse_from(text: &str, path: Option<&Path>) -> Self {
        let mut doc = Self {
            trailing_newline: text.ends_with('\n'),
            ..Self::default()
        };
        if text.is_empty() {
            return doc;
        }
        let mut pieces: Vec<&str> = text.split('\n').collect();
        if doc.trailing_newline {
            pieces.pop();
        }
        let mut seen_header = false;
        for (i, raw) in pieces.into_iter().enumerate() {
            let kind = match parse_line(raw, seen_header) {
                Ok(kind) => kind,
                Err(message) => {
                    let diag = Diagnostic::Parse {
                        path: path.map(Path::to_path_buf),
                        line: i + 1,
                        message,
                    };
                    warn!("{}", diag);
                    doc.diagnostics.push(diag);
                    LineKind::Malformed
                }
            };
            if matches!(kind, LineKind::Header { .. }) {
                seen_header = true;
            }
            doc.lines.push(Line {
                raw: raw.to_string(),
                kind,
            });
        }
        doc
    }

    /// Render the document. Untouched documents reproduce their input.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.raw);
        }
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Problems found while parsing.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when the whole file is locked by a leading `[$i]`.
    pub fn is_immutable(&self) -> bool {
        self.lines.iter().any(|l| l.kind == LineKind::FileLock)
    }

    /// True when the document holds nothing but blank lines.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.kind == LineKind::Blank)
    }

    /// Groups declared immutable with a trailing `[$i]`.
    pub fn immutable_groups(&self) -> Vec<GroupPath> {
        let mut out: Vec<GroupPath> = Vec::new();
        for line in &self.lines {
            if let LineKind::Header {
                path,
                immutable: true,
            } = &line.kind
                && !out.contains(path)
            {
                out.push(path.clone());
            }
        }
        out
    }

    /// Entry records in file order.
    ///
    /// Entries following a malformed header are skipped. Group and file locks
    /// are folded into each record's flags.
    pub fn records(&self) -> Vec<Record> {
        let file_locked = self.is_immutable();
        let mut current = Some((GroupPath::root(), false));
        let mut out = Vec::new();
        for line in &self.lines {
            match &line.kind {
                LineKind::Header { path, immutable } => current = Some((path.clone(), *immutable)),
                LineKind::Malformed if line.raw.trim_start().starts_with('[') => current = None,
                LineKind::Entry { key, value, flags } => {
                    let Some((group, group_locked)) = &current else {
                        continue;
                    };
                    let mut flags = *flags;
                    if file_locked || *group_locked {
                        flags.insert(EntryFlags::IMMUTABLE);
                    }
                    out.push(Record {
                        group: group.clone(),
                        key: key.clone(),
                        value: value.clone(),
                        flags,
                    });
                }
                _ => {}
            }
        }
        out
    }

    /// Apply edits in place, keeping every untouched line where it was.
    ///
    /// Replaced keys keep their position, removed keys lose their line, new keys
    /// go to the end of their group's last section and new groups are appended
    /// after a blank separator. Sections emptied by removals are dropped.
    pub fn apply(&mut self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        let eol = self.line_ending();
        let index: HashMap<(&GroupPath, &EntryKey), usize> = changes
            .iter()
            .enumerate()
            .map(|(i, c)| ((&c.group, &c.key), i))
            .collect();
        let mut applied = vec![false; changes.len()];
        let mut touched: HashSet<GroupPath> = HashSet::new();
        let mut removed = vec![false; self.lines.len()];

        let mut current = Some(GroupPath::root());
        for (i, line) in self.lines.iter_mut().enumerate() {
            match &line.kind {
                LineKind::Header { path, .. } => {
                    current = Some(path.clone());
                    continue;
                }
                LineKind::Malformed if line.raw.trim_start().starts_with('[') => {
                    current = None;
                    continue;
                }
                _ => {}
            }
            let (Some(group), LineKind::Entry { key, .. }) = (&current, &line.kind) else {
                continue;
            };
            let Some(&ci) = index.get(&(group, key)) else {
                continue;
            };
            applied[ci] = true;
            let action = &changes[ci].action;
            if *action == Action::Remove {
                removed[i] = true;
                touched.insert(group.clone());
            } else {
                let fresh = format_entry(key, action, eol);
                *line = fresh;
            }
        }

        let mut kept = Vec::with_capacity(self.lines.len());
        for (line, gone) in self.lines.drain(..).zip(removed) {
            if !gone {
                kept.push(line);
            }
        }
        self.lines = kept;

        let mut pending: Vec<(&GroupPath, Vec<Line>)> = Vec::new();
        for (change, done) in changes.iter().zip(applied) {
            if done || change.action == Action::Remove {
                continue;
            }
            let line = format_entry(&change.key, &change.action, eol);
            match pending.iter_mut().find(|(g, _)| *g == &change.group) {
                Some((_, lines)) => lines.push(line),
                None => pending.push((&change.group, vec![line])),
            }
        }
        for (group, lines) in pending {
            self.insert_into_group(group, lines, eol);
        }
        for group in touched {
            self.drop_section_if_empty(&group);
        }
    }

    /// Line terminator suffix used by the document (`"\r"` for CRLF files).
    fn line_ending(&self) -> &'static str {
        match self.lines.first() {
            Some(l) if l.raw.ends_with('\r') => "\r",
            _ => "",
        }
    }

    /// Index range `(header, end)` of the last section for `group`.
    ///
    /// The root section starts at line 0 with no header. `end` is exclusive.
    fn last_section(&self, group: &GroupPath) -> Option<(Option<usize>, usize)> {
        let mut found: Option<(Option<usize>, usize)> = None;
        let mut current = Some(GroupPath::root());
        let mut start: Option<usize> = None;
        for (i, line) in self.lines.iter().enumerate() {
            let next = match &line.kind {
                LineKind::Header { path, .. } => Some(path.clone()),
                LineKind::Malformed if line.raw.trim_start().starts_with('[') => None,
                _ => continue,
            };
            if current.as_ref() == Some(group) {
                found = Some((start, i));
            }
            current = next;
            start = Some(i);
        }
        if current.as_ref() == Some(group) {
            found = Some((start, self.lines.len()));
        }
        found
    }

    /// Insert entry lines at the end of `group`, creating the section if needed.
    fn insert_into_group(&mut self, group: &GroupPath, lines: Vec<Line>, eol: &str) {
        match self.last_section(group) {
            Some((header, end)) if header.is_some() || group.is_root() => {
                let floor = header.map_or(0, |h| h + 1);
                let mut at = end;
                while at > floor && self.lines[at - 1].kind == LineKind::Blank {
                    at -= 1;
                }
                if at == self.lines.len() {
                    self.trailing_newline = true;
                }
                self.lines.splice(at..at, lines);
            }
            _ => {
                if self
                    .lines
                    .last()
                    .is_some_and(|l| l.kind != LineKind::Blank)
                {
                    self.lines.push(Line::new(eol.to_string(), LineKind::Blank));
                }
                self.lines.push(format_header(group, eol));
                self.lines.extend(lines);
                self.trailing_newline = true;
            }
        }
    }

    /// Drop the last section of `group` when it holds no entries or comments.
    fn drop_section_if_empty(&mut self, group: &GroupPath) {
        if group.is_root() {
            return;
        }
        let Some((Some(header), end)) = self.last_section(group) else {
            return;
        };
        let empty = self.lines[header + 1..end]
            .iter()
            .all(|l| l.kind == LineKind::Blank);
        if !empty {
            return;
        }
        let mut start = header;
        if end == self.lines.len() {
            while start > 0 && self.lines[start - 1].kind == LineKind::Blank {
                start -= 1;
            }
        }
        self.lines.drain(start..end);
    }
}

/// Classify one raw line.
fn parse_line(raw: &str, seen_header: bool) -> Result<LineKind, String> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(LineKind::Blank);
    }
    if line.starts_with('#') {
        return Ok(LineKind::Comment);
    }
    if line.starts_with('[') {
        return parse_header(line, seen_header);
    }
    parse_entry(line)
}

/// Parse `[A][B]`, `[A][$i]` or a lone `[$i]`.
fn parse_header(line: &str, seen_header: bool) -> Result<LineKind, String> {
    let mut names: Vec<String> = Vec::new();
    let mut immutable = false;
    let mut rest = line;
    while let Some(body) = rest.strip_prefix('[') {
        let Some(end) = body.find(']') else {
            return Err("invalid group header: missing ']'".to_string());
        };
        let segment = &body[..end];
        rest = &body[end + 1..];
        if segment == "$i" && !rest.starts_with('[') {
            immutable = true;
            break;
        }
        let mut bad = None;
        let name = unescape(segment, |w| bad = Some(w));
        if let Some(w) = bad {
            warn!("group header {}: {}", line, w);
        }
        validate_name(&name).map_err(|reason| format!("invalid group header: {reason}"))?;
        names.push(name);
    }
    if names.is_empty() {
        if immutable && !seen_header {
            return Ok(LineKind::FileLock);
        }
        return Err("invalid group header".to_string());
    }
    Ok(LineKind::Header {
        path: GroupPath::from_raw(names),
        immutable,
    })
}

/// Parse `key[opts]=value` or `key[$d]`.
fn parse_entry(line: &str) -> Result<LineKind, String> {
    let (mut key, value) = match line.split_once('=') {
        Some((k, v)) => (k.trim(), Some(v.trim())),
        None => (line, None),
    };
    if key.is_empty() {
        return Err("invalid entry: empty key".to_string());
    }
    let mut flags = EntryFlags::empty();
    let mut locale: Option<&str> = None;
    let mut deleted = false;
    while let Some(start) = key.rfind('[') {
        let Some(len) = key[start..].find(']') else {
            return Err("invalid entry: missing ']'".to_string());
        };
        let inner = &key[start + 1..start + len];
        if let Some(opts) = inner.strip_prefix('$') {
            for c in opts.chars() {
                match c {
                    'i' => flags.insert(EntryFlags::IMMUTABLE),
                    'e' => flags.insert(EntryFlags::EXPAND),
                    'd' => deleted = true,
                    _ => {}
                }
            }
        } else if locale.is_some() {
            return Err("invalid entry: second locale".to_string());
        } else {
            locale = Some(inner);
        }
        key = &key[..start];
    }
    let key = unescape(key.trim_end(), |w| warn!("{}", w));
    if key.is_empty() {
        return Err("invalid entry: empty key".to_string());
    }
    let key = EntryKey {
        key,
        locale: locale.filter(|l| !l.is_empty()).map(str::to_string),
    };
    if deleted {
        return Ok(LineKind::Entry {
            key,
            value: None,
            flags,
        });
    }
    let Some(value) = value else {
        return Err("invalid entry: missing '='".to_string());
    };
    Ok(LineKind::Entry {
        key,
        value: Some(unescape(value, |w| warn!("{}", w))),
        flags,
    })
}

/// Format the line for an entry edit.
fn format_entry(key: &EntryKey, action: &Action, eol: &str) -> Line {
    let mut raw = escape(&key.key, Field::Key);
    if let Some(locale) = &key.locale {
        raw.push('[');
        raw.push_str(locale);
        raw.push(']');
    }
    let (value, flags) = match action {
        Action::Set { value, expand } => {
            if *expand {
                raw.push_str("[$e]");
            }
            raw.push('=');
            raw.push_str(&escape(value, Field::Value));
            let flags = if *expand {
                EntryFlags::EXPAND
            } else {
                EntryFlags::empty()
            };
            (Some(value.clone()), flags)
        }
        Action::Tombstone | Action::Remove => {
            raw.push_str("[$d]");
            (None, EntryFlags::empty())
        }
    };
    raw.push_str(eol);
    Line::new(
        raw,
        LineKind::Entry {
            key: key.clone(),
            value,
            flags,
        },
    )
}

/// Format a header line for `group`.
fn format_header(group: &GroupPath, eol: &str) -> Line {
    let mut raw = String::new();
    for name in group.names() {
        raw.push('[');
        raw.push_str(&escape(name, Field::Group));
        raw.push(']');
    }
    raw.push_str(eol);
    Line::new(
        raw,
        LineKind::Header {
            path: group.clone(),
            immutable: false,
        },
    )
}

