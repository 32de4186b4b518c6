//! Resolve the sources of a config and merge them into one store.

use tracing::{debug, trace, warn};

use crate::{
    error::{Diagnostic, Error, Result},
    ini::{IniDocument, IniFile},
    locale::LocaleChain,
    path::GroupPath,
    source::{ConfigSource, Locate, OpenFlags, Precedence, SourceKind},
    store::Store,
};

/// Enumerate the sources of `name`, lowest precedence first.
///
/// Kinds excluded by `flags` or without a located file are skipped. A named
/// config without a user file location is the one hard failure. An empty
/// name is an anonymous config with no file-backed sources.
pub fn resolve(
    name: &str,
    flags: OpenFlags,
    locator: &dyn Locate,
    precedence: &Precedence,
) -> Result<Vec<ConfigSource>> {
    let anonymous = name.is_empty();
    let user = if anonymous {
        None
    } else {
        Some(
            locator
                .locate(name, SourceKind::User)
                .ok_or_else(|| Error::NoSource {
                    name: name.to_string(),
                })?,
        )
    };
    let mut out = Vec::new();
    for &kind in precedence.kinds() {
        if !flags.includes(kind) {
            continue;
        }
        let path = match kind {
            SourceKind::Runtime => None,
            SourceKind::User if anonymous => continue,
            SourceKind::User => user.clone(),
            _ if anonymous => continue,
            _ => match locator.locate(name, kind) {
                Some(p) if Some(&p) != user.as_ref() => Some(p),
                _ => continue,
            },
        };
        trace!(%kind, path = ?path, "resolved source");
        out.push(ConfigSource { kind, path });
    }
    Ok(out)
}

/// A source with its parsed contents.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Where the contents came from.
    pub source: ConfigSource,
    /// Parsed contents.
    pub doc: IniDocument,
}

/// Read every source. Unreadable files are skipped with a diagnostic.
pub fn load_layers(
    sources: &[ConfigSource],
    overlay: Option<&IniDocument>,
) -> (Vec<Layer>, Vec<Diagnostic>) {
    let mut layers = Vec::with_capacity(sources.len());
    let mut diagnostics = Vec::new();
    for source in sources {
        let doc = match &source.path {
            None => overlay.cloned().unwrap_or_default(),
            Some(path) => match IniFile::new(path).load() {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("skipping {} source: {}", source.kind, e);
                    diagnostics.push(Diagnostic::BackendUnavailable {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            },
        };
        layers.push(Layer {
            source: source.clone(),
            doc,
        });
    }
    (layers, diagnostics)
}

/// Result of merging a cascade.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    /// The merged entries.
    pub store: Store,
    /// Some source locked the whole file; later sources were ignored.
    pub immutable: bool,
    /// Parse problems from every merged layer.
    pub diagnostics: Vec<Diagnostic>,
}

/// Merge `layers` from lowest to highest precedence.
///
/// Later layers override values and tombstones of earlier ones. Locks only
/// accumulate, and a layer that locks its whole file ends the merge.
pub fn merge(layers: &[Layer], locale: &LocaleChain) -> Merged {
    let mut merged = Merged::default();
    for layer in layers {
        let writable = layer.source.kind.is_writable();
        let mut blocked = 0usize;
        for rec in layer.doc.records() {
            if let Some(tag) = &rec.key.locale
                && !locale.accepts(tag)
            {
                continue;
            }
            if !merged
                .store
                .merge(&rec.group, &rec.key, rec.value.as_deref(), rec.flags, writable)
            {
                blocked += 1;
            }
        }
        for group in layer.doc.immutable_groups() {
            merged.store.lock_group(&group);
        }
        merged
            .diagnostics
            .extend(layer.doc.diagnostics().iter().cloned());
        debug!(
            kind = %layer.source.kind,
            blocked,
            "merged source"
        );
        if layer.doc.is_immutable() {
            debug!(kind = %layer.source.kind, "source is immutable, stopping merge");
            merged.store.lock_group(&GroupPath::root());
            merged.immutable = true;
            break;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::source::DirLocator;

    fn layer(kind: SourceKind, text: &str) -> Layer {
        Layer {
            source: ConfigSource {
                kind,
                path: Some(PathBuf::from(format!("/{kind}"))),
            },
            doc: IniDocument::parse(text),
        }
    }

    fn value(m: &Merged, group: &str, key: &str) -> Option<String> {
        m.store
            .lookup(&GroupPath::parse(group).unwrap(), key, &[], false)
            .map(|r| r.value)
    }

    #[test]
    fn later_layers_win() {
        let m = merge(
            &[
                layer(SourceKind::System, "[G]\nK=low\nOther=x\n"),
                layer(SourceKind::User, "[G]\nK=high\nOther[$d]\n"),
            ],
            &LocaleChain::default(),
        );
        assert_eq!(value(&m, "G", "K").as_deref(), Some("high"));
        assert_eq!(value(&m, "G", "Other"), None);
    }

    #[test]
    fn locks_block_later_layers() {
        let m = merge(
            &[
                layer(SourceKind::System, "[G]\nK[$i]=locked\n[H][$i]\nA=1\n"),
                layer(SourceKind::User, "[G]\nK=mine\n[H]\nA=2\nB=3\n"),
            ],
            &LocaleChain::default(),
        );
        assert_eq!(value(&m, "G", "K").as_deref(), Some("locked"));
        assert_eq!(value(&m, "H", "A").as_deref(), Some("1"));
        assert_eq!(value(&m, "H", "B"), None);
        assert!(m.store.is_group_immutable(&GroupPath::parse("H").unwrap()));
    }

    #[test]
    fn file_lock_stops_merge() {
        let m = merge(
            &[
                layer(SourceKind::System, "[$i]\n[G]\nK=admin\n"),
                layer(SourceKind::User, "[G]\nK=mine\n"),
            ],
            &LocaleChain::default(),
        );
        assert!(m.immutable);
        assert_eq!(value(&m, "G", "K").as_deref(), Some("admin"));
    }

    #[test]
    fn resolve_orders_and_filters() {
        let loc = DirLocator::new()
            .with(SourceKind::User, "/u")
            .with(SourceKind::Defaults, "/d")
            .with(SourceKind::Globals, "/u");
        let sources = resolve("apprc", OpenFlags::FULL, &loc, &Precedence::default()).unwrap();
        let kinds: Vec<_> = sources.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [
                SourceKind::Defaults,
                SourceKind::Globals,
                SourceKind::User,
                SourceKind::Runtime
            ]
        );
        let simple = resolve("apprc", OpenFlags::SIMPLE, &loc, &Precedence::default()).unwrap();
        assert_eq!(simple.len(), 2);
        let nowhere = DirLocator::new();
        assert!(resolve("apprc", OpenFlags::SIMPLE, &nowhere, &Precedence::default()).is_err());
    }
}
