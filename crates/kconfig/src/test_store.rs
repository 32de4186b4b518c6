#[cfg(test)]
mod tests {
    use crate::{Entry, EntryFlags, EntryKey, GroupPath, Store, WriteOptions, WriteStatus};

    fn group(text: &str) -> GroupPath {
        GroupPath::parse(text).unwrap()
    }

    fn value(store: &Store, g: &GroupPath, key: &str, locales: &[&str]) -> Option<String> {
        let locales: Vec<String> = locales.iter().map(|s| s.to_string()).collect();
        store.lookup(g, key, &locales, false).map(|r| r.value)
    }

    #[test]
    fn write_then_read() {
        let mut store = Store::new();
        let g = group("A");
        assert_eq!(store.set(&g, "k", "v", true), WriteStatus::Written);
        assert_eq!(store.set(&g, "k", "v", true), WriteStatus::Unchanged);
        assert_eq!(value(&store, &g, "k", &[]).as_deref(), Some("v"));
        assert_eq!(value(&store, &g, "missing", &[]), None);
        assert!(store.is_dirty());
        store.mark_clean();
        assert!(!store.is_dirty());
    }

    #[test]
    fn empty_keys_are_rejected() {
        let mut store = Store::new();
        assert_eq!(store.set(&group("A"), "", "v", true), WriteStatus::InvalidKey);
        assert!(!store.is_dirty());
    }

    #[test]
    fn in_memory_writes_stay_clean() {
        let mut store = Store::new();
        let g = group("A");
        let opts = WriteOptions {
            dirty: false,
            ..WriteOptions::default()
        };
        assert!(store.write(&g, &EntryKey::plain("k"), "v", opts).is_written());
        assert!(!store.is_dirty());
        assert_eq!(value(&store, &g, "k", &[]).as_deref(), Some("v"));
    }

    #[test]
    fn locked_entries_and_groups_refuse_writes() {
        let mut store = Store::new();
        let g = group("A");
        let fixed = EntryKey::plain("fixed");
        assert!(store.merge(&g, &fixed, Some("1"), EntryFlags::IMMUTABLE, false));
        assert_eq!(store.set(&g, "fixed", "2", true), WriteStatus::Immutable);
        assert_eq!(store.remove(&g, "fixed"), WriteStatus::Immutable);
        assert!(!store.merge(&g, &fixed, Some("3"), EntryFlags::empty(), true));
        assert_eq!(value(&store, &g, "fixed", &[]).as_deref(), Some("1"));

        let parent = group("Locked");
        store.lock_group(&parent);
        let child = parent.child("Sub").unwrap();
        assert!(store.is_group_immutable(&child));
        assert_eq!(store.set(&child, "k", "v", true), WriteStatus::Immutable);
        assert!(!store.is_dirty());
    }

    #[test]
    fn deletion_leaves_a_tombstone() {
        let mut store = Store::new();
        let g = group("A");
        store.set(&g, "k", "v", false);
        assert_eq!(store.remove(&g, "k"), WriteStatus::Written);
        assert_eq!(store.remove(&g, "k"), WriteStatus::Unchanged);
        assert_eq!(store.remove(&g, "never"), WriteStatus::Unchanged);
        assert_eq!(value(&store, &g, "k", &[]), None);
        assert!(store.get(&g, "k").is_some_and(|e| e.is_deleted() && e.is_dirty()));
        assert!(!store.has_live_entries(&g));
    }

    #[test]
    fn localized_lookup_prefers_the_most_specific_tag() {
        let mut store = Store::new();
        let g = group("Desktop Entry");
        let de = EntryKey::localized("Name", "de");
        let de_at = EntryKey::localized("Name", "de_AT");
        store.merge(&g, &EntryKey::plain("Name"), Some("Hi"), EntryFlags::empty(), false);
        store.merge(&g, &de, Some("Hallo"), EntryFlags::empty(), false);
        store.merge(&g, &de_at, Some("Servus"), EntryFlags::empty(), false);
        assert_eq!(value(&store, &g, "Name", &["de_AT", "de"]).as_deref(), Some("Servus"));
        assert_eq!(value(&store, &g, "Name", &["de_DE", "de"]).as_deref(), Some("Hallo"));
        assert_eq!(value(&store, &g, "Name", &["fr"]).as_deref(), Some("Hi"));

        store.set(&g, "Name", "Hey", true);
        assert_eq!(value(&store, &g, "Name", &["de_AT", "de"]).as_deref(), Some("Hey"));
        let dirty: Vec<_> = store.dirty_entries().map(|(_, k, _)| k.clone()).collect();
        assert_eq!(dirty, vec![EntryKey::plain("Name"), de, de_at]);
    }

    #[test]
    fn later_plain_records_hide_earlier_localized_ones() {
        let mut store = Store::new();
        let g = group("G");
        let de = EntryKey::localized("Name", "de");
        store.merge(&g, &de, Some("Sys"), EntryFlags::empty(), false);
        store.merge(&g, &EntryKey::plain("Name"), Some("Mine"), EntryFlags::empty(), true);
        assert_eq!(value(&store, &g, "Name", &["de"]).as_deref(), Some("Mine"));
        assert!(store.get_exact(&g, &de).is_some_and(Entry::is_deleted));

        store.merge(&g, &de, Some("Late"), EntryFlags::empty(), true);
        assert_eq!(value(&store, &g, "Name", &["de"]).as_deref(), Some("Late"));
    }

    #[test]
    fn locked_localized_records_survive_plain_ones() {
        let mut store = Store::new();
        let g = group("G");
        let de = EntryKey::localized("Name", "de");
        store.merge(&g, &de, Some("Admin"), EntryFlags::IMMUTABLE, false);
        store.merge(&g, &EntryKey::plain("Name"), Some("Mine"), EntryFlags::empty(), true);
        assert_eq!(value(&store, &g, "Name", &["de"]).as_deref(), Some("Admin"));
        store.set(&g, "Name", "Other", true);
        assert_eq!(value(&store, &g, "Name", &["de"]).as_deref(), Some("Admin"));
    }

    #[test]
    fn revert_restores_the_default() {
        let mut store = Store::new();
        let g = group("A");
        let key = EntryKey::plain("k");
        store.merge(&g, &key, Some("default"), EntryFlags::empty(), false);
        store.merge(&g, &key, Some("user"), EntryFlags::empty(), true);
        assert_eq!(value(&store, &g, "k", &[]).as_deref(), Some("user"));
        assert_eq!(
            store.lookup(&g, "k", &[], true).map(|r| r.value).as_deref(),
            Some("default")
        );

        assert_eq!(store.revert(&g, "k", false), WriteStatus::Written);
        assert_eq!(store.revert(&g, "k", false), WriteStatus::Unchanged);
        assert_eq!(value(&store, &g, "k", &[]).as_deref(), Some("default"));
        let entry = store.get(&g, "k").unwrap();
        assert!(entry.flags.contains(EntryFlags::REVERTED | EntryFlags::DIRTY));
    }

    #[test]
    fn revert_without_default_removes() {
        let mut store = Store::new();
        let g = group("A");
        store.set(&g, "k", "v", true);
        store.revert(&g, "k", false);
        assert_eq!(value(&store, &g, "k", &[]), None);
    }

    #[test]
    fn writing_the_default_value_still_counts() {
        let mut store = Store::new();
        let g = group("A");
        store.merge(&g, &EntryKey::plain("k"), Some("1"), EntryFlags::empty(), false);
        assert_eq!(store.set(&g, "k", "1", true), WriteStatus::Written);
        assert!(store.get(&g, "k").is_some_and(|e| !e.is_defaulted()));
    }

    #[test]
    fn groups_and_sub_groups() {
        let mut store = Store::new();
        store.set(&group("A"), "k", "1", true);
        store.set(&group("A/B"), "x", "1", true);
        store.set(&group("A/C"), "y", "1", true);
        store.set(&group("Z"), "z", "1", true);
        assert_eq!(store.sub_groups(&GroupPath::root()), vec!["A", "Z"]);
        assert_eq!(store.sub_groups(&group("A")), vec!["B", "C"]);

        assert_eq!(
            store.delete_group(&group("A"), WriteOptions::default()),
            WriteStatus::Written
        );
        assert!(!store.has_live_entries(&group("A")));
        assert_eq!(store.sub_groups(&GroupPath::root()), vec!["Z"]);
        assert_eq!(
            store.delete_group(&group("A"), WriteOptions::default()),
            WriteStatus::Unchanged
        );
    }
}
