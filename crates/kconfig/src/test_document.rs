#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{
        Action, Change, Diagnostic, EntryFlags, EntryKey, GroupPath, IniDocument,
    };

    fn group(text: &str) -> GroupPath {
        GroupPath::parse(text).unwrap()
    }

    fn set(g: &str, key: &str, value: &str) -> Change {
        Change {
            group: group(g),
            key: EntryKey::plain(key),
            action: Action::Set {
                value: value.to_string(),
                expand: false,
            },
        }
    }

    fn edit(text: &str, changes: &[Change]) -> String {
        let mut doc = IniDocument::parse(text);
        doc.apply(changes);
        doc.serialize()
    }

    #[test]
    fn untouched_documents_round_trip() {
        for text in [
            "",
            "\n",
            "# only a comment",
            "top=1\n\n# note\n[A]\nk = v \n\n[B][C]\nx[$e]=$HOME/x\nName[de]=Hallo\n",
            "[A]\r\nk=v\r\n",
            "[broken\nk=v\n",
        ] {
            assert_eq!(IniDocument::parse(text).serialize(), text);
        }
    }

    #[test]
    fn records_carry_groups_locales_and_flags() {
        let doc = IniDocument::parse(
            "top=1\n[A][B]\nName=Hi\nName[de]=Hallo\npath[$e]=$HOME\ngone[$d]\nfixed[$i]=1\n",
        );
        let records = doc.records();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].group, GroupPath::root());
        assert_eq!(records[1].group.to_string(), "A/B");
        assert_eq!(records[2].key, EntryKey::localized("Name", "de"));
        assert_eq!(records[2].value.as_deref(), Some("Hallo"));
        assert!(records[3].flags.contains(EntryFlags::EXPAND));
        assert_eq!(records[4].value, None);
        assert!(records[5].flags.contains(EntryFlags::IMMUTABLE));
    }

    #[test]
    fn locks() {
        let file = IniDocument::parse("[$i]\n[A]\nk=v\n");
        assert!(file.is_immutable());
        assert!(file.records()[0].flags.contains(EntryFlags::IMMUTABLE));

        let grp = IniDocument::parse("[A][$i]\nk=v\n[B]\nx=1\n");
        assert!(!grp.is_immutable());
        assert_eq!(grp.immutable_groups(), vec![group("A")]);
        let records = grp.records();
        assert!(records[0].flags.contains(EntryFlags::IMMUTABLE));
        assert!(!records[1].flags.contains(EntryFlags::IMMUTABLE));
    }

    #[test]
    fn malformed_lines_are_skipped_with_diagnostics() {
        let doc = IniDocument::parse("[A\nk=v\n[B]\nnovalue\n=x\ny=2\n");
        let lines: Vec<usize> = doc
            .diagnostics()
            .iter()
            .map(|d| match d {
                Diagnostic::Parse { line, .. } => *line,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(lines, vec![1, 4, 5]);
        let records = doc.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.key, "y");
        assert_eq!(records[0].group, group("B"));
    }

    #[test]
    fn lone_lock_after_header_is_malformed() {
        let doc = IniDocument::parse("[A]\n[$i]\nk=v\n");
        assert!(!doc.is_immutable());
        assert_eq!(doc.diagnostics().len(), 1);
    }

    #[test]
    fn escaped_values_come_back() {
        let out = edit("", &[set("A", "k", " two\nlines\t")]);
        assert_eq!(out, "[A]\nk=\\stwo\\nlines\\t\n");
        let records = IniDocument::parse(&out).records();
        assert_eq!(records[0].value.as_deref(), Some(" two\nlines\t"));
    }

    #[test]
    fn replacing_keeps_position_and_comments() {
        let out = edit("# head\n[A]\nk=v\n# keep\nother=1\n", &[set("A", "k", "w")]);
        assert_eq!(out, "# head\n[A]\nk=w\n# keep\nother=1\n");
    }

    #[test]
    fn new_keys_go_before_the_section_gap() {
        let out = edit("[A]\nk=v\n\n[B]\nz=1\n", &[set("A", "new", "1")]);
        assert_eq!(out, "[A]\nk=v\nnew=1\n\n[B]\nz=1\n");
    }

    #[test]
    fn new_groups_are_appended_after_a_blank_line() {
        let out = edit("[A]\nk=v\n", &[set("B/C", "x", "1"), set("B/C", "y", "2")]);
        assert_eq!(out, "[A]\nk=v\n\n[B][C]\nx=1\ny=2\n");
    }

    #[test]
    fn root_entries_go_before_the_first_header() {
        let out = edit("top=1\n\n[A]\nk=v\n", &[set("", "second", "2")]);
        assert_eq!(out, "top=1\nsecond=2\n\n[A]\nk=v\n");
    }

    #[test]
    fn removal_drops_emptied_sections() {
        let remove = Change {
            group: group("B"),
            key: EntryKey::plain("x"),
            action: Action::Remove,
        };
        assert_eq!(edit("[A]\nk=v\n\n[B]\nx=1\n", &[remove]), "[A]\nk=v\n");
    }

    #[test]
    fn sections_with_comments_survive_removal() {
        let remove = Change {
            group: group("A"),
            key: EntryKey::plain("k"),
            action: Action::Remove,
        };
        assert_eq!(edit("[A]\n# note\nk=v\n", &[remove]), "[A]\n# note\n");
    }

    #[test]
    fn tombstones() {
        let tomb = Change {
            group: group("A"),
            key: EntryKey::plain("k"),
            action: Action::Tombstone,
        };
        assert_eq!(edit("[A]\nk=v\n", &[tomb]), "[A]\nk[$d]\n");
    }

    #[test]
    fn expand_and_locale_markers_are_written() {
        let changes = [
            Change {
                group: group("A"),
                key: EntryKey::plain("p"),
                action: Action::Set {
                    value: "$HOME/x".to_string(),
                    expand: true,
                },
            },
            Change {
                group: group("A"),
                key: EntryKey::localized("Name", "de"),
                action: Action::Set {
                    value: "Hallo".to_string(),
                    expand: false,
                },
            },
        ];
        assert_eq!(edit("", &changes), "[A]\np[$e]=$HOME/x\nName[de]=Hallo\n");
    }

    #[test]
    fn crlf_files_stay_crlf() {
        let out = edit("[A]\r\nk=v\r\n", &[set("A", "n", "1")]);
        assert_eq!(out, "[A]\r\nk=v\r\nn=1\r\n");
    }

    proptest! {
        #[test]
        fn parse_then_serialize_is_identity(text in "[\\[\\]=#$a-c \\\\\n\r]{0,64}") {
            prop_assert_eq!(IniDocument::parse(&text).serialize(), text);
        }
    }
}
