#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::{
        Choice, Config, GroupPath, Item, Skeleton, StringKind, Value, skeleton::obscure,
    };

    fn group(text: &str) -> GroupPath {
        GroupPath::parse(text).unwrap()
    }

    fn levels() -> Vec<Choice> {
        vec![
            Choice::new("Low"),
            Choice::new("Medium"),
            Choice::with_value("High", "hi"),
        ]
    }

    #[test]
    fn numbers_are_clamped_on_read() {
        let config = Config::anonymous();
        config.group("A").unwrap().write_entry("level", 150);
        let mut item = Item::int(group("A"), "level", 5, Some(0), Some(100));
        item.read_config(&config);
        assert_eq!(item.value(), &Value::Int(100));
        assert!(item.set_value(Value::Int(-4)));
        assert_eq!(item.value(), &Value::Int(0));
    }

    #[test]
    fn unparsable_values_fall_back_to_the_default() {
        let config = Config::anonymous();
        config.group("A").unwrap().write_entry("flag", "maybe");
        let mut item = Item::bool(group("A"), "flag", true);
        item.read_config(&config);
        assert_eq!(item.value(), &Value::Bool(true));
    }

    #[test]
    fn enum_labels_and_fallbacks() {
        let config = Config::anonymous();
        let g = config.group("View").unwrap();
        let mut item = Item::enumeration(group("View"), "mode", levels(), 1);

        for (raw, expected) in [("HI", 2), ("low", 0), ("2", 2), ("7", 1), ("bogus", 1)] {
            g.write_entry("mode", raw);
            item.read_config(&config);
            assert_eq!(item.value(), &Value::Enum(expected), "{raw}");
        }

        item.set_value(Value::Enum(2));
        g.write_entry("mode", "low");
        item.read_config(&config);
        item.set_value(Value::Enum(2));
        item.write_config(&config, false);
        assert_eq!(g.read_raw("mode").as_deref(), Some("hi"));
    }

    #[test]
    fn passwords_are_stored_obscured() {
        let config = Config::anonymous();
        let mut item = Item::string(group("Login"), "secret", StringKind::Password, "");
        item.set_value(Value::String("hunter2".to_string()));
        item.write_config(&config, false);

        let stored = config.group("Login").unwrap().read_raw("secret").unwrap();
        assert_ne!(stored, "hunter2");
        assert_eq!(obscure(&stored), "hunter2");

        let mut fresh = Item::string(group("Login"), "secret", StringKind::Password, "");
        fresh.read_config(&config);
        assert_eq!(fresh.value(), &Value::String("hunter2".to_string()));
    }

    #[test]
    fn obscuring_is_an_involution() {
        for text in ["", "abc", "!\"#", "päss wörd", "\u{10000}"] {
            assert_eq!(obscure(&obscure(text)), text);
        }
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut item = Item::int(group("A"), "n", 0, None, None);
        let first = Rc::clone(&seen);
        item.on_change(move |v| first.borrow_mut().push(("first", v.clone())));
        let second = Rc::clone(&seen);
        item.on_change(move |v| second.borrow_mut().push(("second", v.clone())));

        assert!(item.set_value(Value::Int(3)));
        assert!(!item.set_value(Value::Int(3)));
        assert!(!item.set_value(Value::Bool(true)));
        assert_eq!(
            *seen.borrow(),
            vec![("first", Value::Int(3)), ("second", Value::Int(3))]
        );
    }

    #[test]
    fn writing_the_default_reverts_the_entry() {
        let config = Config::anonymous();
        let g = config.group("A").unwrap();
        g.write_entry("size", 5);

        let mut item = Item::int(group("A"), "size", 3, None, None);
        item.read_config(&config);
        assert_eq!(item.value(), &Value::Int(5));
        item.set_value(Value::Int(3));
        item.write_config(&config, false);
        assert!(!g.has_key("size"));

        item.set_value(Value::Int(4));
        item.write_config(&config, false);
        item.set_value(Value::Int(3));
        item.write_config(&config, true);
        assert_eq!(g.read_raw("size").as_deref(), Some("3"));
    }

    #[test]
    fn unchanged_items_are_not_written() {
        let config = Config::anonymous();
        let mut item = Item::string(group("A"), "name", StringKind::Normal, "x");
        item.read_config(&config);
        item.write_config(&config, true);
        assert!(!config.is_dirty());
    }

    #[test]
    fn skeleton_tracks_defaults_and_changes() {
        let config = Config::anonymous();
        config.group("General").unwrap().write_entry("Width", 640);

        let mut skel = Skeleton::new(config);
        skel.set_current_group("General").unwrap();
        skel.add_int("Width", 800);
        skel.add_bool("Fullscreen", false);
        skel.add_string("Title", "untitled");
        assert_eq!(skel.items().len(), 3);
        assert!(!skel.is_defaults());
        assert!(!skel.is_save_needed());

        skel.item_mut("Fullscreen").unwrap().set_value(Value::Bool(true));
        assert!(skel.is_save_needed());

        skel.set_defaults();
        assert!(skel.is_defaults());

        skel.read();
        assert_eq!(skel.item("Width").unwrap().value(), &Value::Int(640));

        assert!(!skel.use_defaults(true));
        assert_eq!(skel.item("Width").unwrap().value(), &Value::Int(800));
        assert!(skel.use_defaults(true));
        assert!(skel.use_defaults(false));
        assert_eq!(skel.item("Width").unwrap().value(), &Value::Int(640));

        assert!(skel.remove_item("Title").is_some());
        assert!(skel.item("Title").is_none());
        skel.clear_items();
        assert!(skel.items().is_empty());
    }

    #[test]
    fn items_bind_to_the_current_group() {
        let mut skel = Skeleton::new(Config::anonymous());
        skel.set_current_group("A/B").unwrap();
        let item = skel.add_path("Dir", "/tmp");
        assert_eq!(item.group(), &group("A/B"));
        assert!(skel.set_current_group("A//B").is_err());
    }
}
