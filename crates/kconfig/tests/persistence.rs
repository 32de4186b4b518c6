use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use kconfig::{
    AccessMode, Config, DirLocator, Group, Notice, OpenFlags, SharedConfig, SourceKind,
    WriteFlags, WriteStatus, main_config_name, set_main_config_name,
};
use tempfile::TempDir;

fn locator(root: &Path) -> DirLocator {
    DirLocator::new()
        .with(SourceKind::System, root.join("system"))
        .with(SourceKind::User, root.join("user"))
}

fn put(root: &Path, layer: &str, name: &str, text: &str) -> PathBuf {
    let dir = root.join(layer);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn open(root: &Path, name: &str) -> Config {
    Config::builder(name)
        .locator(locator(root))
        .locale("C")
        .open()
        .unwrap()
}

#[test]
fn use_system_bell_scenario() {
    let tmp = TempDir::new().unwrap();
    let user = put(tmp.path(), "user", "kdeglobals", "[General]\nUseSystemBell=false\n");
    let config = open(tmp.path(), "kdeglobals");
    let general = config.group("General").unwrap();
    assert!(!general.read_entry("UseSystemBell", true));

    assert_eq!(general.write_entry("UseSystemBell", true), WriteStatus::Written);
    assert!(config.sync());
    assert_eq!(fs::read_to_string(&user).unwrap(), "[General]\nUseSystemBell=true\n");

    assert_eq!(general.delete_entry("UseSystemBell"), WriteStatus::Written);
    assert!(config.sync());
    let on_disk = fs::read_to_string(&user).unwrap_or_default();
    assert!(!on_disk.contains("UseSystemBell"));
    assert!(general.read_entry("UseSystemBell", true));

    config.reparse_configuration().unwrap();
    assert!(general.read_entry("UseSystemBell", true));
    assert!(!general.has_key("UseSystemBell"));
}

#[test]
fn second_sync_without_writes_does_no_io() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let user = tmp.path().join("user/apprc");
    config.group("G").unwrap().write_entry("K", 1);
    assert!(config.is_dirty());
    assert!(config.sync());
    assert!(!config.is_dirty());
    assert_eq!(fs::read_to_string(&user).unwrap(), "[G]\nK=1\n");

    fs::remove_file(&user).unwrap();
    assert!(config.sync());
    assert!(!user.exists());
}

#[test]
fn rewriting_the_same_value_leaves_the_file_alone() {
    let tmp = TempDir::new().unwrap();
    let user = put(tmp.path(), "user", "apprc", "[G]\nK=1\n");
    let config = open(tmp.path(), "apprc");
    let before = fs::metadata(&user).unwrap().modified().unwrap();
    assert_eq!(config.group("G").unwrap().write_entry("K", 1), WriteStatus::Unchanged);
    assert!(!config.is_dirty());
    assert!(config.sync());
    assert_eq!(fs::metadata(&user).unwrap().modified().unwrap(), before);
}

#[test]
fn comments_and_layout_survive_a_sync() {
    let tmp = TempDir::new().unwrap();
    let text = "# settings\n[G]\n# the answer\nA=1\n\n[H]\nB = 2\n";
    let user = put(tmp.path(), "user", "apprc", text);
    let config = open(tmp.path(), "apprc");
    config.group("G").unwrap().write_entry("A", 42);
    config.group("H").unwrap().write_entry("C", "x");
    assert!(config.sync());
    assert_eq!(
        fs::read_to_string(&user).unwrap(),
        "# settings\n[G]\n# the answer\nA=42\n\n[H]\nB = 2\nC=x\n"
    );
}

#[test]
fn external_edits_to_other_keys_are_kept() {
    let tmp = TempDir::new().unwrap();
    let user = put(tmp.path(), "user", "apprc", "[G]\nA=1\n");
    let config = open(tmp.path(), "apprc");
    fs::write(&user, "[G]\nA=1\nB=2\n").unwrap();
    config.group("G").unwrap().write_entry("A", 5);
    assert!(config.sync());
    assert_eq!(fs::read_to_string(&user).unwrap(), "[G]\nA=5\nB=2\n");
}

#[test]
fn deleting_over_a_default_writes_a_tombstone() {
    let tmp = TempDir::new().unwrap();
    put(tmp.path(), "system", "apprc", "[G]\nK=admin\n");
    let config = open(tmp.path(), "apprc");
    assert_eq!(config.group("G").unwrap().delete_entry("K"), WriteStatus::Written);
    assert!(config.sync());
    let user = tmp.path().join("user/apprc");
    assert_eq!(fs::read_to_string(user).unwrap(), "[G]\nK[$d]\n");

    let reopened = open(tmp.path(), "apprc");
    assert!(!reopened.group("G").unwrap().has_key("K"));
}

#[test]
fn deleting_groups_drops_their_sections() {
    let tmp = TempDir::new().unwrap();
    let user = put(tmp.path(), "user", "apprc", "[A]\nx=1\n[A][B]\ny=2\n[C]\nz=3\n");
    let config = open(tmp.path(), "apprc");
    assert_eq!(
        config.delete_group("A", WriteFlags::default()).unwrap(),
        WriteStatus::Written
    );
    assert!(!config.has_group("A"));
    assert_eq!(config.group_list(), vec!["C"]);
    assert!(config.sync());
    assert_eq!(fs::read_to_string(user).unwrap(), "[C]\nz=3\n");
}

#[test]
fn non_persistent_writes_are_not_synced() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let g = config.group("G").unwrap();
    g.write_entry_with("Session", "tmp", WriteFlags::empty());
    assert_eq!(g.read_string("Session", ""), "tmp");
    assert!(!config.is_dirty());
    assert!(config.sync());
    assert!(!tmp.path().join("user/apprc").exists());
}

#[test]
fn unsynced_changes_are_discarded_by_reparse() {
    let tmp = TempDir::new().unwrap();
    put(tmp.path(), "user", "apprc", "[G]\nK=disk\n");
    let config = open(tmp.path(), "apprc");
    let g = config.group("G").unwrap();
    g.write_entry("K", "memory");
    config.reparse_configuration().unwrap();
    assert_eq!(g.read_string("K", ""), "disk");
    assert!(!config.is_dirty());
}

#[test]
fn mark_as_clean_forgets_pending_writes() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let g = config.group("G").unwrap();
    g.write_entry("K", 1);
    config.mark_as_clean();
    assert_eq!(g.read_entry("K", 0), 1);
    assert!(config.sync());
    assert!(!tmp.path().join("user/apprc").exists());
}

#[test]
fn localized_writes_carry_the_locale_tag() {
    let tmp = TempDir::new().unwrap();
    let config = Config::builder("apprc")
        .locator(locator(tmp.path()))
        .locale("de_DE")
        .open()
        .unwrap();
    let g = config.group("Desktop Entry").unwrap();
    g.write_entry("Name", "Hi");
    g.write_entry_with("Name", "Hallo", WriteFlags::PERSISTENT | WriteFlags::LOCALIZED);
    assert_eq!(g.read_string("Name", ""), "Hallo");
    assert!(config.sync());
    assert_eq!(
        fs::read_to_string(tmp.path().join("user/apprc")).unwrap(),
        "[Desktop Entry]\nName=Hi\nName[de_DE]=Hallo\n"
    );
}

#[test]
fn plain_writes_drop_stale_localized_lines() {
    let tmp = TempDir::new().unwrap();
    let user = put(tmp.path(), "user", "apprc", "[G]\nName=a\nName[de]=loc\nOther=1\n");
    let config = Config::builder("apprc")
        .locator(locator(tmp.path()))
        .locale("de")
        .open()
        .unwrap();
    let g = config.group("G").unwrap();
    assert_eq!(g.read_string("Name", ""), "loc");

    assert_eq!(g.write_entry("Name", "new"), WriteStatus::Written);
    assert_eq!(g.read_string("Name", ""), "new");
    assert!(config.sync());
    assert_eq!(fs::read_to_string(&user).unwrap(), "[G]\nName=new\nOther=1\n");
    config.reparse_configuration().unwrap();
    assert_eq!(g.read_string("Name", ""), "new");

    fs::write(&user, "[G]\nName=a\nName[de]=loc\nOther=1\n").unwrap();
    config.reparse_configuration().unwrap();
    assert_eq!(g.delete_entry("Name"), WriteStatus::Written);
    assert!(!g.has_key("Name"));
    assert!(config.sync());
    assert_eq!(fs::read_to_string(&user).unwrap(), "[G]\nOther=1\n");
    config.reparse_configuration().unwrap();
    assert_eq!(g.read_string("Name", "gone"), "gone");
}

#[test]
fn path_entries_store_home_relative() {
    let Some(home) = env::var("HOME")
        .ok()
        .filter(|h| h.len() > 1 && !h.ends_with('/') && !h.contains('$'))
    else {
        return;
    };
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let g = config.group("Paths").unwrap();
    let docs = format!("{home}/docs");
    g.write_path_entry("Docs", &docs, WriteFlags::default());
    assert!(config.sync());
    assert_eq!(
        fs::read_to_string(tmp.path().join("user/apprc")).unwrap(),
        "[Paths]\nDocs[$e]=$HOME/docs\n"
    );
    assert_eq!(g.read_path_entry("Docs", ""), docs);
}

#[test]
fn lists_round_trip_through_the_file() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let g = config.group("Lists").unwrap();
    g.write_list("Plain", &["a,b", "c"]);
    g.write_xdg_list_entry("Mime", &["text/plain", "image/png"], WriteFlags::default());
    g.write_entry("Numbers", vec![1, 2, 3]);
    assert!(config.sync());

    let reopened = open(tmp.path(), "apprc");
    let g = reopened.group("Lists").unwrap();
    assert_eq!(g.read_list("Plain", &[]), vec!["a,b", "c"]);
    assert_eq!(g.read_xdg_list_entry("Mime", &[]), vec!["text/plain", "image/png"]);
    assert_eq!(g.read_entry("Numbers", Vec::<i32>::new()), vec![1, 2, 3]);
}

#[test]
fn notify_writes_reach_listeners_once() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let seen: Arc<Mutex<Vec<Notice>>> = Arc::default();
    let sink = Arc::clone(&seen);
    config.on_change(move |notices| sink.lock().unwrap().extend_from_slice(notices));

    let g = config.group("G").unwrap();
    g.write_entry("Quiet", 1);
    g.write_entry_with("Loud", 2, WriteFlags::PERSISTENT | WriteFlags::NOTIFY);
    assert!(config.sync());
    g.write_entry("Quiet", 3);
    assert!(config.sync());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].group.to_string(), "G");
    assert_eq!(seen[0].key, "Loud");
}

#[test]
fn groups_copy_and_move() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let src = config.group("Old").unwrap();
    src.write_entry("a", 1);
    src.write_entry("b", 2);
    src.group("Sub").unwrap().write_entry("c", 3);

    let copy = config.group("Copy").unwrap();
    assert_eq!(src.copy_to(&copy), WriteStatus::Written);
    assert_eq!(copy.group("Sub").unwrap().read_entry("c", 0), 3);
    assert_eq!(copy.read_entry("a", 0), 1);

    let moved = config.group("New").unwrap();
    assert_eq!(src.move_values_to(&["a", "missing"], &moved), WriteStatus::Written);
    assert_eq!(moved.read_entry("a", 0), 1);
    assert!(!src.has_key("a"));
    assert!(src.has_key("b"));

    let same = config.group("Old").unwrap();
    assert_eq!(src.move_values_to(&["b"], &same), WriteStatus::Unchanged);
    assert_eq!(src.read_entry("b", 0), 2);
}

#[test]
fn group_handles() {
    let tmp = TempDir::new().unwrap();
    let config = open(tmp.path(), "apprc");
    let sub = config.group("A").unwrap().group("B").unwrap();
    assert_eq!(sub.name(), "B");
    assert_eq!(sub.path().to_string(), "A/B");
    assert_eq!(sub.parent().unwrap().name(), "A");
    assert!(config.root().parent().is_none());

    sub.write_entry("k", "v");
    assert!(config.has_group("A"));
    assert_eq!(config.group("A").unwrap().group_list(), vec!["B"]);
    assert_eq!(sub.entry_map().get("k").map(String::as_str), Some("v"));
    assert_eq!(config.entry_map("A").unwrap().len(), 0);

    let invalid = Group::default();
    assert!(!invalid.is_valid());
    assert!(!invalid.is_immutable());
    assert_eq!(invalid.read_entry("k", 7), 7);
    assert_eq!(invalid.write_entry("k", 1), WriteStatus::NoConfig);
}

#[test]
fn copy_to_writes_a_new_file() {
    let tmp = TempDir::new().unwrap();
    put(tmp.path(), "user", "apprc", "[G]\nK=1\n[H]\nx=y\n");
    let config = open(tmp.path(), "apprc");
    let target = tmp.path().join("backup/apprc.bak");
    let copy = config.copy_to(&target).unwrap();
    assert!(copy.is_dirty());
    assert!(copy.sync());
    assert_eq!(fs::read_to_string(&target).unwrap(), "[G]\nK=1\n\n[H]\nx=y\n");
}

#[test]
fn access_modes() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(Config::anonymous().access_mode(), AccessMode::NoAccess);
    assert!(!Config::anonymous().sync());
    assert_eq!(open(tmp.path(), "apprc").access_mode(), AccessMode::ReadWrite);
}

#[test]
fn shared_configs_are_one_instance() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("shared.ini");
    let name = path.to_str().unwrap();
    let a = SharedConfig::open(name, OpenFlags::SIMPLE).unwrap();
    let b = SharedConfig::open(name, OpenFlags::SIMPLE).unwrap();
    assert!(a.ptr_eq(&b));
    assert!(SharedConfig::live_count() >= 1);

    a.group("G").unwrap().write_entry("K", 1);
    assert_eq!(b.group("G").unwrap().read_entry("K", 0), 1);

    let other = SharedConfig::open(name, OpenFlags::INCLUDE_GLOBALS).unwrap();
    assert!(!other.ptr_eq(&a));

    drop(a);
    drop(b);
    let fresh = SharedConfig::open(name, OpenFlags::SIMPLE).unwrap();
    assert_eq!(fresh.group("G").unwrap().read_entry("K", 0), 0);
}

#[test]
fn main_config_name_can_be_overridden() {
    set_main_config_name("exampleapprc");
    assert_eq!(main_config_name(), "exampleapprc");
}
