mod support;

use std::path::Path;

use audioshelf::app_dirs::logs_dir;
use audioshelf::session::{DataView, SessionStore};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use support::scratch_home::ScratchHome;

#[test]
fn default_store_lives_in_the_app_directory() {
    let home = ScratchHome::new();

    let mut store = SessionStore::load_default().expect("store location");
    assert_eq!(store.path(), home.store_file());
    store.add_to_shelf(Path::new("/books/a.m4b"));
    store.save().expect("save store");
    assert!(store.path().is_file());
    assert!(logs_dir().expect("logs dir").starts_with(home.app_dir()));
}

#[test]
fn legacy_store_file_is_read_and_rewritten_in_current_layout() {
    let home = ScratchHome::new();
    let legacy = serde_json::json!({
        "/books/a.m4b": 61_000,
        "__bookshelf__": ["/books/a.m4b"],
        "__bookmarks__": [{"file": "/books/a.m4b", "pos": 5_000, "note": "intro"}],
        "__last_book__": "/books/a.m4b",
        "ui_btn_size": 11,
        "ui_title_size": 13,
        "volume": 90
    });
    std::fs::write(home.store_file(), STANDARD.encode(legacy.to_string()))
        .expect("write legacy store");

    let store = SessionStore::load_default().expect("store location");
    assert_eq!(store.resume_position(Path::new("/books/a.m4b")), 61_000);
    assert_eq!(store.bookmarks()[0].note, "intro");
    assert_eq!(store.volume(), 90);
    store.save().expect("save store");

    let decoded = store.view(DataView::Decoded).expect("decoded view");
    let value: serde_json::Value = serde_json::from_str(&decoded).expect("json view");
    assert_eq!(value["ui"]["button_font_size"], 11);
    assert!(value.get("__bookshelf__").is_none());
}

#[test]
fn corrupt_store_file_falls_back_to_defaults_and_is_kept_aside() {
    let home = ScratchHome::new();
    std::fs::write(home.store_file(), b"\x00\x01 broken").expect("write store");

    let store = SessionStore::load_default().expect("store location");
    assert!(store.shelf().is_empty());
    assert_eq!(store.volume(), 100);
    assert!(home.app_dir().join("resume.dat.unreadable").is_file());
}
