use crate::{
    Command, CoreError, KeyRef, Macro, MacroStore, MouseButton, NamedKey, macro_id_from_name,
};

use std::fs;

use serde_json::json;
use tempfile::TempDir;

fn sample_macro(name: &str, position: i64) -> Macro {
    Macro::new(
        name,
        "sample",
        vec![
            Command::key(NamedKey::Shift, true, 0.0),
            Command::text("abc", 0.125),
            Command::click(MouseButton::Left, false, 4, 5, true, 0.25),
            Command::delay(0.5, 0.375),
        ],
        2,
        position,
        true,
    )
}

/// WHAT: Ids drop filesystem-unsafe characters
/// WHY: The id is used as a file name
#[test]
fn given_names_with_unsafe_characters_when_deriving_id_then_sanitized() {
    assert_eq!(macro_id_from_name("My macro: v2?"), "My_macro__v2_");
    assert_eq!(macro_id_from_name("a/b\\c|d"), "a_b_c_d");
    assert_eq!(macro_id_from_name("dots.and-dashes"), "dotsanddashes");
    assert_eq!(macro_id_from_name("Ünïcode"), "Ünïcode");
}

/// WHAT: A saved macro loads back identically
/// WHY: Persistence is the only way macros survive restarts
#[test]
#[allow(clippy::unwrap_used)]
fn given_saved_macro_when_loading_then_identical() {
    // Given: A store with one saved macro
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path()).unwrap();
    let original = sample_macro("Copy paste", 3);
    assert!(store.save(&original, false).unwrap());

    // When: Loading it by id
    let loaded = store.load("Copy_paste").unwrap();

    // Then: Every field matches
    assert_eq!(loaded, original);
    assert!(dir.path().join("Copy_paste.json").is_file());
    assert!(dir.path().join("Copy_paste.commands.json").is_file());
}

/// WHAT: Saving over an existing macro without overwrite is a silent no-op
/// WHY: Protects the first writer from accidental clobbering
#[test]
#[allow(clippy::unwrap_used)]
fn given_existing_macro_when_saving_without_overwrite_then_unchanged() {
    // Given: A saved macro
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path()).unwrap();
    store.save(&sample_macro("Same", 1), false).unwrap();

    // When: Saving a different macro with the same name, no overwrite
    let mut replacement = sample_macro("Same", 9);
    replacement.description = "replacement".to_string();
    let written = store.save(&replacement, false).unwrap();

    // Then: Nothing is written; with overwrite it is
    assert!(!written);
    assert_eq!(store.load("Same").unwrap().position, 1);
    assert!(store.save(&replacement, true).unwrap());
    assert_eq!(store.load("Same").unwrap().position, 9);
}

/// WHAT: Missing either unit is NotFound
/// WHY: A macro needs both metadata and commands
#[test]
#[allow(clippy::unwrap_used)]
fn given_missing_commands_unit_when_loading_then_not_found() {
    // Given: A saved macro whose commands file was removed
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path()).unwrap();
    store.save(&sample_macro("Half", 0), false).unwrap();
    fs::remove_file(dir.path().join("Half.commands.json")).unwrap();

    // When/Then: Loading reports NotFound, as does an unknown id
    assert!(matches!(store.load("Half"), Err(CoreError::NotFound { .. })));
    assert!(matches!(store.load("missing"), Err(CoreError::NotFound { .. })));
}

/// WHAT: Ids with path components are rejected
/// WHY: Client-supplied ids must not escape the store directory
#[test]
#[allow(clippy::unwrap_used)]
fn given_traversal_id_when_loading_then_not_found() {
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path().join("macros")).unwrap();
    store.save(&sample_macro("secret", 0), false).unwrap();

    assert!(matches!(
        store.load("../macros/secret"),
        Err(CoreError::NotFound { .. })
    ));
}

/// WHAT: Unknown or malformed commands are skipped, the rest load
/// WHY: One bad record must not make a whole macro unusable
#[test]
#[allow(clippy::unwrap_used)]
fn given_commands_unit_with_bad_records_when_loading_then_good_ones_kept() {
    // Given: Hand-written files with an unknown kind and a malformed record
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Mixed.json"),
        json!({"name": "Mixed", "description": "", "repeat": 1, "position": 0, "timing": false})
            .to_string(),
    )
    .unwrap();
    fs::write(
        dir.path().join("Mixed.commands.json"),
        json!({"commands": [
            {"name": "Text input: a", "type": "textinput", "time": 0.0, "text": "a"},
            {"name": "?", "type": "teleport", "time": 0.0},
            {"name": "?", "type": "move", "time": 0.0},
            {"name": "Delay 0.5", "type": "delay", "time": 1.0, "delay": 0.5}
        ]})
        .to_string(),
    )
    .unwrap();
    let store = MacroStore::open(dir.path()).unwrap();

    // When: Loading the macro
    let loaded = store.load("Mixed").unwrap();

    // Then: Only the two valid commands remain, in order
    assert_eq!(
        loaded.commands,
        vec![Command::text("a", 0.0), Command::delay(0.5, 1.0)]
    );
}

/// WHAT: Key records written by the desktop recorder load with their key codes intact
/// WHY: Existing macro folders hold virtual-key codes and the full set of key names
#[test]
#[allow(clippy::unwrap_used)]
fn given_recorded_key_commands_when_loading_then_codes_and_names_resolve() {
    // Given: A commands unit as the desktop recorder writes it
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("Shortcuts.json"),
        json!({"name": "Shortcuts", "description": "", "repeat": 1, "position": 0, "timing": true})
            .to_string(),
    )
    .unwrap();
    fs::write(
        dir.path().join("Shortcuts.commands.json"),
        json!({"commands": [
            {"name": "Key ctrl_l press", "type": "key", "time": 0.0, "keytype": "key", "value": "ctrl_l", "press": true},
            {"name": "Key A press", "type": "key", "time": 0.125, "keytype": "keycode", "value": 65, "press": true},
            {"name": "Key A release", "type": "key", "time": 0.25, "keytype": "keycode", "value": 65, "press": false},
            {"name": "Key insert press", "type": "key", "time": 0.375, "keytype": "key", "value": "insert", "press": true},
            {"name": "Key print_screen press", "type": "key", "time": 0.5, "keytype": "key", "value": "print_screen", "press": true},
            {"name": "Key f13 release", "type": "key", "time": 0.625, "keytype": "key", "value": "f13", "press": false},
            {"name": "Key 97 press", "type": "key", "time": 0.75, "keytype": "keycode", "value": 97, "press": true}
        ]})
        .to_string(),
    )
    .unwrap();
    let store = MacroStore::open(dir.path()).unwrap();

    // When: Loading the macro
    let loaded = store.load("Shortcuts").unwrap();

    // Then: No keystroke is dropped and codes keep their virtual-key meaning
    assert_eq!(
        loaded.commands,
        vec![
            Command::key(NamedKey::Ctrl, true, 0.0),
            Command::key(KeyRef::Code(65), true, 0.125),
            Command::key(KeyRef::Code(65), false, 0.25),
            Command::key(NamedKey::Insert, true, 0.375),
            Command::key(NamedKey::PrintScreen, true, 0.5),
            Command::key(NamedKey::F13, false, 0.625),
            Command::key(KeyRef::Code(97), true, 0.75),
        ]
    );
    assert_eq!(loaded.commands[1].render_name(), "Key A press");
    assert_eq!(KeyRef::Code(65).typed_char(), Some('a'));
    assert_eq!(KeyRef::Code(97).typed_char(), Some('1'));
}

/// WHAT: Listing skips corrupt files and sorts by position
/// WHY: One broken file must not hide every other macro
#[test]
#[allow(clippy::unwrap_used)]
fn given_store_with_corrupt_file_when_listing_then_others_returned_sorted() {
    // Given: Three valid macros and one corrupt metadata file
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path()).unwrap();
    store.save(&sample_macro("third", 30), false).unwrap();
    store.save(&sample_macro("first", 10), false).unwrap();
    store.save(&sample_macro("second", 20), false).unwrap();
    fs::write(dir.path().join("broken.json"), "{not json").unwrap();

    // When: Listing
    let summaries = store.list_all().unwrap();

    // Then: Only valid macros, ordered by position, ids from file names
    let ids: Vec<&str> = summaries.iter().map(|s| s.macro_id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
    assert_eq!(summaries[0].repeat, 2);
    assert!(summaries[0].timing);
}

/// WHAT: Metadata-only save keeps the commands
/// WHY: Layout changes must not rewrite command lists
#[test]
#[allow(clippy::unwrap_used)]
fn given_loaded_macro_when_saving_metadata_then_commands_preserved() {
    // Given: A saved macro
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path()).unwrap();
    store.save(&sample_macro("Layout", 0), false).unwrap();

    // When: Changing only the position and saving metadata without commands
    let summary_only = Macro::new("Layout", "sample", Vec::new(), 2, 7, true);
    store.save_metadata(&summary_only).unwrap();

    // Then: Position changed, commands intact
    let loaded = store.load("Layout").unwrap();
    assert_eq!(loaded.position, 7);
    assert_eq!(loaded.commands.len(), 4);
}

/// WHAT: Delete removes both units
/// WHY: A deleted macro must disappear from listings
#[test]
#[allow(clippy::unwrap_used)]
fn given_saved_macro_when_deleting_then_gone() {
    let dir = TempDir::new().unwrap();
    let store = MacroStore::open(dir.path()).unwrap();
    store.save(&sample_macro("Gone", 0), false).unwrap();

    store.delete("Gone").unwrap();

    assert!(store.list_all().unwrap().is_empty());
    assert!(matches!(store.load("Gone"), Err(CoreError::NotFound { .. })));
}

/// WHAT: Repeat is clamped to at least one
/// WHY: A macro always plays at least once
#[test]
fn given_zero_repeat_when_constructing_then_one() {
    let mut m = Macro::new("r", "", Vec::new(), 0, 0, false);
    assert_eq!(m.repeat(), 1);
    m.set_repeat(0);
    assert_eq!(m.repeat(), 1);
    m.set_name("renamed macro");
    assert_eq!(m.id(), "renamed_macro");
}
