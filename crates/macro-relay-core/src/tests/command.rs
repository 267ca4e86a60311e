use crate::{
    Command, CommandUpdate, CoreError, KeyRef, MouseButton, NamedKey,
    tests::support::{Injected, RecordingInjector},
};

use serde_json::json;

fn every_kind() -> Vec<Command> {
    vec![
        Command::key(NamedKey::Esc, true, 0.0),
        Command::key(NamedKey::F11, false, 1.25),
        Command::key(NamedKey::F20, true, 1.5),
        Command::key(NamedKey::MediaPlayPause, false, 1.75),
        Command::key(KeyRef::Code(65), true, 0.5),
        Command::key(KeyRef::Code(300), false, 2.0),
        Command::click(MouseButton::Left, true, 10, 20, true, 0.0),
        Command::click(MouseButton::X2, false, -5, 7, false, 3.0),
        Command::mouse_move(640, 480, true, 0.125),
        Command::mouse_move(-3, 4, false, 0.25),
        Command::scroll(0, -2, 0.375),
        Command::delay(0.0, 0.0),
        Command::delay(1.5, 4.0),
        Command::text("", 0.0),
        Command::text("héllo wörld", 0.75),
    ]
}

/// WHAT: Every command kind survives encode/decode unchanged
/// WHY: Persisted macros must replay exactly what was recorded
#[test]
#[allow(clippy::unwrap_used)]
fn given_every_command_kind_when_round_tripped_through_json_then_equal() {
    // Given: One command per kind, including boundary values
    for command in every_kind() {
        // When: Encoding to a JSON value and decoding it again
        let value = serde_json::to_value(command.to_record()).unwrap();
        let decoded = Command::from_json(value).unwrap();

        // Then: The decoded command equals the original
        assert_eq!(decoded, command);
    }
}

/// WHAT: Records use the persisted field layout
/// WHY: Files written by older installs must stay readable
#[test]
#[allow(clippy::unwrap_used)]
fn given_commands_when_encoded_then_records_match_persisted_layout() {
    // Given: A named key, a code key, a click and a scroll
    let named = Command::key(NamedKey::Space, true, 0.5);
    let code = Command::key(KeyRef::Code(65), false, 0.0);
    let click = Command::click(MouseButton::Right, true, 1, 2, true, 0.0);
    let scroll = Command::scroll(3, -4, 0.0);

    // When: Encoding them
    let named = serde_json::to_value(named.to_record()).unwrap();
    let code = serde_json::to_value(code.to_record()).unwrap();
    let click = serde_json::to_value(click.to_record()).unwrap();
    let scroll = serde_json::to_value(scroll.to_record()).unwrap();

    // Then: Tags, key types and the raw button tuple are as persisted
    assert_eq!(named["type"], "key");
    assert_eq!(named["keytype"], "key");
    assert_eq!(named["value"], "space");
    assert_eq!(named["name"], "Key space press");
    assert_eq!(code["keytype"], "keycode");
    assert_eq!(code["value"], 65);
    assert_eq!(click["type"], "click");
    assert_eq!(click["button"], json!([8, 16, 0]));
    assert_eq!(scroll["type"], "scroll");
    assert_eq!(scroll["x"], 3);
    assert_eq!(scroll["y"], -4);
}

/// WHAT: Unknown type tags are reported as UnknownCommandKind
/// WHY: The loader skips them instead of failing the whole macro
#[test]
fn given_unknown_type_tag_when_decoding_then_unknown_command_kind() {
    // Given: A record with an unrecognized tag
    let value = json!({"name": "Teleport", "type": "teleport", "time": 0.0});

    // When: Decoding it
    let result = Command::from_json(value);

    // Then: The error names the kind
    assert!(matches!(
        result,
        Err(CoreError::UnknownCommandKind { ref kind, .. }) if kind == "teleport"
    ));
}

/// WHAT: Known tags with bad fields are Malformed
/// WHY: Distinguishes corrupt data from newer command kinds
#[test]
fn given_known_tag_with_bad_fields_when_decoding_then_malformed() {
    // Given: Records missing fields or carrying invalid values
    let missing = json!({"type": "move", "time": 0.0, "x": 1});
    let bad_button = json!({"type": "click", "time": 0.0, "button": [9, 9, 9], "press": true, "x": 0, "y": 0, "absolute": true});
    let bad_key = json!({"type": "key", "time": 0.0, "keytype": "key", "value": "hyper", "press": true});

    // When/Then: Each decodes to Malformed
    for value in [missing, bad_button, bad_key] {
        assert!(matches!(
            Command::from_json(value),
            Err(CoreError::Malformed { .. })
        ));
    }
}

/// WHAT: Display names follow the current field values
/// WHY: Names are derived, never stored, so they cannot go stale
#[test]
fn given_command_when_updated_then_name_reflects_new_fields() {
    // Given: A mouse move to an absolute position
    let mut command = Command::mouse_move(1, 2, true, 0.0);
    assert_eq!(command.render_name(), "Mouse Move to 1, 2");

    // When: Switching to relative and changing coordinates
    command.apply_update(CommandUpdate {
        x: Some(-4),
        absolute: Some(false),
        text: Some("ignored".to_string()),
        ..CommandUpdate::default()
    });

    // Then: The name follows and unrelated fields are ignored
    assert_eq!(command.render_name(), "Mouse Move by -4, 2");
    assert_eq!(command, Command::mouse_move(-4, 2, false, 0.0));
}

/// WHAT: Rendered names for each kind
/// WHY: Clients and logs show these strings
#[test]
fn given_each_kind_when_rendering_then_expected_names() {
    assert_eq!(
        Command::key(KeyRef::Code(65), false, 0.0).render_name(),
        "Key A release"
    );
    assert_eq!(
        Command::key(KeyRef::Code(200), true, 0.0).render_name(),
        "Key 200 press"
    );
    assert_eq!(
        Command::click(MouseButton::Left, true, 5, 6, true, 0.0).render_name(),
        "Mouse press left at 5, 6"
    );
    assert_eq!(
        Command::click(MouseButton::Middle, false, 1, 1, false, 0.0).render_name(),
        "Mouse release middle by 1, 1"
    );
    assert_eq!(Command::scroll(0, 3, 0.0).render_name(), "Mouse Scroll 0, 3");
    assert_eq!(Command::delay(0.25, 0.0).render_name(), "Delay 0.25");
    assert_eq!(Command::text("hi", 0.0).render_name(), "Text input: hi");
    assert_eq!(Command::text("hi", 1.5).to_string(), "Text input: hi at 1.5");
}

/// WHAT: Delays are rounded to milliseconds and times never go negative
/// WHY: Keeps persisted values stable and schedules well-defined
#[test]
fn given_unrounded_or_negative_values_when_constructing_then_normalized() {
    // Given/When: A delay with sub-millisecond precision and a negative time
    let mut delay = Command::delay(0.123_456, -2.0);

    // Then: Values are normalized
    assert_eq!(delay, Command::delay(0.123, 0.0));

    // When: Updating the delay
    delay.apply_update(CommandUpdate {
        seconds: Some(2.000_49),
        time: Some(1.0),
        ..CommandUpdate::default()
    });

    // Then: The update is normalized too
    assert_eq!(delay.render_name(), "Delay 2");
    assert!((delay.time - 1.0).abs() < f64::EPSILON);
}

/// WHAT: Executing commands drives the matching injector calls
/// WHY: Mouse commands position the pointer before acting
#[test]
#[allow(clippy::unwrap_used)]
fn given_commands_when_executed_then_injector_receives_actions() {
    // Given: A recording injector
    let mut injector = RecordingInjector::default();

    // When: Executing a click, a relative move, a scroll and some text
    Command::click(MouseButton::Left, true, 10, 20, true, 0.0)
        .execute(&mut injector)
        .unwrap();
    Command::mouse_move(3, -3, false, 0.0)
        .execute(&mut injector)
        .unwrap();
    Command::scroll(1, 2, 0.0).execute(&mut injector).unwrap();
    Command::text("abc", 0.0).execute(&mut injector).unwrap();

    // Then: The injector saw each action in order
    assert_eq!(
        injector.actions(),
        vec![
            Injected::MoveTo(10, 20),
            Injected::Button(MouseButton::Left, true),
            Injected::MoveBy(3, -3),
            Injected::Scroll(1, 2),
            Injected::Text("abc".to_string()),
        ]
    );
}

/// WHAT: Symbolic key names parse, including side-specific aliases
/// WHY: Older files store names such as ctrl_l
#[test]
fn given_key_names_when_parsing_then_known_names_resolve() {
    assert_eq!(NamedKey::parse("ctrl_l"), Some(NamedKey::Ctrl));
    assert_eq!(NamedKey::parse("f12"), Some(NamedKey::F12));
    assert_eq!(NamedKey::parse("f20"), Some(NamedKey::F20));
    assert_eq!(NamedKey::parse("esc"), Some(NamedKey::Esc));
    assert_eq!(NamedKey::parse("hyper"), None);
    assert_eq!(NamedKey::parse("f21"), None);
    assert_eq!(NamedKey::F7.as_str(), "f7");

    for name in [
        "insert",
        "menu",
        "num_lock",
        "pause",
        "print_screen",
        "scroll_lock",
        "media_volume_up",
        "f13",
    ] {
        assert!(NamedKey::parse(name).is_some(), "{} should parse", name);
    }
}

/// WHAT: Every named key round-trips through its name and its key code
/// WHY: Persisted names and recorded codes must resolve to the same key
#[test]
fn given_every_named_key_when_mapping_name_and_code_then_same_key() {
    for key in NamedKey::ALL {
        assert_eq!(NamedKey::parse(key.as_str()), Some(key));
        assert_eq!(NamedKey::from_vk(key.vk()), Some(key));
    }
}

/// WHAT: Characters map to virtual-key codes and back to the typed character
/// WHY: Letters are stored as uppercase key codes but type lowercase
#[test]
fn given_characters_when_mapping_to_key_codes_then_virtual_key_numbering() {
    assert_eq!(KeyRef::for_char('a'), Some(KeyRef::Code(65)));
    assert_eq!(KeyRef::for_char('Z'), Some(KeyRef::Code(90)));
    assert_eq!(KeyRef::for_char('7'), Some(KeyRef::Code(55)));
    assert_eq!(KeyRef::for_char(';'), Some(KeyRef::Code(0xBA)));
    assert_eq!(KeyRef::for_char(' '), Some(KeyRef::Named(NamedKey::Space)));
    assert_eq!(KeyRef::for_char('é'), None);

    assert_eq!(KeyRef::Code(65).typed_char(), Some('a'));
    assert_eq!(KeyRef::Code(0x61).typed_char(), Some('1'));
    assert_eq!(KeyRef::Code(0xDE).typed_char(), Some('\''));
    assert_eq!(KeyRef::Code(0x2D).typed_char(), None);
    assert_eq!(KeyRef::Named(NamedKey::Esc).typed_char(), None);
}
