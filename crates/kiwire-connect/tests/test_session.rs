mod common;

use std::fs;
use std::path::PathBuf;

use common::*;
use kiwire_connect::{ConnectError, EditSession, EditorConfig};
use kiwire_schematic::{Position, SchematicError};
use tempfile::TempDir;

fn scratch_copy() -> (TempDir, PathBuf) {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.kicad_sch");
    fs::copy(schematic_fixture("led_resistor.kicad_sch"), &path).unwrap();
    (dir, path)
}

fn open(path: &PathBuf, config: EditorConfig) -> EditSession {
    EditSession::open_with_libraries(path, config, libraries()).unwrap()
}

#[test]
fn unmodified_save_is_byte_identical() {
    let (_dir, path) = scratch_copy();
    let original = fs::read(&path).unwrap();

    let mut session = open(&path, EditorConfig::default());
    let backup = session.save().unwrap().expect("backup made");

    assert_eq!(fs::read(&path).unwrap(), original);
    assert_eq!(fs::read(backup).unwrap(), original);
}

#[test]
fn backups_are_numbered() {
    let (dir, path) = scratch_copy();
    let mut session = open(&path, EditorConfig::default());

    session
        .resolver_mut()
        .connect(&pin("R1.2"), &pin("D1.A"), None)
        .unwrap();
    let first = session.save().unwrap().unwrap();
    assert_eq!(first, dir.path().join("board.bak1.kicad_sch"));

    session
        .resolver_mut()
        .connect(&pin("R1.1"), &pin("VCC"), None)
        .unwrap();
    let second = session.save().unwrap().unwrap();
    assert_eq!(second, dir.path().join("board.bak2.kicad_sch"));

    // Each backup holds what was on disk before that save
    let fixture = fs::read_to_string(schematic_fixture("led_resistor.kicad_sch")).unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), fixture);
    assert!(fs::read_to_string(&second).unwrap().contains("(wire"));
    assert!(!fs::read_to_string(&second).unwrap().contains("VCC"));
}

#[test]
fn backups_skip_existing_names() {
    let (dir, path) = scratch_copy();
    fs::write(dir.path().join("board.bak1.kicad_sch"), "older").unwrap();

    let mut session = open(&path, EditorConfig::default());
    assert_eq!(
        session.backup().unwrap(),
        Some(dir.path().join("board.bak2.kicad_sch"))
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("board.bak1.kicad_sch")).unwrap(),
        "older"
    );
}

#[test]
fn backups_can_be_disabled() {
    let (dir, path) = scratch_copy();
    let config = EditorConfig {
        backup: false,
        ..EditorConfig::default()
    };
    let mut session = open(&path, config);
    session
        .resolver_mut()
        .connect(&pin("R1.2"), &pin("D1.A"), None)
        .unwrap();
    assert_eq!(session.save().unwrap(), None);
    assert!(!dir.path().join("board.bak1.kicad_sch").exists());
}

#[test]
fn reloading_a_saved_document_reproduces_nets() {
    let (_dir, path) = scratch_copy();
    let mut session = open(&path, EditorConfig::default());
    {
        let resolver = session.resolver_mut();
        resolver.connect(&pin("R1.2"), &pin("D1.A"), None).unwrap();
        resolver.connect(&pin("R1.1"), &pin("VCC"), None).unwrap();
        resolver.mark_no_connect("D1", "K").unwrap();
    }
    let nets = session.resolver().nets();
    session.save().unwrap();

    let reopened = open(&path, EditorConfig::default());
    assert_eq!(reopened.resolver().nets(), nets);
    assert_eq!(reopened.resolver().find_unconnected_pins().count(), 0);
    assert_eq!(reopened.schematic().project(), "board");
}

#[test]
fn reload_discards_edits() {
    let (_dir, path) = scratch_copy();
    let mut session = open(&path, EditorConfig::default());
    session
        .resolver_mut()
        .connect(&pin("R1.2"), &pin("D1.A"), None)
        .unwrap();
    assert_eq!(session.resolver().nets().len(), 1);

    session.reload().unwrap();
    assert!(session.resolver().nets().is_empty());
    assert!(!session.schematic().is_modified());
}

#[test]
fn tee_without_junction_is_connected_after_reload() {
    let (_dir, path) = scratch_copy();
    let mut session = open(&path, EditorConfig::default());
    {
        let resolver = session.resolver_mut();
        resolver
            .add_wire(&[Position::new(100.0, 103.81), Position::new(130.0, 103.81)])
            .unwrap();
        resolver
            .add_wire(&[Position::new(123.81, 110.0), Position::new(123.81, 103.81)])
            .unwrap();
    }
    assert_eq!(session.schematic().junctions().count(), 0);
    session.save().unwrap();

    let reopened = open(&path, EditorConfig::default());
    let nets = reopened.resolver().nets();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0].pins.len(), 2);
}

#[test]
fn wire_over_pins_is_connected_after_reload() {
    let (_dir, path) = scratch_copy();
    let mut session = open(&path, EditorConfig::default());
    session
        .resolver_mut()
        .add_wire(&[Position::new(110.0, 110.0), Position::new(130.0, 110.0)])
        .unwrap();
    let live = session.resolver().nets();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].pins.len(), 2);
    session.save().unwrap();

    let reopened = open(&path, EditorConfig::default());
    assert_eq!(reopened.resolver().nets(), live);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EditSession::open_with_libraries(
        dir.path().join("absent.kicad_sch"),
        EditorConfig::default(),
        libraries(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ConnectError::Schematic(SchematicError::Io { .. })
    ));
}
