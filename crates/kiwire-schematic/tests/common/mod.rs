#![allow(dead_code)]

use kiwire_eda::{Symbol, SymbolLibrary};
use kiwire_schematic::Schematic;
use std::path::PathBuf;

pub const UUID_FILTER: (&str, &str) = (
    r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    "[UUID]",
);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn resource(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources")
        .join(name)
}

pub fn load(name: &str) -> Schematic {
    init_logging();
    Schematic::from_file(&resource(name)).expect("fixture should load")
}

/// Symbols from the shared fixture libraries in kiwire-eda.
pub fn library_symbol(lib_id: &str) -> Symbol {
    let (nickname, name) = lib_id.split_once(':').expect("Nickname:Name");
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../kiwire-eda/tests/resources/symbols")
        .join(format!("{nickname}.kicad_sym"));
    SymbolLibrary::from_file(&path)
        .expect("fixture library should load")
        .get_symbol(name)
        .cloned()
        .unwrap_or_else(|| panic!("{lib_id} missing from fixtures"))
}
