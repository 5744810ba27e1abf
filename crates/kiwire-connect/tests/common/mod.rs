#![allow(dead_code)]

use kiwire_connect::{EditorConfig, Endpoint, Resolver};
use kiwire_eda::LibraryTable;
use kiwire_schematic::{Position, Schematic, SymbolPlacement};
use std::path::PathBuf;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn crates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..")
}

pub fn symbols_dir() -> PathBuf {
    crates_dir().join("kiwire-eda/tests/resources/symbols")
}

pub fn schematic_fixture(name: &str) -> PathBuf {
    crates_dir().join("kiwire-schematic/tests/resources").join(name)
}

/// Only the fixture libraries, so an installed KiCad cannot change results.
pub fn libraries() -> LibraryTable {
    LibraryTable::new([symbols_dir()])
}

pub fn resolver_for(schematic: Schematic, config: &EditorConfig) -> Resolver {
    init_logging();
    Resolver::with_libraries(schematic, config, libraries())
}

/// R1 and D1 from the LED fixture, nothing wired.
pub fn led_resistor() -> Resolver {
    let schematic = Schematic::from_file(&schematic_fixture("led_resistor.kicad_sch"))
        .expect("fixture should load");
    resolver_for(schematic, &EditorConfig::default())
}

pub fn blank() -> Resolver {
    resolver_for(Schematic::new("test"), &EditorConfig::default())
}

pub fn place(resolver: &mut Resolver, lib_id: &str, reference: &str, x: f64, y: f64) {
    resolver
        .add_symbol(&SymbolPlacement::new(lib_id, reference, Position::new(x, y)))
        .unwrap_or_else(|e| panic!("placing {reference}: {e}"));
}

pub fn pin(endpoint: &str) -> Endpoint {
    endpoint.parse().expect("endpoint syntax")
}

pub fn unconnected(resolver: &Resolver) -> Vec<(String, String)> {
    resolver
        .find_unconnected_pins()
        .map(|(r, p)| (r.to_string(), p.to_string()))
        .collect()
}

pub fn pair(reference: &str, pin: &str) -> (String, String) {
    (reference.to_string(), pin.to_string())
}
