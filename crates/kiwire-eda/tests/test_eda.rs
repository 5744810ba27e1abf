
use test_utils::{load_library, setup_symbol, setup_test_env};

use kiwire_eda::{LibraryTable, Symbol};
use std::collections::HashMap;

fn pin_map(symbol: &Symbol, unit: u32) -> HashMap<String, String> {
    symbol
        .pins_for_unit(unit)
        .map(|pin| (pin.number.clone(), symbol.designator(pin).to_string()))
        .collect()
}

#[test]
fn test_device_library_symbols() {
    let library = load_library("Device");
    assert_eq!(library.symbol_names(), vec!["C", "LED", "LED_Red", "R"]);
}

#[test]
fn test_resistor_pins() {
    let symbol = setup_symbol("Device:R");
    assert_eq!(symbol.pins.len(), 2);
    assert_eq!(symbol.unit_count(), 1);

    let pin = symbol.find_pin(1, "1").unwrap();
    assert_eq!(pin.position, (0.0, 3.81));
    assert_eq!(pin.angle, 270.0);
    assert_eq!(symbol.designator(pin), "1");
    assert!(symbol.find_pin(1, "3").is_none());
}

#[test]
fn test_led_pins_by_name() {
    let symbol = setup_symbol("Device:LED");
    assert_eq!(
        pin_map(&symbol, 1),
        HashMap::from([
            ("1".to_string(), "K".to_string()),
            ("2".to_string(), "A".to_string()),
        ])
    );
    assert_eq!(symbol.find_pin(1, "A").unwrap().number, "2");
    assert_eq!(symbol.find_pin(1, "1").unwrap().name, "K");
    assert_eq!(symbol.description.as_deref(), Some("Light emitting diode"));
}

#[test]
fn test_extended_symbol_is_flattened() {
    let symbol = setup_symbol("Device:LED_Red");
    assert_eq!(symbol.extends.as_deref(), Some("LED"));
    assert_eq!(symbol.pins.len(), 2);
    assert_eq!(symbol.property("Value"), Some("LED_Red"));
    assert_eq!(symbol.property("Footprint"), Some(""));

    let embedded = symbol.embedded_sexpr("Device:LED_Red").unwrap();
    assert!(embedded.find_child("extends").is_none());
    assert_eq!(embedded.as_list().unwrap()[1].as_atom(), Some("Device:LED_Red"));
}

#[test]
fn test_power_symbols() {
    let gnd = setup_symbol("power:GND");
    assert!(gnd.power);
    assert_eq!(gnd.pins.len(), 1);
    assert!(gnd.pins[0].hidden);
    assert_eq!(gnd.property("Value"), Some("GND"));

    let r = setup_symbol("Device:R");
    assert!(!r.power);
}

#[test]
fn test_multi_unit_pins() {
    let symbol = setup_symbol("Test:Dual_Gate");
    assert_eq!(symbol.unit_count(), 2);

    // Common power pins appear on every unit, the De Morgan body does not
    let unit1 = pin_map(&symbol, 1);
    assert_eq!(unit1.len(), 5);
    assert_eq!(unit1["8"], "VCC");
    assert_eq!(unit1["4"], "GND");
    // "A" exists on both units, so it is addressed by number
    assert_eq!(unit1["1"], "1");

    let unit2 = pin_map(&symbol, 2);
    assert!(unit2.contains_key("5"));
    assert!(!unit2.contains_key("1"));
}

#[test]
fn test_duplicate_names_resolve_to_first_pin() {
    let symbol = setup_symbol("Test:A4988");
    assert_eq!(symbol.find_pin(1, "GND").unwrap().number, "13");
    assert_eq!(symbol.find_pin(1, "15").unwrap().number, "15");
    assert_eq!(symbol.find_pin(1, "~ENABLE").unwrap().number, "1");
}

#[test]
fn test_library_table_resolves_lazily() {
    let env = setup_test_env();
    let mut table = LibraryTable::new([env.path().join("symbols")]);

    let led = table.resolve("Device:LED").unwrap();
    assert_eq!(led.name, "LED");
    assert!(table.library_path("Connector").is_some());
    assert!(table.library_path("Missing").is_none());

    let err = table.resolve("Device:Nope").unwrap_err();
    assert!(err.to_string().contains("Nope"));
    assert!(table.resolve("Missing:R").is_err());
    assert!(table.resolve("no-colon").is_err());
}

#[test]
fn test_power_pin_snapshot() {
    let symbol = setup_symbol("power:+3V3");
    insta::assert_debug_snapshot!(symbol.pins, @r#"
    [
        Pin {
            name: "+3V3",
            number: "1",
            position: (
                0.0,
                0.0,
            ),
            angle: 90.0,
            length: 0.0,
            unit: 1,
            style: 1,
            electrical_type: "power_in",
            hidden: true,
        },
    ]
    "#);
}
