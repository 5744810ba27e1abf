mod common;

use common::*;
use kiwire_connect::{ConnectError, EditorConfig, Endpoint, NetPin, Resolver};
use kiwire_schematic::{
    LabelKind, Position, Schematic, SchematicError, SymbolPlacement, Transform,
};

#[test]
fn resolve_pin_on_fixture() {
    let resolver = led_resistor();
    assert_eq!(
        resolver.resolve_pin("R1", "1").unwrap(),
        Position::new(100.0, 96.19)
    );
    assert_eq!(
        resolver.resolve_pin("R1", "2").unwrap(),
        Position::new(100.0, 103.81)
    );
    assert_eq!(
        resolver.resolve_pin("D1", "K").unwrap(),
        Position::new(116.19, 110.0)
    );
    // Number works as well as name
    assert_eq!(
        resolver.resolve_pin("D1", "2").unwrap(),
        Position::new(123.81, 110.0)
    );
}

#[test]
fn resolve_pin_errors() {
    let resolver = led_resistor();
    assert!(matches!(
        resolver.resolve_pin("Q1", "1"),
        Err(ConnectError::ComponentNotFound(r)) if r == "Q1"
    ));
    assert!(matches!(
        resolver.resolve_pin("R1", "3"),
        Err(ConnectError::PinNotFound { reference, pin }) if reference == "R1" && pin == "3"
    ));
}

#[test]
fn resolve_pin_applies_rotation() {
    let mut resolver = blank();
    resolver
        .add_symbol(
            &SymbolPlacement::new("Device:R", "R1", Position::new(100.0, 100.0)).rotation(90.0),
        )
        .unwrap();

    let expected = Transform::new(90.0, None).place(Position::new(100.0, 100.0), (0.0, 3.81));
    assert_eq!(resolver.resolve_pin("R1", "1").unwrap(), expected);
    assert_eq!(expected, Position::new(96.19, 100.0));
}

#[test]
fn led_resistor_scenario() {
    let mut resolver = led_resistor();
    assert_eq!(
        unconnected(&resolver),
        vec![pair("R1", "1"), pair("R1", "2"), pair("D1", "K"), pair("D1", "A")]
    );

    let connection = resolver
        .connect(&pin("R1.2"), &pin("D1.A"), None)
        .unwrap();
    assert_eq!(connection.net, "Net-(R1-Pad2)");
    // Horizontal then vertical
    assert_eq!(connection.wires.len(), 2);
    assert!(connection.junctions.is_empty());
    assert!(connection.label.is_none());

    assert_eq!(
        unconnected(&resolver),
        vec![pair("R1", "1"), pair("D1", "K")]
    );
    insta::assert_debug_snapshot!(resolver.nets(), @r###"
    [
        Net {
            name: "Net-(R1-Pad2)",
            explicit: false,
            pins: [
                NetPin {
                    reference: "R1",
                    pin: "2",
                },
                NetPin {
                    reference: "D1",
                    pin: "A",
                },
            ],
        },
    ]
    "###);

    let wires: Vec<_> = resolver.schematic().wires().collect();
    assert_eq!(wires[0].points, vec![Position::new(100.0, 103.81), Position::new(123.81, 103.81)]);
    assert_eq!(wires[1].points, vec![Position::new(123.81, 103.81), Position::new(123.81, 110.0)]);
}

#[test]
fn diagonal_wires_when_allowed() {
    let schematic = Schematic::from_file(&schematic_fixture("led_resistor.kicad_sch")).unwrap();
    let config = EditorConfig {
        allow_diagonal: true,
        ..EditorConfig::default()
    };
    let mut resolver = resolver_for(schematic, &config);
    let connection = resolver.connect(&pin("R1.2"), &pin("D1.A"), None).unwrap();
    assert_eq!(connection.wires.len(), 1);
}

#[test]
fn connect_is_idempotent() {
    let mut resolver = led_resistor();
    resolver.connect(&pin("R1.2"), &pin("D1.A"), None).unwrap();
    let document = resolver.schematic().to_string();

    let again = resolver.connect(&pin("R1.2"), &pin("D1.A"), None).unwrap();
    assert!(again.is_noop());
    assert_eq!(again.net, "Net-(R1-Pad2)");
    let reversed = resolver.connect(&pin("D1.A"), &pin("R1.2"), None).unwrap();
    assert!(reversed.is_noop());
    assert_eq!(resolver.schematic().to_string(), document);
}

#[test]
fn connections_are_transitive() {
    let mut resolver = blank();
    place(&mut resolver, "Device:R", "R1", 100.0, 100.0);
    place(&mut resolver, "Device:R", "R2", 120.0, 100.0);
    place(&mut resolver, "Device:R", "R3", 140.0, 120.0);

    resolver.connect(&pin("R1.2"), &pin("R2.2"), None).unwrap();
    resolver.connect(&pin("R2.2"), &pin("R3.1"), None).unwrap();

    let net = resolver.resolve_net(&pin("R1.2"));
    assert!(net.is_some());
    assert_eq!(net, resolver.resolve_net(&pin("R3.1")));
    assert_eq!(resolver.nets().len(), 1);
    assert_eq!(resolver.nets()[0].pins.len(), 3);
    assert_eq!(resolver.resolve_net(&pin("R1.1")), None);
}

#[test]
fn nothing_unconnected_once_everything_is_wired() {
    let mut resolver = led_resistor();
    resolver.connect(&pin("R1.2"), &pin("D1.A"), None).unwrap();
    resolver.connect(&pin("R1.1"), &pin("VCC"), None).unwrap();
    resolver.connect(&pin("D1.K"), &pin("GND"), None).unwrap();

    assert_eq!(resolver.find_unconnected_pins().count(), 0);
    // Restartable
    assert_eq!(resolver.find_unconnected_pins().count(), 0);
}

#[test]
fn net_endpoint_places_a_label_at_the_pin() {
    let mut resolver = led_resistor();
    let connection = resolver
        .connect(&pin("R1.1"), &Endpoint::net("VCC"), None)
        .unwrap();
    assert!(connection.wires.is_empty());
    assert!(connection.label.is_some());
    assert_eq!(connection.net, "VCC");

    let labels: Vec<_> = resolver.schematic().labels().collect();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].text, "VCC");
    assert_eq!(labels[0].kind, LabelKind::Local);
    assert_eq!(labels[0].position, Position::new(100.0, 96.19));

    assert_eq!(resolver.resolve_net(&pin("R1.1")).as_deref(), Some("VCC"));
    assert!(resolver.nets()[0].explicit);

    // Joining the same net again draws nothing
    let again = resolver
        .connect(&pin("R1.1"), &Endpoint::net("VCC"), None)
        .unwrap();
    assert!(again.is_noop());
}

#[test]
fn same_label_text_is_one_net() {
    let mut resolver = blank();
    place(&mut resolver, "Device:R", "R1", 100.0, 100.0);
    place(&mut resolver, "Device:R", "R2", 140.0, 100.0);
    let r1 = resolver.resolve_pin("R1", "1").unwrap();
    let r2 = resolver.resolve_pin("R2", "1").unwrap();
    resolver.add_label("SIG", r1, 0.0, LabelKind::Local).unwrap();
    resolver.add_label("SIG", r2, 0.0, LabelKind::Global).unwrap();

    let nets = resolver.nets();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0].name, "SIG");
    assert!(nets[0].explicit);
    assert_eq!(resolver.net_pins("SIG").len(), 2);
}

#[test]
fn explicit_net_name_names_a_new_net() {
    let mut resolver = led_resistor();
    let connection = resolver
        .connect(&pin("R1.2"), &pin("D1.A"), Some("LED_A"))
        .unwrap();
    assert_eq!(connection.net, "LED_A");
    assert!(connection.label.is_some());
    assert_eq!(resolver.resolve_net(&pin("D1.A")).as_deref(), Some("LED_A"));
}

#[test]
fn conflicting_names_leave_document_untouched() {
    let mut resolver = led_resistor();
    resolver.connect(&pin("R1.1"), &pin("VCC"), None).unwrap();
    resolver.connect(&pin("D1.K"), &pin("GND"), None).unwrap();
    let document = resolver.schematic().to_string();

    let err = resolver
        .connect(&pin("R1.1"), &pin("D1.K"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectError::ConflictingNetNames { ref a, ref b } if a == "VCC" && b == "GND"
    ));
    assert_eq!(resolver.schematic().to_string(), document);
    assert_eq!(resolver.resolve_net(&pin("D1.K")).as_deref(), Some("GND"));

    // An explicit name settles it
    let merged = resolver
        .connect(&pin("R1.1"), &pin("D1.K"), Some("VCC"))
        .unwrap();
    assert_eq!(merged.net, "VCC");
    assert_eq!(resolver.resolve_net(&pin("D1.K")).as_deref(), Some("VCC"));
}

#[test]
fn net_endpoints_are_checked() {
    let mut resolver = led_resistor();
    assert!(matches!(
        resolver.connect(&Endpoint::net("A"), &Endpoint::net("B"), None),
        Err(ConnectError::InvalidEndpoint(_))
    ));
    assert!(matches!(
        resolver.connect(&pin("R1.1"), &Endpoint::net("VCC"), Some("GND")),
        Err(ConnectError::ConflictingNetNames { .. })
    ));
    assert!(matches!(
        resolver.connect(&pin("R9.1"), &pin("D1.A"), None),
        Err(ConnectError::ComponentNotFound(_))
    ));
    assert!(!resolver.schematic().is_modified());
}

#[test]
fn connect_many_rolls_back_disconnected_pairs() {
    let mut resolver = blank();
    for (i, reference) in ["R1", "R2", "R3", "R4"].iter().enumerate() {
        place(&mut resolver, "Device:R", reference, 100.0 + 20.0 * i as f64, 100.0);
    }
    let document = resolver.schematic().to_string();

    let pairs = [
        (pin("R1.1"), pin("R2.1")),
        (pin("R3.1"), pin("R4.1")),
    ];
    let err = resolver.connect_many(&pairs, None).unwrap_err();
    assert!(matches!(err, ConnectError::DisconnectedNet { ref nets } if nets.len() == 2));

    assert_eq!(resolver.schematic().to_string(), document);
    assert_eq!(resolver.schematic().wires().count(), 0);
    assert_eq!(resolver.resolve_net(&pin("R1.1")), None);
    assert_eq!(resolver.find_unconnected_pins().count(), 8);

    // Naming the net ties both pairs together through labels
    let connections = resolver.connect_many(&pairs, Some("BUS")).unwrap();
    assert_eq!(connections.len(), 2);
    assert_eq!(resolver.net_pins("BUS").len(), 4);
    assert_eq!(resolver.resolve_net(&pin("R4.1")).as_deref(), Some("BUS"));
}

#[test]
fn connect_many_rolls_back_on_any_error() {
    let mut resolver = led_resistor();
    let pairs = [
        (pin("R1.2"), pin("D1.A")),
        (pin("D1.K"), pin("R1.7")),
    ];
    assert!(matches!(
        resolver.connect_many(&pairs, None),
        Err(ConnectError::PinNotFound { .. })
    ));
    assert!(!resolver.schematic().is_modified());
    assert_eq!(resolver.nets().len(), 0);
}

/// R1 and R2 joined by a horizontal wire, R3 below the middle of it.
fn tee() -> Resolver {
    let mut resolver = blank();
    place(&mut resolver, "Device:R", "R1", 100.0, 100.0);
    place(&mut resolver, "Device:R", "R2", 120.0, 100.0);
    place(&mut resolver, "Device:R", "R3", 110.0, 120.0);
    resolver.connect(&pin("R1.2"), &pin("R2.2"), None).unwrap();
    resolver
}

#[test]
fn junction_where_a_wire_ends_on_another() {
    let mut resolver = tee();
    let connection = resolver
        .connect(&pin("R3.1"), &Endpoint::point(110.0, 103.81), None)
        .unwrap();
    assert_eq!(connection.wires.len(), 1);
    assert_eq!(connection.junctions.len(), 1);
    assert_eq!(connection.net, "Net-(R1-Pad2)");

    let junctions: Vec<_> = resolver.schematic().junctions().collect();
    assert_eq!(junctions.len(), 1);
    assert_eq!(junctions[0].position, Position::new(110.0, 103.81));
    assert_eq!(resolver.net_pins("Net-(R1-Pad2)").len(), 3);
}

#[test]
fn junction_where_two_wires_meet_at_a_pin() {
    let mut resolver = tee();
    let connection = resolver.connect(&pin("R3.1"), &pin("R1.2"), None).unwrap();
    assert_eq!(connection.wires.len(), 2);
    assert_eq!(connection.junctions.len(), 1);

    let junctions: Vec<_> = resolver.schematic().junctions().collect();
    assert_eq!(junctions[0].position, Position::new(100.0, 103.81));

    // Never a second junction at the same spot
    place(&mut resolver, "Device:R", "R4", 80.0, 100.0);
    let again = resolver
        .connect(&pin("R4.2"), &pin("R1.2"), None)
        .unwrap();
    assert_eq!(again.wires.len(), 1);
    assert!(again.junctions.is_empty());
    assert_eq!(resolver.schematic().junctions().count(), 1);
}

#[test]
fn crossing_wires_need_a_junction() {
    let mut resolver = blank();
    resolver
        .add_wire(&[Position::new(100.0, 110.0), Position::new(120.0, 110.0)])
        .unwrap();
    resolver
        .add_wire(&[Position::new(110.0, 100.0), Position::new(110.0, 120.0)])
        .unwrap();
    let horizontal = Endpoint::point(100.0, 110.0);
    let vertical = Endpoint::point(110.0, 100.0);
    assert_ne!(
        resolver.resolve_net(&horizontal),
        resolver.resolve_net(&vertical)
    );

    resolver.add_junction(Position::new(110.0, 110.0)).unwrap();
    assert_eq!(
        resolver.resolve_net(&horizontal),
        resolver.resolve_net(&vertical)
    );
}

#[test]
fn power_symbols_name_their_net() {
    let mut resolver = blank();
    place(&mut resolver, "Device:R", "R1", 100.0, 100.0);
    place(&mut resolver, "power:GND", "#PWR01", 100.0, 120.0);
    assert_eq!(unconnected(&resolver), vec![pair("R1", "1"), pair("R1", "2")]);

    let connection = resolver.connect(&pin("R1.2"), &pin("#PWR01.1"), None).unwrap();
    assert_eq!(connection.net, "GND");
    assert!(connection.label.is_none());
    assert_eq!(unconnected(&resolver), vec![pair("R1", "1")]);

    let nets = resolver.nets();
    assert_eq!(nets.len(), 1);
    assert_eq!(nets[0].name, "GND");
    assert_eq!(nets[0].pins.len(), 1);
}

#[test]
fn no_connect_markers_hide_pins() {
    let mut resolver = led_resistor();
    resolver.mark_no_connect("D1", "K").unwrap();
    assert_eq!(
        unconnected(&resolver),
        vec![pair("R1", "1"), pair("R1", "2"), pair("D1", "A")]
    );
    assert_eq!(resolver.schematic().no_connects().count(), 1);
}

#[test]
fn multi_unit_components() {
    let mut resolver = blank();
    place(&mut resolver, "Test:Dual_Gate", "U1", 100.0, 100.0);
    resolver
        .add_symbol(
            &SymbolPlacement::new("Test:Dual_Gate", "U1", Position::new(130.0, 100.0)).unit(2),
        )
        .unwrap();

    assert_eq!(resolver.components().len(), 1);
    let u1 = resolver.component("U1").unwrap();
    assert_eq!(u1.units, vec![1, 2]);
    let designators: Vec<&str> = u1.pins.iter().map(|p| p.designator.as_str()).collect();
    assert_eq!(designators, vec!["VCC", "GND", "1", "2", "7", "5", "6", "3"]);

    // Duplicate names resolve to the first declared pin
    assert_eq!(
        resolver.resolve_pin("U1", "Y").unwrap(),
        Position::new(107.62, 100.0)
    );
    assert_eq!(
        resolver.resolve_pin("U1", "3").unwrap(),
        Position::new(137.62, 100.0)
    );
}

#[test]
fn unannotated_symbols_are_skipped() {
    let mut resolver = blank();
    place(&mut resolver, "Device:R", "R?", 100.0, 100.0);
    assert_eq!(resolver.schematic().symbols().count(), 1);
    assert!(resolver.components().is_empty());
    assert_eq!(resolver.find_unconnected_pins().count(), 0);
}

#[test]
fn missing_library_symbols() {
    let mut resolver = blank();
    let document = resolver.schematic().to_string();
    let err = resolver
        .add_symbol(&SymbolPlacement::new("Nope:R", "R1", Position::new(0.0, 0.0)))
        .unwrap_err();
    assert!(matches!(
        err,
        ConnectError::Schematic(SchematicError::SymbolNotFound(ref id)) if id == "Nope:R"
    ));

    let err = resolver
        .add_symbol(&SymbolPlacement::new("Device:Nope", "R1", Position::new(0.0, 0.0)))
        .unwrap_err();
    assert!(matches!(err, ConnectError::Library(_)));
    assert_eq!(resolver.schematic().to_string(), document);
}

#[test]
fn moving_a_symbol_rebuilds_connectivity() {
    let mut resolver = led_resistor();
    resolver.connect(&pin("R1.2"), &pin("D1.A"), None).unwrap();

    resolver.move_symbol("R1", Position::new(80.0, 100.0)).unwrap();
    assert_eq!(
        resolver.resolve_pin("R1", "2").unwrap(),
        Position::new(80.0, 103.81)
    );
    // The wire stayed behind
    assert_eq!(
        unconnected(&resolver),
        vec![pair("R1", "1"), pair("R1", "2"), pair("D1", "K")]
    );

    assert!(matches!(
        resolver.move_symbol("Q7", Position::new(0.0, 0.0)),
        Err(ConnectError::ComponentNotFound(_))
    ));
}

#[test]
fn components_with_pin_names() {
    let mut resolver = blank();
    place(&mut resolver, "Test:MCU", "U1", 100.0, 100.0);
    place(&mut resolver, "Test:I2C_Sensor", "U2", 140.0, 100.0);
    place(&mut resolver, "Device:R", "R1", 60.0, 100.0);

    assert_eq!(
        resolver.find_components_with_pin(&["VCC", "VDD"]),
        vec![pair("U1", "VCC"), pair("U2", "VDD")]
    );
}

#[test]
fn routing_steps_around_other_nets() {
    let mut resolver = blank();
    place(&mut resolver, "Device:R", "R1", 100.0, 100.0);
    place(&mut resolver, "Device:R", "R3", 120.0, 100.0);
    resolver.connect(&pin("R1.2"), &Endpoint::net("SIG"), None).unwrap();
    resolver.connect(&pin("R3.2"), &Endpoint::net("VCC"), None).unwrap();

    // Horizontal first would turn the corner on R3.2
    let connection = resolver
        .connect(&pin("R1.2"), &Endpoint::point(120.0, 120.0), None)
        .unwrap();
    assert_eq!(connection.net, "SIG");
    let wires: Vec<_> = resolver.schematic().wires().collect();
    assert_eq!(wires.len(), 2);
    assert_eq!(wires[0].points, vec![Position::new(100.0, 103.81), Position::new(100.0, 120.0)]);
    assert_eq!(wires[1].points, vec![Position::new(100.0, 120.0), Position::new(120.0, 120.0)]);

    assert_eq!(resolver.resolve_net(&pin("R3.2")).as_deref(), Some("VCC"));
    assert_eq!(resolver.net_pins("VCC"), vec![net_pin("R3", "2")]);
    assert_eq!(resolver.net_pins("SIG"), vec![net_pin("R1", "2")]);
}

fn net_pin(reference: &str, pin: &str) -> NetPin {
    NetPin {
        reference: reference.to_string(),
        pin: pin.to_string(),
    }
}

/// R1, R2 and R3 side by side; a straight wire from R1.2 to R3.2 runs
/// over R2.2.
fn row_of_three() -> Resolver {
    let mut resolver = blank();
    for (reference, x) in [("R1", 100.0), ("R2", 110.0), ("R3", 120.0)] {
        place(&mut resolver, "Device:R", reference, x, 100.0);
    }
    resolver
}

#[test]
fn blocked_route_is_an_error() {
    let mut resolver = row_of_three();
    let document = resolver.schematic().to_string();

    let err = resolver
        .connect(&pin("R1.2"), &pin("R3.2"), None)
        .unwrap_err();
    assert!(
        matches!(err, ConnectError::RouteBlocked { ref obstacles, .. } if obstacles == &["pin R2.2"]),
        "{err}"
    );
    assert!(err.to_string().contains("(100, 103.81)"), "{err}");
    assert_eq!(resolver.schematic().to_string(), document);
    assert_eq!(resolver.resolve_net(&pin("R1.2")), None);
    assert_eq!(resolver.resolve_net(&pin("R2.2")), None);
}

#[test]
fn route_may_cross_pins_of_its_own_net() {
    let mut resolver = row_of_three();
    resolver.connect(&pin("R1.2"), &Endpoint::net("SIG"), None).unwrap();
    resolver.connect(&pin("R2.2"), &Endpoint::net("SIG"), None).unwrap();

    let connection = resolver.connect(&pin("R1.2"), &pin("R3.2"), None).unwrap();
    assert_eq!(connection.net, "SIG");
    assert_eq!(connection.wires.len(), 1);
    assert_eq!(resolver.net_pins("SIG").len(), 3);
}

#[test]
fn pins_on_a_wire_join_its_net() {
    let mut resolver = row_of_three();
    resolver
        .add_wire(&[Position::new(100.0, 103.81), Position::new(120.0, 103.81)])
        .unwrap();
    let net = resolver.resolve_net(&pin("R2.2"));
    assert!(net.is_some());
    assert_eq!(net, resolver.resolve_net(&pin("R1.2")));
    assert_eq!(net, resolver.resolve_net(&pin("R3.2")));
    assert!(resolver.schematic().junctions().next().is_none());

    // A symbol dropped onto an existing wire
    resolver
        .add_wire(&[Position::new(130.0, 90.0), Position::new(130.0, 130.0)])
        .unwrap();
    place(&mut resolver, "Device:R", "R5", 130.0, 100.0);
    let shorted = resolver.resolve_net(&pin("R5.1"));
    assert!(shorted.is_some());
    assert_eq!(shorted, resolver.resolve_net(&pin("R5.2")));
    assert_ne!(shorted, net);
}

#[test]
fn long_wires_on_a_fine_grid() {
    let config = EditorConfig {
        grid: 0.001,
        ..EditorConfig::default()
    };
    let mut resolver = resolver_for(Schematic::new("test"), &config);
    place(&mut resolver, "Device:R", "R1", 0.0, 46.19);
    resolver
        .add_wire(&[Position::new(-2000.0, 50.0), Position::new(2000.0, 50.0)])
        .unwrap();
    assert!(resolver.resolve_net(&pin("R1.2")).is_some());
    assert_eq!(
        resolver.resolve_net(&pin("R1.2")),
        resolver.resolve_net(&Endpoint::point(1999.0, 50.0))
    );
}

#[test]
fn coordinates_off_the_sheet_are_rejected() {
    let mut resolver = led_resistor();
    assert!(matches!(
        resolver.add_wire(&[Position::new(0.0, 0.0), Position::new(1e12, 0.0)]),
        Err(ConnectError::Schematic(SchematicError::InvalidWireSpec(_)))
    ));
    assert!(matches!(
        resolver.connect(&pin("R1.1"), &Endpoint::point(1e12, 0.0), None),
        Err(ConnectError::InvalidEndpoint(_))
    ));
    assert!(!resolver.schematic().is_modified());
    assert_eq!(resolver.schematic().wires().count(), 0);
}
