//! Wiring patterns that come up on most boards, built from `connect`.
//!
//! Every recipe is all-or-nothing: when one step fails the resolver is left
//! as it was before the call.

use std::fmt;

use kiwire_schematic::{Position, SchematicError, SymbolPlacement};

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::resolver::{Connection, Resolver};

/// Pin names treated as a positive supply.
pub const POWER_PIN_NAMES: &[&str] = &["VCC", "VDD", "PWR"];
pub const GROUND_NET: &str = "GND";
/// Logic supply used for driver configuration pins.
pub const LOGIC_RAIL: &str = "+3V3";

fn selected(reference: &str, components: Option<&[&str]>) -> bool {
    components.map_or(true, |refs| refs.contains(&reference))
}

fn connect_named_pins(
    resolver: &mut Resolver,
    pin_names: &[&str],
    net: &str,
    components: Option<&[&str]>,
) -> Result<Vec<Connection>> {
    let pins: Vec<(String, String)> = resolver
        .find_components_with_pin(pin_names)
        .into_iter()
        .filter(|(reference, _)| selected(reference, components))
        .collect();
    if pins.is_empty() {
        log::warn!("No {} pins to connect to {net}", pin_names.join("/"));
    }

    resolver.atomically(|resolver| {
        pins.iter()
            .map(|(reference, pin)| {
                resolver.connect(&Endpoint::pin(reference, pin), &Endpoint::net(net), None)
            })
            .collect()
    })
}

/// Tie every VCC/VDD/PWR pin, optionally only on `components`, to `rail`.
pub fn connect_power(
    resolver: &mut Resolver,
    rail: &str,
    components: Option<&[&str]>,
) -> Result<Vec<Connection>> {
    connect_named_pins(resolver, POWER_PIN_NAMES, rail, components)
}

pub fn connect_grounds(
    resolver: &mut Resolver,
    components: Option<&[&str]>,
) -> Result<Vec<Connection>> {
    connect_named_pins(resolver, &["GND"], GROUND_NET, components)
}

/// Put each `(reference, sda_pin, scl_pin)` on the two bus nets.
pub fn connect_i2c_bus(
    resolver: &mut Resolver,
    devices: &[(&str, &str, &str)],
    sda_net: &str,
    scl_net: &str,
) -> Result<Vec<Connection>> {
    resolver.atomically(|resolver| {
        let mut connections = Vec::with_capacity(devices.len() * 2);
        for &(reference, sda, scl) in devices {
            connections.push(resolver.connect(
                &Endpoint::pin(reference, sda),
                &Endpoint::net(sda_net),
                None,
            )?);
            connections.push(resolver.connect(
                &Endpoint::pin(reference, scl),
                &Endpoint::net(scl_net),
                None,
            )?);
        }
        Ok(connections)
    })
}

/// Hook up an A4988-style stepper driver: logic supply and the active-low
/// RESET/SLEEP inputs to `+3V3`, grounds to `GND`, VMOT to `motor_power`,
/// and the control inputs to the given endpoints.
pub fn wire_stepper_driver(
    resolver: &mut Resolver,
    driver: &str,
    step: &Endpoint,
    dir: &Endpoint,
    enable: &Endpoint,
    motor_power: &Endpoint,
) -> Result<Vec<Connection>> {
    let grounds: Vec<String> = resolver
        .find_components_with_pin(&["GND"])
        .into_iter()
        .filter(|(reference, _)| reference == driver)
        .map(|(_, pin)| pin)
        .collect();

    resolver.atomically(|resolver| {
        let logic = Endpoint::net(LOGIC_RAIL);
        let ground = Endpoint::net(GROUND_NET);
        let mut plan: Vec<(String, &Endpoint)> = vec![
            ("VDD".into(), &logic),
            ("~RESET".into(), &logic),
            ("~SLEEP".into(), &logic),
            ("VMOT".into(), motor_power),
            ("STEP".into(), step),
            ("DIR".into(), dir),
            ("~ENABLE".into(), enable),
        ];
        plan.extend(grounds.iter().map(|pin| (pin.clone(), &ground)));

        plan.into_iter()
            .map(|(pin, target)| resolver.connect(&Endpoint::pin(driver, pin), target, None))
            .collect()
    })
}

/// Two `Device:R` stacked vertically, `{prefix}1` above `{prefix}2`, with the
/// tap between them connected. Returns the tap connection.
pub fn create_resistor_divider(
    resolver: &mut Resolver,
    origin: Position,
    r1_value: &str,
    r2_value: &str,
    prefix: &str,
) -> Result<Connection> {
    let top = format!("{prefix}1");
    let bottom = format!("{prefix}2");
    resolver.atomically(|resolver| {
        resolver.add_symbol(&SymbolPlacement::new("Device:R", &top, origin).value(r1_value))?;
        resolver.add_symbol(
            &SymbolPlacement::new("Device:R", &bottom, origin.offset(0.0, 10.16)).value(r2_value),
        )?;
        resolver.connect(
            &Endpoint::pin(&top, "2"),
            &Endpoint::pin(&bottom, "1"),
            None,
        )
    })
}

/// A `Device:C` turned on its side with pin 1 on `VCC` and pin 2 on `GND`.
pub fn create_bypass_cap(
    resolver: &mut Resolver,
    position: Position,
    value: &str,
    reference: &str,
) -> Result<Vec<Connection>> {
    resolver.atomically(|resolver| {
        resolver.add_symbol(
            &SymbolPlacement::new("Device:C", reference, position)
                .value(value)
                .rotation(90.0),
        )?;
        Ok(vec![
            resolver.connect(&Endpoint::pin(reference, "1"), &Endpoint::net("VCC"), None)?,
            resolver.connect(&Endpoint::pin(reference, "2"), &Endpoint::net(GROUND_NET), None)?,
        ])
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorKind {
    PinHeader,
    SocketHeader,
}

impl ConnectorKind {
    /// Library id of a single-row connector with `pins` pins.
    pub fn lib_id(self, pins: u32) -> String {
        let suffix = match self {
            ConnectorKind::PinHeader => "Pin",
            ConnectorKind::SocketHeader => "Socket",
        };
        format!("Connector:Conn_01x{pins:02}_{suffix}")
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectorKind::PinHeader => "pin header",
            ConnectorKind::SocketHeader => "socket header",
        })
    }
}

/// KiCad's stock single-row connectors go up to 40 pins.
pub const MAX_CONNECTOR_PINS: u32 = 40;

pub fn create_connector(
    resolver: &mut Resolver,
    kind: ConnectorKind,
    pin_count: u32,
    position: Position,
    reference: &str,
) -> Result<String> {
    let lib_id = kind.lib_id(pin_count);
    if !(1..=MAX_CONNECTOR_PINS).contains(&pin_count) {
        log::warn!("No {pin_count}-pin {kind} in the stock library");
        return Err(SchematicError::SymbolNotFound(lib_id).into());
    }
    resolver.add_symbol(&SymbolPlacement::new(lib_id, reference, position))
}
