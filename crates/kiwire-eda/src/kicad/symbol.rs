use crate::{Pin, Symbol};
use anyhow::Result;
use kiwire_sexpr::Sexpr;

pub(crate) fn parse_symbol(symbol_data: &[Sexpr]) -> Result<Symbol> {
    // Extract the symbol name
    let name = symbol_data
        .get(1)
        .and_then(Sexpr::as_atom)
        .map(str::to_string)
        .ok_or(anyhow::anyhow!("Symbol name not found"))?;

    let mut symbol = Symbol {
        name,
        in_bom: true,
        on_board: true,
        raw_sexp: Some(Sexpr::List(symbol_data.to_vec())),
        ..Default::default()
    };

    for prop in &symbol_data[2..] {
        let Some(prop_list) = prop.as_list() else {
            continue;
        };
        match prop.tag() {
            Some("extends") => {
                symbol.extends = prop_list.get(1).and_then(Sexpr::as_atom).map(str::to_string);
            }
            Some("power") => symbol.power = true,
            Some("in_bom") => symbol.in_bom = is_yes(prop_list),
            Some("on_board") => symbol.on_board = is_yes(prop_list),
            Some("property") => parse_property(&mut symbol, prop_list),
            Some("pin") => {
                // Legacy layout with pins directly on the symbol
                if let Some(pin) = parse_pin(prop, 0, 0) {
                    symbol.pins.push(pin);
                }
            }
            Some("symbol") => parse_symbol_section(&mut symbol, prop),
            _ => {}
        }
    }

    Ok(symbol)
}

fn is_yes(prop_list: &[Sexpr]) -> bool {
    prop_list.get(1).and_then(Sexpr::as_atom) == Some("yes")
}

/// Unit and body style encoded in a sub-symbol name such as `LED_0_1`.
fn unit_and_style(section_name: &str) -> (u32, u32) {
    let mut parts = section_name.rsplitn(3, '_');
    let style = parts.next().and_then(|s| s.parse().ok());
    let unit = parts.next().and_then(|s| s.parse().ok());
    match (unit, style) {
        (Some(unit), Some(style)) => (unit, style),
        _ => (0, 0),
    }
}

fn parse_symbol_section(symbol: &mut Symbol, section: &Sexpr) {
    let section_name = section
        .as_list()
        .and_then(|items| items.get(1))
        .and_then(Sexpr::as_atom)
        .unwrap_or_default();
    let (unit, style) = unit_and_style(section_name);

    for pin_sexpr in section.find_children("pin") {
        if let Some(pin) = parse_pin(pin_sexpr, unit, style) {
            symbol.pins.push(pin);
        }
    }
}

// Format: (pin passive line (at X Y A) (length L) [hide] (name "N" ...) (number "1" ...))
fn parse_pin(pin_sexpr: &Sexpr, unit: u32, style: u32) -> Option<Pin> {
    let items = pin_sexpr.as_list()?;
    let number = pin_sexpr.child_atom("number", 1)?.to_string();
    if number.is_empty() {
        return None;
    }

    Some(Pin {
        name: pin_sexpr
            .child_atom("name", 1)
            .unwrap_or_default()
            .to_string(),
        number,
        position: (
            pin_sexpr.child_f64("at", 1).unwrap_or(0.0),
            pin_sexpr.child_f64("at", 2).unwrap_or(0.0),
        ),
        angle: pin_sexpr.child_f64("at", 3).unwrap_or(0.0),
        length: pin_sexpr.child_f64("length", 1).unwrap_or(0.0),
        unit,
        style,
        electrical_type: items
            .get(1)
            .and_then(Sexpr::as_atom)
            .unwrap_or("unspecified")
            .to_string(),
        hidden: pin_sexpr.has_flag("hide") || pin_sexpr.child_atom("hide", 1) == Some("yes"),
    })
}

fn parse_property(symbol: &mut Symbol, prop_list: &[Sexpr]) {
    let key = prop_list.get(1).and_then(Sexpr::as_atom);
    let value = prop_list.get(2).and_then(Sexpr::as_atom);
    let (Some(key), Some(value)) = (key, value) else {
        return;
    };

    if matches!(key, "ki_description" | "Description") && !value.is_empty() {
        symbol.description = Some(value.to_string());
    }

    symbol.properties.insert(key.to_string(), value.to_string());
}
