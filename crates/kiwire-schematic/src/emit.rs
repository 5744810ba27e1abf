//! Builders for the S-expressions KiCad expects for each schematic item.

use kiwire_sexpr::Sexpr;
use uuid::Uuid;

use crate::geometry::{Mirror, Position};
use crate::items::LabelKind;

/// File format version written into new documents (KiCad 8).
pub const FORMAT_VERSION: &str = "20231120";
pub const GENERATOR: &str = "kiwire";

pub(crate) fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

fn yes_no(flag: bool) -> Sexpr {
    Sexpr::symbol(if flag { "yes" } else { "no" })
}

fn uuid_sexpr(uuid: &str) -> Sexpr {
    Sexpr::node("uuid", [Sexpr::string(uuid)])
}

pub(crate) fn at_sexpr(position: Position, angle: f64) -> Sexpr {
    Sexpr::node(
        "at",
        [
            Sexpr::number(position.x),
            Sexpr::number(position.y),
            Sexpr::number(angle),
        ],
    )
}

fn font_effects(justify: Option<&str>, hide: bool) -> Sexpr {
    let mut items = vec![
        Sexpr::symbol("effects"),
        Sexpr::node(
            "font",
            [Sexpr::node("size", [Sexpr::number(1.27), Sexpr::number(1.27)])],
        ),
    ];
    if let Some(justify) = justify {
        items.push(Sexpr::node("justify", [Sexpr::symbol(justify)]));
    }
    if hide {
        items.push(Sexpr::symbol("hide"));
    }
    Sexpr::list(items)
}

pub(crate) fn document(project_uuid: &str) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("kicad_sch"),
        Sexpr::node("version", [Sexpr::symbol(FORMAT_VERSION)]),
        Sexpr::node("generator", [Sexpr::string(GENERATOR)]),
        Sexpr::node(
            "generator_version",
            [Sexpr::string(env!("CARGO_PKG_VERSION"))],
        ),
        uuid_sexpr(project_uuid),
        Sexpr::node("paper", [Sexpr::string("A4")]),
        Sexpr::list(vec![Sexpr::symbol("lib_symbols")]),
        Sexpr::node(
            "sheet_instances",
            [Sexpr::node(
                "path",
                [Sexpr::string("/"), Sexpr::node("page", [Sexpr::string("1")])],
            )],
        ),
    ])
}

pub(crate) fn junction(position: Position, uuid: &str) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("junction"),
        Sexpr::node("at", [Sexpr::number(position.x), Sexpr::number(position.y)]),
        Sexpr::node("diameter", [Sexpr::symbol("0")]),
        Sexpr::node("color", vec![Sexpr::symbol("0"); 4]),
        uuid_sexpr(uuid),
    ])
}

pub(crate) fn no_connect(position: Position, uuid: &str) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("no_connect"),
        Sexpr::node("at", [Sexpr::number(position.x), Sexpr::number(position.y)]),
        uuid_sexpr(uuid),
    ])
}

pub(crate) fn wire(start: Position, end: Position, uuid: &str) -> Sexpr {
    let xy = |p: Position| Sexpr::node("xy", [Sexpr::number(p.x), Sexpr::number(p.y)]);
    Sexpr::list(vec![
        Sexpr::symbol("wire"),
        Sexpr::node("pts", [xy(start), xy(end)]),
        Sexpr::node(
            "stroke",
            [
                Sexpr::node("width", [Sexpr::symbol("0")]),
                Sexpr::node("type", [Sexpr::symbol("default")]),
            ],
        ),
        uuid_sexpr(uuid),
    ])
}

pub(crate) fn label(
    kind: LabelKind,
    text: &str,
    position: Position,
    angle: f64,
    uuid: &str,
) -> Sexpr {
    // Text runs away from the anchor point
    let justify = match (angle.round() as i64).rem_euclid(360) {
        180 | 270 => "right",
        _ => "left",
    };

    let mut items = vec![Sexpr::symbol(kind.tag()), Sexpr::string(text)];
    if kind != LabelKind::Local {
        items.push(Sexpr::node("shape", [Sexpr::symbol("input")]));
    }
    items.push(at_sexpr(position, angle));
    items.push(Sexpr::node("fields_autoplaced", [Sexpr::symbol("yes")]));
    items.push(font_effects(Some(justify), false));
    items.push(uuid_sexpr(uuid));
    Sexpr::list(items)
}

pub(crate) fn property(key: &str, value: &str, position: Position, hide: bool) -> Sexpr {
    Sexpr::list(vec![
        Sexpr::symbol("property"),
        Sexpr::string(key),
        Sexpr::string(value),
        at_sexpr(position, 0.0),
        font_effects(None, hide),
    ])
}

/// Fields of a placed symbol that are not derived from the library.
pub(crate) struct SymbolInstance<'a> {
    pub lib_id: &'a str,
    pub reference: &'a str,
    pub value: &'a str,
    pub footprint: &'a str,
    pub datasheet: &'a str,
    pub position: Position,
    pub rotation: f64,
    pub mirror: Option<Mirror>,
    pub unit: u32,
    pub in_bom: bool,
    pub on_board: bool,
    pub uuid: &'a str,
    pub pin_numbers: Vec<&'a str>,
    pub project: &'a str,
    pub sheet_path: String,
}

pub(crate) fn symbol(instance: &SymbolInstance<'_>) -> Sexpr {
    let at = instance.position;
    let mut items = vec![
        Sexpr::symbol("symbol"),
        Sexpr::node("lib_id", [Sexpr::string(instance.lib_id)]),
        at_sexpr(at, instance.rotation),
    ];
    if let Some(mirror) = instance.mirror {
        items.push(Sexpr::node("mirror", [Sexpr::symbol(mirror.as_str())]));
    }
    items.extend([
        Sexpr::node("unit", [Sexpr::symbol(instance.unit.to_string())]),
        Sexpr::node("exclude_from_sim", [yes_no(false)]),
        Sexpr::node("in_bom", [yes_no(instance.in_bom)]),
        Sexpr::node("on_board", [yes_no(instance.on_board)]),
        Sexpr::node("dnp", [yes_no(false)]),
        uuid_sexpr(instance.uuid),
        property("Reference", instance.reference, at.offset(0.0, -2.54), false),
        property("Value", instance.value, at.offset(0.0, 2.54), false),
        property("Footprint", instance.footprint, at, true),
        property("Datasheet", instance.datasheet, at, true),
    ]);

    for number in &instance.pin_numbers {
        items.push(Sexpr::node(
            "pin",
            [Sexpr::string(*number), uuid_sexpr(&new_uuid())],
        ));
    }

    items.push(Sexpr::node(
        "instances",
        [Sexpr::node(
            "project",
            [
                Sexpr::string(instance.project),
                Sexpr::node(
                    "path",
                    [
                        Sexpr::string(instance.sheet_path.clone()),
                        Sexpr::node("reference", [Sexpr::string(instance.reference)]),
                        Sexpr::node("unit", [Sexpr::symbol(instance.unit.to_string())]),
                    ],
                ),
            ],
        )],
    ));

    Sexpr::list(items)
}
