//! Read-only views over the items of a schematic.

use kiwire_eda::Pin;
use kiwire_sexpr::Sexpr;
use serde::Serialize;

use crate::geometry::{Mirror, Position, Transform};

/// A symbol instance placed on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedSymbol {
    pub lib_id: String,
    pub reference: String,
    pub value: String,
    pub position: Position,
    pub rotation: f64,
    pub mirror: Option<Mirror>,
    pub unit: u32,
    pub uuid: String,
}

impl PlacedSymbol {
    pub(crate) fn from_sexpr(sexpr: &Sexpr) -> Option<Self> {
        let lib_id = sexpr.child_atom("lib_id", 1)?.to_string();
        let position = at_position(sexpr)?;
        Some(PlacedSymbol {
            lib_id,
            reference: property_value(sexpr, "Reference")
                .unwrap_or_default()
                .to_string(),
            value: property_value(sexpr, "Value")
                .unwrap_or_default()
                .to_string(),
            position,
            rotation: sexpr.child_f64("at", 3).unwrap_or(0.0),
            mirror: sexpr.child_atom("mirror", 1).and_then(Mirror::parse),
            unit: sexpr
                .child_atom("unit", 1)
                .and_then(|u| u.parse().ok())
                .unwrap_or(1),
            uuid: uuid_of(sexpr),
        })
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.rotation, self.mirror)
    }

    /// Absolute position of one of this symbol's library pins.
    pub fn pin_position(&self, pin: &Pin) -> Position {
        self.transform().place(self.position, pin.position)
    }

    /// References ending in `?` have not been annotated yet.
    pub fn is_annotated(&self) -> bool {
        !self.reference.is_empty() && !self.reference.ends_with('?')
    }
}

/// One `wire` item. KiCad writes exactly two points per wire, but longer
/// polylines are accepted on load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wire {
    pub points: Vec<Position>,
    pub uuid: String,
}

impl Wire {
    pub(crate) fn from_sexpr(sexpr: &Sexpr) -> Option<Self> {
        let points: Vec<Position> = sexpr
            .find_child("pts")?
            .find_children("xy")
            .filter_map(|xy| {
                let items = xy.as_list()?;
                Some(Position::new(items.get(1)?.as_f64()?, items.get(2)?.as_f64()?))
            })
            .collect();
        (points.len() >= 2).then(|| Wire {
            points,
            uuid: uuid_of(sexpr),
        })
    }

    pub fn segments(&self) -> impl Iterator<Item = (Position, Position)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Junction {
    pub position: Position,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoConnect {
    pub position: Position,
    pub uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LabelKind {
    Local,
    Global,
    Hierarchical,
}

impl LabelKind {
    pub fn tag(self) -> &'static str {
        match self {
            LabelKind::Local => "label",
            LabelKind::Global => "global_label",
            LabelKind::Hierarchical => "hierarchical_label",
        }
    }

    pub(crate) fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "label" => Some(LabelKind::Local),
            "global_label" => Some(LabelKind::Global),
            "hierarchical_label" => Some(LabelKind::Hierarchical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub text: String,
    pub position: Position,
    pub angle: f64,
    pub kind: LabelKind,
    pub uuid: String,
}

impl Label {
    pub(crate) fn from_sexpr(sexpr: &Sexpr) -> Option<Self> {
        let kind = LabelKind::from_tag(sexpr.tag()?)?;
        Some(Label {
            text: sexpr.as_list()?.get(1)?.as_atom()?.to_string(),
            position: at_position(sexpr)?,
            angle: sexpr.child_f64("at", 3).unwrap_or(0.0),
            kind,
            uuid: uuid_of(sexpr),
        })
    }
}

pub(crate) fn at_position(sexpr: &Sexpr) -> Option<Position> {
    Some(Position::new(
        sexpr.child_f64("at", 1)?,
        sexpr.child_f64("at", 2)?,
    ))
}

pub(crate) fn uuid_of(sexpr: &Sexpr) -> String {
    sexpr.child_atom("uuid", 1).unwrap_or_default().to_string()
}

pub(crate) fn property_value<'a>(sexpr: &'a Sexpr, key: &str) -> Option<&'a str> {
    sexpr
        .find_children("property")
        .find(|p| p.as_list().and_then(|l| l.get(1)).and_then(Sexpr::as_atom) == Some(key))
        .and_then(|p| p.as_list()?.get(2)?.as_atom())
}
