use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use kiwire_eda::Symbol;
use kiwire_sexpr::{format_sexpr, parse, Sexpr};

use crate::emit::{self, new_uuid, SymbolInstance};
use crate::error::{Result, SchematicError};
use crate::geometry::{round4, Mirror, Position, MAX_COORDINATE};
use crate::items::{
    at_position, property_value, uuid_of, Junction, Label, LabelKind, NoConnect, PlacedSymbol,
    Wire,
};

/// Items that close a KiCad schematic. New items are inserted before them.
const TRAILING_FORMS: &[&str] = &["sheet_instances", "symbol_instances", "embedded_fonts"];

/// Header items that precede `lib_symbols`.
const HEADER_FORMS: &[&str] = &[
    "version",
    "generator",
    "generator_version",
    "uuid",
    "paper",
    "title_block",
];

/// Where and how to place a library symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPlacement {
    pub lib_id: String,
    pub reference: String,
    pub value: Option<String>,
    pub footprint: Option<String>,
    pub position: Position,
    pub rotation: f64,
    pub mirror: Option<Mirror>,
    pub unit: u32,
}

impl SymbolPlacement {
    pub fn new(lib_id: impl Into<String>, reference: impl Into<String>, position: Position) -> Self {
        SymbolPlacement {
            lib_id: lib_id.into(),
            reference: reference.into(),
            value: None,
            footprint: None,
            position,
            rotation: 0.0,
            mirror: None,
            unit: 1,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn footprint(mut self, footprint: impl Into<String>) -> Self {
        self.footprint = Some(footprint.into());
        self
    }

    pub fn rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn unit(mut self, unit: u32) -> Self {
        self.unit = unit;
        self
    }
}

/// An in-memory KiCad schematic.
///
/// The document is kept as its S-expression tree. Until the first mutation
/// the text it was loaded from is kept too, and is what gets written back, so
/// an untouched document round-trips byte for byte.
#[derive(Debug, Clone)]
pub struct Schematic {
    root: Sexpr,
    source: Option<String>,
    project: String,
}

impl Schematic {
    /// A fresh, empty sheet belonging to `project`.
    pub fn new(project: &str) -> Self {
        Schematic {
            root: emit::document(&new_uuid()),
            source: None,
            project: project.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SchematicError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut schematic: Schematic = content.parse()?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            schematic.project = stem.to_string();
        }
        log::debug!(
            "Loaded {} with {} symbols",
            path.display(),
            schematic.symbols().count()
        );
        Ok(schematic)
    }

    /// Write the document to `path` through a temporary file in the same
    /// directory, so readers never see a partial file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let io_err = |source| SchematicError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(self.to_string().as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(path).map_err(|e| io_err(e.error))?;

        log::info!("Wrote {}", path.display());
        Ok(())
    }

    /// Whether the document differs from what it was loaded from.
    pub fn is_modified(&self) -> bool {
        self.source.is_none()
    }

    pub fn root(&self) -> &Sexpr {
        &self.root
    }

    /// Project name written into symbol instances.
    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn uuid(&self) -> Option<&str> {
        self.root.child_atom("uuid", 1)
    }

    fn items(&self) -> impl Iterator<Item = &Sexpr> + '_ {
        self.root.as_list().unwrap_or_default().iter().skip(1)
    }

    pub fn symbols(&self) -> impl Iterator<Item = PlacedSymbol> + '_ {
        self.items()
            .filter(|item| item.tag() == Some("symbol"))
            .filter_map(PlacedSymbol::from_sexpr)
    }

    pub fn wires(&self) -> impl Iterator<Item = Wire> + '_ {
        self.items()
            .filter(|item| item.tag() == Some("wire"))
            .filter_map(Wire::from_sexpr)
    }

    pub fn junctions(&self) -> impl Iterator<Item = Junction> + '_ {
        self.items()
            .filter(|item| item.tag() == Some("junction"))
            .filter_map(|item| {
                Some(Junction {
                    position: at_position(item)?,
                    uuid: uuid_of(item),
                })
            })
    }

    pub fn no_connects(&self) -> impl Iterator<Item = NoConnect> + '_ {
        self.items()
            .filter(|item| item.tag() == Some("no_connect"))
            .filter_map(|item| {
                Some(NoConnect {
                    position: at_position(item)?,
                    uuid: uuid_of(item),
                })
            })
    }

    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.items().filter_map(Label::from_sexpr)
    }

    fn lib_symbols(&self) -> Option<&Sexpr> {
        self.root.find_child("lib_symbols")
    }

    fn embedded_sexpr(&self, lib_id: &str) -> Option<&Sexpr> {
        self.lib_symbols()?.find_children("symbol").find(|s| {
            s.as_list().and_then(|l| l.get(1)).and_then(Sexpr::as_atom) == Some(lib_id)
        })
    }

    /// The library definition embedded for `lib_id`, if any.
    pub fn lib_symbol(&self, lib_id: &str) -> Option<Symbol> {
        let sexpr = self.embedded_sexpr(lib_id)?;
        match Symbol::from_sexpr(sexpr) {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                log::warn!("Embedded symbol {lib_id} is unreadable: {e}");
                None
            }
        }
    }

    /// First placed unit of `reference`.
    pub fn find_symbol(&self, reference: &str) -> Option<PlacedSymbol> {
        self.symbols().find(|s| s.reference == reference)
    }

    pub fn symbol_position(&self, reference: &str) -> Option<Position> {
        self.find_symbol(reference).map(|s| s.position)
    }

    fn touch(&mut self) -> Result<&mut Vec<Sexpr>> {
        self.source = None;
        self.root
            .as_list_mut()
            .ok_or_else(|| SchematicError::Malformed("document root is not a list".into()))
    }

    /// Insert a top-level item before the closing instance tables.
    fn insert_item(&mut self, item: Sexpr) -> Result<()> {
        let items = self.touch()?;
        let index = items
            .iter()
            .position(|i| i.tag().is_some_and(|t| TRAILING_FORMS.contains(&t)))
            .unwrap_or(items.len());
        items.insert(index, item);
        Ok(())
    }

    fn ensure_lib_symbols(&mut self) -> Result<&mut Vec<Sexpr>> {
        let items = self.touch()?;
        let index = match items.iter().position(|i| i.tag() == Some("lib_symbols")) {
            Some(index) => index,
            None => {
                let after_header = items
                    .iter()
                    .rposition(|i| i.tag().is_some_and(|t| HEADER_FORMS.contains(&t)))
                    .map_or(1, |i| i + 1);
                items.insert(after_header, Sexpr::list(vec![Sexpr::symbol("lib_symbols")]));
                after_header
            }
        };
        items[index]
            .as_list_mut()
            .ok_or_else(|| SchematicError::Malformed("lib_symbols is not a list".into()))
    }

    /// Place a symbol, embedding its library definition on first use.
    /// Returns the new symbol's UUID.
    pub fn add_symbol(&mut self, placement: &SymbolPlacement, symbol: &Symbol) -> Result<String> {
        if placement.rotation.rem_euclid(90.0) != 0.0 {
            return Err(SchematicError::InvalidOrientation(placement.rotation));
        }
        if self
            .symbols()
            .any(|s| s.reference == placement.reference && s.unit == placement.unit)
        {
            return Err(SchematicError::DuplicateReference {
                reference: placement.reference.clone(),
                unit: placement.unit,
            });
        }

        if self.embedded_sexpr(&placement.lib_id).is_none() {
            let embedded = symbol
                .embedded_sexpr(&placement.lib_id)
                .ok_or_else(|| SchematicError::SymbolNotFound(placement.lib_id.clone()))?;
            self.ensure_lib_symbols()?.push(embedded);
            log::debug!("Embedded library symbol {}", placement.lib_id);
        }

        let mut seen = HashSet::new();
        let pin_numbers: Vec<&str> = symbol
            .pins_for_unit(placement.unit)
            .map(|p| p.number.as_str())
            .filter(|n| seen.insert(*n))
            .collect();

        let uuid = new_uuid();
        let sheet_path = format!("/{}", self.uuid().unwrap_or_default());
        let value = placement
            .value
            .as_deref()
            .or_else(|| symbol.property("Value"))
            .unwrap_or(&symbol.name);
        let instance = SymbolInstance {
            lib_id: &placement.lib_id,
            reference: &placement.reference,
            value,
            footprint: placement
                .footprint
                .as_deref()
                .or_else(|| symbol.property("Footprint"))
                .unwrap_or_default(),
            datasheet: symbol.property("Datasheet").unwrap_or("~"),
            position: placement.position,
            rotation: placement.rotation.rem_euclid(360.0),
            mirror: placement.mirror,
            unit: placement.unit,
            in_bom: symbol.in_bom,
            on_board: symbol.on_board,
            uuid: &uuid,
            pin_numbers,
            project: &self.project,
            sheet_path,
        };
        let sexpr = emit::symbol(&instance);
        self.insert_item(sexpr)?;

        log::debug!(
            "Placed {} ({}) at {}",
            placement.reference,
            placement.lib_id,
            placement.position
        );
        Ok(uuid)
    }

    /// Add a polyline as one `wire` item per segment. Zero-length segments
    /// are skipped. Returns the UUIDs of the wires created.
    pub fn add_wire(&mut self, points: &[Position]) -> Result<Vec<String>> {
        if points.len() < 2 {
            return Err(SchematicError::InvalidWireSpec(format!(
                "a wire needs at least two points, got {}",
                points.len()
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.in_bounds()) {
            return Err(SchematicError::InvalidWireSpec(format!(
                "point {p:?} is outside the sheet (|x|, |y| <= {MAX_COORDINATE} mm)"
            )));
        }

        let mut uuids = Vec::new();
        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if round4(start.x) == round4(end.x) && round4(start.y) == round4(end.y) {
                log::debug!("Skipping zero-length wire segment at {start}");
                continue;
            }
            let uuid = new_uuid();
            self.insert_item(emit::wire(start, end, &uuid))?;
            uuids.push(uuid);
        }
        Ok(uuids)
    }

    pub fn add_junction(&mut self, position: Position) -> Result<String> {
        let uuid = new_uuid();
        self.insert_item(emit::junction(position, &uuid))?;
        log::debug!("Added junction at {position}");
        Ok(uuid)
    }

    pub fn add_no_connect(&mut self, position: Position) -> Result<String> {
        let uuid = new_uuid();
        self.insert_item(emit::no_connect(position, &uuid))?;
        Ok(uuid)
    }

    pub fn add_label(
        &mut self,
        text: &str,
        position: Position,
        angle: f64,
        kind: LabelKind,
    ) -> Result<String> {
        let uuid = new_uuid();
        self.insert_item(emit::label(kind, text, position, angle, &uuid))?;
        log::debug!("Added {} '{text}' at {position}", kind.tag());
        Ok(uuid)
    }

    /// Move every unit of `reference` so the first one sits at `position`.
    /// Field positions move along with the symbol.
    pub fn move_symbol(&mut self, reference: &str, position: Position) -> Result<()> {
        let current = self
            .symbol_position(reference)
            .ok_or_else(|| SchematicError::ComponentNotFound(reference.to_string()))?;
        let (dx, dy) = (position.x - current.x, position.y - current.y);

        let items = self.touch()?;
        for item in items.iter_mut() {
            if item.tag() != Some("symbol") || property_value(item, "Reference") != Some(reference)
            {
                continue;
            }
            shift_at(item, dx, dy);
            if let Some(children) = item.as_list_mut() {
                for child in children.iter_mut().filter(|c| c.tag() == Some("property")) {
                    shift_at(child, dx, dy);
                }
            }
        }

        log::debug!("Moved {reference} to {position}");
        Ok(())
    }
}

fn shift_at(item: &mut Sexpr, dx: f64, dy: f64) {
    let Some(at) = item.find_child_mut("at").and_then(Sexpr::as_list_mut) else {
        return;
    };
    for (index, delta) in [(1, dx), (2, dy)] {
        if let Some(value) = at.get(index).and_then(Sexpr::as_f64) {
            at[index] = Sexpr::number(value + delta);
        }
    }
}

impl FromStr for Schematic {
    type Err = SchematicError;

    fn from_str(content: &str) -> Result<Self> {
        let root = parse(content)?;
        if root.tag() != Some("kicad_sch") {
            return Err(SchematicError::Malformed(
                "expected a (kicad_sch ...) document".into(),
            ));
        }
        let project = root
            .find_children("symbol")
            .find_map(|s| s.find_child("instances")?.child_atom("project", 1))
            .unwrap_or("kiwire")
            .to_string();
        Ok(Schematic {
            root,
            source: Some(content.to_string()),
            project,
        })
    }
}

impl fmt::Display for Schematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => f.write_str(source),
            None => writeln!(f, "{}", format_sexpr(&self.root, 0)),
        }
    }
}
