//! The connectivity model behind symbolic wiring.
//!
//! Every electrical fact on the sheet becomes a node in one disjoint-set:
//! component pins, grid points touched by wires or labels, and label texts.
//! Two nodes share a set exactly when they are on the same net, so lookups
//! and merges stay close to O(1) however the net was drawn.

use std::collections::{BTreeSet, HashMap, HashSet};

use itertools::Itertools;
use kiwire_eda::{LibraryTable, Symbol};
use kiwire_schematic::{
    GridKey, LabelKind, PlacedSymbol, Position, Schematic, SchematicError, SymbolPlacement,
};
use serde::Serialize;

use crate::config::EditorConfig;
use crate::disjoint_set::DisjointSet;
use crate::endpoint::Endpoint;
use crate::error::{ConnectError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Node {
    Pin { reference: String, number: String },
    At(GridKey),
    /// Label text. All labels with the same text share this node.
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NetName {
    Explicit(String),
    Generated(String),
}

impl NetName {
    fn as_str(&self) -> &str {
        match self {
            NetName::Explicit(name) | NetName::Generated(name) => name,
        }
    }

    fn is_explicit(&self) -> bool {
        matches!(self, NetName::Explicit(_))
    }
}

/// Explicit beats generated; otherwise the first name is kept.
fn merge_names(first: Option<NetName>, second: Option<NetName>) -> Option<NetName> {
    match (first, second) {
        (Some(a), Some(b)) if !a.is_explicit() && b.is_explicit() => Some(b),
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}

fn pin_net_name(reference: &str, number: &str) -> String {
    format!("Net-({reference}-Pad{number})")
}

/// A pin of a placed component, at its absolute position.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentPin {
    /// Name, or number when the name is empty, `~` or shared.
    pub designator: String,
    pub number: String,
    pub name: String,
    pub unit: u32,
    pub position: Position,
    #[serde(skip)]
    key: GridKey,
    #[serde(skip)]
    node: Node,
}

/// All placed units of one reference designator.
#[derive(Debug, Clone, Serialize)]
pub struct Component {
    pub reference: String,
    pub lib_id: String,
    pub value: String,
    pub power: bool,
    pub units: Vec<u32>,
    pub pins: Vec<ComponentPin>,
}

impl Component {
    /// Match by designator, then number, then name. With duplicate names the
    /// first declared pin wins.
    pub fn pin(&self, key: &str) -> Option<&ComponentPin> {
        self.pins
            .iter()
            .find(|p| p.designator == key)
            .or_else(|| self.pins.iter().find(|p| p.number == key))
            .or_else(|| self.pins.iter().find(|p| p.name == key))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetPin {
    pub reference: String,
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Net {
    pub name: String,
    /// Named by a label or power symbol rather than generated.
    pub explicit: bool,
    pub pins: Vec<NetPin>,
}

/// The primitives one `connect` call added to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub net: String,
    pub wires: Vec<String>,
    pub junctions: Vec<String>,
    pub label: Option<String>,
}

impl Connection {
    /// Nothing was drawn: the endpoints were already on one net.
    pub fn is_noop(&self) -> bool {
        self.wires.is_empty() && self.junctions.is_empty() && self.label.is_none()
    }
}

#[derive(Debug, Clone)]
struct Segment {
    start: Position,
    end: Position,
    a: GridKey,
    b: GridKey,
}

impl Segment {
    fn position_at(&self, key: GridKey) -> Position {
        if key == self.a {
            self.start
        } else {
            self.end
        }
    }

    /// `key` lies strictly between the ends of this axis-aligned segment.
    fn passes_through(&self, key: GridKey) -> bool {
        let (a, b) = (self.a, self.b);
        if a.row == b.row && key.row == a.row {
            strictly_between(key.col, a.col, b.col)
        } else if a.col == b.col && key.col == a.col {
            strictly_between(key.row, a.row, b.row)
        } else {
            false
        }
    }
}

fn strictly_between(v: i64, a: i64, b: i64) -> bool {
    a.min(b) < v && v < a.max(b)
}

/// Grid keys that hold something (a pin, a wire end, a label, a junction),
/// ordered both by row and by column so a segment can find what lies on it
/// without walking every grid step.
#[derive(Debug, Clone, Default)]
struct Occupied {
    by_row: BTreeSet<(i64, i64)>,
    by_col: BTreeSet<(i64, i64)>,
}

impl Occupied {
    fn insert(&mut self, key: GridKey) {
        self.by_row.insert((key.row, key.col));
        self.by_col.insert((key.col, key.row));
    }

    /// Occupied keys strictly between `a` and `b`. Empty unless the two
    /// share a row or a column.
    fn between(&self, a: GridKey, b: GridKey) -> Vec<GridKey> {
        if a.row == b.row && a.col != b.col {
            let (lo, hi) = (a.col.min(b.col), a.col.max(b.col));
            self.by_row
                .range((a.row, lo + 1)..(a.row, hi))
                .map(|&(row, col)| GridKey { col, row })
                .collect()
        } else if a.col == b.col && a.row != b.row {
            let (lo, hi) = (a.row.min(b.row), a.row.max(b.row));
            self.by_col
                .range((a.col, lo + 1)..(a.col, hi))
                .map(|&(col, row)| GridKey { col, row })
                .collect()
        } else {
            Vec::new()
        }
    }
}

/// An endpoint resolved against the current model.
enum Side {
    Pin { position: Position, node: Node },
    Point(Position),
    Net(String),
}

impl Side {
    fn position(&self) -> Option<Position> {
        match self {
            Side::Pin { position, .. } | Side::Point(position) => Some(*position),
            Side::Net(_) => None,
        }
    }
}

/// Owns a schematic and keeps a net model in step with every edit made
/// through it.
#[derive(Debug, Clone)]
pub struct Resolver {
    schematic: Schematic,
    grid: f64,
    allow_diagonal: bool,
    libraries: LibraryTable,

    components: Vec<Component>,
    by_reference: HashMap<String, usize>,
    pins_at: HashMap<GridKey, Vec<Node>>,
    segments: Vec<Segment>,
    ends: HashMap<GridKey, Vec<usize>>,
    /// Horizontal segments by row, vertical segments by column.
    rows: HashMap<i64, Vec<usize>>,
    cols: HashMap<i64, Vec<usize>>,
    occupied: Occupied,
    junctions: HashSet<GridKey>,
    no_connects: HashSet<GridKey>,

    sets: DisjointSet<Node>,
    names: HashMap<usize, NetName>,
    next_net: usize,
}

impl Resolver {
    pub fn new(schematic: Schematic) -> Self {
        Self::with_config(schematic, &EditorConfig::default())
    }

    pub fn with_config(schematic: Schematic, config: &EditorConfig) -> Self {
        let libraries = LibraryTable::with_default_dirs(config.library_dirs.iter().cloned());
        Self::with_libraries(schematic, config, libraries)
    }

    pub fn with_libraries(
        schematic: Schematic,
        config: &EditorConfig,
        libraries: LibraryTable,
    ) -> Self {
        let mut resolver = Resolver {
            schematic,
            grid: config.grid,
            allow_diagonal: config.allow_diagonal,
            libraries,
            components: Vec::new(),
            by_reference: HashMap::new(),
            pins_at: HashMap::new(),
            segments: Vec::new(),
            ends: HashMap::new(),
            rows: HashMap::new(),
            cols: HashMap::new(),
            occupied: Occupied::default(),
            junctions: HashSet::new(),
            no_connects: HashSet::new(),
            sets: DisjointSet::new(),
            names: HashMap::new(),
            next_net: 1,
        };
        resolver.rebuild();
        resolver
    }

    pub fn schematic(&self) -> &Schematic {
        &self.schematic
    }

    pub fn into_schematic(self) -> Schematic {
        self.schematic
    }

    pub(crate) fn libraries(&self) -> &LibraryTable {
        &self.libraries
    }

    pub fn grid(&self) -> f64 {
        self.grid
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, reference: &str) -> Option<&Component> {
        self.by_reference
            .get(reference)
            .map(|&index| &self.components[index])
    }

    fn key(&self, position: Position) -> GridKey {
        position.grid_key(self.grid)
    }

    /// Rebuild the whole model from the document.
    fn rebuild(&mut self) {
        self.components.clear();
        self.by_reference.clear();
        self.pins_at.clear();
        self.segments.clear();
        self.ends.clear();
        self.rows.clear();
        self.cols.clear();
        self.occupied = Occupied::default();
        self.junctions.clear();
        self.no_connects.clear();
        self.sets = DisjointSet::new();
        self.names.clear();
        self.next_net = 1;

        let placed: Vec<PlacedSymbol> = self.schematic.symbols().collect();
        for symbol in &placed {
            if !symbol.is_annotated() {
                log::warn!(
                    "Skipping unannotated symbol {} ({})",
                    symbol.reference,
                    symbol.lib_id
                );
                continue;
            }
            let library = self.schematic.lib_symbol(&symbol.lib_id).or_else(|| {
                self.libraries
                    .resolve(&symbol.lib_id)
                    .map_err(|e| log::warn!("No definition for {}: {e:#}", symbol.lib_id))
                    .ok()
            });
            self.register_symbol(symbol, library.as_ref());
        }

        let wires: Vec<_> = self.schematic.wires().collect();
        for wire in &wires {
            for (start, end) in wire.segments() {
                self.register_segment(start, end);
            }
        }

        let junctions: Vec<GridKey> = self
            .schematic
            .junctions()
            .map(|j| self.key(j.position))
            .collect();
        for key in junctions {
            self.insert_junction(key);
        }

        let no_connects: Vec<GridKey> = self
            .schematic
            .no_connects()
            .map(|nc| self.key(nc.position))
            .collect();
        self.no_connects.extend(no_connects);

        let labels: Vec<_> = self.schematic.labels().collect();
        for label in &labels {
            self.register_label(&label.text, label.position);
        }

        self.assign_names(true);
        log::debug!(
            "Built connectivity: {} components, {} wire segments, {} nets",
            self.components.len(),
            self.segments.len(),
            self.names.len()
        );
    }

    fn register_symbol(&mut self, placed: &PlacedSymbol, library: Option<&Symbol>) {
        let grid = self.grid;
        let index = match self.by_reference.get(&placed.reference) {
            Some(&index) => {
                if self.components[index].units.contains(&placed.unit) {
                    log::warn!(
                        "Ignoring duplicate {} unit {}",
                        placed.reference,
                        placed.unit
                    );
                    return;
                }
                index
            }
            None => {
                self.components.push(Component {
                    reference: placed.reference.clone(),
                    lib_id: placed.lib_id.clone(),
                    value: placed.value.clone(),
                    power: library.is_some_and(|s| s.power),
                    units: Vec::new(),
                    pins: Vec::new(),
                });
                self.by_reference
                    .insert(placed.reference.clone(), self.components.len() - 1);
                self.components.len() - 1
            }
        };

        let component = &mut self.components[index];
        component.units.push(placed.unit);
        let Some(symbol) = library else {
            return;
        };

        let mut added = Vec::new();
        for pin in symbol.pins_for_unit(placed.unit) {
            if component.pins.iter().any(|p| p.number == pin.number) {
                continue;
            }
            let position = placed.pin_position(pin);
            let node = Node::Pin {
                reference: placed.reference.clone(),
                number: pin.number.clone(),
            };
            let key = position.grid_key(grid);
            component.pins.push(ComponentPin {
                designator: symbol.designator(pin).to_string(),
                number: pin.number.clone(),
                name: pin.name.clone(),
                unit: placed.unit,
                position,
                key,
                node: node.clone(),
            });
            added.push((key, node));
        }

        let power_net = component.power.then(|| {
            if component.value.is_empty() {
                symbol.name.clone()
            } else {
                component.value.clone()
            }
        });
        for (key, node) in added {
            self.attach_pin(key, node, power_net.as_deref());
        }
    }

    fn attach_pin(&mut self, key: GridKey, node: Node, power_net: Option<&str>) {
        let touching = self.pins_at.get(&key).cloned().unwrap_or_default();
        self.pins_at.entry(key).or_default().push(node.clone());
        self.occupied.insert(key);

        if let Some(net) = power_net {
            self.join(node.clone(), Node::Name(net.to_string()));
            self.join(node.clone(), Node::At(key));
        }
        if self.sets.contains(&Node::At(key)) {
            self.join(node.clone(), Node::At(key));
        }
        for other in touching {
            self.join(node.clone(), other);
            self.join(node.clone(), Node::At(key));
        }
        if !self.crossing(key).is_empty() {
            self.attach_point(key);
            self.join_interiors(key);
        }
    }

    /// Make `key` a node and join it to the pins there.
    fn attach_point(&mut self, key: GridKey) {
        let at = Node::At(key);
        self.sets.insert(at.clone());
        self.occupied.insert(key);
        let pins = self.pins_at.get(&key).cloned().unwrap_or_default();
        for pin in pins {
            self.join(at.clone(), pin);
        }
    }

    /// Segments whose interior passes through `key`.
    fn crossing(&self, key: GridKey) -> Vec<usize> {
        let along_row = self.rows.get(&key.row).into_iter().flatten();
        let along_col = self.cols.get(&key.col).into_iter().flatten();
        along_row
            .chain(along_col)
            .copied()
            .filter(|&index| self.segments[index].passes_through(key))
            .collect()
    }

    /// Join `key` to every wire whose interior passes through it.
    fn join_interiors(&mut self, key: GridKey) {
        for index in self.crossing(key) {
            let start = self.segments[index].a;
            self.join(Node::At(key), Node::At(start));
        }
    }

    fn insert_junction(&mut self, key: GridKey) {
        self.occupied.insert(key);
        self.junctions.insert(key);
        self.join_at_junction(key);
    }

    fn join_at_junction(&mut self, key: GridKey) {
        let touching: Vec<usize> = self
            .ends
            .get(&key)
            .into_iter()
            .flatten()
            .copied()
            .chain(self.crossing(key))
            .collect();
        if touching.is_empty() {
            return;
        }
        self.attach_point(key);
        for index in touching {
            let start = self.segments[index].a;
            self.join(Node::At(key), Node::At(start));
        }
    }

    /// Add one wire segment to the model. Returns the points where a
    /// junction belongs.
    fn register_segment(&mut self, start: Position, end: Position) -> Vec<(GridKey, Position)> {
        let (a, b) = (self.key(start), self.key(end));
        if a == b {
            return Vec::new();
        }

        let mut junctions = Vec::new();
        for (key, position) in [(a, start), (b, end)] {
            let other_ends = self.ends.get(&key).map_or(0, Vec::len);
            let on_interior = !self.crossing(key).is_empty();
            let at_pin = self.pins_at.contains_key(&key);
            if on_interior || other_ends >= 2 || (other_ends >= 1 && at_pin) {
                junctions.push((key, position));
            }
            self.attach_point(key);
            self.join_interiors(key);
        }
        self.join(Node::At(a), Node::At(b));

        let interior = self.occupied.between(a, b);
        for &key in &interior {
            if let Some(&other) = self.ends.get(&key).and_then(|v| v.first()) {
                junctions.push((key, self.segments[other].position_at(key)));
                self.join(Node::At(key), Node::At(a));
            } else if self.sets.contains(&Node::At(key)) || self.pins_at.contains_key(&key) {
                // A pin, label or bare point on the wire
                self.attach_point(key);
                self.join(Node::At(key), Node::At(a));
            }
        }

        let index = self.segments.len();
        self.segments.push(Segment { start, end, a, b });
        self.ends.entry(a).or_default().push(index);
        self.ends.entry(b).or_default().push(index);
        if a.row == b.row {
            self.rows.entry(a.row).or_default().push(index);
        } else if a.col == b.col {
            self.cols.entry(a.col).or_default().push(index);
        }
        for &key in &interior {
            if self.junctions.contains(&key) {
                self.join_at_junction(key);
            }
        }
        junctions
    }

    fn register_label(&mut self, text: &str, position: Position) {
        let key = self.key(position);
        self.attach_point(key);
        self.join_interiors(key);
        self.join(Node::Name(text.to_string()), Node::At(key));
    }

    fn join(&mut self, a: Node, b: Node) -> usize {
        let (root, absorbed) = self.sets.union(a, b);
        if let Some(absorbed) = absorbed {
            let kept = self.names.remove(&root);
            let gone = self.names.remove(&absorbed);
            if let Some(name) = merge_names(kept, gone) {
                self.names.insert(root, name);
            }
        }
        root
    }

    /// Name every set that has none yet: label texts first, then the first
    /// pin in document order, then a running number.
    fn assign_names(&mut self, warn: bool) {
        let texts: Vec<String> = self
            .sets
            .keys()
            .filter_map(|node| match node {
                Node::Name(text) => Some(text.clone()),
                _ => None,
            })
            .collect();
        for text in texts {
            let Some(root) = self.sets.find(&Node::Name(text.clone())) else {
                continue;
            };
            match self.names.get(&root) {
                Some(NetName::Explicit(existing)) => {
                    if warn && *existing != text {
                        log::warn!("Net '{existing}' is also labelled '{text}'");
                    }
                }
                _ => {
                    self.names.insert(root, NetName::Explicit(text));
                }
            }
        }

        let pins: Vec<(Node, String)> = self
            .components
            .iter()
            .filter(|c| !c.power)
            .flat_map(|c| {
                c.pins
                    .iter()
                    .map(|p| (p.node.clone(), pin_net_name(&c.reference, &p.number)))
            })
            .collect();
        for (node, name) in pins {
            if let Some(root) = self.sets.find(&node) {
                if !self.names.contains_key(&root) && !self.name_taken(&name) {
                    self.names.insert(root, NetName::Generated(name));
                }
            }
        }

        let unnamed: Vec<usize> = self
            .sets
            .roots()
            .filter(|root| !self.names.contains_key(root))
            .collect();
        for root in unnamed {
            let name = self.fresh_net_name();
            self.names.insert(root, NetName::Generated(name));
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        self.names.values().any(|n| n.as_str() == name)
    }

    fn fresh_net_name(&mut self) -> String {
        loop {
            let name = format!("Net-{}", self.next_net);
            self.next_net += 1;
            if !self.name_taken(&name) {
                return name;
            }
        }
    }

    /// Absolute position of a pin, addressed by name or number.
    pub fn resolve_pin(&self, reference: &str, pin: &str) -> Result<Position> {
        let component = self
            .component(reference)
            .ok_or_else(|| ConnectError::ComponentNotFound(reference.to_string()))?;
        component
            .pin(pin)
            .map(|p| p.position)
            .ok_or_else(|| ConnectError::PinNotFound {
                reference: reference.to_string(),
                pin: pin.to_string(),
            })
    }

    fn locate(&self, endpoint: &Endpoint) -> Result<Side> {
        match endpoint {
            Endpoint::Pin { reference, pin } => {
                let component = self
                    .component(reference)
                    .ok_or_else(|| ConnectError::ComponentNotFound(reference.clone()))?;
                let pin = component
                    .pin(pin)
                    .ok_or_else(|| ConnectError::PinNotFound {
                        reference: reference.clone(),
                        pin: pin.clone(),
                    })?;
                Ok(Side::Pin {
                    position: pin.position,
                    node: pin.node.clone(),
                })
            }
            Endpoint::Point(position) => {
                if !position.in_bounds() {
                    return Err(ConnectError::InvalidEndpoint(format!(
                        "point {position:?} is outside the sheet"
                    )));
                }
                Ok(Side::Point(*position))
            }
            Endpoint::Net(name) if name.trim().is_empty() => {
                Err(ConnectError::InvalidEndpoint("empty net name".into()))
            }
            Endpoint::Net(name) => Ok(Side::Net(name.clone())),
        }
    }

    /// A node already in the model that stands for `side`.
    fn existing_node(&self, side: &Side) -> Option<Node> {
        let node = match side {
            Side::Pin { node, .. } => node.clone(),
            Side::Point(position) => {
                let key = self.key(*position);
                let at = Node::At(key);
                if !self.sets.contains(&at) {
                    let index = *self.crossing(key).first()?;
                    return Some(Node::At(self.segments[index].a));
                }
                at
            }
            Side::Net(name) => Node::Name(name.clone()),
        };
        self.sets.contains(&node).then_some(node)
    }

    fn root_of(&self, side: &Side) -> Option<usize> {
        self.sets.find_root(&self.existing_node(side)?)
    }

    /// Make `side`'s point part of the model and return its node.
    fn anchor(&mut self, side: &Side) -> Option<Node> {
        let key = self.key(side.position()?);
        self.attach_point(key);
        self.join_interiors(key);
        Some(Node::At(key))
    }

    /// Name of the net an endpoint is on, if it is on one.
    pub fn resolve_net(&self, endpoint: &Endpoint) -> Option<String> {
        let side = self.locate(endpoint).ok()?;
        let root = self.root_of(&side)?;
        self.names.get(&root).map(|n| n.as_str().to_string())
    }

    /// Decide the name of the merged net before anything is touched.
    fn decide_name(
        a: Option<&NetName>,
        b: Option<&NetName>,
        requested: Option<&str>,
    ) -> Result<Option<NetName>> {
        if let Some(name) = requested {
            for existing in [a, b]
                .into_iter()
                .flatten()
                .filter(|n| n.is_explicit() && n.as_str() != name)
                .unique_by(|n| n.as_str().to_string())
            {
                log::warn!("Renaming net '{}' to '{name}'", existing.as_str());
            }
            return Ok(Some(NetName::Explicit(name.to_string())));
        }

        Ok(match (a, b) {
            (Some(NetName::Explicit(x)), Some(NetName::Explicit(y))) if x != y => {
                return Err(ConnectError::ConflictingNetNames {
                    a: x.clone(),
                    b: y.clone(),
                })
            }
            (Some(n @ NetName::Explicit(_)), _) | (_, Some(n @ NetName::Explicit(_))) => {
                Some(n.clone())
            }
            (Some(n), _) | (None, Some(n)) => Some(n.clone()),
            (None, None) => None,
        })
    }

    fn generated_name(&mut self, a: &Side, b: &Side) -> String {
        let from_pin = [a, b].into_iter().find_map(|side| match side {
            Side::Pin {
                node: Node::Pin { reference, number },
                ..
            } => Some(pin_net_name(reference, number)),
            _ => None,
        });
        match from_pin {
            Some(name) if !self.name_taken(&name) => name,
            _ => self.fresh_net_name(),
        }
    }

    /// Straight when allowed or already axis-aligned, otherwise horizontal
    /// then vertical, falling back to vertical then horizontal. A path that
    /// would touch a pin or wire outside `nets` is never drawn.
    fn route(
        &self,
        from: Position,
        to: Position,
        nets: [Option<usize>; 2],
    ) -> Result<Vec<Position>> {
        if self.key(from) == self.key(to) {
            return Ok(Vec::new());
        }
        let aligned = from.x == to.x || from.y == to.y;
        let candidates = if self.allow_diagonal || aligned {
            vec![vec![from, to]]
        } else {
            vec![
                vec![from, Position::new(to.x, from.y), to],
                vec![from, Position::new(from.x, to.y), to],
            ]
        };

        let mut obstacles = Vec::new();
        for path in candidates {
            let touched = self.foreign_contacts(&path, nets);
            if touched.is_empty() {
                return Ok(path);
            }
            log::debug!("Path {} touches {}", path.iter().join(" "), touched.join(", "));
            if obstacles.is_empty() {
                obstacles = touched;
            }
        }
        Err(ConnectError::RouteBlocked { from, to, obstacles })
    }

    /// What a wire along `path` would connect to besides its own two ends
    /// and the nets in `nets`. Mirrors the joins `register_segment` makes.
    fn foreign_contacts(&self, path: &[Position], nets: [Option<usize>; 2]) -> Vec<String> {
        let keys: Vec<GridKey> = path.iter().map(|p| self.key(*p)).collect();
        let (Some(&first), Some(&last)) = (keys.first(), keys.last()) else {
            return Vec::new();
        };
        let corners = &keys[1..keys.len() - 1];
        let along = keys
            .windows(2)
            .flat_map(|pair| self.occupied.between(pair[0], pair[1]));

        let mut found = Vec::new();
        for key in corners.iter().copied().chain(along).unique() {
            if key == first || key == last {
                continue;
            }
            let mut nodes = self.pins_at.get(&key).cloned().unwrap_or_default();
            nodes.push(Node::At(key));
            if corners.contains(&key) || self.junctions.contains(&key) {
                nodes.extend(
                    self.crossing(key)
                        .into_iter()
                        .map(|index| Node::At(self.segments[index].a)),
                );
            }
            for node in nodes {
                let root = self.sets.find_root(&node);
                let foreign = match (&node, root) {
                    (Node::At(_), None) => false,
                    (_, Some(root)) => !nets.contains(&Some(root)),
                    (_, None) => true,
                };
                if foreign {
                    found.push(self.describe(&node, root));
                }
            }
        }
        found.into_iter().unique().collect()
    }

    fn describe(&self, node: &Node, root: Option<usize>) -> String {
        match (node, root.and_then(|r| self.names.get(&r))) {
            (_, Some(name)) => format!("net {}", name.as_str()),
            (Node::Pin { reference, number }, None) => format!("pin {reference}.{number}"),
            (Node::At(key), None) => format!("point {}", key.position(self.grid)),
            (Node::Name(text), None) => format!("label {text}"),
        }
    }

    /// Connect two endpoints, drawing whatever wires, junctions and labels
    /// the connection needs.
    ///
    /// `net_name`, when given, names the resulting net and wins over any
    /// existing name. Without it, two nets with different explicit names
    /// cannot be merged.
    pub fn connect(
        &mut self,
        a: &Endpoint,
        b: &Endpoint,
        net_name: Option<&str>,
    ) -> Result<Connection> {
        let side_a = self.locate(a)?;
        let side_b = self.locate(b)?;

        let requested = match (&side_a, &side_b, net_name) {
            (Side::Net(_), Side::Net(_), _) => {
                return Err(ConnectError::InvalidEndpoint(format!(
                    "cannot connect net {a} directly to net {b}"
                )))
            }
            (Side::Net(n), _, Some(m)) | (_, Side::Net(n), Some(m)) if n != m => {
                return Err(ConnectError::ConflictingNetNames {
                    a: n.clone(),
                    b: m.to_string(),
                })
            }
            _ => net_name.map(str::to_string),
        };

        let root_a = self.root_of(&side_a);
        let root_b = self.root_of(&side_b);
        let current = |side: &Side, root: Option<usize>| match side {
            Side::Net(name) => Some(NetName::Explicit(name.clone())),
            _ => root.and_then(|r| self.names.get(&r)).cloned(),
        };
        let (name_a, name_b) = (current(&side_a, root_a), current(&side_b, root_b));
        let decided = Self::decide_name(name_a.as_ref(), name_b.as_ref(), requested.as_deref())?;

        // Whether the chosen label text is already on a side that gets wired.
        // A net endpoint is only reached through the label itself.
        let wired_root = |side: &Side, root: Option<usize>| match side {
            Side::Net(_) => None,
            _ => root,
        };
        let wired = [wired_root(&side_a, root_a), wired_root(&side_b, root_b)];
        let labelled = match &decided {
            Some(NetName::Explicit(name)) => self
                .sets
                .find_root(&Node::Name(name.clone()))
                .is_some_and(|r| wired.contains(&Some(r))),
            _ => true,
        };

        let mut connection = Connection {
            net: String::new(),
            wires: Vec::new(),
            junctions: Vec::new(),
            label: None,
        };

        let already = root_a.is_some() && root_a == root_b;
        let member = if already {
            log::debug!("{a} and {b} are already connected");
            self.existing_node(&side_a)
        } else {
            match (side_a.position(), side_b.position()) {
                (Some(from), Some(to)) => {
                    let path = self.route(from, to, [root_a, root_b])?;
                    let mut junctions = Vec::new();
                    if !path.is_empty() {
                        connection.wires = self.schematic.add_wire(&path)?;
                        for pair in path.windows(2) {
                            junctions.extend(self.register_segment(pair[0], pair[1]));
                        }
                    }
                    for (key, position) in junctions.into_iter().unique_by(|(key, _)| *key) {
                        if !self.junctions.contains(&key) {
                            connection.junctions.push(self.schematic.add_junction(position)?);
                            self.insert_junction(key);
                        }
                    }
                    let node_a = self.anchor(&side_a);
                    let node_b = self.anchor(&side_b);
                    if let (Some(node_a), Some(node_b)) = (node_a.clone(), node_b) {
                        self.join(node_a, node_b);
                    }
                    node_a
                }
                _ => {
                    // One side is a net: the other gets a label, no wire
                    let positioned = if side_a.position().is_some() {
                        &side_a
                    } else {
                        &side_b
                    };
                    self.anchor(positioned)
                }
            }
        };

        let name = match decided {
            Some(name) => name,
            None => NetName::Generated(self.generated_name(&side_a, &side_b)),
        };

        if let NetName::Explicit(text) = &name {
            if !labelled {
                if let Some(position) = side_a.position().or(side_b.position()) {
                    let uuid =
                        self.schematic
                            .add_label(text, position, 0.0, LabelKind::Local)?;
                    self.register_label(text, position);
                    connection.label = Some(uuid);
                }
            }
        }

        if let Some(root) = member.and_then(|node| self.sets.find(&node)) {
            self.names.insert(root, name.clone());
        }
        self.assign_names(false);

        connection.net = name.as_str().to_string();
        if !connection.is_noop() {
            log::debug!(
                "Connected {a} to {b} on {}: {} wires, {} junctions{}",
                connection.net,
                connection.wires.len(),
                connection.junctions.len(),
                if connection.label.is_some() { ", labelled" } else { "" }
            );
        }
        Ok(connection)
    }

    /// Run `edit`, restoring the resolver and its document if it fails.
    pub fn atomically<T>(&mut self, edit: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.clone();
        let result = edit(self);
        if let Err(e) = &result {
            log::warn!("Rolling back: {e}");
            *self = snapshot;
        }
        result
    }

    /// Connect every pair, then require that all endpoints ended up on one
    /// net. Either everything is applied or nothing is.
    pub fn connect_many(
        &mut self,
        pairs: &[(Endpoint, Endpoint)],
        net_name: Option<&str>,
    ) -> Result<Vec<Connection>> {
        self.atomically(|resolver| {
            let connections = pairs
                .iter()
                .map(|(a, b)| resolver.connect(a, b, net_name))
                .collect::<Result<Vec<_>>>()?;

            let mut roots = Vec::new();
            for endpoint in pairs.iter().flat_map(|(a, b)| [a, b]) {
                let side = resolver.locate(endpoint)?;
                roots.push(resolver.root_of(&side));
            }
            let distinct: Vec<Option<usize>> = roots.into_iter().unique().collect();
            if distinct.len() > 1 {
                let nets = distinct
                    .into_iter()
                    .map(|root| {
                        root.and_then(|r| resolver.names.get(&r))
                            .map_or_else(|| "(unconnected)".to_string(), |n| n.as_str().to_string())
                    })
                    .collect();
                return Err(ConnectError::DisconnectedNet { nets });
            }
            Ok(connections)
        })
    }

    /// `(reference, pin)` for every declared pin that is on no net and has
    /// no no-connect marker, in document and declaration order.
    pub fn find_unconnected_pins(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.components
            .iter()
            .filter(|c| !c.power)
            .flat_map(move |component| {
                component
                    .pins
                    .iter()
                    .filter(move |pin| {
                        !self.sets.contains(&pin.node) && !self.no_connects.contains(&pin.key)
                    })
                    .map(move |pin| (component.reference.as_str(), pin.designator.as_str()))
            })
    }

    /// Nets with at least one component pin, in order of first appearance.
    pub fn nets(&self) -> Vec<Net> {
        let mut order = Vec::new();
        let mut members: HashMap<usize, Vec<NetPin>> = HashMap::new();
        for component in self.components.iter().filter(|c| !c.power) {
            for pin in &component.pins {
                let Some(root) = self.sets.find_root(&pin.node) else {
                    continue;
                };
                members
                    .entry(root)
                    .or_insert_with(|| {
                        order.push(root);
                        Vec::new()
                    })
                    .push(NetPin {
                        reference: component.reference.clone(),
                        pin: pin.designator.clone(),
                    });
            }
        }

        order
            .into_iter()
            .map(|root| {
                let name = self.names.get(&root);
                Net {
                    name: name.map(|n| n.as_str().to_string()).unwrap_or_default(),
                    explicit: name.is_some_and(NetName::is_explicit),
                    pins: members.remove(&root).unwrap_or_default(),
                }
            })
            .collect()
    }

    pub fn net_pins(&self, name: &str) -> Vec<NetPin> {
        self.nets()
            .into_iter()
            .find(|net| net.name == name)
            .map(|net| net.pins)
            .unwrap_or_default()
    }

    /// `(reference, pin)` of every pin named one of `names`, skipping power
    /// symbols.
    pub fn find_components_with_pin(&self, names: &[&str]) -> Vec<(String, String)> {
        self.components
            .iter()
            .filter(|c| !c.power)
            .flat_map(|c| {
                c.pins
                    .iter()
                    .filter(|p| names.contains(&p.name.as_str()))
                    .map(|p| (c.reference.clone(), p.designator.clone()))
            })
            .collect()
    }

    fn library_symbol(&mut self, lib_id: &str) -> Result<Symbol> {
        if let Some(symbol) = self.schematic.lib_symbol(lib_id) {
            return Ok(symbol);
        }
        match self.libraries.resolve(lib_id) {
            Ok(symbol) => Ok(symbol),
            Err(e) => {
                let known_library = lib_id
                    .split_once(':')
                    .is_some_and(|(nickname, _)| self.libraries.library_path(nickname).is_some());
                if known_library {
                    Err(ConnectError::Library(e))
                } else {
                    log::debug!("{e:#}");
                    Err(SchematicError::SymbolNotFound(lib_id.to_string()).into())
                }
            }
        }
    }

    /// Place a symbol from the document's embedded definitions or the
    /// library table.
    pub fn add_symbol(&mut self, placement: &SymbolPlacement) -> Result<String> {
        let symbol = self.library_symbol(&placement.lib_id)?;
        let uuid = self.schematic.add_symbol(placement, &symbol)?;
        let placed = self.schematic.symbols().find(|s| s.uuid == uuid);
        if let Some(placed) = placed {
            if placed.is_annotated() {
                self.register_symbol(&placed, Some(&symbol));
            } else {
                log::warn!("{} is not annotated and stays unconnected", placed.reference);
            }
        }
        self.assign_names(false);
        Ok(uuid)
    }

    /// Draw a raw polyline. No junctions are added.
    pub fn add_wire(&mut self, points: &[Position]) -> Result<Vec<String>> {
        let uuids = self.schematic.add_wire(points)?;
        for pair in points.windows(2) {
            self.register_segment(pair[0], pair[1]);
        }
        self.assign_names(false);
        Ok(uuids)
    }

    pub fn add_junction(&mut self, position: Position) -> Result<String> {
        let uuid = self.schematic.add_junction(position)?;
        let key = self.key(position);
        self.insert_junction(key);
        self.assign_names(false);
        Ok(uuid)
    }

    pub fn add_label(
        &mut self,
        text: &str,
        position: Position,
        angle: f64,
        kind: LabelKind,
    ) -> Result<String> {
        let uuid = self.schematic.add_label(text, position, angle, kind)?;
        self.register_label(text, position);
        self.assign_names(false);
        Ok(uuid)
    }

    pub fn add_no_connect(&mut self, position: Position) -> Result<String> {
        let uuid = self.schematic.add_no_connect(position)?;
        self.no_connects.insert(self.key(position));
        Ok(uuid)
    }

    /// Put a no-connect marker on a pin.
    pub fn mark_no_connect(&mut self, reference: &str, pin: &str) -> Result<String> {
        let position = self.resolve_pin(reference, pin)?;
        self.add_no_connect(position)
    }

    /// Move every unit of a component. Pins move with it, so the model is
    /// rebuilt from the document.
    pub fn move_symbol(&mut self, reference: &str, position: Position) -> Result<()> {
        if self.component(reference).is_none() {
            return Err(ConnectError::ComponentNotFound(reference.to_string()));
        }
        self.schematic.move_symbol(reference, position)?;
        self.rebuild();
        Ok(())
    }
}
