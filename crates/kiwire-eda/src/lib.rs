pub mod kicad;
mod library_table;

use anyhow::Result;
use kicad::symbol::parse_symbol;
use kicad::symbol_library::KicadSymbolLibrary;
use kiwire_sexpr::Sexpr;
use serde::Serialize;

use std::collections::HashMap;
use std::io;
use std::path::Path;

pub use library_table::{default_symbol_dirs, LibraryTable};

#[derive(Debug, Default, Clone, Serialize)]
pub struct Symbol {
    pub name: String,
    /// Parent symbol this one was derived from, already flattened in.
    pub extends: Option<String>,
    /// Power symbols (`GND`, `+3V3`, ...) put their pin on the net named by
    /// their `Value`.
    pub power: bool,
    pub in_bom: bool,
    pub on_board: bool,
    pub pins: Vec<Pin>,
    pub description: Option<String>,
    pub properties: HashMap<String, String>,
    #[serde(skip)]
    pub raw_sexp: Option<Sexpr>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Pin {
    pub name: String,
    pub number: String,
    /// Connection point relative to the symbol origin, library Y-up.
    pub position: (f64, f64),
    pub angle: f64,
    pub length: f64,
    /// 0 for pins shared by every unit.
    pub unit: u32,
    /// Body style; 0 and 1 are the normal body, 2 is De Morgan.
    pub style: u32,
    pub electrical_type: String,
    pub hidden: bool,
}

impl Pin {
    fn has_usable_name(&self) -> bool {
        !self.name.is_empty() && self.name != "~"
    }
}

impl Symbol {
    pub fn from_file(path: &Path) -> Result<Self> {
        let library = SymbolLibrary::from_file(path)?;
        library
            .symbols
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No symbol found in {}", path.display()))
    }

    pub fn from_string(contents: &str, file_type: &str) -> Result<Self> {
        let library = SymbolLibrary::from_string(contents, file_type)?;
        library
            .symbols
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No symbol found"))
    }

    /// Parse a single `(symbol ...)` expression, e.g. one embedded in a
    /// schematic's `lib_symbols`.
    pub fn from_sexpr(sexpr: &Sexpr) -> Result<Self> {
        match sexpr {
            Sexpr::List(items) if sexpr.tag() == Some("symbol") => parse_symbol(items),
            _ => Err(anyhow::anyhow!("Expected a (symbol ...) expression")),
        }
    }

    pub fn raw_sexp(&self) -> Option<&Sexpr> {
        self.raw_sexp.as_ref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Number of units; symbols without unit sections have one.
    pub fn unit_count(&self) -> u32 {
        self.pins.iter().map(|p| p.unit).max().unwrap_or(0).max(1)
    }

    /// Pins present on `unit`: the common pins plus the unit's own, normal
    /// body style only.
    pub fn pins_for_unit(&self, unit: u32) -> impl Iterator<Item = &Pin> + Clone + '_ {
        self.pins
            .iter()
            .filter(move |p| (p.unit == 0 || p.unit == unit) && p.style <= 1)
    }

    /// The identifier a pin is addressed by: its name, or its number when the
    /// name is empty, `~`, or shared with another pin of the symbol.
    pub fn designator<'a>(&self, pin: &'a Pin) -> &'a str {
        if !pin.has_usable_name() {
            return &pin.number;
        }
        let shared = self
            .pins
            .iter()
            .any(|p| p.style <= 1 && p.name == pin.name && p.number != pin.number);
        if shared {
            &pin.number
        } else {
            &pin.name
        }
    }

    /// Look a pin up among the pins of `unit` by designator, then number,
    /// then name. Duplicated names resolve to the first declared pin.
    pub fn find_pin(&self, unit: u32, key: &str) -> Option<&Pin> {
        let mut pins = self.pins_for_unit(unit);
        pins.clone()
            .find(|p| self.designator(p) == key)
            .or_else(|| pins.clone().find(|p| p.number == key))
            .or_else(|| pins.find(|p| p.has_usable_name() && p.name == key))
    }

    /// The flattened definition renamed to `lib_id`, ready to be embedded in
    /// a schematic's `lib_symbols`.
    pub fn embedded_sexpr(&self, lib_id: &str) -> Option<Sexpr> {
        let mut sexpr = self.raw_sexp.clone()?;
        let items = sexpr.as_list_mut()?;
        if items.len() < 2 {
            return None;
        }
        items[1] = Sexpr::string(lib_id);
        items.retain(|item| item.tag() != Some("extends"));
        Some(sexpr)
    }
}

/// A symbol library that can contain multiple symbols
#[derive(Debug, Default, Clone)]
pub struct SymbolLibrary {
    symbols: Vec<Symbol>,
}

impl SymbolLibrary {
    /// Parse a symbol library from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let extension = path.extension().unwrap_or("".as_ref()).to_str();
        let error = io::Error::other("Unsupported file type");
        match extension {
            Some("kicad_sym") => {
                let lib = KicadSymbolLibrary::from_file(path)?;
                Ok(SymbolLibrary {
                    symbols: lib.into_symbols(),
                })
            }
            _ => Err(anyhow::anyhow!(error)),
        }
    }

    /// Parse a symbol library from a string
    pub fn from_string(contents: &str, file_type: &str) -> Result<Self> {
        match file_type {
            "kicad_sym" => {
                let lib = KicadSymbolLibrary::from_string(contents)?;
                Ok(SymbolLibrary {
                    symbols: lib.into_symbols(),
                })
            }
            _ => Err(anyhow::anyhow!("Unsupported file type: {}", file_type)),
        }
    }

    /// Get all symbols in the library
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Get a symbol by name
    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Get the names of all symbols in the library
    pub fn symbol_names(&self) -> Vec<&str> {
        self.symbols.iter().map(|s| s.name.as_str()).collect()
    }
}
