use crate::Symbol;
use anyhow::Result;
use kiwire_sexpr::{parse, Sexpr};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::symbol::parse_symbol;

/// A KiCad symbol library that can contain multiple symbols
pub struct KicadSymbolLibrary {
    symbols: Vec<Symbol>,
}

impl KicadSymbolLibrary {
    /// Parse a KiCad symbol library, flattening every `extends` chain.
    pub fn from_string(content: &str) -> Result<Self> {
        let mut symbols = parse_with_raw_sexprs(content)?;
        let index: HashMap<String, usize> = symbols
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.name.clone(), idx))
            .collect();

        // Resolve parents before children so multi-level chains flatten fully
        let mut resolved: Vec<bool> = symbols.iter().map(|s| s.extends.is_none()).collect();
        let mut made_progress = true;
        while made_progress {
            made_progress = false;
            for idx in 0..symbols.len() {
                if resolved[idx] {
                    continue;
                }
                let Some(parent_name) = symbols[idx].extends.clone() else {
                    continue;
                };
                let Some(&parent_idx) = index.get(&parent_name) else {
                    continue;
                };
                if !resolved[parent_idx] {
                    continue;
                }

                let flattened = flatten(&symbols[parent_idx], &symbols[idx])?;
                symbols[idx] = flattened;
                resolved[idx] = true;
                made_progress = true;
            }
        }

        for (symbol, done) in symbols.iter().zip(&resolved) {
            if !done {
                log::warn!(
                    "Symbol '{}' extends '{}' which is missing or circular; using it unflattened",
                    symbol.name,
                    symbol.extends.as_deref().unwrap_or_default()
                );
            }
        }

        Ok(KicadSymbolLibrary { symbols })
    }

    /// Parse a KiCad symbol library from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        log::debug!("Loading symbol library {}", path.display());
        Self::from_string(&content)
    }

    /// Get all symbols in the library
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }
}

/// Re-parse the merged definition so pins and properties come from a single
/// flattened tree.
fn flatten(parent: &Symbol, child: &Symbol) -> Result<Symbol> {
    let (Some(parent_sexp), Some(child_sexp)) = (&parent.raw_sexp, &child.raw_sexp) else {
        return Ok(child.clone());
    };
    let merged = merge_symbol_sexprs(parent_sexp, child_sexp);
    let mut symbol = Symbol::from_sexpr(&merged)?;
    symbol.extends = child.extends.clone();
    Ok(symbol)
}

/// Merge two symbol S-expressions, with child overriding parent.
///
/// Properties are matched by key and other settings by tag. The parent's
/// drawing units are renamed after the child unless the child has its own.
fn merge_symbol_sexprs(parent_sexp: &Sexpr, child_sexp: &Sexpr) -> Sexpr {
    let (Some(parent_list), Some(child_list)) = (parent_sexp.as_list(), child_sexp.as_list())
    else {
        return child_sexp.clone();
    };

    let parent_name = parent_list.get(1).and_then(Sexpr::as_atom).unwrap_or_default();
    let child_name = child_list.get(1).and_then(Sexpr::as_atom).unwrap_or_default();

    let property_key = |item: &Sexpr| -> Option<String> {
        item.as_list()?.get(1)?.as_atom().map(str::to_string)
    };

    let mut child_props: Vec<&Sexpr> = Vec::new();
    let mut child_settings: Vec<&Sexpr> = Vec::new();
    let mut child_units: Vec<&Sexpr> = Vec::new();
    for item in child_list.iter().skip(2) {
        match item.tag() {
            Some("extends") | None => {}
            Some("property") => child_props.push(item),
            Some("symbol") => child_units.push(item),
            Some(_) => child_settings.push(item),
        }
    }

    let child_has = |tag: &str| child_settings.iter().any(|s| s.tag() == Some(tag));
    let child_has_prop = |key: &str| {
        child_props
            .iter()
            .any(|p| property_key(p).as_deref() == Some(key))
    };

    let mut merged = vec![Sexpr::symbol("symbol"), child_list[1].clone()];
    let mut parent_units = Vec::new();

    for item in parent_list.iter().skip(2) {
        match item.tag() {
            Some("property") => {
                if !property_key(item).is_some_and(|key| child_has_prop(&key)) {
                    merged.push(item.clone());
                }
            }
            Some("symbol") => {
                if child_units.is_empty() {
                    parent_units.push(rename_unit(item, parent_name, child_name));
                }
            }
            Some(tag) if !child_has(tag) => merged.push(item.clone()),
            _ => {}
        }
    }

    merged.extend(child_settings.into_iter().cloned());
    merged.extend(child_props.into_iter().cloned());
    merged.extend(parent_units);
    merged.extend(child_units.into_iter().cloned());

    Sexpr::List(merged)
}

fn rename_unit(unit: &Sexpr, parent_name: &str, child_name: &str) -> Sexpr {
    let mut unit = unit.clone();
    if let Some(items) = unit.as_list_mut() {
        if let Some(Sexpr::Symbol(name) | Sexpr::String(name)) = items.get_mut(1) {
            if let Some(suffix) = name.strip_prefix(parent_name) {
                *name = format!("{child_name}{suffix}");
            }
        }
    }
    unit
}

/// Parse every top-level symbol of a library, keeping raw S-expressions.
pub fn parse_with_raw_sexprs(content: &str) -> Result<Vec<Symbol>> {
    let sexp = parse(content)?;
    if sexp.tag() != Some("kicad_symbol_lib") {
        return Err(anyhow::anyhow!("Invalid KiCad symbol library format"));
    }

    let mut symbols = Vec::new();
    for item in sexp.find_children("symbol") {
        match Symbol::from_sexpr(item) {
            Ok(symbol) => symbols.push(symbol),
            // Keep going so one broken symbol doesn't hide the rest
            Err(e) => log::warn!("Failed to parse symbol: {e}"),
        }
    }

    Ok(symbols)
}
