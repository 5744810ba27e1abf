//! KiCad schematic documents: loading, typed views over the placed items,
//! raw add/move operations and saving.

mod document;
mod emit;
mod error;
pub mod geometry;
mod items;

pub use document::{Schematic, SymbolPlacement};
pub use emit::{FORMAT_VERSION, GENERATOR};
pub use error::{Result, SchematicError};
pub use geometry::{
    grid_align, GridKey, Mirror, Position, Transform, DEFAULT_GRID, MAX_COORDINATE,
};
pub use items::{Junction, Label, LabelKind, NoConnect, PlacedSymbol, Wire};
