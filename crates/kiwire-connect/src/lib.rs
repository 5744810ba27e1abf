//! Symbolic wiring for KiCad schematics.
//!
//! A [`Resolver`] owns a [`kiwire_schematic::Schematic`] and turns requests
//! like "connect `R1.2` to `D1.A`" into wires, junctions and labels while
//! tracking which pins share a net.

pub mod config;
mod disjoint_set;
mod endpoint;
mod error;
pub mod recipes;
mod resolver;
mod session;

pub use config::{ConfigError, EditorConfig};
pub use disjoint_set::DisjointSet;
pub use endpoint::Endpoint;
pub use error::{ConnectError, Result};
pub use resolver::{Component, ComponentPin, Connection, Net, NetPin, Resolver};
pub use session::EditSession;
