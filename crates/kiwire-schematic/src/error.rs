use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    /// The schematic file could not be read or written.
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schematic: {0}")]
    Parse(#[from] kiwire_sexpr::ParseError),

    #[error("invalid wire: {0}")]
    InvalidWireSpec(String),

    #[error("{reference} unit {unit} is already placed")]
    DuplicateReference { reference: String, unit: u32 },

    #[error("rotation {0} is not a multiple of 90 degrees")]
    InvalidOrientation(f64),

    #[error("component {0} not found")]
    ComponentNotFound(String),

    #[error("library symbol {0} not found")]
    SymbolNotFound(String),

    #[error("malformed schematic: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, SchematicError>;
