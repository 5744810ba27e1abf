use kiwire_schematic::{Position, SchematicError};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("component {0} not found")]
    ComponentNotFound(String),

    #[error("{reference} has no pin '{pin}'")]
    PinNotFound { reference: String, pin: String },

    /// Both sides already carry different explicit names.
    #[error("cannot merge net '{a}' with net '{b}' without a net name")]
    ConflictingNetNames { a: String, b: String },

    #[error("endpoints ended up in separate nets: {}", .nets.join(", "))]
    DisconnectedNet { nets: Vec<String> },

    /// Every wire path between the two points would touch another net.
    #[error("no clear wire path from {from} to {to}: it would touch {}", .obstacles.join(", "))]
    RouteBlocked {
        from: Position,
        to: Position,
        obstacles: Vec<String>,
    },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error(transparent)]
    Schematic(#[from] SchematicError),

    #[error("symbol library error: {0:#}")]
    Library(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ConnectError>;
