use std::fmt;
use std::str::FromStr;

use kiwire_schematic::Position;
use serde::Serialize;

use crate::error::ConnectError;

/// One side of a connection request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Endpoint {
    /// A pin, addressed by reference designator and pin name or number.
    Pin { reference: String, pin: String },
    /// A free point on the sheet.
    Point(Position),
    /// A named net, reached through a label rather than a wire.
    Net(String),
}

impl Endpoint {
    pub fn pin(reference: impl Into<String>, pin: impl Into<String>) -> Self {
        Endpoint::Pin {
            reference: reference.into(),
            pin: pin.into(),
        }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Endpoint::Point(Position::new(x, y))
    }

    pub fn net(name: impl Into<String>) -> Self {
        Endpoint::Net(name.into())
    }
}

impl From<Position> for Endpoint {
    fn from(position: Position) -> Self {
        Endpoint::Point(position)
    }
}

/// Parses `REF.PIN`, `x,y`, or a bare net name.
impl FromStr for Endpoint {
    type Err = ConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConnectError::InvalidEndpoint("empty endpoint".into()));
        }

        if let Some((x, y)) = s.split_once(',') {
            return match (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => Ok(Endpoint::point(x, y)),
                _ => Err(ConnectError::InvalidEndpoint(format!(
                    "'{s}' is not an x,y coordinate"
                ))),
            };
        }

        match s.split_once('.') {
            Some((reference, pin))
                if !pin.is_empty()
                    && reference
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_alphabetic() || c == '#') =>
            {
                Ok(Endpoint::pin(reference, pin))
            }
            _ => Ok(Endpoint::net(s)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Pin { reference, pin } => write!(f, "{reference}.{pin}"),
            Endpoint::Point(position) => write!(f, "{},{}", position.x, position.y),
            Endpoint::Net(name) => write!(f, "{name}"),
        }
    }
}
