use serde::{Deserialize, Serialize};
use std::fmt;

use kiwire_sexpr::format_number;

/// Default coincidence grid, 100 mil.
pub const DEFAULT_GRID: f64 = 2.54;

/// Largest coordinate KiCad can store: 32-bit nanometres, in millimetres.
pub const MAX_COORDINATE: f64 = 2147.483647;

/// A point in schematic coordinates (millimetres, Y pointing down).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Position::new(round4(self.x + dx), round4(self.y + dy))
    }

    pub fn grid_key(self, grid: f64) -> GridKey {
        GridKey::new(self, grid)
    }

    /// Finite and inside the sheet coordinate range.
    pub fn in_bounds(self) -> bool {
        [self.x, self.y]
            .iter()
            .all(|v| v.is_finite() && v.abs() <= MAX_COORDINATE)
    }

    /// Snap both coordinates to `grid`.
    pub fn snapped(self, grid: f64) -> Self {
        Position::new(grid_align(self.x, grid), grid_align(self.y, grid))
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Position::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", format_number(self.x), format_number(self.y))
    }
}

/// A position snapped to the grid, used wherever two points must be compared
/// for coincidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey {
    pub col: i64,
    pub row: i64,
}

impl GridKey {
    pub fn new(position: Position, grid: f64) -> Self {
        GridKey {
            col: (position.x / grid).round() as i64,
            row: (position.y / grid).round() as i64,
        }
    }

    pub fn position(self, grid: f64) -> Position {
        Position::new(round4(self.col as f64 * grid), round4(self.row as f64 * grid))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    /// `(mirror x)`: flipped about the horizontal axis.
    X,
    /// `(mirror y)`: flipped about the vertical axis.
    Y,
}

impl Mirror {
    pub fn as_str(self) -> &'static str {
        match self {
            Mirror::X => "x",
            Mirror::Y => "y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "x" => Some(Mirror::X),
            "y" => Some(Mirror::Y),
            _ => None,
        }
    }
}

/// Orientation of a placed symbol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    /// Counter-clockwise, degrees.
    pub rotation: f64,
    pub mirror: Option<Mirror>,
}

impl Transform {
    pub fn new(rotation: f64, mirror: Option<Mirror>) -> Self {
        Transform { rotation, mirror }
    }

    /// Map a library offset (Y up) to a schematic offset (Y down): flip Y,
    /// rotate, then mirror.
    pub fn apply(&self, local: (f64, f64)) -> (f64, f64) {
        let (x, y) = (local.0, -local.1);
        let theta = self.rotation.to_radians();
        let (sin, cos) = theta.sin_cos();
        let (mut rx, mut ry) = (x * cos + y * sin, -x * sin + y * cos);
        match self.mirror {
            Some(Mirror::X) => ry = -ry,
            Some(Mirror::Y) => rx = -rx,
            None => {}
        }
        (round4(rx), round4(ry))
    }

    /// Absolute position of a library offset for a symbol placed at `origin`.
    pub fn place(&self, origin: Position, local: (f64, f64)) -> Position {
        let (dx, dy) = self.apply(local);
        origin.offset(dx, dy)
    }
}

/// Round to the nearest multiple of `grid`.
pub fn grid_align(value: f64, grid: f64) -> f64 {
    round4((value / grid).round() * grid)
}

/// Round to KiCad's 1e-4 mm resolution, without negative zero.
pub fn round4(value: f64) -> f64 {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
