use grid_util::point::Point;
use thiserror::Error;

/// Construction-time failures. These point at a bad configuration rather than at
/// anything a player did, so hosts usually treat them as fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid must have at least one row")]
    ZeroSized,
    #[error("obstacle probability {0} is outside [0, 1]")]
    InvalidObstacleProbability(f64),
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(f32),
    #[error("player speed must be positive, got {0}")]
    InvalidPlayerSpeed(f32),
    #[error("row {row} has {len} cells, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("unknown cell glyph {0:?}")]
    UnknownGlyph(char),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

/// Reasons a start, end or obstacle placement was turned down. A rejected
/// placement leaves the grid untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("{0} lies outside the grid")]
    OutOfBounds(Point),
    #[error("{0} is an obstacle")]
    Obstacle(Point),
    #[error("{0} is already the start or the end")]
    Occupied(Point),
    #[error("the start has already been placed")]
    StartTaken,
    #[error("the end has already been placed")]
    EndTaken,
    #[error("the start must be placed before the end")]
    StartMissing,
}
