//! # path_hunter
//!
//! Core of a grid racing game: a player steers a route by hand across a randomly
//! obstructed grid while an [A*](https://en.wikipedia.org/wiki/A*_search_algorithm)
//! search computes the optimal route on the same grid, one expansion at a time.
//! The player's score depends on how close their move count came to the optimal
//! hop count and on how long they took.
//!
//! The crate holds no rendering or input code. A host loop owns a
//! [Session](session::Session), forwards input actions to it and calls
//! [tick](session::Session::tick) once per frame; between ticks it can draw the
//! [Grid](grid::Grid), including the search marks the engine leaves on each node.
//! The search can also be driven directly through [PathSearch](search::PathSearch).
//!
//! The grid is 4-connected with a uniform edge cost of one, so the Manhattan
//! distance heuristic is admissible and consistent and the reported path length
//! is the true minimum hop count.
pub mod clock;
pub mod config;
pub mod error;
pub mod grid;
pub mod player;
pub mod score;
pub mod search;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GameConfig;
pub use error::{GridError, PlacementError};
pub use grid::{Direction, Grid, Mark, Node, NodeKind, Role};
pub use player::{PlayerSession, VisualPos};
pub use score::score;
pub use search::{PathSearch, SearchState};
pub use session::{GameState, Session};

/// Side length of the square grid.
pub const ROWS: usize = 50;
/// Probability with which each cell becomes an obstacle when a grid is built.
pub const OBSTACLE_PROBABILITY: f64 = 0.3;
/// Minimum time between two effectual search steps, in milliseconds.
pub const SEARCH_STEP_INTERVAL_MS: u64 = 50;
/// Distance the player's visual position covers per tick.
pub const PLAYER_SPEED: f32 = 5.0;
/// Edge length of one cell in visual units.
pub const CELL_SIZE: f32 = 14.0;
/// Opacity gained per tick by a fading node.
pub const FADE_SPEED: u8 = 20;
/// Seed of the default configuration.
pub const DEFAULT_SEED: u64 = 0x5eed;
