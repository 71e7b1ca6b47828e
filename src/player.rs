use std::time::Duration;

use grid_util::point::Point;
use log::debug;

use crate::grid::Grid;

/// Position in visual units, as a renderer would place the player's marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualPos {
    pub x: f32,
    pub y: f32,
}

impl VisualPos {
    fn cell_centre(cell: Point, cell_size: f32) -> VisualPos {
        VisualPos {
            x: cell.x as f32 * cell_size + cell_size / 2.0,
            y: cell.y as f32 * cell_size + cell_size / 2.0,
        }
    }
}

/// The hand-steered walk across the grid. The logical position jumps a whole cell
/// per accepted move, while the visual position glides toward it over several
/// [update](Self::update)s; no new move is accepted until the glide has finished.
#[derive(Clone, Debug)]
pub struct PlayerSession {
    current: Point,
    history: Vec<Point>,
    moves: u32,
    started_at: Duration,
    finished_at: Option<Duration>,
    pos: VisualPos,
    target: VisualPos,
    moving: bool,
    cell_size: f32,
    speed: f32,
}

impl PlayerSession {
    pub fn new(start: Point, cell_size: f32, speed: f32, now: Duration) -> PlayerSession {
        let pos = VisualPos::cell_centre(start, cell_size);
        PlayerSession {
            current: start,
            history: vec![start],
            moves: 0,
            started_at: now,
            finished_at: None,
            pos,
            target: pos,
            moving: false,
            cell_size,
            speed,
        }
    }

    /// Steps onto `node` if it is adjacent to the current cell and the previous
    /// move has finished animating. Returns whether the move was taken.
    pub fn move_to(&mut self, grid: &Grid, node: Point) -> bool {
        if self.moving {
            debug!("Move to {} rejected: previous move still in flight", node);
            return false;
        }
        if !grid.neighbors(self.current).contains(&node) {
            debug!("Move to {} rejected: not adjacent to {}", node, self.current);
            return false;
        }
        self.current = node;
        self.history.push(node);
        self.moves += 1;
        self.target = VisualPos::cell_centre(node, self.cell_size);
        self.moving = true;
        true
    }

    /// Moves the visual position one tick toward the current cell.
    pub fn update(&mut self) {
        if !self.moving {
            return;
        }
        let dx = self.target.x - self.pos.x;
        let dy = self.target.y - self.pos.y;
        let dist = dx.hypot(dy);
        if dist <= self.speed.max(1.0) {
            self.pos = self.target;
            self.moving = false;
        } else {
            self.pos.x += dx / dist * self.speed;
            self.pos.y += dy / dist * self.speed;
        }
    }

    /// Stops the player's clock; later [elapsed](Self::elapsed) calls report the
    /// time up to this moment. Only the first call counts.
    pub fn finish(&mut self, now: Duration) {
        if self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        self.finished_at
            .unwrap_or(now)
            .saturating_sub(self.started_at)
    }

    pub fn current(&self) -> Point {
        self.current
    }

    /// Every cell visited so far, starting with the start cell.
    pub fn history(&self) -> &[Point] {
        &self.history
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn position(&self) -> VisualPos {
        self.pos
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Duration> {
        self.finished_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid() -> Grid {
        Grid::from_ascii(&[
            "S..", //
            ".#.", //
            "..E",
        ])
        .unwrap()
    }

    fn settle(player: &mut PlayerSession) {
        while player.is_moving() {
            player.update();
        }
    }

    #[test]
    fn starts_at_rest_on_start() {
        let player = PlayerSession::new(Point::new(0, 0), 14.0, 5.0, Duration::from_secs(3));
        assert_eq!(player.history(), &[Point::new(0, 0)]);
        assert_eq!(player.moves(), 0);
        assert_eq!(player.position(), VisualPos { x: 7.0, y: 7.0 });
        assert!(!player.is_moving());
        assert_eq!(player.started_at(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_non_adjacent_and_obstacle_moves() {
        let grid = open_grid();
        let mut player = PlayerSession::new(Point::new(0, 0), 14.0, 5.0, Duration::ZERO);
        assert!(!player.move_to(&grid, Point::new(1, 1)));
        assert!(!player.move_to(&grid, Point::new(2, 0)));
        assert!(!player.move_to(&grid, Point::new(0, 0)));
        assert!(!player.move_to(&grid, Point::new(-1, 0)));

        player.move_to(&grid, Point::new(1, 0));
        settle(&mut player);
        // (1, 1) is the obstacle below.
        assert!(!player.move_to(&grid, Point::new(1, 1)));
        assert_eq!(player.current(), Point::new(1, 0));
        assert_eq!(player.moves(), 1);
        assert_eq!(player.history().len(), 2);
    }

    #[test]
    fn move_in_flight_blocks_next_move() {
        let grid = open_grid();
        let mut player = PlayerSession::new(Point::new(0, 0), 14.0, 5.0, Duration::ZERO);
        assert!(player.move_to(&grid, Point::new(1, 0)));
        assert!(player.is_moving());
        assert!(!player.move_to(&grid, Point::new(2, 0)));
        player.update();
        assert!(!player.move_to(&grid, Point::new(2, 0)));
        assert_eq!(player.moves(), 1);
        assert_eq!(player.current(), Point::new(1, 0));

        settle(&mut player);
        assert_eq!(player.position(), VisualPos { x: 21.0, y: 7.0 });
        assert!(player.move_to(&grid, Point::new(2, 0)));
        assert_eq!(player.moves(), 2);
    }

    #[test]
    fn glide_takes_several_updates() {
        let grid = open_grid();
        let mut player = PlayerSession::new(Point::new(0, 0), 14.0, 5.0, Duration::ZERO);
        player.move_to(&grid, Point::new(0, 1));
        player.update();
        assert_eq!(player.position(), VisualPos { x: 7.0, y: 12.0 });
        player.update();
        assert!(player.is_moving());
        player.update();
        assert!(!player.is_moving());
        assert_eq!(player.position(), VisualPos { x: 7.0, y: 21.0 });
    }

    #[test]
    fn history_is_a_walk_with_revisits() {
        let grid = open_grid();
        let mut player = PlayerSession::new(Point::new(0, 0), 14.0, 5.0, Duration::ZERO);
        for target in [Point::new(1, 0), Point::new(0, 0), Point::new(0, 1)] {
            assert!(player.move_to(&grid, target));
            settle(&mut player);
        }
        assert_eq!(
            player.history(),
            &[
                Point::new(0, 0),
                Point::new(1, 0),
                Point::new(0, 0),
                Point::new(0, 1)
            ]
        );
        assert_eq!(player.moves(), 3);
    }

    #[test]
    fn finishing_freezes_elapsed_time() {
        let mut player = PlayerSession::new(Point::new(0, 0), 14.0, 5.0, Duration::from_secs(2));
        assert_eq!(player.elapsed(Duration::from_secs(5)), Duration::from_secs(3));
        player.finish(Duration::from_secs(7));
        player.finish(Duration::from_secs(9));
        assert_eq!(player.elapsed(Duration::from_secs(60)), Duration::from_secs(5));
        assert_eq!(player.finished_at(), Some(Duration::from_secs(7)));
    }
}
