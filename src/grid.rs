//! The square grid the game is played on. Each cell is a [Node] carrying its
//! classification, the A* bookkeeping of the current search and the fade state a
//! renderer animates. Positions are [Point]s with `x` as the column and `y` as the
//! row.
use core::fmt;

use grid_util::grid::{Grid as Lattice, SimpleGrid};
use grid_util::point::Point;
use itertools::iproduct;
use log::{debug, info};
use petgraph::unionfind::UnionFind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::error::{GridError, PlacementError};
use crate::OBSTACLE_PROBABILITY;

/// Value of `g` for nodes the current search has not reached.
pub const UNREACHED: u32 = u32::MAX;
/// Fully opaque.
pub const OPAQUE: u8 = 255;
/// Opacity of discovered and finalized nodes.
pub const TRANSLUCENT: u8 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Open,
    Obstacle,
    Start,
    End,
}

/// The two special cells a player places by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Start,
    End,
}

/// What the last search did with a node, for drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    Unvisited,
    /// Entered the frontier.
    Discovered,
    /// Expanded.
    Finalized,
    /// Part of the reconstructed path.
    Path,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Order in which neighbours are listed, and therefore relaxed by the search.
    pub const ALL: [Direction; 4] = [
        Direction::Down,
        Direction::Up,
        Direction::Right,
        Direction::Left,
    ];

    /// Column and row offset.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn apply(self, point: Point) -> Point {
        let (dx, dy) = self.offset();
        Point::new(point.x + dx, point.y + dy)
    }

    /// Bit of this direction in a node's neighbour mask.
    fn bit(self) -> u8 {
        match self {
            Direction::Down => 0b0001,
            Direction::Up => 0b0010,
            Direction::Right => 0b0100,
            Direction::Left => 0b1000,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub(crate) pos: Point,
    pub(crate) kind: NodeKind,
    pub(crate) g: u32,
    pub(crate) h: u32,
    pub(crate) f: u32,
    /// One [Direction::bit] per passable neighbour.
    pub(crate) neighbors: u8,
    pub(crate) mark: Mark,
    pub(crate) alpha: u8,
    pub(crate) fade_alpha: u8,
}

impl Node {
    fn new(pos: Point, kind: NodeKind) -> Node {
        Node {
            pos,
            kind,
            g: UNREACHED,
            h: 0,
            f: 0,
            neighbors: 0,
            mark: Mark::Unvisited,
            alpha: OPAQUE,
            fade_alpha: 0,
        }
    }

    pub fn pos(&self) -> Point {
        self.pos
    }
    pub fn row(&self) -> usize {
        self.pos.y as usize
    }
    pub fn col(&self) -> usize {
        self.pos.x as usize
    }
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
    pub fn is_obstacle(&self) -> bool {
        self.kind == NodeKind::Obstacle
    }
    /// Best known cost from the start, [UNREACHED] if none.
    pub fn g(&self) -> u32 {
        self.g
    }
    pub fn h(&self) -> u32 {
        self.h
    }
    pub fn f(&self) -> u32 {
        self.f
    }
    /// Passable 4-neighbours as of the last [Grid::recompute_adjacency], in
    /// [Direction::ALL] order.
    pub fn neighbors(&self) -> SmallVec<[Point; 4]> {
        Direction::ALL
            .iter()
            .filter(|dir| self.neighbors & dir.bit() != 0)
            .map(|dir| dir.apply(self.pos))
            .collect()
    }
    pub fn mark(&self) -> Mark {
        self.mark
    }
    /// Opacity the node fades toward.
    pub fn alpha(&self) -> u8 {
        self.alpha
    }
    /// Current opacity.
    pub fn fade_alpha(&self) -> u8 {
        self.fade_alpha
    }

    /// Changing the mark restarts the fade from transparent.
    pub(crate) fn set_mark(&mut self, mark: Mark, alpha: u8) {
        self.mark = mark;
        self.alpha = alpha;
        self.fade_alpha = 0;
    }

    fn reset_search(&mut self) {
        self.g = UNREACHED;
        self.h = 0;
        self.f = 0;
        self.mark = Mark::Unvisited;
        self.alpha = OPAQUE;
        self.fade_alpha = 0;
    }

    fn advance_fade(&mut self, speed: u8) {
        if self.fade_alpha < self.alpha {
            self.fade_alpha = self.fade_alpha.saturating_add(speed).min(self.alpha);
        }
    }

    fn glyph(&self) -> char {
        match self.kind {
            NodeKind::Obstacle => '#',
            NodeKind::Start => 'S',
            NodeKind::End => 'E',
            NodeKind::Open => match self.mark {
                Mark::Unvisited => '.',
                Mark::Discovered => 'o',
                Mark::Finalized => 'x',
                Mark::Path => '*',
            },
        }
    }
}

/// Square lattice of [Node]s. The side length never changes after construction.
/// Adjacency and the connected components derived from it are only meaningful
/// after [recompute_adjacency](Self::recompute_adjacency).
#[derive(Clone, Debug)]
pub struct Grid {
    obstacle_probability: f64,
    nodes: SimpleGrid<Node>,
    start: Option<Point>,
    end: Option<Point>,
    components: UnionFind<usize>,
    adjacency_ready: bool,
}

impl Grid {
    /// Builds a grid where every cell is an obstacle with probability
    /// [OBSTACLE_PROBABILITY], drawn from a generator seeded with `seed`.
    pub fn build(rows: usize, seed: u64) -> Result<Grid, GridError> {
        Grid::with_obstacle_probability(
            rows,
            OBSTACLE_PROBABILITY,
            &mut StdRng::seed_from_u64(seed),
        )
    }

    /// Builds an obstacle-free grid.
    pub fn empty(rows: usize) -> Result<Grid, GridError> {
        Grid::with_obstacle_probability(rows, 0.0, &mut StdRng::seed_from_u64(0))
    }

    pub fn with_obstacle_probability<R: Rng>(
        rows: usize,
        obstacle_probability: f64,
        rng: &mut R,
    ) -> Result<Grid, GridError> {
        if rows == 0 {
            return Err(GridError::ZeroSized);
        }
        if !(0.0..=1.0).contains(&obstacle_probability) {
            return Err(GridError::InvalidObstacleProbability(obstacle_probability));
        }
        Ok(Grid::generate(rows, obstacle_probability, rng))
    }

    /// Parses a grid from one string per row: `.` open, `#` obstacle, `S` start
    /// and `E` end. Adjacency is computed before returning.
    pub fn from_ascii(lines: &[&str]) -> Result<Grid, GridError> {
        let mut grid = Grid::empty(lines.len())?;
        let (mut start, mut end) = (None, None);
        for (y, line) in lines.iter().enumerate() {
            let len = line.chars().count();
            if len != grid.rows() {
                return Err(GridError::NotSquare {
                    row: y,
                    len,
                    expected: grid.rows(),
                });
            }
            for (x, glyph) in line.chars().enumerate() {
                let pos = Point::new(x as i32, y as i32);
                match glyph {
                    '.' => {}
                    '#' => grid.toggle_obstacle(pos)?,
                    'S' => start = Some(pos),
                    'E' => end = Some(pos),
                    other => return Err(GridError::UnknownGlyph(other)),
                }
            }
        }
        if let Some(start) = start {
            grid.place(start, Role::Start)?;
        }
        if let Some(end) = end {
            grid.place(end, Role::End)?;
        }
        grid.recompute_adjacency();
        Ok(grid)
    }

    fn generate<R: Rng>(rows: usize, obstacle_probability: f64, rng: &mut R) -> Grid {
        let blank = Node::new(Point::new(0, 0), NodeKind::Open);
        let mut nodes = SimpleGrid::new(rows, rows, blank);
        for (y, x) in iproduct!(0..rows, 0..rows) {
            let kind = if rng.gen_bool(obstacle_probability) {
                NodeKind::Obstacle
            } else {
                NodeKind::Open
            };
            nodes.set(x, y, Node::new(Point::new(x as i32, y as i32), kind));
        }
        let obstacles = nodes.values.iter().filter(|n| n.is_obstacle()).count();
        info!("Built {rows}x{rows} grid with {obstacles} obstacles");
        Grid {
            obstacle_probability,
            nodes,
            start: None,
            end: None,
            components: UnionFind::new(rows * rows),
            adjacency_ready: false,
        }
    }

    /// Throws away every classification, search field and placement and generates
    /// a fresh layout of the same size from `seed`.
    pub fn rebuild(&mut self, seed: u64) {
        *self = Grid::generate(
            self.rows(),
            self.obstacle_probability,
            &mut StdRng::seed_from_u64(seed),
        );
    }

    pub fn rows(&self) -> usize {
        self.nodes.height()
    }

    /// Row by row.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values.iter()
    }

    pub fn in_bounds(&self, pos: Point) -> bool {
        self.nodes.point_in_bounds(pos)
    }

    /// Lattice index of `pos`, which also keys the connected components.
    fn index(&self, pos: Point) -> Option<usize> {
        self.in_bounds(pos).then(|| self.nodes.get_ix_point(&pos))
    }

    pub fn node(&self, pos: Point) -> Option<&Node> {
        self.nodes.values.get(self.index(pos)?)
    }

    pub(crate) fn node_mut(&mut self, pos: Point) -> Option<&mut Node> {
        let ix = self.index(pos)?;
        self.nodes.values.get_mut(ix)
    }

    /// In bounds and not an obstacle.
    pub fn is_passable(&self, pos: Point) -> bool {
        self.node(pos).is_some_and(|n| !n.is_obstacle())
    }

    /// Adjacency of `pos`, empty when out of bounds.
    pub fn neighbors(&self, pos: Point) -> SmallVec<[Point; 4]> {
        self.node(pos).map(Node::neighbors).unwrap_or_default()
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn end(&self) -> Option<Point> {
        self.end
    }

    pub fn has_adjacency(&self) -> bool {
        self.adjacency_ready
    }

    /// Marks an open cell as the start or the end. The start has to come first
    /// and each role can be placed once. Adjacency is left as it is.
    pub fn place(&mut self, pos: Point, role: Role) -> Result<(), PlacementError> {
        let (start, end) = (self.start, self.end);
        let node = self.node_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        match node.kind {
            NodeKind::Obstacle => return Err(PlacementError::Obstacle(pos)),
            NodeKind::Start | NodeKind::End => return Err(PlacementError::Occupied(pos)),
            NodeKind::Open => {}
        }
        match role {
            Role::Start if start.is_some() => Err(PlacementError::StartTaken),
            Role::Start => {
                node.kind = NodeKind::Start;
                self.start = Some(pos);
                Ok(())
            }
            Role::End if start.is_none() => Err(PlacementError::StartMissing),
            Role::End if end.is_some() => Err(PlacementError::EndTaken),
            Role::End => {
                node.kind = NodeKind::End;
                self.end = Some(pos);
                Ok(())
            }
        }
    }

    /// Turns an open cell into an obstacle. Obstacles, the start and the end are
    /// rejected and stay as they are.
    pub fn toggle_obstacle(&mut self, pos: Point) -> Result<(), PlacementError> {
        let node = self.node_mut(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        match node.kind {
            NodeKind::Obstacle => Err(PlacementError::Obstacle(pos)),
            NodeKind::Start | NodeKind::End => Err(PlacementError::Occupied(pos)),
            NodeKind::Open => {
                node.kind = NodeKind::Obstacle;
                Ok(())
            }
        }
    }

    /// Rebuilds every node's list of passable 4-neighbours and links the passable
    /// cells into connected components.
    pub fn recompute_adjacency(&mut self) {
        let rows = self.rows();
        let mut components = UnionFind::new(rows * rows);
        for (y, x) in iproduct!(0..rows, 0..rows) {
            let pos = Point::new(x as i32, y as i32);
            let p_ix = self.nodes.get_ix(x, y);
            let mut node = self.nodes.get(x, y);
            node.neighbors = 0;
            for dir in Direction::ALL {
                let n = dir.apply(pos);
                if !self.is_passable(n) {
                    continue;
                }
                node.neighbors |= dir.bit();
                if !node.is_obstacle() {
                    components.union(p_ix, self.nodes.get_ix_point(&n));
                }
            }
            self.nodes.set(x, y, node);
        }
        self.components = components;
        self.adjacency_ready = true;
        debug!("Recomputed adjacency for {} nodes", rows * rows);
    }

    /// Whether `b` can be reached from `a` over the last computed adjacency.
    pub fn reachable(&self, a: Point, b: Point) -> bool {
        match (self.index(a), self.index(b)) {
            (Some(a_ix), Some(b_ix)) => {
                self.adjacency_ready
                    && self.is_passable(a)
                    && self.is_passable(b)
                    && self.components.equiv(a_ix, b_ix)
            }
            _ => false,
        }
    }

    /// Puts every node back to the state it has before any search ran.
    pub fn reset_search_state(&mut self) {
        for node in &mut self.nodes.values {
            node.reset_search();
        }
    }

    /// Moves each node's opacity one tick toward its target.
    pub fn advance_fades(&mut self, speed: u8) {
        for node in &mut self.nodes.values {
            node.advance_fade(speed);
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.nodes.values.chunks(self.nodes.width()) {
            let line = row.iter().map(Node::glyph).collect::<String>();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
