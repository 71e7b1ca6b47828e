//! A* over a [Grid] that advances one node expansion per effectual step, so a host
//! can draw the search while it runs.
//!
//! Nodes are only inserted into the frontier when they are not already in it, and
//! keep the key they were inserted with. A node that was already expanded is
//! inserted again when a cheaper route to it turns up. With unit edge costs and the
//! Manhattan heuristic this still yields minimum hop counts.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use fxhash::{FxBuildHasher, FxHashSet};
use grid_util::point::Point;
use indexmap::IndexMap;
use log::{debug, info};

use crate::grid::{Grid, Mark, OPAQUE, TRANSLUCENT};

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Manhattan distance, the search heuristic.
pub fn manhattan(a: Point, b: Point) -> u32 {
    a.manhattan_distance(&b).unsigned_abs()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchState {
    /// Created, no effectual step taken yet.
    Initialized,
    Running,
    /// The end was reached; a path is available.
    Found,
    /// The frontier ran dry before the end was reached.
    Exhausted,
}

struct FrontierEntry {
    estimated_cost: u32,
    order: u64,
    pos: Point,
}

impl Eq for FrontierEntry {}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost == other.estimated_cost && self.order == other.order
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for the max-heap: smallest estimate first, then earliest insertion
        other
            .estimated_cost
            .cmp(&self.estimated_cost)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// One A* run from `start` to `end`. The search reads adjacency from the grid it is
/// stepped with and writes `g`, `h`, `f` and the search marks back into it; it must
/// always be stepped with the grid it was created on.
pub struct PathSearch {
    start: Point,
    end: Point,
    frontier: BinaryHeap<FrontierEntry>,
    in_frontier: FxHashSet<Point>,
    came_from: FxIndexMap<Point, Point>,
    counter: u64,
    state: SearchState,
    path: Vec<Point>,
    visited: usize,
    step_interval: Duration,
    last_update: Duration,
}

impl PathSearch {
    /// Resets the grid's search state and seeds the frontier with `start`. The
    /// first effectual [step](Self::step) can happen once `step_interval` has
    /// passed after `now`.
    pub fn new(
        grid: &mut Grid,
        start: Point,
        end: Point,
        step_interval: Duration,
        now: Duration,
    ) -> PathSearch {
        grid.reset_search_state();
        if let Some(node) = grid.node_mut(start) {
            node.g = 0;
            node.h = manhattan(start, end);
            node.f = node.h;
        }
        let mut frontier = BinaryHeap::new();
        frontier.push(FrontierEntry {
            estimated_cost: 0,
            order: 0,
            pos: start,
        });
        let mut in_frontier = FxHashSet::default();
        in_frontier.insert(start);
        info!("Starting search from {} to {}", start, end);
        PathSearch {
            start,
            end,
            frontier,
            in_frontier,
            came_from: FxIndexMap::default(),
            counter: 0,
            state: SearchState::Initialized,
            path: Vec::new(),
            visited: 0,
            step_interval,
            last_update: now,
        }
    }

    /// Rate-limited [advance](Self::advance). Calls made before `step_interval`
    /// has passed since the last effectual step, or after the search finished,
    /// change nothing.
    pub fn step(&mut self, grid: &mut Grid, now: Duration) -> SearchState {
        if self.is_terminal() || now.saturating_sub(self.last_update) < self.step_interval {
            return self.state;
        }
        self.last_update = now;
        self.advance(grid)
    }

    /// Expands one node regardless of timing.
    pub fn advance(&mut self, grid: &mut Grid) -> SearchState {
        if self.is_terminal() {
            return self.state;
        }
        self.state = SearchState::Running;

        let Some(FrontierEntry { pos: current, .. }) = self.frontier.pop() else {
            info!(
                "Frontier exhausted after {} expansions: {} cannot be reached from {}",
                self.visited, self.end, self.start
            );
            self.state = SearchState::Exhausted;
            return self.state;
        };
        self.in_frontier.remove(&current);

        if current == self.end {
            self.path = self.reconstruct_path(grid);
            self.state = SearchState::Found;
            info!(
                "Found path of length {} after {} expansions",
                self.path_length(),
                self.visited
            );
            return self.state;
        }

        let (current_g, neighbors) = match grid.node(current) {
            Some(node) => (node.g, node.neighbors()),
            None => return self.state,
        };
        debug!("Expanding {} at g = {}", current, current_g);
        let tentative_g = current_g.saturating_add(1);
        for neighbor in neighbors {
            let h = manhattan(neighbor, self.end);
            let Some(node) = grid.node_mut(neighbor) else {
                continue;
            };
            if tentative_g < node.g {
                self.came_from.insert(neighbor, current);
                node.g = tentative_g;
                node.h = h;
                node.f = tentative_g + h;
                if self.in_frontier.insert(neighbor) {
                    self.counter += 1;
                    self.frontier.push(FrontierEntry {
                        estimated_cost: node.f,
                        order: self.counter,
                        pos: neighbor,
                    });
                    node.set_mark(Mark::Discovered, TRANSLUCENT);
                }
            }
        }

        if current != self.start {
            if let Some(node) = grid.node_mut(current) {
                node.set_mark(Mark::Finalized, TRANSLUCENT);
            }
            self.visited += 1;
        }
        self.state
    }

    /// Advances until the search finishes.
    pub fn run_to_completion(&mut self, grid: &mut Grid) -> SearchState {
        while !self.is_terminal() {
            self.advance(grid);
        }
        self.state
    }

    /// Follows predecessor links back from the end and marks every node after the
    /// start as part of the path.
    fn reconstruct_path(&self, grid: &mut Grid) -> Vec<Point> {
        let mut path = std::iter::successors(Some(self.end), |p| self.came_from.get(p).copied())
            .collect::<Vec<Point>>();
        path.reverse();
        for pos in path.iter().skip(1) {
            if let Some(node) = grid.node_mut(*pos) {
                node.set_mark(Mark::Path, OPAQUE);
            }
        }
        path
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SearchState::Found | SearchState::Exhausted)
    }

    /// Start to end inclusive, empty unless [Found](SearchState::Found).
    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// Number of moves along the found path, 0 if there is none.
    pub fn path_length(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Nodes other than the start that have been expanded.
    pub fn visited_count(&self) -> usize {
        self.visited
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn in_frontier(&self, pos: Point) -> bool {
        self.in_frontier.contains(&pos)
    }
}
