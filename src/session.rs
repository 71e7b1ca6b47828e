//! The game loop's state machine. A host owns one [Session], calls
//! [tick](Session::tick) once per frame and forwards player input through the
//! action methods, each of which reports whether it was accepted. Rejected actions
//! leave the session untouched.
use std::time::Duration;

use grid_util::point::Point;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::{Clock, SystemClock};
use crate::config::GameConfig;
use crate::error::{GridError, PlacementError};
use crate::grid::{Direction, Grid, Role};
use crate::player::PlayerSession;
use crate::score::score;
use crate::search::{PathSearch, SearchState};

const SELECT_START: &str = "Select Start Point";
const SELECT_END: &str = "Select End Point";
const USE_ARROWS: &str = "Use Arrow Keys to Move!";
const NO_PATH: &str = "No Path Found";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameState {
    Menu,
    /// Placing the start, end and obstacles, then walking.
    Playing,
    /// The search is animating toward its result.
    RunningSearch,
    /// The search found no route.
    GameOver,
    /// The search found the optimal route and the player was scored against it.
    Victory,
}

pub struct Session {
    config: GameConfig,
    clock: Box<dyn Clock>,
    rng: StdRng,
    state: GameState,
    grid: Grid,
    player: Option<PlayerSession>,
    search: Option<PathSearch>,
    optimal_length: usize,
    score: Option<u32>,
    message: String,
    running: bool,
}

impl Session {
    /// Validates the configuration and builds the first grid. The session starts
    /// in the menu.
    pub fn new<C: Clock + 'static>(config: GameConfig, clock: C) -> Result<Session, GridError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let grid = Grid::with_obstacle_probability(
            config.rows,
            config.obstacle_probability,
            &mut StdRng::seed_from_u64(rng.gen()),
        )?;
        info!("Session created with seed {}", config.seed);
        Ok(Session {
            config,
            clock: Box::new(clock),
            rng,
            state: GameState::Menu,
            grid,
            player: None,
            search: None,
            optimal_length: 0,
            score: None,
            message: String::new(),
            running: true,
        })
    }

    pub fn with_system_clock(config: GameConfig) -> Result<Session, GridError> {
        Session::new(config, SystemClock::new())
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn accepts(&self, states: &[GameState]) -> bool {
        self.running && states.contains(&self.state)
    }

    fn transition(&mut self, to: GameState) {
        info!("{:?} -> {:?}", self.state, to);
        self.state = to;
    }

    /// Fresh layout, nothing placed, no player and no search.
    fn rebuild_grid(&mut self) {
        let seed = self.rng.gen();
        self.grid.rebuild(seed);
        self.player = None;
        self.search = None;
        self.optimal_length = 0;
        self.score = None;
        self.message = SELECT_START.to_owned();
    }

    /// Advances one frame: the player's glide, the node fades, then at most one
    /// search step and whatever transition its outcome calls for.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        if let Some(player) = self.player.as_mut() {
            player.update();
        }
        self.grid.advance_fades(self.config.fade_speed);

        if self.state != GameState::RunningSearch {
            return;
        }
        let now = self.now();
        let outcome = match self.search.as_mut() {
            Some(search) => search.step(&mut self.grid, now),
            None => return,
        };
        match outcome {
            SearchState::Found => self.finish_victory(now),
            SearchState::Exhausted => self.finish_game_over(),
            SearchState::Initialized | SearchState::Running => {}
        }
    }

    fn finish_victory(&mut self, now: Duration) {
        let Some(search) = self.search.as_ref() else {
            return;
        };
        self.optimal_length = search.path_length();
        let visited = search.visited_count();
        let (moves, elapsed) = self
            .player
            .as_ref()
            .map(|p| (p.moves(), p.elapsed(now)))
            .unwrap_or_default();
        let optimal = u32::try_from(self.optimal_length).unwrap_or(u32::MAX);
        let points = score(moves, optimal, elapsed.as_secs_f64());
        self.score = Some(points);
        self.message = format!(
            "A* Done: Visited={}, Path={}",
            visited, self.optimal_length
        );
        info!(
            "Scored {} for {} moves against optimal {} in {:.1}s",
            points,
            moves,
            self.optimal_length,
            elapsed.as_secs_f64()
        );
        self.transition(GameState::Victory);
    }

    fn finish_game_over(&mut self) {
        if let (Some(start), Some(end)) = (self.grid.start(), self.grid.end()) {
            if self.grid.reachable(start, end) {
                warn!("Search exhausted although {} and {} are connected", start, end);
            }
        }
        self.optimal_length = 0;
        self.message = NO_PATH.to_owned();
        self.transition(GameState::GameOver);
    }

    fn spawn_search(&mut self) -> bool {
        let (Some(start), Some(end)) = (self.grid.start(), self.grid.end()) else {
            return false;
        };
        if !self.grid.reachable(start, end) {
            info!("{} is not reachable from {}; the search will exhaust", end, start);
        }
        let now = self.now();
        self.search = Some(PathSearch::new(
            &mut self.grid,
            start,
            end,
            self.config.search_step_interval,
            now,
        ));
        self.transition(GameState::RunningSearch);
        true
    }

    /// Menu: begin a game on a freshly built grid.
    pub fn start_game(&mut self) -> bool {
        if !self.accepts(&[GameState::Menu]) {
            return false;
        }
        self.rebuild_grid();
        self.transition(GameState::Playing);
        true
    }

    /// Playing: the first placement sets the start (and puts the player there),
    /// the second sets the end and computes adjacency, every later one turns a free
    /// cell into an obstacle.
    pub fn place(&mut self, pos: Point) -> bool {
        if !self.accepts(&[GameState::Playing]) {
            return false;
        }
        let result = if self.grid.start().is_none() {
            self.place_start(pos)
        } else if self.grid.end().is_none() {
            self.place_end(pos)
        } else {
            self.place_obstacle(pos)
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("Placement at {} rejected: {}", pos, e);
                false
            }
        }
    }

    fn place_start(&mut self, pos: Point) -> Result<(), PlacementError> {
        self.grid.place(pos, Role::Start)?;
        let now = self.now();
        self.player = Some(PlayerSession::new(
            pos,
            self.config.cell_size,
            self.config.player_speed,
            now,
        ));
        self.message = SELECT_END.to_owned();
        Ok(())
    }

    fn place_end(&mut self, pos: Point) -> Result<(), PlacementError> {
        self.grid.place(pos, Role::End)?;
        self.grid.recompute_adjacency();
        self.message = USE_ARROWS.to_owned();
        Ok(())
    }

    /// The player's own cell stays free.
    fn place_obstacle(&mut self, pos: Point) -> Result<(), PlacementError> {
        if self.player.as_ref().map(PlayerSession::current) == Some(pos) {
            return Err(PlacementError::Occupied(pos));
        }
        self.grid.toggle_obstacle(pos)?;
        self.grid.recompute_adjacency();
        Ok(())
    }

    /// Playing, once the end is placed: step the player one cell. Landing on the
    /// end stops the player's clock and starts the search.
    pub fn move_player(&mut self, direction: Direction) -> bool {
        if !self.accepts(&[GameState::Playing]) {
            return false;
        }
        let Some(end) = self.grid.end() else {
            return false;
        };
        let Some(player) = self.player.as_mut() else {
            return false;
        };
        let target = direction.apply(player.current());
        if !self.grid.in_bounds(target) || !player.move_to(&self.grid, target) {
            return false;
        }
        if target == end {
            let now = self.clock.now();
            player.finish(now);
            info!("Player reached the end in {} moves", player.moves());
            self.spawn_search();
        }
        true
    }

    /// Playing, once start and end are placed: run the search without walking to
    /// the end first. The player is scored on the moves made so far.
    pub fn run_search(&mut self) -> bool {
        if !self.accepts(&[GameState::Playing]) || self.grid.end().is_none() {
            return false;
        }
        let now = self.now();
        if let Some(player) = self.player.as_mut() {
            player.finish(now);
        }
        self.spawn_search()
    }

    /// Playing: discard the grid and everything on it and start placing again.
    pub fn reset(&mut self) -> bool {
        if !self.accepts(&[GameState::Playing]) {
            return false;
        }
        info!("Resetting the grid");
        self.rebuild_grid();
        true
    }

    /// After a game: go again on a new grid.
    pub fn play_again(&mut self) -> bool {
        if !self.accepts(&[GameState::GameOver, GameState::Victory]) {
            return false;
        }
        self.rebuild_grid();
        self.transition(GameState::Playing);
        true
    }

    /// After a game: back to the menu. The finished game's player and search are
    /// dropped; the grid stays until the next [start_game](Self::start_game).
    pub fn main_menu(&mut self) -> bool {
        if !self.accepts(&[GameState::GameOver, GameState::Victory]) {
            return false;
        }
        self.player = None;
        self.search = None;
        self.transition(GameState::Menu);
        true
    }

    /// Stops the session. Ticks and actions are ignored afterwards.
    pub fn quit(&mut self) -> bool {
        if !self.running {
            return false;
        }
        info!("Quitting from {:?}", self.state);
        self.running = false;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> Option<&PlayerSession> {
        self.player.as_ref()
    }

    pub fn search(&self) -> Option<&PathSearch> {
        self.search.as_ref()
    }

    /// Score of the last victory.
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    /// Hop count of the last found path, 0 if none.
    pub fn optimal_length(&self) -> usize {
        self.optimal_length
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// One line for a status bar.
    pub fn status(&self) -> String {
        match (self.state, self.player.as_ref(), self.search.as_ref()) {
            (GameState::Playing, Some(player), _) => format!(
                "Moves: {} | Time: {}s",
                player.moves(),
                player.elapsed(self.now()).as_secs()
            ),
            (GameState::RunningSearch, _, Some(search)) => {
                format!("Running A*: Visited={}", search.visited_count())
            }
            _ => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn small_session() -> (Session, ManualClock) {
        let clock = ManualClock::new();
        let config = GameConfig {
            rows: 6,
            obstacle_probability: 0.0,
            ..GameConfig::default()
        };
        (Session::new(config, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn starts_in_menu() {
        let (session, _) = small_session();
        assert_eq!(session.state(), GameState::Menu);
        assert!(session.is_running());
        assert!(session.player().is_none());
    }

    #[test]
    fn invalid_config_is_fatal() {
        let config = GameConfig {
            rows: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            Session::new(config, ManualClock::new()),
            Err(GridError::ZeroSized)
        ));
    }

    #[test]
    fn actions_outside_their_state_are_rejected() {
        let (mut session, _) = small_session();
        assert!(!session.place(Point::new(0, 0)));
        assert!(!session.move_player(Direction::Down));
        assert!(!session.reset());
        assert!(!session.play_again());
        assert!(!session.main_menu());
        assert!(!session.run_search());
        assert_eq!(session.state(), GameState::Menu);

        assert!(session.start_game());
        assert!(!session.start_game());
        assert!(!session.main_menu());
        assert!(!session.run_search());
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn placement_sequence() {
        let (mut session, _) = small_session();
        session.start_game();
        assert_eq!(session.status(), SELECT_START);
        assert!(session.place(Point::new(0, 0)));
        assert!(session.player().is_some());
        assert_eq!(session.message(), SELECT_END);
        assert!(!session.grid().has_adjacency());

        assert!(!session.place(Point::new(0, 0)));
        assert!(session.place(Point::new(5, 5)));
        assert!(session.grid().has_adjacency());
        assert_eq!(session.message(), USE_ARROWS);

        assert!(session.place(Point::new(1, 0)));
        assert!(session.grid().node(Point::new(1, 0)).unwrap().is_obstacle());
        assert!(!session
            .grid()
            .neighbors(Point::new(0, 0))
            .contains(&Point::new(1, 0)));
        assert!(!session.place(Point::new(5, 5)));
        assert!(!session.place(Point::new(0, 0)));
        assert!(!session.place(Point::new(6, 0)));
    }

    #[test]
    fn obstacle_on_obstacle_is_rejected() {
        let (mut session, _) = small_session();
        session.start_game();
        session.place(Point::new(0, 0));
        session.place(Point::new(3, 3));
        assert!(session.place(Point::new(2, 2)));
        let before = session.grid().to_string();

        assert!(!session.place(Point::new(2, 2)));
        assert_eq!(session.grid().to_string(), before);
        assert!(session.grid().node(Point::new(2, 2)).unwrap().is_obstacle());
        assert_eq!(session.message(), USE_ARROWS);
        assert_eq!(session.state(), GameState::Playing);
    }

    #[test]
    fn main_menu_drops_the_finished_game() {
        let (mut session, clock) = small_session();
        session.start_game();
        session.place(Point::new(0, 0));
        session.place(Point::new(1, 0));
        assert!(session.move_player(Direction::Right));
        assert_eq!(session.state(), GameState::RunningSearch);
        for _ in 0..10 {
            clock.advance(session.config().search_step_interval);
            session.tick();
        }
        assert_eq!(session.state(), GameState::Victory);
        assert!(session.player().is_some());
        assert!(session.search().is_some());

        assert!(session.main_menu());
        assert_eq!(session.state(), GameState::Menu);
        assert!(session.player().is_none());
        assert!(session.search().is_none());
    }

    #[test]
    fn moves_wait_for_the_end_and_the_glide() {
        let (mut session, _) = small_session();
        session.start_game();
        session.place(Point::new(0, 0));
        assert!(!session.move_player(Direction::Down));
        session.place(Point::new(5, 5));
        assert!(!session.move_player(Direction::Up));
        assert!(session.move_player(Direction::Down));
        assert!(!session.move_player(Direction::Down));
        for _ in 0..3 {
            session.tick();
        }
        assert!(session.move_player(Direction::Down));
        assert_eq!(session.player().unwrap().moves(), 2);
        assert_eq!(session.status(), "Moves: 2 | Time: 0s");
    }

    #[test]
    fn reset_discards_everything() {
        let (mut session, _) = small_session();
        session.start_game();
        session.place(Point::new(0, 0));
        session.place(Point::new(5, 5));
        assert!(session.reset());
        assert_eq!(session.state(), GameState::Playing);
        assert!(session.player().is_none());
        assert_eq!(session.grid().start(), None);
        assert_eq!(session.grid().end(), None);
        assert_eq!(session.grid().rows(), 6);
        assert_eq!(session.message(), SELECT_START);
    }

    #[test]
    fn quit_stops_everything() {
        let (mut session, _) = small_session();
        assert!(session.quit());
        assert!(!session.is_running());
        assert!(!session.start_game());
        assert!(!session.quit());
    }
}
