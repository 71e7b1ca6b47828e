use std::thread;
use std::time::Duration;

use grid_util::point::Point;
use log::info;
use path_hunter::{Direction, GameConfig, GameState, Grid, PathSearch, Session};

// Plays one game without a window. The "player" walks the route a throwaway search
// found on a copy of the grid, so it should score close to the maximum; the real
// search then replays on the session's grid at its normal pace.
//
// Run with RUST_LOG=debug to see every rejected action and expansion.

fn direction_between(a: Point, b: Point) -> Option<Direction> {
    Direction::ALL.into_iter().find(|d| d.apply(a) == b)
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = GameConfig {
        rows: 20,
        ..GameConfig::with_seed(7)
    };
    let mut session = match Session::with_system_clock(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };
    session.start_game();

    let open = session
        .grid()
        .nodes()
        .filter(|n| !n.is_obstacle())
        .map(|n| n.pos())
        .collect::<Vec<Point>>();
    let (Some(&start), Some(&end)) = (open.first(), open.last()) else {
        eprintln!("No open cells");
        return;
    };
    if !session.place(start) || !session.place(end) {
        eprintln!("Could not place the start at {start} and the end at {end}");
        session.quit();
        return;
    }
    println!("{}", session.grid());

    let mut scout: Grid = session.grid().clone();
    let mut search = PathSearch::new(&mut scout, start, end, Duration::ZERO, Duration::ZERO);
    search.run_to_completion(&mut scout);
    let route = search.path().to_vec();
    if route.is_empty() {
        info!("No route exists, revealing the search");
        session.run_search();
    }

    let mut steps = route
        .iter()
        .zip(route.iter().skip(1))
        .filter_map(|(a, b)| direction_between(*a, *b));
    while session.is_running() {
        session.tick();
        match session.state() {
            GameState::Playing => {
                if let Some(direction) = steps.next() {
                    // Rejected while the previous glide is in flight; retry next frame.
                    while !session.move_player(direction) {
                        session.tick();
                        thread::sleep(Duration::from_millis(16));
                    }
                }
            }
            GameState::GameOver | GameState::Victory => {
                println!("{}", session.grid());
                println!("{}", session.status());
                if let Some(score) = session.score() {
                    println!("Score: {score}");
                }
                session.quit();
            }
            GameState::Menu | GameState::RunningSearch => {}
        }
        thread::sleep(Duration::from_millis(16));
    }
}
