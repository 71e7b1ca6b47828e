use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use grid_util::point::Point;
use path_hunter::{Grid, PathSearch, Role};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Seeded full-size grids with the start and end in opposite corners of the open
/// cells.
fn scenarios(count: usize) -> Vec<Grid> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..count)
        .filter_map(|_| {
            let mut grid = Grid::build(50, rng.gen()).ok()?;
            let open = grid
                .nodes()
                .filter(|n| !n.is_obstacle())
                .map(|n| n.pos())
                .collect::<Vec<Point>>();
            grid.place(*open.first()?, Role::Start).ok()?;
            grid.place(*open.last()?, Role::End).ok()?;
            grid.recompute_adjacency();
            Some(grid)
        })
        .collect()
}

fn full_search(c: &mut Criterion) {
    let mut grids = scenarios(20);
    c.bench_function("50x50, full search", |b| {
        b.iter(|| {
            for grid in grids.iter_mut() {
                let (Some(start), Some(end)) = (grid.start(), grid.end()) else {
                    continue;
                };
                let mut search = PathSearch::new(grid, start, end, Duration::ZERO, Duration::ZERO);
                black_box(search.run_to_completion(grid));
            }
        })
    });
}

fn adjacency(c: &mut Criterion) {
    let mut grid = Grid::build(50, 7).unwrap();
    c.bench_function("50x50, recompute adjacency", |b| {
        b.iter(|| black_box(&mut grid).recompute_adjacency())
    });
}

criterion_group!(benches, full_search, adjacency);
criterion_main!(benches);
