use grid_astar::{CellKind, Outcome, ProgressSink, SearchEngine, SearchGrid};
use grid_util::point::Point;

// Watches the frontier expand: a sink that prints the painted grid every few
// expansion steps, the way an interactive UI would repaint it. Barriers form
// a wall with a single gap, forcing the frontier around it.

struct PrintEvery {
    interval: usize,
    steps: usize,
}

impl ProgressSink for PrintEvery {
    fn on_step(&mut self, grid: &SearchGrid) {
        self.steps += 1;
        if self.steps % self.interval == 0 {
            println!("step {}:\n{}", self.steps, grid);
        }
    }
}

fn main() {
    let mut grid = SearchGrid::build(10, 800).unwrap();
    for col in 0..9 {
        grid.set_kind(5, col, CellKind::Barrier).unwrap();
    }
    grid.refresh_neighbours();
    let start = Point::new(0, 0);
    let end = Point::new(9, 0);
    let mut sink = PrintEvery {
        interval: 10,
        steps: 0,
    };
    let outcome = SearchEngine::new()
        .run(&mut grid, start, end, &mut sink)
        .unwrap();
    println!("final state after {} steps:\n{}", sink.steps, grid);
    if let Outcome::Found(path) = outcome {
        println!("path length: {}", path.len());
    }
}
