use grid_astar::{CellKind, NoProgress, Outcome, SearchEngine, SearchGrid};
use grid_util::point::Point;

// In this example a path is found on a 3x3 grid with shape
//  ___
// |S  |
// | # |
// |  E|
//  ___
// where
// - # marks a barrier
// - S marks the start
// - E marks the end
//
// Cells have a 4-neighbourhood and every move costs 1.

fn main() {
    let mut grid = SearchGrid::build(3, 300).unwrap();
    grid.set_kind(0, 0, CellKind::Start).unwrap();
    grid.set_kind(1, 1, CellKind::Barrier).unwrap();
    grid.set_kind(2, 2, CellKind::End).unwrap();
    grid.refresh_neighbours();
    let (start, end) = grid.endpoints().unwrap();
    let outcome = SearchEngine::new()
        .run(&mut grid, start, end, &mut NoProgress)
        .unwrap();
    println!("{}", grid);
    match outcome {
        Outcome::Found(path) => {
            println!("Path:");
            for p in path {
                println!("{:?}", (p.x, p.y));
            }
        }
        other => println!("No path: {:?}", other),
    }
}
