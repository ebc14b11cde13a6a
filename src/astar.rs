//! Best-first search over a [SearchGrid] with an interleaved progress
//! callback. The frontier is ordered by an explicit composite key of estimated
//! total cost and insertion sequence, which gives FIFO behaviour among equally
//! promising cells and makes search traces reproducible.
use fxhash::{FxBuildHasher, FxHashSet};
use indexmap::map::Entry::{Occupied, Vacant};
use indexmap::IndexMap;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

use grid_util::point::Point;
use log::{info, warn};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::GridError;
use crate::{CellKind, SearchGrid, NEIGHBOUR_OFFSETS};

/// Manhattan distance between two cells. With unit edge costs on a
/// 4-connected grid this never overestimates the true remaining distance and
/// is consistent, so the search it guides returns shortest paths.
pub fn manhattan_estimate(a: &Point, b: &Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Callback surface through which a caller observes a running search. The
/// engine invokes [on_step](ProgressSink::on_step) once per expanded cell so a
/// UI can repaint the current Open/Closed state, and polls
/// [should_cancel](ProgressSink::should_cancel) before each expansion so that
/// e.g. a window-close can abort the run. Both are called from the single
/// search thread; the run-state is never touched while a callback executes.
pub trait ProgressSink {
    fn on_step(&mut self, grid: &SearchGrid);
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Sink for headless runs: observes nothing and never cancels.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_step(&mut self, _grid: &SearchGrid) {}
}

/// Terminal result of a search run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A shortest path exists. Contains the cells from the one after the
    /// start up to and including the end, in walk order.
    Found(Vec<Point>),
    /// The frontier ran dry without reaching the end; the barriers cut it
    /// off.
    Exhausted,
    /// The sink requested cancellation. Partial Open/Closed paint is left on
    /// the grid on purpose.
    Cancelled,
}

struct FrontierEntry {
    estimated_cost: i32,
    sequence: usize,
    index: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost == other.estimated_cost && self.sequence == other.sequence
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Orders per estimated cost first; the insertion sequence breaks ties
        // so equally promising cells leave the frontier in FIFO order. Both
        // comparisons are flipped to turn the max-heap into a min-heap.
        match other.estimated_cost.cmp(&self.estimated_cost) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            s => s,
        }
    }
}

fn reverse_path(parents: &FxIndexMap<Point, (usize, i32)>, end_index: usize) -> Vec<Point> {
    let mut path: Vec<Point> = itertools::unfold(end_index, |i| {
        parents.get_index(*i).map(|(node, &(parent, _))| {
            *i = parent;
            *node
        })
    })
    .collect();
    path.reverse();
    path
}

/// Runs A* searches over a [SearchGrid]. The engine is stateless between
/// runs; all bookkeeping (scores, predecessors, frontier, membership) lives in
/// a single [run](SearchEngine::run) invocation.
#[derive(Clone, Debug, Default)]
pub struct SearchEngine;

impl SearchEngine {
    pub fn new() -> SearchEngine {
        SearchEngine
    }

    /// Searches for a shortest path from `start` to `end`, painting cells
    /// Open, Closed and finally Path as it goes and calling the sink after
    /// each expansion. Preconditions are checked before the grid is touched:
    /// both endpoints must lie inside the grid, be distinct and passable, and
    /// the neighbour masks must be fresh.
    pub fn run<S: ProgressSink>(
        &self,
        grid: &mut SearchGrid,
        start: Point,
        end: Point,
        sink: &mut S,
    ) -> Result<Outcome, GridError> {
        self.check_preconditions(grid, start, end)?;
        info!("Searching for a path from {} to {}", start, end);

        let mut frontier = BinaryHeap::new();
        let mut in_frontier: FxHashSet<Point> = FxHashSet::default();
        let mut parents: FxIndexMap<Point, (usize, i32)> = FxIndexMap::default();
        let mut sequence: usize = 0;

        parents.insert(start, (usize::MAX, 0));
        in_frontier.insert(start);
        frontier.push(FrontierEntry {
            estimated_cost: manhattan_estimate(&start, &end),
            sequence,
            index: 0,
        });

        loop {
            if sink.should_cancel() {
                info!("Search cancelled by the progress sink");
                return Ok(Outcome::Cancelled);
            }
            let Some(FrontierEntry { index, .. }) = frontier.pop() else {
                break;
            };
            let (&current, &(_, current_g)) = parents.get_index(index).unwrap();
            in_frontier.remove(&current);

            if current == end {
                let path = reconstruct(grid, &parents, index, start, end);
                // One final callback so the Path-painted state is observable.
                sink.on_step(grid);
                info!("Found a path of {} steps", path.len());
                return Ok(Outcome::Found(path));
            }

            let mask = grid.neighbour_mask(current);
            for (bit, (dr, dc)) in NEIGHBOUR_OFFSETS.into_iter().enumerate() {
                if mask & (1 << bit) == 0 {
                    continue;
                }
                let neighbour = Point::new(current.x + dr, current.y + dc);
                let tentative = current_g + 1;
                let neighbour_index = match parents.entry(neighbour) {
                    Vacant(e) => {
                        let ix = e.index();
                        e.insert((index, tentative));
                        ix
                    }
                    Occupied(mut e) => {
                        // Strict improvement only: an equal-cost route must
                        // not requeue a cell that is already accounted for.
                        if tentative < e.get().1 {
                            let ix = e.index();
                            e.insert((index, tentative));
                            ix
                        } else {
                            continue;
                        }
                    }
                };
                // A cell already on the frontier keeps its queued key; the
                // improved score takes effect through the parents table when
                // the cell is eventually popped.
                if in_frontier.insert(neighbour) {
                    sequence += 1;
                    frontier.push(FrontierEntry {
                        estimated_cost: tentative + manhattan_estimate(&neighbour, &end),
                        sequence,
                        index: neighbour_index,
                    });
                    grid.paint(neighbour, CellKind::Open);
                }
            }
            sink.on_step(grid);
            if current != start {
                grid.paint(current, CellKind::Closed);
            }
        }
        warn!("Frontier exhausted without reaching {}", end);
        Ok(Outcome::Exhausted)
    }

    fn check_preconditions(
        &self,
        grid: &SearchGrid,
        start: Point,
        end: Point,
    ) -> Result<(), GridError> {
        if !grid.in_bounds(start) || !grid.in_bounds(end) {
            return Err(GridError::PreconditionViolation(
                "start and end must lie inside the grid",
            ));
        }
        if start == end {
            return Err(GridError::PreconditionViolation(
                "start and end must be distinct cells",
            ));
        }
        if grid.kind_point(start) == CellKind::Barrier || grid.kind_point(end) == CellKind::Barrier
        {
            return Err(GridError::PreconditionViolation(
                "start and end must not be barrier cells",
            ));
        }
        if grid.neighbours_stale {
            return Err(GridError::PreconditionViolation(
                "neighbour masks are stale, call refresh_neighbours first",
            ));
        }
        Ok(())
    }
}

/// Walks the predecessor table backward from the end, paints the intermediate
/// cells and restores the endpoint kinds. The returned path excludes the
/// start and includes the end.
fn reconstruct(
    grid: &mut SearchGrid,
    parents: &FxIndexMap<Point, (usize, i32)>,
    end_index: usize,
    start: Point,
    end: Point,
) -> Vec<Point> {
    let mut full = reverse_path(parents, end_index);
    for p in &full[1..full.len() - 1] {
        grid.paint(*p, CellKind::Path);
    }
    grid.paint(start, CellKind::Start);
    grid.paint(end, CellKind::End);
    full.split_off(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_grid(side: i32) -> SearchGrid {
        let mut grid = SearchGrid::build(side, side * 10).unwrap();
        grid.refresh_neighbours();
        grid
    }

    fn count_kind(grid: &SearchGrid, kind: CellKind) -> usize {
        let mut count = 0;
        for row in 0..grid.side_length() {
            for col in 0..grid.side_length() {
                if grid.cell_at(row, col).unwrap().kind() == kind {
                    count += 1;
                }
            }
        }
        count
    }

    /// Sink recording an ASCII frame of the grid at every callback.
    #[derive(Default)]
    struct Tracer {
        frames: Vec<String>,
    }

    impl ProgressSink for Tracer {
        fn on_step(&mut self, grid: &SearchGrid) {
            self.frames.push(grid.to_string());
        }
    }

    struct CancelImmediately;

    impl ProgressSink for CancelImmediately {
        fn on_step(&mut self, _grid: &SearchGrid) {}
        fn should_cancel(&self) -> bool {
            true
        }
    }

    #[test]
    fn manhattan_estimate_is_symmetric_taxicab() {
        let a = Point::new(0, 0);
        let b = Point::new(4, 4);
        assert_eq!(manhattan_estimate(&a, &b), 8);
        assert_eq!(manhattan_estimate(&b, &a), 8);
        assert_eq!(manhattan_estimate(&a, &a), 0);
        assert_eq!(manhattan_estimate(&Point::new(2, 1), &Point::new(0, 3)), 4);
    }

    /// With no obstacles the found path length equals the heuristic value.
    #[test]
    fn empty_grid_path_has_manhattan_length() {
        let mut grid = empty_grid(5);
        let start = Point::new(0, 0);
        let end = Point::new(4, 4);
        grid.set_kind(0, 0, CellKind::Start).unwrap();
        grid.set_kind(4, 4, CellKind::End).unwrap();
        let outcome = SearchEngine::new()
            .run(&mut grid, start, end, &mut NoProgress)
            .unwrap();
        match outcome {
            Outcome::Found(path) => {
                assert_eq!(path.len(), 8);
                assert_eq!(*path.last().unwrap(), end);
                assert!(!path.contains(&start));
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    /// A full barrier row leaves no 4-connected route in a 3-wide grid.
    #[test]
    fn full_barrier_row_exhausts_frontier() {
        let mut grid = SearchGrid::build(3, 300).unwrap();
        for col in 0..3 {
            grid.set_kind(1, col, CellKind::Barrier).unwrap();
        }
        grid.refresh_neighbours();
        let outcome = SearchEngine::new()
            .run(&mut grid, Point::new(0, 1), Point::new(2, 1), &mut NoProgress)
            .unwrap();
        assert_eq!(outcome, Outcome::Exhausted);
    }

    #[test]
    fn detour_around_centre_barrier() {
        //  ___
        // |S  |
        // | # |
        // |  E|
        //  ___
        let mut grid = SearchGrid::build(3, 300).unwrap();
        grid.set_kind(1, 1, CellKind::Barrier).unwrap();
        grid.refresh_neighbours();
        let outcome = SearchEngine::new()
            .run(&mut grid, Point::new(0, 0), Point::new(2, 2), &mut NoProgress)
            .unwrap();
        match outcome {
            Outcome::Found(path) => assert_eq!(path.len(), 4),
            other => panic!("expected Found, got {:?}", other),
        }
        // A detour-free corner run still expands cells off the final path.
        assert!(count_kind(&grid, CellKind::Closed) > 0);
    }

    #[test]
    fn found_run_paints_path_and_restores_endpoints() {
        let mut grid = empty_grid(4);
        let start = Point::new(0, 0);
        let end = Point::new(3, 3);
        grid.set_kind(0, 0, CellKind::Start).unwrap();
        grid.set_kind(3, 3, CellKind::End).unwrap();
        let outcome = SearchEngine::new()
            .run(&mut grid, start, end, &mut NoProgress)
            .unwrap();
        let Outcome::Found(path) = outcome else {
            panic!("expected Found");
        };
        assert_eq!(grid.cell_at(0, 0).unwrap().kind(), CellKind::Start);
        assert_eq!(grid.cell_at(3, 3).unwrap().kind(), CellKind::End);
        for p in &path[..path.len() - 1] {
            assert_eq!(grid.cell_at(p.x, p.y).unwrap().kind(), CellKind::Path);
        }
        assert_eq!(count_kind(&grid, CellKind::Path), path.len() - 1);
    }

    #[test]
    fn adjacent_endpoints_give_single_step_path() {
        let mut grid = empty_grid(2);
        let outcome = SearchEngine::new()
            .run(&mut grid, Point::new(0, 0), Point::new(0, 1), &mut NoProgress)
            .unwrap();
        assert_eq!(outcome, Outcome::Found(vec![Point::new(0, 1)]));
    }

    #[test]
    fn cancellation_before_first_step_leaves_grid_unexpanded() {
        let mut grid = empty_grid(5);
        let outcome = SearchEngine::new()
            .run(
                &mut grid,
                Point::new(0, 0),
                Point::new(4, 4),
                &mut CancelImmediately,
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(count_kind(&grid, CellKind::Closed), 0);
        assert_eq!(count_kind(&grid, CellKind::Path), 0);
    }

    #[test]
    fn run_rejects_stale_neighbours() {
        let mut grid = empty_grid(3);
        grid.set_kind(1, 1, CellKind::Barrier).unwrap();
        // No refresh after the barrier change.
        let result =
            SearchEngine::new().run(&mut grid, Point::new(0, 0), Point::new(2, 2), &mut NoProgress);
        assert!(matches!(
            result,
            Err(GridError::PreconditionViolation(_))
        ));
        // The failing call must not have painted anything.
        assert_eq!(count_kind(&grid, CellKind::Open), 0);
    }

    #[test]
    fn run_rejects_bad_endpoints() {
        let mut grid = empty_grid(3);
        let engine = SearchEngine::new();
        assert!(matches!(
            engine.run(&mut grid, Point::new(1, 1), Point::new(1, 1), &mut NoProgress),
            Err(GridError::PreconditionViolation(_))
        ));
        assert!(matches!(
            engine.run(&mut grid, Point::new(0, 0), Point::new(3, 0), &mut NoProgress),
            Err(GridError::PreconditionViolation(_))
        ));
        grid.set_kind(2, 2, CellKind::Barrier).unwrap();
        grid.refresh_neighbours();
        assert!(matches!(
            engine.run(&mut grid, Point::new(0, 0), Point::new(2, 2), &mut NoProgress),
            Err(GridError::PreconditionViolation(_))
        ));
    }

    /// Two runs over identical grids produce identical paths and identical
    /// callback frames, including the final Path-painted one.
    #[test]
    fn traces_are_deterministic() {
        let build = || {
            let mut grid = SearchGrid::build(6, 600).unwrap();
            for col in 1..5 {
                grid.set_kind(3, col, CellKind::Barrier).unwrap();
            }
            grid.refresh_neighbours();
            grid
        };
        let run = || {
            let mut grid = build();
            let mut tracer = Tracer::default();
            let outcome = SearchEngine::new()
                .run(&mut grid, Point::new(0, 2), Point::new(5, 2), &mut tracer)
                .unwrap();
            (outcome, tracer.frames)
        };
        let (first_outcome, first_frames) = run();
        let (second_outcome, second_frames) = run();
        assert_eq!(first_outcome, second_outcome);
        assert_eq!(first_frames, second_frames);
        assert!(matches!(first_outcome, Outcome::Found(_)));
    }

    /// Equal-cost rediscoveries must not requeue a cell: on a uniform-cost
    /// grid a cell that has been expanded never returns to the frontier, so
    /// no cell painted Closed may later show up as Open again.
    #[test]
    fn closed_cells_are_never_reopened() {
        let mut grid = empty_grid(6);
        let mut tracer = Tracer::default();
        SearchEngine::new()
            .run(&mut grid, Point::new(0, 0), Point::new(5, 5), &mut tracer)
            .unwrap();
        let frames: Vec<Vec<char>> = tracer
            .frames
            .iter()
            .map(|f| f.chars().filter(|c| *c != '\n').collect())
            .collect();
        for cell in 0..frames[0].len() {
            let mut expanded = false;
            for frame in &frames {
                match frame[cell] {
                    'x' => expanded = true,
                    'o' => assert!(!expanded, "cell {} requeued after expansion", cell),
                    _ => {}
                }
            }
        }
    }

    /// The frontier expands strictly one cell per callback, so the number of
    /// Closed cells grows by at most one between consecutive frames.
    #[test]
    fn one_expansion_per_callback() {
        let mut grid = empty_grid(5);
        let mut tracer = Tracer::default();
        SearchEngine::new()
            .run(&mut grid, Point::new(0, 0), Point::new(4, 4), &mut tracer)
            .unwrap();
        // The final frame repaints closed cells as Path, so it is skipped.
        let closed_counts: Vec<usize> = tracer.frames[..tracer.frames.len() - 1]
            .iter()
            .map(|f| f.chars().filter(|&c| c == 'x').count())
            .collect();
        for pair in closed_counts.windows(2) {
            assert!(pair[1] >= pair[0]);
            assert!(pair[1] - pair[0] <= 1);
        }
    }
}
