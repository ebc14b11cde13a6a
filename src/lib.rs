//! # grid_astar
//!
//! An interactive-friendly
//! [A*](https://en.wikipedia.org/wiki/A*_search_algorithm) pathfinding engine
//! for uniform-cost 4-connected grids. A caller paints barriers and endpoints
//! onto a [SearchGrid], refreshes the neighbour masks and then hands the grid
//! to a [SearchEngine], which expands the frontier one cell at a time and
//! reports progress through a [ProgressSink] so the caller can render each
//! step (or cancel the run). The
//! [Manhattan distance](https://en.wikipedia.org/wiki/Taxicab_geometry)
//! heuristic is exact for unit-cost cardinal movement, so found paths are
//! shortest paths. Pre-computes
//! [connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
//! so a UI can answer reachability questions without running a search.
pub mod astar;
pub mod error;

pub use crate::astar::{manhattan_estimate, NoProgress, Outcome, ProgressSink, SearchEngine};
pub use crate::error::GridError;

use core::fmt;
use grid_util::grid::{Grid, SimpleGrid};
use grid_util::point::Point;
use log::info;
use petgraph::unionfind::UnionFind;

/// Offsets to the four cardinal neighbours in (row, col) form. The up, down,
/// right, left order is fixed; relaxation visits neighbours in this order, so
/// it must stay stable for search traces to be reproducible.
pub(crate) const NEIGHBOUR_OFFSETS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

/// What a single cell currently holds. [Empty](CellKind::Empty) and
/// [Barrier](CellKind::Barrier) are the topological states the caller paints,
/// [Start](CellKind::Start) and [End](CellKind::End) mark the endpoints, and
/// [Open](CellKind::Open), [Closed](CellKind::Closed) and
/// [Path](CellKind::Path) are visualization paint applied by [SearchEngine]
/// while it runs. Only barriers affect the search topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellKind {
    #[default]
    Empty,
    Barrier,
    Start,
    End,
    Open,
    Closed,
    Path,
}

impl CellKind {
    /// Open, Closed and Path are transient search paint rather than caller
    /// input.
    pub fn is_search_paint(self) -> bool {
        matches!(self, CellKind::Open | CellKind::Closed | CellKind::Path)
    }
}

/// A value snapshot of a single cell: its position and kind at lookup time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    position: Point,
    kind: CellKind,
}

impl Cell {
    pub fn position(&self) -> (i32, i32) {
        (self.position.x, self.position.y)
    }
    pub fn kind(&self) -> CellKind {
        self.kind
    }
    pub fn is_barrier(&self) -> bool {
        self.kind == CellKind::Barrier
    }
}

/// [SearchGrid] owns the [CellKind] values of an N x N grid together with the
/// traversable neighbours of every cell in [u8] mask format for fast lookups
/// during search. It also maintains connected components over the passable
/// cells using a [UnionFind] structure, so that a caller can cheaply check
/// whether any path between two cells can exist at all.
///
/// Points index the grid with `x` as the row and `y` as the column. After any
/// barrier change, [refresh_neighbours](SearchGrid::refresh_neighbours) must
/// be called before the masks, the components or a search are used again;
/// until then the grid reports itself as stale.
#[derive(Clone, Debug)]
pub struct SearchGrid {
    pub kinds: SimpleGrid<CellKind>,
    pub neighbours: SimpleGrid<u8>,
    pub components: UnionFind<usize>,
    pub neighbours_stale: bool,
    side: i32,
    cell_px: i32,
}

impl SearchGrid {
    /// Allocates a `side_length` x `side_length` grid of [Empty](CellKind::Empty)
    /// cells mapped onto a square display region of `region_px` pixels.
    ///
    /// Fails with [InvalidDimension](GridError::InvalidDimension) when
    /// `side_length` is not positive, and also when `region_px < side_length`:
    /// the region must give every cell at least one pixel or the pixel-to-cell
    /// mapping would divide by zero.
    pub fn build(side_length: i32, region_px: i32) -> Result<SearchGrid, GridError> {
        if side_length <= 0 || region_px < side_length {
            return Err(GridError::InvalidDimension {
                side: side_length,
                region_px,
            });
        }
        let n = side_length as usize;
        Ok(SearchGrid {
            kinds: SimpleGrid::new(n, n, CellKind::Empty),
            neighbours: SimpleGrid::new(n, n, 0),
            components: UnionFind::new(n * n),
            neighbours_stale: true,
            side: side_length,
            cell_px: region_px / side_length,
        })
    }

    pub fn side_length(&self) -> i32 {
        self.side
    }

    /// Pixel width of a single cell in the display region.
    pub fn cell_px(&self) -> i32 {
        self.cell_px
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.side && p.y < self.side
    }

    fn ix(&self, p: Point) -> usize {
        (p.x * self.side + p.y) as usize
    }

    fn checked_point(&self, row: i32, col: i32) -> Result<Point, GridError> {
        let p = Point::new(row, col);
        if self.in_bounds(p) {
            Ok(p)
        } else {
            Err(GridError::OutOfBounds {
                row,
                col,
                side: self.side,
            })
        }
    }

    pub(crate) fn kind_point(&self, p: Point) -> CellKind {
        self.kinds.get_point(p)
    }

    /// Search paint applied by the engine. Never changes barrier topology, so
    /// it does not mark the neighbour masks stale.
    pub(crate) fn paint(&mut self, p: Point, kind: CellKind) {
        self.kinds.set_point(p, kind);
    }

    pub(crate) fn neighbour_mask(&self, p: Point) -> u8 {
        self.neighbours.get_point(p)
    }

    /// Snapshot of the cell at (row, col).
    pub fn cell_at(&self, row: i32, col: i32) -> Result<Cell, GridError> {
        let p = self.checked_point(row, col)?;
        Ok(Cell {
            position: p,
            kind: self.kind_point(p),
        })
    }

    /// Overwrites the kind of the cell at (row, col). Flags the neighbour
    /// masks as stale when the barrier property of the cell changes; the new
    /// topology takes effect once [refresh_neighbours](Self::refresh_neighbours)
    /// is called.
    pub fn set_kind(&mut self, row: i32, col: i32, kind: CellKind) -> Result<(), GridError> {
        let p = self.checked_point(row, col)?;
        let was_barrier = self.kind_point(p) == CellKind::Barrier;
        if was_barrier != (kind == CellKind::Barrier) {
            self.neighbours_stale = true;
        }
        self.kinds.set_point(p, kind);
        Ok(())
    }

    /// Recomputes every neighbour mask from the current barrier set and
    /// regenerates the connected components. A cell's traversable neighbours
    /// are the up-to-4 cardinally adjacent cells that are in bounds and not
    /// barriers, in up, down, right, left order; barrier cells get an empty
    /// mask and join no component. Idempotent while no kinds change.
    pub fn refresh_neighbours(&mut self) {
        info!("Refreshing neighbour masks and connected components");
        let n = self.side;
        self.components = UnionFind::new((n * n) as usize);
        for row in 0..n {
            for col in 0..n {
                let p = Point::new(row, col);
                let mut mask = 0u8;
                if self.kind_point(p) != CellKind::Barrier {
                    for (bit, (dr, dc)) in NEIGHBOUR_OFFSETS.into_iter().enumerate() {
                        let q = Point::new(row + dr, col + dc);
                        if self.in_bounds(q) && self.kind_point(q) != CellKind::Barrier {
                            mask |= 1 << bit;
                            // Down and right unions cover every passable edge once.
                            if dr == 1 || dc == 1 {
                                self.components.union(self.ix(p), self.ix(q));
                            }
                        }
                    }
                }
                self.neighbours.set_point(p, mask);
            }
        }
        self.neighbours_stale = false;
    }

    /// The traversable neighbours of (row, col) in mask order. Intended for
    /// UIs and tests; the engine reads the masks directly.
    pub fn neighbours(&self, row: i32, col: i32) -> Result<Vec<Point>, GridError> {
        let p = self.checked_point(row, col)?;
        let mask = self.neighbour_mask(p);
        Ok(NEIGHBOUR_OFFSETS
            .into_iter()
            .enumerate()
            .filter(|&(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, (dr, dc))| Point::new(row + dr, col + dc))
            .collect())
    }

    /// Checks if `a` and `b` are passable cells on the same connected
    /// component. Like a search run, this requires fresh neighbour data.
    pub fn reachable(&self, a: &Point, b: &Point) -> bool {
        if self.in_bounds(*a)
            && self.in_bounds(*b)
            && self.kind_point(*a) != CellKind::Barrier
            && self.kind_point(*b) != CellKind::Barrier
        {
            self.components.equiv(self.ix(*a), self.ix(*b))
        } else {
            false
        }
    }

    /// Finds the unique [Start](CellKind::Start) and [End](CellKind::End)
    /// cells. A missing or duplicated endpoint is a caller error.
    pub fn endpoints(&self) -> Result<(Point, Point), GridError> {
        let mut start: Option<Point> = None;
        let mut end: Option<Point> = None;
        for row in 0..self.side {
            for col in 0..self.side {
                let p = Point::new(row, col);
                match self.kind_point(p) {
                    CellKind::Start => {
                        if start.replace(p).is_some() {
                            return Err(GridError::PreconditionViolation(
                                "more than one start cell is marked",
                            ));
                        }
                    }
                    CellKind::End => {
                        if end.replace(p).is_some() {
                            return Err(GridError::PreconditionViolation(
                                "more than one end cell is marked",
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }
        match (start, end) {
            (Some(s), Some(e)) => Ok((s, e)),
            (None, _) => Err(GridError::PreconditionViolation("no start cell is marked")),
            (_, None) => Err(GridError::PreconditionViolation("no end cell is marked")),
        }
    }

    /// Maps a pixel position in the display region to the cell it falls in.
    pub fn cell_index_at(&self, px_x: i32, px_y: i32) -> Result<Point, GridError> {
        let row = px_x.div_euclid(self.cell_px);
        let col = px_y.div_euclid(self.cell_px);
        self.checked_point(row, col)
    }

    /// Resets every cell to [Empty](CellKind::Empty), dropping barriers,
    /// endpoints and search paint alike.
    pub fn clear(&mut self) {
        for row in 0..self.side {
            for col in 0..self.side {
                self.kinds.set_point(Point::new(row, col), CellKind::Empty);
            }
        }
        self.neighbours_stale = true;
    }

    /// Demotes all Open/Closed/Path paint back to [Empty](CellKind::Empty) so
    /// the grid can be searched again without rebuilding. Barriers and
    /// endpoints are kept and the neighbour masks stay valid.
    pub fn clear_search_artifacts(&mut self) {
        for row in 0..self.side {
            for col in 0..self.side {
                let p = Point::new(row, col);
                if self.kind_point(p).is_search_paint() {
                    self.kinds.set_point(p, CellKind::Empty);
                }
            }
        }
    }
}

impl fmt::Display for SearchGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..self.side {
            for col in 0..self.side {
                let c = match self.kind_point(Point::new(row, col)) {
                    CellKind::Empty => '.',
                    CellKind::Barrier => '#',
                    CellKind::Start => 'S',
                    CellKind::End => 'E',
                    CellKind::Open => 'o',
                    CellKind::Closed => 'x',
                    CellKind::Path => '*',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
