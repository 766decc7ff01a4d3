use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::resource::{ResourceId, ResourceRegistry};

/// Absolute grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Apply `offset`, returning `None` when the result leaves a `size × size` grid.
    pub fn checked_offset(self, offset: Offset, size: usize) -> Option<Position> {
        let row = self.row as i64 + offset.drow as i64;
        let col = self.col as i64 + offset.dcol as i64;
        let size = size as i64;
        ((0..size).contains(&row) && (0..size).contains(&col))
            .then(|| Position::new(row as usize, col as usize))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One-step relative move. Both components lie in `{-1, 0, 1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub drow: i32,
    pub dcol: i32,
}

impl Offset {
    pub const STAY: Offset = Offset { drow: 0, dcol: 0 };

    /// The nine candidate moves (stay plus the eight king moves) in row-major order.
    pub const CANDIDATES: [Offset; 9] = [
        Offset { drow: -1, dcol: -1 },
        Offset { drow: -1, dcol: 0 },
        Offset { drow: -1, dcol: 1 },
        Offset { drow: 0, dcol: -1 },
        Offset { drow: 0, dcol: 0 },
        Offset { drow: 0, dcol: 1 },
        Offset { drow: 1, dcol: -1 },
        Offset { drow: 1, dcol: 0 },
        Offset { drow: 1, dcol: 1 },
    ];

    pub fn new(drow: i32, dcol: i32) -> Self {
        Self { drow, dcol }
    }

    pub fn is_stay(&self) -> bool {
        *self == Self::STAY
    }
}

/// Contents of one cell.
///
/// `Barrier` only ever appears in a [`LocalView`], marking cells beyond the grid edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cell {
    #[default]
    Empty,
    Barrier,
    Agent(AgentId),
    Resource(ResourceId),
}

/// Square, row-major matrix of cells.
#[derive(Clone, Debug)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    /// Cell at `pos`, or `None` when out of bounds.
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.contains(pos)
            .then(|| self.cells[pos.row * self.size + pos.col])
    }

    /// Overwrite the cell at `pos`.
    ///
    /// # Panics
    /// Panics if `pos` is out of bounds or `cell` is `Barrier`.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        assert!(self.contains(pos), "position {pos} outside {0}x{0} grid", self.size);
        assert!(cell != Cell::Barrier, "barriers never live in the grid");
        self.cells[pos.row * self.size + pos.col] = cell;
    }

    pub fn clear(&mut self, pos: Position) {
        self.set(pos, Cell::Empty);
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos) == Some(Cell::Empty)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size).flat_map(move |row| (0..self.size).map(move |col| Position::new(row, col)))
    }

    /// Borrow a `(2·radius+1)²` window of the live grid centred on `center`.
    pub fn view<'w>(
        &'w self,
        resources: &'w ResourceRegistry,
        center: Position,
        radius: usize,
    ) -> LocalView<'w> {
        LocalView {
            grid: self,
            resources,
            center,
            radius,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.size {
            for col in 0..self.size {
                match self.cells[row * self.size + col] {
                    Cell::Agent(id) => write!(f, "{:<4}", id.0)?,
                    Cell::Resource(_) => write!(f, "{:<4}", "R")?,
                    Cell::Empty | Cell::Barrier => write!(f, "{:<4}", ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// An agent's window onto the grid.
///
/// Window coordinates `(i, j)` run over `0..side()`; the agent sits at
/// `(radius, radius)`. Reads go straight to the borrowed grid, so a view always
/// shows the current state rather than a snapshot.
#[derive(Clone, Copy, Debug)]
pub struct LocalView<'w> {
    grid: &'w Grid,
    resources: &'w ResourceRegistry,
    center: Position,
    radius: usize,
}

impl<'w> LocalView<'w> {
    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    pub fn center(&self) -> Position {
        self.center
    }

    /// Contents at window coordinate `(i, j)`; `Barrier` beyond the grid edge.
    pub fn cell(&self, i: usize, j: usize) -> Cell {
        let row = self.center.row as i64 + i as i64 - self.radius as i64;
        let col = self.center.col as i64 + j as i64 - self.radius as i64;
        if row < 0 || col < 0 {
            return Cell::Barrier;
        }
        self.grid
            .get(Position::new(row as usize, col as usize))
            .unwrap_or(Cell::Barrier)
    }

    /// Amount of a visible resource; `None` if it has already been collected.
    pub fn resource_amount(&self, id: ResourceId) -> Option<i64> {
        self.resources.get(id).map(|r| r.amount())
    }
}
