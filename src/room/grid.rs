use serde::Serialize;

use crate::error::{ConfigError, PlacementError};
use crate::parser::StudentId;

/// State of a single grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "student", rename_all = "snake_case")]
pub enum Cell {
    Free,
    /// Aisle, wall or banned seat.
    Blocked,
    Desk,
    Occupied(StudentId),
}

impl Cell {
    /// Free or occupied: a physical seat.
    pub fn is_seat(&self) -> bool {
        matches!(self, Cell::Free | Cell::Occupied(_))
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Cell::Free)
    }

    pub fn student(&self) -> Option<&StudentId> {
        match self {
            Cell::Occupied(id) => Some(id),
            _ => None,
        }
    }
}

/// Seat grid of one room, stored row-major. Seat labels count from grid
/// row 0, whatever row the desk is declared on; layouts put the desk on
/// row 0 so row `A` is the front row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomGrid {
    name: String,
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl RoomGrid {
    /// A grid with every cell blocked.
    pub fn new(name: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            name: name.into(),
            rows,
            cols,
            cells: vec![Cell::Blocked; rows * cols],
        }
    }

    /// Builds a grid from seat markers, cropped to the bounding box of the
    /// seats. Ragged rows are padded with blocked cells.
    pub fn from_markers(name: impl Into<String>, markers: &[Vec<bool>]) -> Result<Self, ConfigError> {
        let name = name.into();
        let seats: Vec<(usize, usize)> = markers
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, seat)| **seat)
                    .map(move |(c, _)| (r, c))
            })
            .collect();

        if seats.is_empty() {
            return Err(ConfigError::NoSeats(name));
        }
        let min_r = seats.iter().map(|s| s.0).min().unwrap_or(0);
        let max_r = seats.iter().map(|s| s.0).max().unwrap_or(0);
        let min_c = seats.iter().map(|s| s.1).min().unwrap_or(0);
        let max_c = seats.iter().map(|s| s.1).max().unwrap_or(0);

        let mut grid = Self::new(name, max_r - min_r + 1, max_c - min_c + 1);
        for (r, c) in seats {
            grid.set(r - min_r, c - min_c, Cell::Free);
        }
        Ok(grid)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn is_seat(&self, row: usize, col: usize) -> bool {
        self.cell(row, col).map(Cell::is_seat).unwrap_or(false)
    }

    /// Rows of the final cell matrix, for rendering and export.
    pub fn matrix(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.cols.max(1))
    }

    /// Number of free cells.
    pub fn capacity(&self) -> usize {
        self.cells.iter().filter(|c| c.is_free()).count()
    }

    pub fn seat_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_seat()).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.seat_count() - self.capacity()
    }

    /// First free cell in row-major order, `None` when the room is full.
    pub fn first_free_cell(&self) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .position(Cell::is_free)
            .map(|i| (i / self.cols, i % self.cols))
    }

    /// Seats `student` at (`row`, `col`). The cell must be free.
    pub fn occupy(&mut self, row: usize, col: usize, student: StudentId) -> Result<(), PlacementError> {
        let room = self.name.clone();
        match self.cell_mut(row, col) {
            Some(cell) if cell.is_free() => {
                *cell = Cell::Occupied(student);
                Ok(())
            }
            Some(cell) => Err(PlacementError::CellNotFree {
                room,
                row,
                col,
                cell: cell.clone(),
            }),
            None => Err(PlacementError::CellNotFree {
                room,
                row,
                col,
                cell: Cell::Blocked,
            }),
        }
    }

    /// Thins the seats so only every `(rows + 1)`-th row and `(cols + 1)`-th
    /// column keep a free seat.
    pub fn apply_spacing(&mut self, rows: usize, cols: usize) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                let keep = r % (rows + 1) == 0 && c % (cols + 1) == 0;
                if let Some(cell) = self.cell_mut(r, c) {
                    if cell.is_free() && !keep {
                        *cell = Cell::Blocked;
                    }
                }
            }
        }
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: Cell) {
        if let Some(cell) = self.cell_mut(row, col) {
            *cell = value;
        }
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }
}
