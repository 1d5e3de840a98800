use serde::{Deserialize, Serialize};
use std::fmt;

use super::RoomGrid;
use crate::error::ConfigError;

/// Human-readable seat address, e.g. `B7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatLabel {
    pub row: String,
    pub col: usize,
}

impl fmt::Display for SeatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

/// Which seat rows get their column labels mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnakePolicy {
    Off,
    /// Rows whose 1-based letter ordinal `n` has `n % period == phase`.
    Alternate { period: usize, phase: usize },
}

impl Default for SnakePolicy {
    fn default() -> Self {
        SnakePolicy::Alternate { period: 4, phase: 2 }
    }
}

impl SnakePolicy {
    pub fn validate(self) -> Result<Self, ConfigError> {
        match self {
            SnakePolicy::Alternate { period, phase } if period == 0 || phase >= period => {
                Err(ConfigError::BadSnakePolicy { period, phase })
            }
            policy => Ok(policy),
        }
    }

    pub fn reverses(self, row_ordinal: usize) -> bool {
        match self {
            SnakePolicy::Off => false,
            SnakePolicy::Alternate { period, phase } => period > 0 && row_ordinal % period == phase,
        }
    }
}

/// Spreadsheet-style letters: 1 -> A, 26 -> Z, 27 -> AA.
pub fn row_letters(mut ordinal: usize) -> String {
    let mut letters = Vec::new();
    while ordinal > 0 {
        let rem = (ordinal - 1) % 26;
        letters.push(b'A' + rem as u8);
        ordinal = (ordinal - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Labels seats of one room. Seat rows and seat columns are numbered in
/// grid order, skipping rows/columns without any seat.
///
/// Seat geometry does not change while students are placed (free and
/// occupied cells are both seats), so a labeler built before placement
/// stays valid for the whole run.
#[derive(Debug, Clone)]
pub struct SeatLabeler {
    row_ordinals: Vec<Option<usize>>,
    col_ordinals: Vec<Option<usize>>,
    seats: Vec<Vec<bool>>,
    policy: SnakePolicy,
}

impl SeatLabeler {
    pub fn new(grid: &RoomGrid, policy: SnakePolicy) -> Self {
        let seats: Vec<Vec<bool>> = (0..grid.rows())
            .map(|r| (0..grid.cols()).map(|c| grid.is_seat(r, c)).collect())
            .collect();

        let row_ordinals = ordinals((0..grid.rows()).map(|r| seats[r].iter().any(|s| *s)));
        let col_ordinals =
            ordinals((0..grid.cols()).map(|c| seats.iter().any(|row| row[c])));

        Self {
            row_ordinals,
            col_ordinals,
            seats,
            policy,
        }
    }

    /// Letters of a seat row, `None` for rows without seats.
    pub fn row_label(&self, row: usize) -> Option<String> {
        self.row_ordinals.get(row).copied().flatten().map(row_letters)
    }

    /// Unmirrored column number, `None` for columns without seats.
    pub fn col_label(&self, col: usize) -> Option<usize> {
        self.col_ordinals.get(col).copied().flatten()
    }

    /// Label of the seat at (`row`, `col`); `None` if the cell is not a seat.
    pub fn label(&self, row: usize, col: usize) -> Option<SeatLabel> {
        if !self.is_seat(row, col) {
            return None;
        }
        let ordinal = self.row_ordinals.get(row).copied().flatten()?;
        let mut shown = col;
        if self.policy.reverses(ordinal) {
            let cols = self.col_ordinals.len();
            let mirrored = cols - 1 - col;
            if self.is_seat(row, mirrored) {
                shown = mirrored;
            }
        }
        Some(SeatLabel {
            row: row_letters(ordinal),
            col: self.col_label(shown)?,
        })
    }

    fn is_seat(&self, row: usize, col: usize) -> bool {
        self.seats
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }
}

fn ordinals(has_seat: impl Iterator<Item = bool>) -> Vec<Option<usize>> {
    let mut next = 0;
    has_seat
        .map(|seated| {
            seated.then(|| {
                next += 1;
                next
            })
        })
        .collect()
}
