//! The locked-cell matrix: collision, locking and line clearing.

use crate::piece::Piece;
use std::collections::VecDeque;

pub const ROWS: usize = 20;
pub const COLUMNS: usize = 10;

pub type Row = [u8; COLUMNS];

/// 20 x 10 field. `rows[0]` is the top row; 0 is empty, 1..=7 a shape id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: VecDeque<Row>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            rows: (0..ROWS).map(|_| [0; COLUMNS]).collect(),
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, id: u8) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = id;
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// True if any occupied cell of `piece` is left/right of the field, below
    /// it, or on a filled cell. Cells above the top edge never collide.
    pub fn has_collision(&self, piece: &Piece) -> bool {
        piece.cells().any(|(row, col, _)| {
            if col < 0 || col >= COLUMNS as i32 || row >= ROWS as i32 {
                return true;
            }
            row >= 0 && self.get(row as usize, col as usize).is_some_and(|c| c != 0)
        })
    }

    /// Writes the piece's occupied cells into the field. Cells above the top
    /// edge are dropped.
    pub fn lock(&mut self, piece: &Piece) {
        for (row, col, id) in piece.cells() {
            if row >= 0 && col >= 0 {
                self.set(row as usize, col as usize, id);
            }
        }
    }

    /// Removes every full row and feeds an empty one in at the top for each.
    /// Returns the removed row indices in the order they were processed
    /// (top to bottom); rows that were not full keep their relative order.
    pub fn clear_lines(&mut self) -> Vec<usize> {
        let full: Vec<usize> = (0..self.height())
            .filter(|&y| self.rows[y].iter().all(|&c| c != 0))
            .collect();
        // Removing a row only shifts the rows above it, so the lower indices
        // stay valid while we go top to bottom.
        for &y in &full {
            self.rows.remove(y);
            self.rows.push_front([0; COLUMNS]);
        }
        full
    }
}
