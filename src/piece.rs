//! Tetromino shapes, their square matrices and in-place ring rotation.

use crate::grid::COLUMNS;
use rand::Rng;
use thiserror::Error;

/// Largest matrix side among the seven shapes (I and O are 4x4).
pub const MAX_SIZE: usize = 4;

/// Square block matrix; only the top-left `size x size` corner is used.
pub type Blocks = [[u8; MAX_SIZE]; MAX_SIZE];

/// Raised when a shape is requested by an id outside 1..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown shape id {0}")]
pub struct UnknownShape(pub u8);

/// The seven fixed shapes, ordered as the generator indexes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl Shape {
    pub const ALL: [Self; 7] = [Self::I, Self::J, Self::L, Self::O, Self::S, Self::T, Self::Z];

    /// Cell value this shape writes into the grid (1..=7).
    pub const fn id(self) -> u8 {
        match self {
            Self::I => 1,
            Self::J => 2,
            Self::L => 3,
            Self::O => 4,
            Self::S => 5,
            Self::T => 6,
            Self::Z => 7,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, UnknownShape> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.id() == id)
            .ok_or(UnknownShape(id))
    }

    /// Side of the square matrix.
    pub const fn size(self) -> usize {
        match self {
            Self::I | Self::O => 4,
            _ => 3,
        }
    }

    /// Spawn orientation. Coordinates are (row, col) inside the matrix.
    pub fn blocks(self) -> Blocks {
        let cells: &[(usize, usize)] = match self {
            Self::I => &[(1, 0), (1, 1), (1, 2), (1, 3)],
            Self::J => &[(1, 0), (1, 1), (1, 2)],
            Self::L => &[(1, 0), (1, 1), (1, 2), (2, 0)],
            Self::O => &[(1, 1), (1, 2), (2, 1), (2, 2)],
            Self::S => &[(1, 1), (1, 2), (2, 0), (2, 1)],
            Self::T => &[(1, 0), (1, 1), (1, 2), (2, 1)],
            Self::Z => &[(1, 0), (1, 1), (1, 2), (2, 1), (2, 2)],
        };
        let mut blocks = [[0; MAX_SIZE]; MAX_SIZE];
        for &(r, c) in cells {
            blocks[r][c] = self.id();
        }
        blocks
    }

    /// Independent uniform draw; repeats are allowed.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    pub const fn inverse(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// A shape's current matrix plus the grid offset of its top-left corner.
/// `row` is negative while the piece is still above the visible field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub shape: Shape,
    pub blocks: Blocks,
    pub row: i32,
    pub col: i32,
}

impl Piece {
    /// Piece in spawn orientation, horizontally centred, one row above the field.
    pub fn spawn(shape: Shape) -> Self {
        let size = shape.size();
        Self {
            shape,
            blocks: shape.blocks(),
            row: -1,
            col: ((COLUMNS - size) / 2) as i32,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::spawn(Shape::random(rng))
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Occupied cells as absolute (row, col, id).
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        let n = self.size();
        (0..n).flat_map(move |r| {
            (0..n).filter_map(move |c| {
                let id = self.blocks[r][c];
                (id != 0).then_some((self.row + r as i32, self.col + c as i32, id))
            })
        })
    }

    /// Rotates the matrix a quarter turn in place, ring by ring.
    pub fn rotate(&mut self, rotation: Rotation) {
        let b = &mut self.blocks;
        let y = self.shape.size() - 1;
        for i in 0..self.shape.size() / 2 {
            for j in i..y - i {
                let temp = b[i][j];
                match rotation {
                    Rotation::Clockwise => {
                        b[i][j] = b[y - j][i];
                        b[y - j][i] = b[y - i][y - j];
                        b[y - i][y - j] = b[j][y - i];
                        b[j][y - i] = temp;
                    }
                    Rotation::CounterClockwise => {
                        b[i][j] = b[j][y - i];
                        b[j][y - i] = b[y - i][y - j];
                        b[y - i][y - j] = b[y - j][i];
                        b[y - j][i] = temp;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn occupied(piece: &Piece) -> Vec<(i32, i32)> {
        piece.cells().map(|(r, c, _)| (r, c)).collect()
    }

    #[test]
    fn canonical_matrices() {
        let i = Shape::I.blocks();
        assert_eq!(i[1], [1, 1, 1, 1]);
        assert_eq!(i[0], [0; 4]);

        let l = Shape::L.blocks();
        assert_eq!(&l[1][..3], &[3, 3, 3]);
        assert_eq!(&l[2][..3], &[3, 0, 0]);

        let o = Shape::O.blocks();
        assert_eq!(o[1], [0, 4, 4, 0]);
        assert_eq!(o[2], [0, 4, 4, 0]);

        let s = Shape::S.blocks();
        assert_eq!(&s[1][..3], &[0, 5, 5]);
        assert_eq!(&s[2][..3], &[5, 5, 0]);

        let z = Shape::Z.blocks();
        assert_eq!(&z[1][..3], &[7, 7, 7]);
        assert_eq!(&z[2][..3], &[0, 7, 7]);

        assert_eq!(Piece::spawn(Shape::J).cells().count(), 3);
        assert_eq!(Piece::spawn(Shape::T).cells().count(), 4);
    }

    #[test]
    fn ids_round_trip_and_unknown_is_error() {
        for shape in Shape::ALL {
            assert_eq!(Shape::from_id(shape.id()), Ok(shape));
        }
        assert_eq!(Shape::from_id(0), Err(UnknownShape(0)));
        assert_eq!(Shape::from_id(8), Err(UnknownShape(8)));
    }

    #[test]
    fn spawn_is_centred_one_row_above() {
        let i = Piece::spawn(Shape::I);
        assert_eq!((i.row, i.col), (-1, 3));
        let t = Piece::spawn(Shape::T);
        assert_eq!((t.row, t.col), (-1, 3));
    }

    #[test]
    fn clockwise_turns_i_vertical() {
        let mut p = Piece::spawn(Shape::I);
        p.rotate(Rotation::Clockwise);
        let cols: Vec<i32> = p.cells().map(|(_, c, _)| c).collect();
        assert!(cols.iter().all(|&c| c == p.col + 2), "{cols:?}");
    }

    #[test]
    fn counter_clockwise_undoes_clockwise() {
        for shape in Shape::ALL {
            let mut p = Piece::spawn(shape);
            p.rotate(Rotation::Clockwise);
            p.rotate(Rotation::Clockwise.inverse());
            assert_eq!(p.blocks, shape.blocks());
        }
    }

    #[test]
    fn seeded_draws_cover_all_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 7];
        for _ in 0..500 {
            let shape = Shape::random(&mut rng);
            seen[usize::from(shape.id() - 1)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    proptest! {
        #[test]
        fn four_turns_restore_pattern(idx in 0usize..7, ccw in any::<bool>()) {
            let shape = Shape::ALL[idx];
            let mut p = Piece::spawn(shape);
            let before = occupied(&p);
            let dir = if ccw { Rotation::CounterClockwise } else { Rotation::Clockwise };
            for _ in 0..4 {
                p.rotate(dir);
            }
            prop_assert_eq!(occupied(&p), before);
            prop_assert_eq!(p.blocks, shape.blocks());
        }

        #[test]
        fn rotation_keeps_cell_count(idx in 0usize..7, turns in 0usize..8) {
            let mut p = Piece::spawn(Shape::ALL[idx]);
            let count = p.cells().count();
            for _ in 0..turns {
                p.rotate(Rotation::Clockwise);
            }
            prop_assert_eq!(p.cells().count(), count);
        }
    }
}
