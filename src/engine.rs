//! Game state: grid, active/next piece, gravity tick, scoring.

use crate::grid::{COLUMNS, Grid, ROWS};
use crate::piece::{Piece, Rotation};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Lines needed per level.
pub const LINES_PER_LEVEL: u32 = 10;

/// Points per lock event indexed by cleared line count.
const LINE_POINTS: [u32; 5] = [0, 40, 100, 300, 1200];

/// Award for clearing `cleared` lines at `level` (the level before the clear).
pub fn line_clear_points(cleared: usize, level: u32) -> u32 {
    LINE_POINTS.get(cleared).copied().unwrap_or(0) * (level + 1)
}

/// Notifications for the side channel (sound, flashes). The engine never
/// waits on or inspects how they are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// One per removed row; `row` is the index it had when it was removed.
    LineCleared { row: usize },
    GameOver,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub score: u32,
    pub highest_score: u32,
    pub lines: u32,
    pub level: u32,
    pub is_game_over: bool,
    /// Locked cells with the active piece painted on top.
    pub grid: [[u8; COLUMNS]; ROWS],
    pub next_piece: Piece,
}

#[derive(Debug)]
pub struct Engine {
    grid: Grid,
    active: Piece,
    next: Piece,
    score: u32,
    lines: u32,
    game_over: bool,
    game_over_announced: bool,
    highest_score: u32,
    rng: StdRng,
    events: Vec<GameEvent>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Reproducible piece sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let active = Piece::random(&mut rng);
        let next = Piece::random(&mut rng);
        Self {
            grid: Grid::new(),
            active,
            next,
            score: 0,
            lines: 0,
            game_over: false,
            game_over_announced: false,
            highest_score: 0,
            rng,
            events: Vec::new(),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn level(&self) -> u32 {
        self.lines / LINES_PER_LEVEL
    }

    pub fn highest_score(&self) -> u32 {
        self.highest_score
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Starts a new game. The discarded score feeds the highest score.
    pub fn reset(&mut self) {
        self.highest_score = self.highest_score.max(self.score);
        self.score = 0;
        self.lines = 0;
        self.game_over = false;
        self.game_over_announced = false;
        self.grid = Grid::new();
        self.active = Piece::random(&mut self.rng);
        self.next = Piece::random(&mut self.rng);
        self.events.clear();
    }

    pub fn move_left(&mut self) {
        self.shift(-1);
    }

    pub fn move_right(&mut self) {
        self.shift(1);
    }

    fn shift(&mut self, dc: i32) {
        if self.game_over {
            return;
        }
        self.active.col += dc;
        if self.grid.has_collision(&self.active) {
            self.active.col -= dc;
        }
    }

    /// Clockwise quarter turn; undone if the new orientation collides. No kicks.
    pub fn rotate(&mut self) {
        if self.game_over {
            return;
        }
        let rotation = Rotation::Clockwise;
        self.active.rotate(rotation);
        if self.grid.has_collision(&self.active) {
            self.active.rotate(rotation.inverse());
        }
    }

    /// One gravity step. Also used for manual soft drop.
    pub fn tick(&mut self) {
        if self.game_over {
            if !self.game_over_announced {
                self.game_over_announced = true;
                self.events.push(GameEvent::GameOver);
            }
            return;
        }

        self.active.row += 1;
        if !self.grid.has_collision(&self.active) {
            return;
        }
        self.active.row -= 1;
        self.grid.lock(&self.active);
        let cleared = self.grid.clear_lines();
        self.events
            .extend(cleared.iter().map(|&row| GameEvent::LineCleared { row }));
        self.award(cleared.len());

        let fresh = Piece::random(&mut self.rng);
        self.active = std::mem::replace(&mut self.next, fresh);
        if self.grid.has_collision(&self.active) {
            self.game_over = true;
        }
    }

    fn award(&mut self, cleared: usize) {
        if cleared == 0 {
            return;
        }
        self.score += line_clear_points(cleared, self.level());
        self.lines += cleared as u32;
    }

    /// Drains pending side-channel notifications.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut grid = [[0; COLUMNS]; ROWS];
        for (dst, src) in grid.iter_mut().zip(self.grid.rows()) {
            *dst = *src;
        }
        for (row, col, id) in self.active.cells() {
            if (0..ROWS as i32).contains(&row) && (0..COLUMNS as i32).contains(&col) {
                grid[row as usize][col as usize] = id;
            }
        }
        Snapshot {
            score: self.score(),
            highest_score: self.highest_score().max(self.score()),
            lines: self.lines(),
            level: self.level(),
            is_game_over: self.game_over,
            grid,
            next_piece: self.next,
        }
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> &Piece {
        &self.active
    }

    #[cfg(test)]
    pub(crate) fn set_active(&mut self, piece: Piece) {
        self.active = piece;
    }

    #[cfg(test)]
    pub(crate) fn set_next(&mut self, piece: Piece) {
        self.next = piece;
    }

    #[cfg(test)]
    pub(crate) fn set_progress(&mut self, score: u32, lines: u32) {
        self.score = score;
        self.lines = lines;
    }
}
