//! Play session: Ready/Running/Paused/GameOver phases and the gravity timer.

use crate::engine::{Engine, GameEvent, Snapshot};
use std::time::{Duration, Instant};

/// Slowest gravity step (level 0).
const BASE_PERIOD_MS: u64 = 1000;
/// Each level shaves this much off the period.
const PERIOD_STEP_MS: u64 = 100;
/// Gravity never gets faster than this.
const MIN_PERIOD_MS: u64 = 100;

/// Time between gravity ticks at `level`.
pub fn gravity_period(level: u32) -> Duration {
    let ms = BASE_PERIOD_MS
        .saturating_sub(u64::from(level) * PERIOD_STEP_MS)
        .max(MIN_PERIOD_MS);
    Duration::from_millis(ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Running,
    Paused,
    GameOver,
}

/// Single repeating deadline. Stopped when `next_due` is `None`.
#[derive(Debug, Clone, Default)]
pub struct GravityTimer {
    next_due: Option<Instant>,
}

impl GravityTimer {
    /// Arms the timer unless it is already running.
    pub fn start(&mut self, now: Instant, level: u32) {
        if self.next_due.is_none() {
            self.next_due = Some(now + gravity_period(level));
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Fires at most once per call and re-arms from `now` with the period for
    /// `level`, so a level change takes effect on the next step.
    pub fn poll(&mut self, now: Instant, level: u32) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + gravity_period(level));
                true
            }
            _ => false,
        }
    }

    /// Time left until the next tick, if running.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

/// Owns the engine and decides which inputs reach it in each phase.
#[derive(Debug)]
pub struct Session {
    engine: Engine,
    phase: Phase,
    timer: GravityTimer,
    soft_dropping: bool,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            phase: Phase::Ready,
            timer: GravityTimer::default(),
            soft_dropping: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.engine.take_events()
    }

    pub fn timer(&self) -> &GravityTimer {
        &self.timer
    }

    /// The single confirm key: start, pause, resume, or restart after game over.
    pub fn confirm(&mut self, now: Instant) {
        match self.phase {
            Phase::Ready | Phase::Paused => self.resume(now),
            Phase::Running => self.pause(),
            Phase::GameOver => self.reset(now),
        }
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.phase {
            Phase::Running => self.pause(),
            Phase::Paused => self.resume(now),
            Phase::Ready | Phase::GameOver => {}
        }
    }

    /// Start from Ready or resume from Paused.
    pub fn resume(&mut self, now: Instant) {
        if matches!(self.phase, Phase::Ready | Phase::Paused) {
            self.phase = Phase::Running;
            self.soft_dropping = false;
            self.timer.start(now, self.engine.level());
        }
    }

    pub fn pause(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Paused;
            self.soft_dropping = false;
            self.timer.stop();
        }
    }

    /// New game; only honoured once the current one is over.
    pub fn reset(&mut self, now: Instant) {
        if self.phase != Phase::GameOver {
            return;
        }
        self.engine.reset();
        self.phase = Phase::Running;
        self.soft_dropping = false;
        self.timer.stop();
        self.timer.start(now, self.engine.level());
    }

    pub fn move_left(&mut self) {
        if self.phase == Phase::Running {
            self.engine.move_left();
        }
    }

    pub fn move_right(&mut self) {
        if self.phase == Phase::Running {
            self.engine.move_right();
        }
    }

    pub fn rotate(&mut self) {
        if self.phase == Phase::Running {
            self.engine.rotate();
        }
    }

    /// Manual step down. Gravity is held off until [`Self::soft_drop_end`].
    pub fn soft_drop_begin(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.soft_dropping = true;
        self.timer.stop();
        self.engine.tick();
        self.after_tick();
    }

    pub fn soft_drop_end(&mut self, now: Instant) {
        if !self.soft_dropping {
            return;
        }
        self.soft_dropping = false;
        if self.phase == Phase::Running {
            self.timer.start(now, self.engine.level());
        }
    }

    /// Advances gravity if the timer is due.
    pub fn update(&mut self, now: Instant) {
        if self.phase == Phase::Running && self.timer.poll(now, self.engine.level()) {
            self.engine.tick();
            self.after_tick();
        }
    }

    fn after_tick(&mut self) {
        if self.engine.is_game_over() && self.phase != Phase::GameOver {
            self.phase = Phase::GameOver;
            self.soft_dropping = false;
            self.timer.stop();
            // A tick on a finished game only emits the game-over notification.
            self.engine.tick();
        }
    }

    #[cfg(test)]
    pub(crate) fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{COLUMNS, ROWS};
    use crate::piece::{Piece, Shape};

    fn running(now: Instant) -> Session {
        let mut s = Session::new(Engine::with_seed(11));
        s.confirm(now);
        assert_eq!(s.phase(), Phase::Running);
        s
    }

    fn block_spawn(session: &mut Session) {
        let engine = session.engine_mut();
        for row in 1..ROWS {
            for col in 1..COLUMNS {
                engine.grid_mut().set(row, col, 2);
            }
        }
        engine.set_active(Piece::spawn(Shape::I));
        engine.set_next(Piece::spawn(Shape::T));
    }

    #[test]
    fn period_by_level() {
        assert_eq!(gravity_period(0), Duration::from_millis(1000));
        assert_eq!(gravity_period(1), Duration::from_millis(900));
        assert_eq!(gravity_period(8), Duration::from_millis(200));
        assert_eq!(gravity_period(9), Duration::from_millis(100));
        assert_eq!(gravity_period(10), Duration::from_millis(100));
        assert_eq!(gravity_period(500), Duration::from_millis(100));
    }

    #[test]
    fn timer_fires_once_per_period() {
        let t0 = Instant::now();
        let mut timer = GravityTimer::default();
        assert!(!timer.poll(t0, 0));
        timer.start(t0, 0);
        timer.start(t0 + Duration::from_millis(500), 0);
        assert!(!timer.poll(t0 + Duration::from_millis(999), 0));
        assert!(timer.poll(t0 + Duration::from_millis(1000), 3));
        assert_eq!(
            timer.remaining(t0 + Duration::from_millis(1000)),
            Some(Duration::from_millis(700))
        );
        timer.stop();
        assert!(!timer.is_running());
        assert!(!timer.poll(t0 + Duration::from_secs(10), 0));
    }

    #[test]
    fn ready_ignores_input_and_gravity() {
        let t0 = Instant::now();
        let mut s = Session::new(Engine::with_seed(12));
        let before = s.snapshot();
        s.move_left();
        s.rotate();
        s.soft_drop_begin();
        s.update(t0 + Duration::from_secs(5));
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.phase(), Phase::Ready);
    }

    #[test]
    fn confirm_cycles_pause_and_resume() {
        let t0 = Instant::now();
        let mut s = running(t0);
        assert!(s.timer().is_running());
        s.confirm(t0);
        assert_eq!(s.phase(), Phase::Paused);
        assert!(!s.timer().is_running());
        s.toggle_pause(t0);
        assert_eq!(s.phase(), Phase::Running);
    }

    #[test]
    fn pause_freezes_state() {
        let t0 = Instant::now();
        let mut s = running(t0);
        s.pause();
        let before = s.snapshot();
        s.move_left();
        s.move_right();
        s.rotate();
        s.soft_drop_begin();
        s.update(t0 + Duration::from_secs(30));
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn gravity_ticks_when_due() {
        let t0 = Instant::now();
        let mut s = running(t0);
        let row = s.engine_mut().active().row;
        s.update(t0 + Duration::from_millis(999));
        assert_eq!(s.engine_mut().active().row, row);
        s.update(t0 + Duration::from_millis(1000));
        assert_eq!(s.engine_mut().active().row, row + 1);
    }

    #[test]
    fn soft_drop_holds_gravity_until_release() {
        let t0 = Instant::now();
        let mut s = running(t0);
        let row = s.engine_mut().active().row;
        s.soft_drop_begin();
        assert_eq!(s.engine_mut().active().row, row + 1);
        assert!(!s.timer().is_running());

        s.update(t0 + Duration::from_secs(3));
        assert_eq!(s.engine_mut().active().row, row + 1);

        let t1 = t0 + Duration::from_secs(3);
        s.soft_drop_end(t1);
        assert!(s.timer().is_running());
        s.update(t1 + Duration::from_millis(1000));
        assert_eq!(s.engine_mut().active().row, row + 2);
    }

    #[test]
    fn release_while_paused_keeps_gravity_stopped() {
        let t0 = Instant::now();
        let mut s = running(t0);
        s.soft_drop_begin();
        s.pause();
        s.soft_drop_end(t0);
        assert!(!s.timer().is_running());
    }

    #[test]
    fn top_out_moves_to_game_over_with_one_notification() {
        let t0 = Instant::now();
        let mut s = running(t0);
        block_spawn(&mut s);
        s.soft_drop_begin();
        assert_eq!(s.phase(), Phase::GameOver);
        assert!(!s.timer().is_running());
        assert!(s.snapshot().is_game_over);
        assert_eq!(s.take_events(), vec![GameEvent::GameOver]);

        s.soft_drop_begin();
        s.update(t0 + Duration::from_secs(10));
        s.toggle_pause(t0);
        assert_eq!(s.phase(), Phase::GameOver);
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn reset_only_after_game_over() {
        let t0 = Instant::now();
        let mut s = running(t0);
        s.engine_mut().set_progress(700, 4);
        s.reset(t0);
        assert_eq!(s.snapshot().score, 700);

        block_spawn(&mut s);
        s.soft_drop_begin();
        assert_eq!(s.phase(), Phase::GameOver);

        s.confirm(t0);
        assert_eq!(s.phase(), Phase::Running);
        assert!(s.timer().is_running());
        let snap = s.snapshot();
        assert_eq!((snap.score, snap.lines, snap.is_game_over), (0, 0, false));
        assert_eq!(snap.highest_score, 700);
    }
}
