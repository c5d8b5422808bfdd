//! App: terminal init, main loop, key handling and side effects.

use crate::GameConfig;
use crate::engine::GameEvent;
use crate::input::{Action, key_to_action};
use crate::session::{Phase, Session};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: Session,
    /// Without release events a soft drop is a single step.
    key_release_supported: bool,
    /// Field rows still glowing from the last clear.
    flash_rows: Vec<usize>,
    flash: Option<Effect>,
    flash_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme, session: Session) -> Self {
        Self {
            config,
            theme,
            session,
            key_release_supported: false,
            flash_rows: Vec::new(),
            flash: None,
            flash_process_time: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{
                KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
                PushKeyboardEnhancementFlags,
            },
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        self.key_release_supported = supports_keyboard_enhancement().unwrap_or(false);
        if self.key_release_supported {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }

        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        if self.config.no_menu {
            self.session.confirm(Instant::now());
        }
        let result = self.run_loop(&mut terminal);

        // Restore
        if self.key_release_supported {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            self.handle_game_events();

            let phase = self.session.phase();
            let snapshot = self.session.snapshot();
            terminal.draw(|f| {
                let area = f.area();
                crate::ui::draw(
                    f,
                    phase,
                    &snapshot,
                    &self.theme,
                    area,
                    &self.flash_rows,
                    &mut self.flash,
                    &mut self.flash_process_time,
                    now,
                );
            })?;
            if self.flash.as_ref().is_some_and(Effect::done) {
                self.clear_flash();
            }

            // Wake for the next frame or the next gravity step, whichever is first.
            let mut timeout = frame_duration.saturating_sub(now.elapsed());
            if let Some(gravity) = self.session.timer().remaining(Instant::now()) {
                timeout = timeout.min(gravity);
            }

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if !self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }

            self.session.update(Instant::now());
        }
    }

    /// Returns `false` when the player quits.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(key);
        let now = Instant::now();
        match key.kind {
            KeyEventKind::Release => {
                if action == Action::SoftDrop {
                    self.session.soft_drop_end(now);
                }
                return true;
            }
            KeyEventKind::Press | KeyEventKind::Repeat => {}
        }

        match action {
            Action::Quit => return false,
            Action::Confirm => {
                if key.kind == KeyEventKind::Press {
                    if self.session.phase() == Phase::GameOver {
                        self.clear_flash();
                    }
                    self.session.confirm(now);
                }
            }
            Action::Pause => {
                if key.kind == KeyEventKind::Press {
                    self.session.toggle_pause(now);
                }
            }
            Action::MoveLeft => self.session.move_left(),
            Action::MoveRight => self.session.move_right(),
            Action::Rotate => self.session.rotate(),
            Action::SoftDrop => {
                self.session.soft_drop_begin();
                if !self.key_release_supported {
                    self.session.soft_drop_end(now);
                }
            }
            Action::None => {}
        }
        true
    }

    /// Side channel: a glow over cleared rows and a bell on game over.
    /// Failures here are ignored; game state never depends on them.
    fn handle_game_events(&mut self) {
        for event in self.session.take_events() {
            match event {
                GameEvent::LineCleared { row } => {
                    if !self.config.no_animation {
                        if !self.flash_rows.is_empty() {
                            // Restart the fade so it covers every glowing row.
                            self.flash = None;
                            self.flash_process_time = None;
                        }
                        self.flash_rows.push(row);
                    }
                    self.ring_bell();
                }
                GameEvent::GameOver => {
                    self.clear_flash();
                    self.ring_bell();
                }
            }
        }
    }

    fn ring_bell(&self) {
        if self.config.mute {
            return;
        }
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07").and_then(|()| stdout.flush());
    }

    fn clear_flash(&mut self) {
        self.flash_rows.clear();
        self.flash = None;
        self.flash_process_time = None;
    }
}
