//! Layout and drawing: start screen, field, side panel, pause and game-over overlays.

use crate::engine::Snapshot;
use crate::grid::{COLUMNS, ROWS};
use crate::piece::Piece;
use crate::session::Phase;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each field cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 24;
const BLOCK_SYMBOL: &str = "██";
const EMPTY_SYMBOL: &str = " ·";

/// How long a cleared row keeps glowing.
const LINE_CLEAR_FADE_MS: u32 = 350;

/// Field size in terminal cells including the border.
const fn playfield_outer_size() -> (u16, u16) {
    (COLUMNS as u16 * CELL_WIDTH + 2, ROWS as u16 * CELL_HEIGHT + 2)
}

/// Splits `area` into the centred field and the sidebar to its right.
fn game_layout(area: Rect) -> (Rect, Rect) {
    let (pw, ph) = playfield_outer_size();
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Board rect (inside the border) matching `draw_playfield`.
fn board_rect(area: Rect) -> Rect {
    let (outer, _) = game_layout(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: (COLUMNS as u16 * CELL_WIDTH).min(outer.width.saturating_sub(2)),
        height: (ROWS as u16 * CELL_HEIGHT).min(outer.height.saturating_sub(2)),
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

/// Draw the screen for `phase`. While `flash_rows` is non-empty and animations
/// are on, a fade runs over those rows and `flash` holds its progress.
pub fn draw(
    frame: &mut Frame,
    phase: Phase,
    snapshot: &Snapshot,
    theme: &Theme,
    area: Rect,
    flash_rows: &[usize],
    flash: &mut Option<Effect>,
    flash_process_time: &mut Option<Instant>,
    now: Instant,
) {
    match phase {
        Phase::Ready => draw_start_screen(frame, theme, area),
        Phase::Running | Phase::Paused => {
            draw_game(frame, snapshot, theme, area);
            if !flash_rows.is_empty() {
                apply_line_clear_effect(
                    frame,
                    theme,
                    area,
                    flash_rows,
                    flash,
                    flash_process_time,
                    now,
                );
            }
            if phase == Phase::Paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Phase::GameOver => draw_game_over(frame, snapshot, theme, area),
    }
}

/// Build set of buffer positions covering the given field rows.
fn row_buffer_positions(board: Rect, rows: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &row in rows {
        let y0 = board.y + row as u16 * CELL_HEIGHT;
        for y in y0..(y0 + CELL_HEIGHT).min(board.y + board.height) {
            for x in board.x..board.x + board.width {
                set.insert((x, y));
            }
        }
    }
    set
}

fn apply_line_clear_effect(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    rows: &[usize],
    flash: &mut Option<Effect>,
    flash_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area);
    let delta = flash_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *flash_process_time = Some(now);

    if flash.is_none() {
        let positions = row_buffer_positions(board, rows);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            theme.main_fg,
            theme.main_fg,
            (LINE_CLEAR_FADE_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(board);
        *flash = Some(effect);
    }

    if let Some(effect) = flash {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_start_screen(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 40, 14);
    let key = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " BLOCKFALL ",
            Style::default()
                .fg(theme.block_color(1).unwrap_or(Color::Cyan))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press ENTER to Start",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![Span::styled("← → ", key), Span::styled("move   ", fg)]),
        Line::from(vec![Span::styled("↑ ", key), Span::styled("rotate   ", fg)]),
        Line::from(vec![Span::styled("↓ ", key), Span::styled("soft drop", fg)]),
        Line::from(vec![Span::styled("ENTER/P ", key), Span::styled("pause", fg)]),
        Line::from(vec![Span::styled("Q ", key), Span::styled("quit", fg)]),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    Clear.render(popup, frame.buffer_mut());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.accent),
        )),
        Line::from(Span::styled(
            "Press ENTER to Resume",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, snapshot: &Snapshot, theme: &Theme, area: Rect) {
    let popup = centered(area, 36, 11);
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default()
                .fg(Color::White)
                .bg(theme.alert)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Highest Score: ", fg),
            Span::styled(
                snapshot.highest_score.to_string(),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(format!("Score: {}", snapshot.score), fg)),
        Line::from(Span::styled(
            format!("Lines: {}  Level: {}", snapshot.lines, snapshot.level),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled("ENTER: Restart    Q: Quit", fg)),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" blockfall ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game(frame: &mut Frame, snapshot: &Snapshot, theme: &Theme, area: Rect) {
    let (playfield, sidebar) = game_layout(area);
    draw_playfield(frame, snapshot, theme, playfield);
    draw_sidebar(frame, snapshot, theme, sidebar);
}

fn draw_playfield(frame: &mut Frame, snapshot: &Snapshot, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let empty = Style::default().fg(theme.div_line).bg(theme.bg);
    let buf = frame.buffer_mut();
    for (y, row) in snapshot.grid.iter().enumerate() {
        let ry = inner.y + y as u16 * CELL_HEIGHT;
        if ry >= inner.y + inner.height {
            break;
        }
        for (x, &id) in row.iter().enumerate() {
            let rx = inner.x + x as u16 * CELL_WIDTH;
            if rx + CELL_WIDTH > inner.x + inner.width {
                break;
            }
            match theme.block_color(id) {
                Some(c) => buf.set_string(rx, ry, BLOCK_SYMBOL, Style::default().fg(c).bg(theme.bg)),
                None => buf.set_string(rx, ry, EMPTY_SYMBOL, empty),
            }
        }
    }
}

fn draw_sidebar(frame: &mut Frame, snapshot: &Snapshot, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // stats
            Constraint::Length(1), // gap
            Constraint::Length(7), // next
        ])
        .split(area);

    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats = vec![
        Line::from(vec![
            Span::styled("Highest: ", title_style),
            Span::styled(
                snapshot.highest_score.to_string(),
                Style::default().fg(theme.accent),
            ),
        ]),
        Line::from(vec![
            Span::styled("Score:   ", title_style),
            Span::styled(snapshot.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Lines:   ", title_style),
            Span::styled(snapshot.lines.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level:   ", title_style),
            Span::styled(snapshot.level.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Next", title_style));
    let next_inner = next_block.inner(chunks[2]);
    next_block.render(chunks[2], frame.buffer_mut());
    draw_next_preview(frame, theme, next_inner, &snapshot.next_piece);
}

/// Draw the next piece's matrix, trimmed to its occupied rows and columns.
fn draw_next_preview(frame: &mut Frame, theme: &Theme, area: Rect, piece: &Piece) {
    let n = piece.size();
    let used_rows: Vec<usize> = (0..n)
        .filter(|&r| piece.blocks[r][..n].iter().any(|&c| c != 0))
        .collect();
    let used_cols: Vec<usize> = (0..n)
        .filter(|&c| (0..n).any(|r| piece.blocks[r][c] != 0))
        .collect();
    let (Some(&r0), Some(&c0)) = (used_rows.first(), used_cols.first()) else {
        return;
    };
    let bw = used_cols.len() as u16 * CELL_WIDTH;
    let bh = used_rows.len() as u16 * CELL_HEIGHT;
    let off_x = area.width.saturating_sub(bw) / 2;
    let off_y = area.height.saturating_sub(bh) / 2;

    let buf = frame.buffer_mut();
    for (r, c, id) in piece.cells() {
        let Some(color) = theme.block_color(id) else {
            continue;
        };
        let px = (c - piece.col) as u16 - c0 as u16;
        let py = (r - piece.row) as u16 - r0 as u16;
        let x = area.x + off_x + px * CELL_WIDTH;
        let y = area.y + off_y + py * CELL_HEIGHT;
        if x + CELL_WIDTH <= area.x + area.width && y < area.y + area.height {
            buf.set_string(x, y, BLOCK_SYMBOL, Style::default().fg(color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render(phase: Phase, snapshot: &Snapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 26)).unwrap();
        let theme = Theme::default();
        terminal
            .draw(|f| {
                let area = f.area();
                draw(
                    f,
                    phase,
                    snapshot,
                    &theme,
                    area,
                    &[],
                    &mut None,
                    &mut None,
                    Instant::now(),
                );
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn start_screen_prompts_for_enter() {
        let snap = Engine::with_seed(1).snapshot();
        assert!(render(Phase::Ready, &snap).contains("Press ENTER to Start"));
    }

    #[test]
    fn panel_shows_counters() {
        let mut snap = Engine::with_seed(1).snapshot();
        snap.score = 1234;
        snap.highest_score = 5678;
        snap.lines = 17;
        snap.level = 1;
        let screen = render(Phase::Running, &snap);
        assert!(screen.contains("1234"));
        assert!(screen.contains("5678"));
        assert!(screen.contains("Lines:   17"));
        assert!(screen.contains("Next"));
    }

    #[test]
    fn pause_and_game_over_overlays() {
        let mut snap = Engine::with_seed(2).snapshot();
        assert!(render(Phase::Paused, &snap).contains("Press ENTER to Resume"));
        snap.is_game_over = true;
        snap.highest_score = 900;
        let screen = render(Phase::GameOver, &snap);
        assert!(screen.contains("GAME OVER"));
        assert!(screen.contains("900"));
    }

    #[test]
    fn flash_covers_whole_rows() {
        let board = Rect::new(5, 3, 20, 20);
        let set = row_buffer_positions(board, &[0, 19]);
        assert_eq!(set.len(), 40);
        assert!(set.contains(&(5, 3)));
        assert!(set.contains(&(24, 22)));
    }
}
