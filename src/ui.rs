//! Layout and drawing: menu, playfield, ghost piece, preview slots, stats, pause, game over.

use crate::GameMode;
use crate::app::{ClearFlash, MenuTab, Outcome, QuitOption, Screen, View};
use crate::theme::Theme;
use grainfall::{GameOverReason, Grid, Piece, PixelColor};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Fine columns per terminal column.
const FINE_PER_COL: i32 = 2;
/// Fine rows per half-block (▀ gives two halves per terminal row).
const FINE_PER_HALF: i32 = 2;
const FINE_PER_ROW: i32 = FINE_PER_HALF * 2;

const SIDEBAR_WIDTH: u16 = 26;
const SLOT_WIDTH: u16 = 8;
const MINI_CELL_W: u16 = 2;

/// Duration of the elimination fade (TachyonFX).
const CLEAR_FADE_MS: u32 = 350;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Terminal cells (width, height) of the board interior.
fn board_cells(grid: &Grid) -> (u16, u16) {
    let (pw, ph) = grid.pixel_dims();
    let w = pw.div_ceil(FINE_PER_COL as usize);
    let h = ph.div_ceil(FINE_PER_ROW as usize);
    (w as u16, h as u16)
}

/// Playfield outer size including border.
fn playfield_size(grid: &Grid) -> (u16, u16) {
    let (w, h) = board_cells(grid);
    (w + 2, h + 2)
}

/// Board interior rect for a full-screen area; matches `draw_game` layout.
fn board_rect(area: Rect, grid: &Grid) -> Rect {
    let (pw, ph) = playfield_size(grid);
    let total_w = pw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(ph) / 2;
    let (bw, bh) = board_cells(grid);
    Rect {
        x: x + 1,
        y: y + 1,
        width: bw,
        height: bh,
    }
    .intersection(area)
}

/// Colour shown for one half-block: the first occupied fine cell, scanning bottom-up.
fn sample_half(grid: &Grid, fx: i32, fy: i32) -> Option<PixelColor> {
    (0..FINE_PER_HALF)
        .rev()
        .flat_map(|dy| (0..FINE_PER_COL).map(move |dx| (dx, dy)))
        .find_map(|(dx, dy)| grid.color_at(fx + dx, fy + dy))
}

fn blend(a: Color, b: Color, t: f32) -> Color {
    match (a, b) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let mix = |x: u8, y: u8| (f32::from(x) * (1.0 - t) + f32::from(y) * t) as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        _ => a,
    }
}

/// Buffer positions covered by eliminated fine cells.
fn flash_buffer_positions(board: Rect, cells: &[(i32, i32)]) -> HashSet<(u16, u16)> {
    cells
        .iter()
        .map(|&(x, y)| {
            (
                board.x + (x / FINE_PER_COL) as u16,
                board.y + (y / FINE_PER_ROW) as u16,
            )
        })
        .filter(|&(x, y)| board.contains(Position { x, y }))
        .collect()
}

/// Create or advance the elimination fade and render it over the board.
fn apply_clear_flash(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    flash: &mut ClearFlash,
    now: Instant,
) {
    let delta = flash
        .last_processed
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    flash.last_processed = Some(now);

    // Cleared cells are painted white every frame; the fade blends them toward the background.
    let positions = flash_buffer_positions(board, &flash.cells);
    let buf = frame.buffer_mut();
    for &(x, y) in &positions {
        buf[(x, y)]
            .set_symbol("█")
            .set_style(Style::default().fg(Color::White).bg(theme.bg));
    }

    if flash.effect.is_none() {
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(theme.bg, theme.bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw the current screen.
pub fn draw(frame: &mut Frame, view: &View, flash: &mut Option<ClearFlash>, now: Instant) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(view.theme.bg));
    match view.screen {
        Screen::Menu => draw_menu(frame, view, area, now),
        Screen::Playing => {
            draw_game(frame, view, area);
            if let Some(flash) = flash.as_mut() {
                let board = board_rect(area, view.session.grid());
                apply_clear_flash(frame, view.theme, board, flash, now);
            }
            if view.paused {
                draw_pause_overlay(frame, view.theme, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, view, area);
            if let Some(opt) = view.quit_selected {
                draw_quit_menu(frame, view.theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, view, area);
            draw_game_over(frame, view, area);
        }
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

fn draw_menu(frame: &mut Frame, view: &View, area: Rect, now: Instant) {
    let theme = view.theme;
    let menu = view.menu;
    let popup = centered(area, 48, 20);

    let title = Line::from(vec![
        Span::styled(" grain", bold().fg(theme.color(PixelColor::Yellow))),
        Span::styled("fall ", bold().fg(theme.main_fg)),
    ]);

    let highlight = bold().fg(Color::Black).bg(theme.color(PixelColor::Yellow));
    let selected = bold().fg(theme.color(PixelColor::Yellow));
    let normal = Style::default().fg(theme.main_fg);
    let option = |label: &'static str, tab: MenuTab, is_selected: bool| {
        let style = if menu.current_tab == tab && is_selected {
            highlight
        } else if is_selected {
            selected
        } else {
            normal
        };
        Span::styled(label, style)
    };

    let mode_line = Line::from(vec![
        option(" ENDLESS ", MenuTab::Mode, menu.selected_mode == GameMode::Endless),
        Span::from("  "),
        option(" DAILY ", MenuTab::Mode, menu.selected_mode == GameMode::Daily),
    ]);
    let difficulty_line = Line::from(vec![
        option(" EASY ", MenuTab::Difficulty, menu.selected_difficulty == crate::Difficulty::Easy),
        Span::from("  "),
        option(
            " NORMAL ",
            MenuTab::Difficulty,
            menu.selected_difficulty == crate::Difficulty::Normal,
        ),
        Span::from("  "),
        option(" HARD ", MenuTab::Difficulty, menu.selected_difficulty == crate::Difficulty::Hard),
    ]);
    let start = if menu.current_tab == MenuTab::Start {
        Span::styled(" [ START ] ", highlight)
    } else {
        Span::styled(" [ START ] ", normal)
    };
    let hint = if menu.selected_mode == GameMode::Daily {
        " Same layout and pieces for everyone today "
    } else {
        " Play until nothing fits "
    };

    let key = Style::default().fg(theme.color(PixelColor::Blue));
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(" ─ MODE ─ ", Style::default().fg(theme.div_line))),
        mode_line,
        Line::from(Span::styled(hint, Style::default().fg(theme.inactive_fg))),
        Line::from(""),
        Line::from(Span::styled(" ─ DAILY DIFFICULTY ─ ", Style::default().fg(theme.div_line))),
        difficulty_line,
        Line::from(""),
        Line::from(Span::styled(
            format!(" Best endless score: {} ", view.best_endless),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(start),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", key),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", key),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", key),
            Span::from("START"),
        ]),
        Line::from(""),
        Line::from(Span::styled(" [Q] QUIT ", Style::default().fg(theme.color(PixelColor::Red)))),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Slide in from below, ease-out cubic.
    let elapsed = now.saturating_duration_since(menu.animation_start).as_millis() as f32;
    let t = (elapsed / 500.0).min(1.0);
    let offset = ((1.0 - t).powi(3) * 10.0) as u16;
    let mut animated = popup;
    animated.y = (animated.y + offset).min(area.bottom().saturating_sub(animated.height));
    p.render(animated, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    Clear.render(popup, frame.buffer_mut());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn stars_line(stars: u8) -> String {
    (1..=3).map(|i| if i <= stars { '★' } else { '☆' }).collect()
}

fn format_time(d: Duration) -> String {
    let s = d.as_secs();
    format!("{:02}:{:02}", s / 60, s % 60)
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let popup = centered(area, 34, 12);
    Clear.render(popup, frame.buffer_mut());
    let (title, title_style) = match view.outcome {
        Some(Outcome::Cleared { .. }) => (
            " Cleared! ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ),
        Some(Outcome::Lost(GameOverReason::OutOfSteps)) => {
            (" Out of steps ", Style::default().fg(Color::White).bg(Color::Red))
        }
        _ => (" No room left ", Style::default().fg(Color::White).bg(Color::Red)),
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
    ];
    if let Some(Outcome::Cleared { stars }) = view.outcome {
        lines.push(Line::from(Span::styled(
            stars_line(stars),
            bold().fg(theme.color(PixelColor::Yellow)),
        )));
    }
    lines.push(Line::from(Span::styled(format!(" Score: {} ", session.score()), fg)));
    lines.push(Line::from(Span::styled(format!(" Steps: {} ", session.steps()), fg)));
    lines.push(Line::from(Span::styled(format!(" Time: {} ", format_time(view.play_time)), fg)));
    if view.new_record {
        lines.push(Line::from(Span::styled(" New record! ", bold().fg(Color::Yellow))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" R: Retry  Enter: Menu  Q: Quit ", fg)));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" grainfall ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: playfield + sidebar, centred.
fn draw_game(frame: &mut Frame, view: &View, area: Rect) {
    let (pw, ph) = playfield_size(view.session.grid());
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
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

    draw_playfield(frame, view, inner[0]);
    draw_sidebar(frame, view, inner[1]);
}

fn draw_playfield(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let grid = session.grid();

    let title = match session.challenge() {
        Some(c) => format!(" Daily {} · {} ", c.date, c.tier.name()),
        None => " Endless ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let (bw, bh) = board_cells(grid);
    let board = Rect {
        x: inner.x,
        y: inner.y,
        width: bw.min(inner.width),
        height: bh.min(inner.height),
    };

    // Ghost of the selected piece at the cursor, only while the player can act.
    let ghost = (view.screen == Screen::Playing && !session.is_finished())
        .then(|| session.previews().get_slot(view.slot))
        .flatten()
        .map(|piece| {
            let (cx, cy) = view.cursor;
            let cells: HashSet<(i32, i32)> = piece.cells_at(cx, cy).into_iter().collect();
            let color = if session.can_place(piece, cx, cy) {
                blend(theme.color(piece.color), theme.bg, 0.55)
            } else {
                blend(Color::Rgb(0xFF, 0x40, 0x40), theme.bg, 0.6)
            };
            (cells, color)
        });

    let ratio = grid.ratio() as i32;
    let half_color = |fx: i32, fy: i32| -> Color {
        if let Some(c) = sample_half(grid, fx, fy) {
            return theme.color(c);
        }
        match &ghost {
            Some((cells, color)) if cells.contains(&(fx / ratio, fy / ratio)) => *color,
            _ => theme.bg,
        }
    };

    let buf = frame.buffer_mut();
    for ty in 0..board.height {
        for tx in 0..board.width {
            let fx = i32::from(tx) * FINE_PER_COL;
            let fy = i32::from(ty) * FINE_PER_ROW;
            let top = half_color(fx, fy);
            let bottom = half_color(fx, fy + FINE_PER_HALF);
            buf[(board.x + tx, board.y + ty)]
                .set_symbol("▀")
                .set_style(Style::default().fg(top).bg(bottom));
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let session = view.session;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8), // Pieces (border + title + previews + slot labels)
            Constraint::Length(1),
            Constraint::Length(4), // Colours
            Constraint::Length(1),
            Constraint::Length(7), // Stats
            Constraint::Length(1),
            Constraint::Length(3), // Message
        ])
        .split(area);

    // --- Pieces ---
    let pieces_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let pieces_inner = pieces_block.inner(chunks[0]);
    pieces_block.render(chunks[0], frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(4), Constraint::Length(1)])
        .split(pieces_inner);
    Paragraph::new(Line::from(Span::styled("Pieces", title_style)))
        .render(rows[0], frame.buffer_mut());
    let mut labels = Vec::new();
    for (i, piece) in session.previews().iter().enumerate() {
        let slot_area = Rect {
            x: rows[1].x + i as u16 * SLOT_WIDTH,
            y: rows[1].y,
            width: SLOT_WIDTH,
            height: rows[1].height,
        }
        .intersection(rows[1]);
        if let Some(piece) = piece {
            draw_piece_preview(frame, theme, slot_area, piece);
        }
        let style = if i == view.slot {
            bold().fg(Color::Black).bg(theme.title)
        } else {
            Style::default().fg(theme.inactive_fg)
        };
        labels.push(Span::styled(format!("{:^w$}", i + 1, w = SLOT_WIDTH as usize), style));
    }
    Paragraph::new(Line::from(labels)).render(rows[2], frame.buffer_mut());

    // --- Colours in play ---
    let colours_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let colours_inner = colours_block.inner(chunks[2]);
    colours_block.render(chunks[2], frame.buffer_mut());
    let colour_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(colours_inner);
    Paragraph::new(Line::from(Span::styled("Colours", title_style)))
        .render(colour_rows[0], frame.buffer_mut());
    draw_colour_strip(frame, theme, colour_rows[1], session.previews().source().colors());

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[4]);
    stats_block.render(chunks[4], frame.buffer_mut());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let mut stats = vec![stat("Score: ", session.score().to_string())];
    match (session.steps_left(), session.max_steps()) {
        (Some(left), Some(max)) => {
            stats.push(stat("Steps: ", format!("{} / {max} ({left} left)", session.steps())));
            stats.push(stat("Grains: ", session.layout_remaining().to_string()));
        }
        _ => {
            stats.push(stat("Best: ", view.best_endless.max(session.score()).to_string()));
            stats.push(stat("Blocks: ", session.steps().to_string()));
        }
    }
    let chain = session.chain_level();
    stats.push(if chain > 1 {
        Line::from(Span::styled(
            format!("Chain x{chain}"),
            bold().fg(theme.color(PixelColor::Magenta)),
        ))
    } else {
        stat("Chain: ", "-".to_string())
    });
    stats.push(stat("Time: ", format_time(view.play_time)));
    Paragraph::new(ratatui::text::Text::from(stats)).render(stats_inner, frame.buffer_mut());

    // --- Message ---
    if let Some(msg) = view.message {
        Paragraph::new(Line::from(Span::styled(
            format!(" {msg}"),
            Style::default().fg(theme.color(PixelColor::Red)),
        )))
        .render(chunks[6], frame.buffer_mut());
    }
}

/// Draw a piece (current rotation) centred in `area`.
fn draw_piece_preview(frame: &mut Frame, theme: &Theme, area: Rect, piece: &Piece) {
    let color = theme.color(piece.color);
    let (w, h) = piece.extent();
    let off_x = area.width.saturating_sub(w as u16 * MINI_CELL_W) / 2;
    let off_y = area.height.saturating_sub(h as u16) / 2;
    for &(dx, dy) in piece.cells() {
        let r = Rect {
            x: area.x + off_x + dx as u16 * MINI_CELL_W,
            y: area.y + off_y + dy as u16,
            width: MINI_CELL_W,
            height: 1,
        }
        .intersection(area);
        Paragraph::new("██")
            .style(Style::default().fg(color).bg(color))
            .render(r, frame.buffer_mut());
    }
}

/// One block per colour the piece source can deal.
fn draw_colour_strip(frame: &mut Frame, theme: &Theme, area: Rect, colors: &[PixelColor]) {
    let block_w = (area.width / 6).max(1);
    for (i, &c) in colors.iter().enumerate() {
        let r = Rect {
            x: area.x + i as u16 * block_w,
            y: area.y,
            width: block_w.saturating_sub(1).max(1),
            height: area.height.min(1),
        }
        .intersection(area);
        let color = theme.color(c);
        Paragraph::new("█".repeat(r.width as usize))
            .style(Style::default().fg(color).bg(theme.bg))
            .render(r, frame.buffer_mut());
    }
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let quit_rect = centered(frame.area(), 24, 8);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    Clear.render(quit_rect, frame.buffer_mut());
    frame
        .buffer_mut()
        .set_style(quit_rect, Style::default().bg(theme.bg));
    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];
    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            bold().fg(theme.bg).bg(theme.title)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + inner.width.saturating_sub(label.len() as u16) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.bottom() {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
