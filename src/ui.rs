pub mod charting;
pub mod history;
pub mod screen;

use std::time::Instant;

use itertools::Itertools;
use nback::{
    session::{Feedback, SessionPhase},
    stimulus::{Modality, VisualCoordinate},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::{App, AppState, SettingsField};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const CELL_WIDTH: u16 = 9;
const CELL_HEIGHT: u16 = 4;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Game => render_game(self, area, buf, Instant::now()),
            AppState::Results => render_results(self, area, buf),
            AppState::Settings => render_settings(self, area, buf),
            // drawn through the frame by ui::history
            AppState::History => {}
        }
    }
}

fn render_game(app: &App, area: Rect, buf: &mut Buffer, now: Instant) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let session = app.engine.session();
    let presenter = app.engine.presenter();
    let level = session.level();
    let grid_size = level.grid.size as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(grid_size * CELL_HEIGHT),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let status = match session.phase() {
        SessionPhase::Running => format!(
            "{}-back   {} / {}",
            level.n_back,
            session.ticks_presented(),
            session.sequences().len()
        ),
        _ => format!(
            "{}-back   {} attempts   press (space) to start",
            level.n_back, level.attempt_count
        ),
    };
    Paragraph::new(Span::styled(status, bold_style))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let grid_width = grid_size * CELL_WIDTH;
    let grid_area = centered(chunks[2], grid_width);
    render_grid(app, grid_area, buf, presenter.lit_cell(now));

    let letter = presenter
        .letter(now)
        .map(|k| k.as_str().to_uppercase())
        .unwrap_or_default();
    Paragraph::new(Span::styled(
        letter,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::NONE))
    .render(chunks[3], buf);

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(centered(chunks[4], grid_width.max(40)));
    for (chunk, modality) in buttons.iter().zip(Modality::ALL) {
        let feedback = presenter.feedback(modality, now);
        let label = match modality {
            Modality::Visual => "(a) position",
            Modality::Audio => "(l) sound",
        };
        Paragraph::new(Span::styled(label, feedback_style(feedback)))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(*chunk, buf);
    }

    let legend = if session.is_running() {
        "(space) stop / (a) position / (l) sound / (esc) abort"
    } else {
        "(space) start / (h)istory / (s)ettings / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[6], buf);
}

fn render_grid(app: &App, area: Rect, buf: &mut Buffer, lit: Option<VisualCoordinate>) {
    let grid = app.engine.session().level().grid;
    let size = grid.size as u32;
    let running = app.engine.session().is_running();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints((0..size).map(|_| Constraint::Ratio(1, size)))
        .split(area);

    for (y, row) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints((0..size).map(|_| Constraint::Ratio(1, size)))
            .split(*row);
        for (x, cell_area) in cols.iter().enumerate() {
            let coordinate = VisualCoordinate::new(x as u8, y as u8);
            let block = Block::default().borders(Borders::ALL);
            if coordinate == grid.center() {
                let symbol = if running { "■" } else { "▶" };
                Paragraph::new(Span::styled(
                    symbol,
                    Style::default().add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center)
                .block(block.border_style(Style::default().add_modifier(Modifier::DIM)))
                .render(*cell_area, buf);
            } else if lit == Some(coordinate) {
                block
                    .style(Style::default().bg(Color::Blue))
                    .render(*cell_area, buf);
            } else {
                block.render(*cell_area, buf);
            }
        }
    }
}

fn feedback_style(feedback: Option<Feedback>) -> Style {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    match feedback {
        Some(f) if f.correct => bold_style.fg(Color::Green),
        Some(_) => bold_style.fg(Color::Red),
        None => bold_style,
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let Some(score) = app.engine.last_score() else {
        return;
    };

    Paragraph::new(Span::styled(format!("{}-back", score.n_back), bold_style))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Line::from(vec![
        Span::raw("position "),
        Span::styled(score.visual.to_string(), score_style(score.visual.percent())),
        Span::raw("   sound "),
        Span::styled(score.audio.to_string(), score_style(score.audio.percent())),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    if let Some(level) = app.engine.history().level(score.n_back) {
        let summary = match (level.visual_mean(), level.audio_mean()) {
            (Some(v), Some(a)) => format!(
                "average over {} sessions: position {:.0}%, sound {:.0}%",
                level.len(),
                v,
                a
            ),
            _ => String::new(),
        };
        Paragraph::new(Span::styled(
            summary,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);
    }

    Paragraph::new(Span::styled(
        "(space) play again / (h)istory / (s)ettings / (esc)ape",
        italic_style,
    ))
    .render(chunks[5], buf);
}

pub(crate) fn score_style(percent: u8) -> Style {
    let color = if percent >= 80 {
        Color::Green
    } else if percent >= 50 {
        Color::Yellow
    } else {
        Color::Red
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn render_settings(app: &App, area: Rect, buf: &mut Buffer) {
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let lines = SettingsField::ALL
        .iter()
        .map(|field| {
            let value = match field {
                SettingsField::NBack => format!("{}-back", app.draft.n_back()),
                SettingsField::Attempts => app.draft.attempt_count().to_string(),
                SettingsField::Feedback => String::from(if app.draft.immediate_feedback() {
                    "ON"
                } else {
                    "OFF"
                }),
            };
            let name = match field {
                SettingsField::NBack => "level",
                SettingsField::Attempts => "attempts",
                SettingsField::Feedback => "feedback",
            };
            let style = if *field == app.settings_cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!("{name:<10} < {value:^8} >"), style))
        })
        .collect_vec();

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Settings"))
        .render(centered(chunks[0], 36), buf);

    let keys = ["(↑/↓) select", "(←/→) change", "(enter) save"].iter().join(" / ");
    Paragraph::new(Span::styled(keys, italic_style)).render(chunks[1], buf);
}

/// Horizontally center a column of `width` inside `area`
fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}
