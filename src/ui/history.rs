use itertools::Itertools;
use nback::history::LevelHistory;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};

use crate::{
    ui::{
        charting::{compute_chart_params, format_label, score_points, MIN_SESSIONS_FOR_CHART},
        score_style,
    },
    App,
};

/// Pure presenter for one row of the per-level summary table
pub fn present_row(n_back: usize, level: &LevelHistory, selected: bool) -> Row<'static> {
    let mean = |m: Option<f64>| match m {
        Some(v) => Cell::from(format!("{v:.0}%")).style(score_style(v.round() as u8)),
        None => Cell::from("—"),
    };

    let recent = level
        .visual
        .iter()
        .zip(&level.audio)
        .rev()
        .take(5)
        .map(|(v, a)| format!("{}/{}", v.percent(), a.percent()))
        .join("  ");

    let level_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    Row::new(vec![
        Cell::from(format!("{n_back}-back")).style(level_style),
        Cell::from(level.len().to_string()),
        mean(level.visual_mean()),
        mean(level.audio_mean()),
        Cell::from(recent),
    ])
}

/// Render the score history screen: trend chart for one level plus a summary of all levels
pub fn render_history(app: &App, f: &mut Frame) {
    let area = f.area();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),  // Title
            Constraint::Min(8),     // Chart
            Constraint::Length(13), // Level table
            Constraint::Length(1),  // Instructions
        ])
        .split(area);

    let title = Paragraph::new(format!("{}-back", app.history_level))
        .block(Block::default().borders(Borders::ALL).title("History"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let history = app.engine.history();
    match history.level(app.history_level) {
        Some(level) if level.len() >= MIN_SESSIONS_FOR_CHART => {
            let visual = score_points(&level.visual);
            let audio = score_points(&level.audio);
            let (last_session, top) = compute_chart_params(&[&visual, &audio]);

            let datasets = vec![
                Dataset::default()
                    .name("position")
                    .marker(Marker::Braille)
                    .style(Style::default().fg(Color::Blue))
                    .graph_type(GraphType::Line)
                    .data(&visual),
                Dataset::default()
                    .name("sound")
                    .marker(Marker::Braille)
                    .style(Style::default().fg(Color::Magenta))
                    .graph_type(GraphType::Line)
                    .data(&audio),
            ];

            let chart = Chart::new(datasets)
                .x_axis(
                    Axis::default()
                        .title("session")
                        .bounds([1.0, last_session])
                        .labels(vec![
                            Span::styled("1", bold_style),
                            Span::styled(format_label(last_session), bold_style),
                        ]),
                )
                .y_axis(
                    Axis::default()
                        .title("%")
                        .bounds([0.0, top])
                        .labels(vec![
                            Span::styled("0", bold_style),
                            Span::styled("50", bold_style),
                            Span::styled(format_label(top), bold_style),
                        ]),
                );
            f.render_widget(chart, chunks[1]);
        }
        _ => {
            let no_data = Paragraph::new(format!(
                "Not enough data yet. Play at least {MIN_SESSIONS_FOR_CHART} sessions at this level."
            ))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
            f.render_widget(no_data, chunks[1]);
        }
    }

    let header = Row::new(vec![
        Cell::from("Level"),
        Cell::from("Sessions"),
        Cell::from("Position"),
        Cell::from("Sound"),
        Cell::from("Recent (position/sound)"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows = history
        .levels()
        .map(|(n_back, level)| present_row(n_back, level, n_back == app.history_level))
        .collect_vec();

    let widths = [
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Levels"))
        .column_spacing(2);
    f.render_widget(table, chunks[2]);

    let instructions = Paragraph::new("(←/→) level  (b/esc) back")
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[3]);
}
