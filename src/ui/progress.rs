use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::{
    app::App,
    stats::StatisticsSnapshot,
    ui::{charting, status_color},
    util::percent,
    word::WordStatus,
};

/// Pure presenter for one line of the status summary table
pub fn present_summary_row(status: WordStatus, count: usize, total: usize) -> Row<'static> {
    Row::new(vec![
        Cell::from(status.label()).style(Style::default().fg(status_color(status))),
        Cell::from(count.to_string()),
        Cell::from(format!("{}%", percent(count, total))),
    ])
}

pub fn streak_line(snapshot: &StatisticsSnapshot) -> String {
    let days = |n: u32| if n == 1 { "day" } else { "days" };
    format!(
        "streak {} {}   best {} {}   {} per day",
        snapshot.current_streak,
        days(snapshot.current_streak),
        snapshot.best_streak,
        days(snapshot.best_streak),
        charting::format_label((snapshot.average_per_day * 100.0).round() / 100.0),
    )
}

pub fn render_progress(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // streaks
            Constraint::Min(8),    // chart
            Constraint::Length(1), // chart legend
            Constraint::Length(7), // summary table
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(snapshot) = app.stats.as_ref() else {
        let text = if app.stats_pending() {
            "computing statistics..."
        } else {
            "no statistics yet, press (r) to compute"
        };
        f.render_widget(
            Paragraph::new(text).alignment(Alignment::Center),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new(Span::styled("(tab) study / (r)efresh / (esc)ape", italic_style)),
            chunks[5],
        );
        return;
    };

    let title = Paragraph::new(Span::styled(
        format!(
            "progress {} to {}",
            snapshot.window.start.format("%b %d"),
            snapshot.window.end.format("%b %d")
        ),
        bold_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    f.render_widget(
        Paragraph::new(streak_line(snapshot)).alignment(Alignment::Center),
        chunks[1],
    );

    let width = charting::bar_width(
        chunks[2].width.saturating_sub(2),
        snapshot.daily.len(),
        WordStatus::TRACKED.len(),
    );
    let mut chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("words per day"))
        .bar_width(width)
        .bar_gap(0)
        .group_gap(1)
        .max(charting::compute_bar_max(&snapshot.daily));
    for day in &snapshot.daily {
        let bars: Vec<Bar> = WordStatus::TRACKED
            .iter()
            .map(|status| {
                Bar::default()
                    .value(u64::from(day.get(*status)))
                    .text_value(String::new())
                    .style(Style::default().fg(status_color(*status)))
            })
            .collect();
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(charting::day_label(day.date)))
                .bars(&bars),
        );
    }
    f.render_widget(chart, chunks[2]);

    let legend: Vec<Span> = WordStatus::TRACKED
        .iter()
        .map(|status| {
            Span::styled(
                format!("■ {}  ", status.label()),
                Style::default().fg(status_color(*status)),
            )
        })
        .collect();
    f.render_widget(
        Paragraph::new(Line::from(legend)).alignment(Alignment::Center),
        chunks[3],
    );

    let total: usize = snapshot.summary.values().sum();
    let rows: Vec<Row> = WordStatus::ALL
        .iter()
        .map(|status| {
            let count = snapshot.summary.get(status).copied().unwrap_or(0);
            present_summary_row(*status, count, total)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(6),
        ],
    )
    .header(Row::new(vec!["status", "words", "share"]).style(bold_style))
    .block(Block::default().borders(Borders::NONE));
    f.render_widget(table, chunks[4]);

    f.render_widget(
        Paragraph::new(Span::styled("(tab) study / (r)efresh / (esc)ape", italic_style)),
        chunks[5],
    );
}
