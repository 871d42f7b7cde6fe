use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};

use crate::controller::CategoryStats;
use crate::status::{Connectivity, ExternalStatus};
use crate::util::truncate_to_width;

pub fn connectivity_span(connectivity: Connectivity) -> Span<'static> {
    match connectivity {
        Connectivity::Unknown => Span::styled("checking…", Style::default().fg(Color::Gray)),
        Connectivity::Connected => Span::styled("connected", Style::default().fg(Color::Green)),
        Connectivity::Lost => Span::styled(
            "unreachable",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    }
}

fn on_off(flag: bool, on: &'static str, off: &'static str) -> Span<'static> {
    if flag {
        Span::styled(on, Style::default().fg(Color::Green))
    } else {
        Span::styled(off, Style::default().add_modifier(Modifier::DIM))
    }
}

/// Pure presenter for one detection category row
pub fn present_category_row(name: &str, stats: &CategoryStats, latest_width: usize) -> Row<'static> {
    let count_color = if stats.count == 0 {
        Color::DarkGray
    } else {
        Color::Yellow
    };
    let latest = stats
        .latest
        .as_deref()
        .map(|text| truncate_to_width(text, latest_width))
        .unwrap_or_else(|| "-".to_string());

    Row::new(vec![
        Cell::from(name.to_string()).style(Style::default().fg(Color::Cyan)),
        Cell::from(stats.count.to_string()).style(Style::default().fg(count_color)),
        Cell::from(latest),
    ])
}

fn summary_lines(status: &ExternalStatus) -> Vec<Line<'static>> {
    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Backend  ", label),
            connectivity_span(status.connectivity),
        ]),
        Line::from(vec![
            Span::styled("Capture  ", label),
            on_off(status.capture_running, "running", "stopped"),
            Span::raw(
                status
                    .pid
                    .map(|pid| format!(" (pid {pid})"))
                    .unwrap_or_default(),
            ),
        ]),
        Line::from(vec![
            Span::styled("Voice    ", label),
            on_off(status.voice_output_enabled, "on", "off"),
        ]),
    ];
    if let Some(err) = &status.last_error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

/// Backend status box: connectivity, capture process and detection counts
pub fn render_backend_panel(status: &ExternalStatus, area: Rect, buf: &mut Buffer) {
    let block = Block::default().borders(Borders::ALL).title("Kitchen");
    let inner = block.inner(area);
    block.render(area, buf);

    let lines = summary_lines(status);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(lines.len() as u16), Constraint::Min(0)])
        .split(inner);

    Paragraph::new(lines).render(chunks[0], buf);

    if status.categories.is_empty() {
        return;
    }

    let latest_width = chunks[1].width.saturating_sub(20) as usize;
    let rows: Vec<Row> = status
        .categories
        .iter()
        .map(|(name, stats)| present_category_row(name, stats, latest_width))
        .collect();

    let header = Row::new(vec!["Seen", "#", "Latest"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(5),
            Constraint::Min(0),
        ],
    )
    .header(header);

    table.render(chunks[1], buf);
}
