pub mod backend_panel;
pub mod screen;
pub mod steps;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Widget, Wrap},
};

use crate::app::{App, AppState, NoticeLevel};
use crate::clock::TimeSource;
use crate::session::SessionStatus;
use crate::util::{format_clock, progress_ratio};
use backend_panel::render_backend_panel;
use steps::{active_caption, active_title, kind_style, present_queue_item, status_badge};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

impl<T: TimeSource + Clone> Widget for &App<T> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Summary => render_summary(self, area, buf),
            AppState::Session => render_session(self, area, buf),
            AppState::Talk => {
                render_session(self, area, buf);
                render_talk_box(self, area, buf);
            }
        }
    }
}

fn help_line<T: TimeSource + Clone>(app: &App<T>) -> &'static str {
    match (app.state, app.session.status()) {
        (AppState::Talk, _) => "enter send · esc cancel",
        (AppState::Summary, _) => "r cook again · q quit",
        (_, SessionStatus::Idle) => "space start · q quit",
        (_, SessionStatus::Running) => "space pause · e end · t talk · q quit",
        (_, SessionStatus::Paused) => "space resume · e end · t talk · q quit",
        (_, SessionStatus::Completed) => "q quit",
    }
}

fn render_session<T: TimeSource + Clone>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let next = app.session.next_action();
    let summary = app.session.summary();

    let notice_lines = app.notices.len() as u16;
    let reply_lines = if app.chef_reply.is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),            // header
            Constraint::Length(1),            // progress
            Constraint::Length(5),            // active step
            Constraint::Min(4),               // queue + backend
            Constraint::Length(reply_lines),  // chef reply
            Constraint::Length(notice_lines), // notices
            Constraint::Length(1),            // help
        ])
        .split(area);

    let shown = app.display.shown_secs();
    let header = Line::from(vec![
        status_badge(app.session.status()),
        Span::raw(" "),
        Span::styled(summary.dish_name.clone(), bold),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} / {}",
                format_clock(shown),
                format_clock(summary.total_seconds)
            ),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    Paragraph::new(header).render(chunks[0], buf);

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio(progress_ratio(shown, summary.total_seconds))
        .label(Span::styled(summary.id.clone(), dim))
        .render(chunks[1], buf);

    let active_block = Block::default()
        .borders(Borders::ALL)
        .title(active_title(next))
        .border_style(kind_style(next.active.kind));
    Paragraph::new(vec![
        Line::from(Span::styled(next.active.text.clone(), bold)),
        Line::from(Span::styled(active_caption(next), dim)),
    ])
    .block(active_block)
    .wrap(Wrap { trim: true })
    .render(chunks[2], buf);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[3]);

    let queue_width = body[0].width.saturating_sub(2) as usize;
    let items: Vec<ListItem> = if next.queue.is_empty() {
        vec![ListItem::new(Span::styled("nothing left to prep", dim))]
    } else {
        next.queue
            .iter()
            .map(|step| present_queue_item(step, next.now_seconds, queue_width))
            .collect()
    };
    List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Up next"))
        .render(body[0], buf);

    render_backend_panel(app.status.fields(), body[1], buf);

    if let Some(reply) = &app.chef_reply {
        Paragraph::new(reply.clone())
            .block(Block::default().borders(Borders::ALL).title("Chef"))
            .wrap(Wrap { trim: true })
            .render(chunks[4], buf);
    }

    let notices: Vec<Line> = app
        .notices
        .iter()
        .map(|notice| {
            let style = match notice.level {
                NoticeLevel::Info => Style::default().fg(Color::Yellow),
                NoticeLevel::Error => Style::default().fg(Color::Red),
            };
            Line::from(Span::styled(notice.text.clone(), style))
        })
        .collect();
    Paragraph::new(notices).render(chunks[5], buf);

    Paragraph::new(Span::styled(help_line(app), dim.add_modifier(Modifier::ITALIC)))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_talk_box<T: TimeSource + Clone>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let popup = centered(area, area.width.saturating_sub(8).max(20), 5);
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(vec![Span::raw("> "), Span::raw(app.draft.clone()), Span::raw("█")]),
        Line::from(Span::styled(
            help_line(app),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Ask the chef")
            .border_style(Style::default().fg(Color::Magenta)),
    )
    .wrap(Wrap { trim: false })
    .render(popup, buf);
}

fn render_summary<T: TimeSource + Clone>(app: &App<T>, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let summary = app.session.summary();
    let elapsed_secs = app.final_elapsed_ms.unwrap_or(0) / 1000;
    let done = app
        .session
        .steps()
        .iter()
        .filter(|step| step.has_started(elapsed_secs))
        .count();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(6),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let started = summary
        .started_at
        .map(|at| at.format("%H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    let lines = vec![
        Line::from(Span::styled(
            format!("{} is done", summary.dish_name),
            bold.fg(Color::Green),
        )),
        Line::from(""),
        Line::from(format!(
            "cooked for {} of {} planned",
            format_clock(elapsed_secs),
            format_clock(summary.total_seconds)
        )),
        Line::from(format!(
            "reached {done} of {} steps · started {started}",
            app.session.steps().len()
        )),
        Line::from(Span::styled(
            summary.id.clone(),
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        help_line(app),
        Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}
