use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::ListItem,
};

use crate::session::SessionStatus;
use crate::step::{Step, StepKind};
use crate::timeline::NextAction;
use crate::util::{format_clock, format_countdown, truncate_to_width};

pub fn kind_style(kind: StepKind) -> Style {
    match kind {
        StepKind::Instruction => Style::default().fg(Color::Cyan),
        StepKind::Progress => Style::default().fg(Color::Yellow),
        StepKind::End => Style::default().fg(Color::Green),
    }
}

pub fn status_badge(status: SessionStatus) -> Span<'static> {
    let (label, color) = match status {
        SessionStatus::Idle => (" READY ", Color::Gray),
        SessionStatus::Running => (" COOKING ", Color::Green),
        SessionStatus::Paused => (" PAUSED ", Color::Yellow),
        SessionStatus::Completed => (" DONE ", Color::Magenta),
    };
    Span::styled(
        label,
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD),
    )
}

/// Title for the focal step panel
pub fn active_title(next: &NextAction) -> &'static str {
    if next.is_complete() {
        "Finished"
    } else if next.is_pending() {
        "Up first"
    } else {
        "Now"
    }
}

/// One-line description under the active step: kind, category and timing
pub fn active_caption(next: &NextAction) -> String {
    if next.is_complete() {
        return "every step is done".to_string();
    }
    let step = &next.active;
    let mut parts = vec![step.kind.to_string()];
    if let Some(category) = &step.category {
        parts.push(category.clone());
    }
    match next.countdown() {
        Some(secs) if next.is_pending() => parts.push(format!("starts in {}", format_countdown(secs))),
        Some(secs) => parts.push(format!("{} left", format_clock(secs))),
        None => {}
    }
    parts.join(" · ")
}

/// Presenter for one up-next entry
pub fn present_queue_item(step: &Step, now: u64, max_width: usize) -> ListItem<'static> {
    let when = format!(
        "{:>7} ",
        format_countdown(step.start_offset.saturating_sub(now))
    );
    let label = step
        .category
        .as_ref()
        .map(|c| format!("[{c}] "))
        .unwrap_or_default();
    let budget = max_width.saturating_sub(when.chars().count() + label.chars().count());

    ListItem::new(Line::from(vec![
        Span::styled(when, Style::default().add_modifier(Modifier::DIM)),
        Span::styled(label, kind_style(step.kind)),
        Span::raw(truncate_to_width(&step.text, budget)),
    ]))
}
