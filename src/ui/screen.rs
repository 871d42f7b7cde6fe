use ratatui::Frame;

use crate::app::{App, AppState};
use crate::clock::TimeSource;

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen<T: TimeSource + Clone> {
    fn render(&self, app: &App<T>, f: &mut Frame);
}

/// Live timeline view
pub struct SessionScreen;

impl<T: TimeSource + Clone> Screen<T> for SessionScreen {
    fn render(&self, app: &App<T>, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Timeline view with the chef prompt on top
pub struct TalkScreen;

impl<T: TimeSource + Clone> Screen<T> for TalkScreen {
    fn render(&self, app: &App<T>, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// End-of-session recap
pub struct SummaryScreen;

impl<T: TimeSource + Clone> Screen<T> for SummaryScreen {
    fn render(&self, app: &App<T>, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen<T: TimeSource + Clone + 'static>(state: AppState) -> Box<dyn Screen<T>> {
    match state {
        AppState::Session => Box::new(SessionScreen),
        AppState::Talk => Box::new(TalkScreen),
        AppState::Summary => Box::new(SummaryScreen),
    }
}
