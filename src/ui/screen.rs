use ratatui::Frame;

use crate::{
    app::{App, AppState},
    ui::progress::render_progress,
};

/// A UI Screen boundary: one per top-level app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Study screen - renders the current card through the App widget
pub struct StudyScreen;

impl Screen for StudyScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Progress screen - charts and streaks from the latest statistics snapshot
pub struct ProgressScreen;

impl Screen for ProgressScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_progress(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Study => Box::new(StudyScreen),
        AppState::Progress => Box::new(ProgressScreen),
    }
}
