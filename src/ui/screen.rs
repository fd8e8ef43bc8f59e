use ratatui::Frame;

use crate::{ui::history::render_history, App, AppState};

/// A UI screen boundary: renders one application state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Game screen - grid, letter and signal buttons via the App widget
pub struct GameScreen;

impl Screen for GameScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Results screen - last session's score via the App widget
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

pub struct SettingsScreen;

impl Screen for SettingsScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// History screen - uses dedicated renderer
pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Game => Box::new(GameScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::Settings => Box::new(SettingsScreen),
        AppState::History => Box::new(HistoryScreen),
    }
}
