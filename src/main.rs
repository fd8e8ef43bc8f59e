pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use nback::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, N_BACK_RANGE},
    engine::{GameEngine, Presenter},
    error::EngineError,
    history::{export_csv, HistoryStore, MemoryHistoryStore, SqliteHistoryStore},
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    session::{Feedback, SessionOutcome},
    stimulus::{AudioKey, Modality, VisualCoordinate},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

/// Redraw cadence while nothing else is due
const UI_REFRESH_MS: u64 = 50;
/// How long a grid cell and its letter stay lit after being presented
const STIMULUS_VISIBLE_MS: u64 = 1000;
const FEEDBACK_VISIBLE_MS: u64 = 600;

/// dual n-back working memory trainer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A dual n-back trainer: every few seconds a grid cell lights up and a letter is shown. Signal when either matches the one from N steps earlier. Scores are kept per level."
)]
pub struct Cli {
    /// how many steps back stimuli are compared (2-10)
    #[clap(short = 'n', long, value_parser = clap::value_parser!(u8).range(2..=10))]
    n_back: Option<u8>,

    /// number of scored attempts per session (20-40)
    #[clap(short = 'a', long, value_parser = clap::value_parser!(u8).range(20..=40))]
    attempts: Option<u8>,

    /// disable right/wrong feedback while playing
    #[clap(long)]
    no_feedback: bool,

    /// milliseconds between stimuli
    #[clap(short = 'i', long, value_parser = clap::value_parser!(u64).range(500..))]
    interval_ms: Option<u64>,

    /// score history database (default: ~/.local/state/nback/history.db)
    #[clap(long)]
    history_db: Option<PathBuf>,

    /// write the score history as CSV to this path and exit
    #[clap(long)]
    export_csv: Option<PathBuf>,
}

impl Cli {
    /// Overlay command line settings on the stored configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(n) = self.n_back {
            config.set_n_back(n as usize);
        }
        if let Some(a) = self.attempts {
            config.set_attempt_count(a as usize);
        }
        if self.no_feedback {
            config.set_immediate_feedback(false);
        }
        if let Some(ms) = self.interval_ms {
            if !config.set_tick_interval_ms(ms) {
                tracing::warn!(
                    interval_ms = ms,
                    auto_fill_lead_ms = config.auto_fill_lead_ms(),
                    "interval must exceed the auto-fill lead, keeping {}ms",
                    config.tick_interval_ms()
                );
            }
        }
    }
}

/// Keeps what the engine presented, timestamped so the UI can fade it out
#[derive(Debug, Default)]
pub struct TuiPresenter {
    cell: Option<(VisualCoordinate, Instant)>,
    letter: Option<(AudioKey, Instant)>,
    visual_feedback: Option<(Feedback, Instant)>,
    audio_feedback: Option<(Feedback, Instant)>,
}

impl TuiPresenter {
    pub fn lit_cell(&self, now: Instant) -> Option<VisualCoordinate> {
        self.cell
            .filter(|(_, at)| now.duration_since(*at) < Duration::from_millis(STIMULUS_VISIBLE_MS))
            .map(|(c, _)| c)
    }

    pub fn letter(&self, now: Instant) -> Option<&AudioKey> {
        self.letter
            .as_ref()
            .filter(|(_, at)| now.duration_since(*at) < Duration::from_millis(STIMULUS_VISIBLE_MS))
            .map(|(k, _)| k)
    }

    pub fn feedback(&self, modality: Modality, now: Instant) -> Option<Feedback> {
        let slot = match modality {
            Modality::Visual => self.visual_feedback,
            Modality::Audio => self.audio_feedback,
        };
        slot.filter(|(_, at)| now.duration_since(*at) < Duration::from_millis(FEEDBACK_VISIBLE_MS))
            .map(|(f, _)| f)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Presenter for TuiPresenter {
    fn emit_visual(&mut self, coordinate: VisualCoordinate) {
        self.cell = Some((coordinate, Instant::now()));
    }

    fn emit_audio(&mut self, key: &AudioKey) {
        self.letter = Some((key.clone(), Instant::now()));
    }

    fn feedback(&mut self, feedback: Feedback) {
        let slot = Some((feedback, Instant::now()));
        match feedback.modality {
            Modality::Visual => self.visual_feedback = slot,
            Modality::Audio => self.audio_feedback = slot,
        }
    }

    fn session_finished(&mut self, _outcome: &SessionOutcome) {
        self.cell = None;
        self.letter = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Game,
    Results,
    History,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsField {
    NBack,
    Attempts,
    Feedback,
}

impl SettingsField {
    pub const ALL: [SettingsField; 3] = [
        SettingsField::NBack,
        SettingsField::Attempts,
        SettingsField::Feedback,
    ];

    fn next(self) -> Self {
        match self {
            SettingsField::NBack => SettingsField::Attempts,
            SettingsField::Attempts => SettingsField::Feedback,
            SettingsField::Feedback => SettingsField::NBack,
        }
    }

    fn prev(self) -> Self {
        match self {
            SettingsField::NBack => SettingsField::Feedback,
            SettingsField::Attempts => SettingsField::NBack,
            SettingsField::Feedback => SettingsField::Attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub engine: GameEngine<TuiPresenter>,
    pub state: AppState,
    pub history_level: usize,
    pub settings_cursor: SettingsField,
    pub draft: Config,
    config_store: Box<dyn ConfigStore>,
}

impl App {
    pub fn new(engine: GameEngine<TuiPresenter>, config_store: Box<dyn ConfigStore>) -> Self {
        let draft = engine.config().clone();
        let history_level = engine.config().n_back();
        Self {
            engine,
            state: AppState::Game,
            history_level,
            settings_cursor: SettingsField::NBack,
            draft,
            config_store,
        }
    }

    /// Fire engine timers that are due
    pub fn on_tick(&mut self, now: Instant) -> Result<(), EngineError> {
        if self.engine.advance(now)?.is_some() {
            self.state = AppState::Results;
        }
        Ok(())
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Result<Flow, EngineError> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Flow::Quit);
        }

        match self.state {
            AppState::Game => return self.on_game_key(key, now),
            AppState::Results => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(Flow::Quit),
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Char('s') => self.open_settings(),
                KeyCode::Char(' ') => {
                    self.state = AppState::Game;
                    self.engine.start(now);
                }
                _ => self.state = AppState::Game,
            },
            AppState::History => match key.code {
                KeyCode::Left => {
                    if self.history_level > *N_BACK_RANGE.start() {
                        self.history_level -= 1;
                    }
                }
                KeyCode::Right => {
                    if self.history_level < *N_BACK_RANGE.end() {
                        self.history_level += 1;
                    }
                }
                KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('h') | KeyCode::Backspace => {
                    self.state = AppState::Game
                }
                _ => {}
            },
            AppState::Settings => match key.code {
                KeyCode::Up => self.settings_cursor = self.settings_cursor.prev(),
                KeyCode::Down => self.settings_cursor = self.settings_cursor.next(),
                KeyCode::Left => self.adjust_setting(-1),
                KeyCode::Right | KeyCode::Char(' ') => self.adjust_setting(1),
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char('s') => self.apply_settings()?,
                _ => {}
            },
        }
        Ok(Flow::Continue)
    }

    fn on_game_key(&mut self, key: KeyEvent, now: Instant) -> Result<Flow, EngineError> {
        match key.code {
            KeyCode::Char(' ') => {
                if !self.engine.toggle(now)? {
                    tracing::debug!("toggle ignored in phase {}", self.engine.phase());
                }
                if !self.engine.session().is_running() {
                    self.engine.presenter_mut().clear();
                }
            }
            KeyCode::Char('a') | KeyCode::Left => {
                self.engine.user_signal(Modality::Visual);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.engine.user_signal(Modality::Audio);
            }
            KeyCode::Char('h') if !self.engine.session().is_running() => self.open_history(),
            KeyCode::Char('s') if !self.engine.session().is_running() => self.open_settings(),
            KeyCode::Esc | KeyCode::Char('q') => {
                if !self.engine.session().is_running() {
                    return Ok(Flow::Quit);
                }
                self.engine.stop()?;
                self.engine.presenter_mut().clear();
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn open_history(&mut self) {
        self.history_level = self.engine.config().n_back();
        self.state = AppState::History;
    }

    fn open_settings(&mut self) {
        self.draft = self.engine.config().clone();
        self.settings_cursor = SettingsField::NBack;
        self.state = AppState::Settings;
    }

    fn adjust_setting(&mut self, delta: i64) {
        match self.settings_cursor {
            SettingsField::NBack => {
                let n = self.draft.n_back() as i64 + delta;
                if n > 0 {
                    self.draft.set_n_back(n as usize);
                }
            }
            SettingsField::Attempts => {
                let a = self.draft.attempt_count() as i64 + 5 * delta;
                if a > 0 {
                    self.draft.set_attempt_count(a as usize);
                }
            }
            SettingsField::Feedback => {
                let enabled = self.draft.immediate_feedback();
                self.draft.set_immediate_feedback(!enabled);
            }
        }
    }

    fn apply_settings(&mut self) -> Result<(), EngineError> {
        if self.draft != *self.engine.config() {
            self.engine.set_config(self.draft.clone())?;
            if let Err(e) = self.config_store.save(&self.draft) {
                tracing::warn!(error = %e, "could not save settings");
            }
        }
        self.state = AppState::Game;
        Ok(())
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("NBACK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn open_history_store(path: Option<&Path>) -> Box<dyn HistoryStore> {
    let opened = match path {
        Some(p) => SqliteHistoryStore::open(p),
        None => SqliteHistoryStore::open_default(),
    };
    match opened {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "history database unavailable, scores kept in memory");
            Box::new(MemoryHistoryStore::new())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let config_store = FileConfigStore::new();
    let mut config = config_store.load();
    cli.apply_to(&mut config);

    let store = open_history_store(cli.history_db.as_deref());

    if let Some(path) = &cli.export_csv {
        let table = store.load()?;
        export_csv(&table, File::create(path)?)?;
        println!("history written to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let engine = GameEngine::new(config, store, TuiPresenter::default())?;
    let mut app = App::new(engine, Box::new(config_store));
    tracing::info!("nback starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(UI_REFRESH_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::screen::current_screen(&app.state).render(app, f))?;

        let event = runner.step(app.engine.next_deadline());
        // Timers due before this event fire first, so a late key sees its window closed.
        app.on_tick(Instant::now())?;

        if let AppEvent::Key(key) = event {
            if app.on_key(key, Instant::now())? == Flow::Quit {
                break;
            }
        }
    }

    tracing::info!("nback exiting");
    Ok(())
}
