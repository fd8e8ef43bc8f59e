use rand::rngs::ThreadRng;
use rand::Rng;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::history::{HistoryStore, HistoryTable};
use crate::scoring::SessionScore;
use crate::sequence::SequenceGenerator;
use crate::session::{
    Feedback, SessionEvent, SessionOutcome, SessionPhase, SessionSequences, SessionStateMachine,
    SignalOutcome,
};
use crate::stimulus::{AudioKey, Modality, VisualCoordinate};

/// Receives everything the engine wants shown or played
pub trait Presenter {
    fn emit_visual(&mut self, coordinate: VisualCoordinate);
    fn emit_audio(&mut self, key: &AudioKey);
    fn feedback(&mut self, _feedback: Feedback) {}
    fn session_finished(&mut self, _outcome: &SessionOutcome) {}
}

/// Owns the configuration, the current session and the score history
pub struct GameEngine<P: Presenter, R: Rng = ThreadRng> {
    config: Config,
    generator: SequenceGenerator<R>,
    session: SessionStateMachine,
    history: HistoryTable,
    store: Box<dyn HistoryStore>,
    presenter: P,
    last_score: Option<SessionScore>,
}

impl<P: Presenter> GameEngine<P, ThreadRng> {
    pub fn new(config: Config, store: Box<dyn HistoryStore>, presenter: P) -> Result<Self> {
        Self::with_rng(config, store, presenter, rand::thread_rng())
    }
}

impl<P: Presenter, R: Rng> GameEngine<P, R> {
    /// Loads history and arms the first session. Only an invalid configuration fails.
    pub fn with_rng(
        config: Config,
        store: Box<dyn HistoryStore>,
        presenter: P,
        rng: R,
    ) -> Result<Self> {
        let history = match store.load() {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "starting with empty history");
                HistoryTable::default()
            }
        };

        let mut engine = Self {
            config,
            generator: SequenceGenerator::with_rng(rng),
            session: SessionStateMachine::new(),
            history,
            store,
            presenter,
            last_score: None,
        };
        engine.arm()?;
        Ok(engine)
    }

    /// Generates fresh sequences from the current configuration
    pub fn arm(&mut self) -> Result<()> {
        let level = self.config.level();
        let sequences = SessionSequences::generate(&mut self.generator, &level)?;
        self.session
            .arm(level, self.config.immediate_feedback(), sequences)
    }

    pub fn start(&mut self, now: Instant) -> bool {
        self.session.start(now)
    }

    /// Aborts the running session. Nothing is scored; the next session is armed fresh.
    pub fn stop(&mut self) -> Result<bool> {
        if !self.session.stop() {
            return Ok(false);
        }
        self.arm()?;
        Ok(true)
    }

    /// Starts when armed, stops when running: the center control of the grid
    pub fn toggle(&mut self, now: Instant) -> Result<bool> {
        if self.session.is_running() {
            self.stop()
        } else {
            Ok(self.start(now))
        }
    }

    pub fn user_signal(&mut self, modality: Modality) -> SignalOutcome {
        let outcome = self.session.user_signal(modality);
        if let SignalOutcome::Recorded {
            feedback: Some(feedback),
            ..
        } = outcome
        {
            self.presenter.feedback(feedback);
        }
        outcome
    }

    /// Fires due timers and dispatches their events. Returns the score of a session
    /// that finished during this call.
    pub fn advance(&mut self, now: Instant) -> Result<Option<SessionScore>> {
        let mut finished = None;
        for event in self.session.advance(now) {
            match event {
                SessionEvent::Stimulus { visual, audio, .. } => {
                    self.presenter.emit_visual(visual);
                    self.presenter.emit_audio(&audio);
                }
                SessionEvent::Feedback(feedback) => self.presenter.feedback(feedback),
                SessionEvent::Finished(outcome) => {
                    self.finish(&outcome)?;
                    finished = Some(outcome.score);
                }
            }
        }
        Ok(finished)
    }

    fn finish(&mut self, outcome: &SessionOutcome) -> Result<()> {
        let score = outcome.score;
        self.history
            .record_score(score.n_back, score.visual, score.audio);
        if let Err(e) = self.store.save(&self.history) {
            warn!(error = %e, "history kept in memory only");
        }
        self.last_score = Some(score);
        self.presenter.session_finished(outcome);
        self.arm()
    }

    /// Replaces the configuration. Applied now when no session is running,
    /// otherwise at the next arm. A rejected configuration leaves the current one in place.
    pub fn set_config(&mut self, config: Config) -> Result<()> {
        config.level().validate()?;
        self.config = config;
        if self.session.is_running() {
            return Ok(());
        }
        info!(
            n_back = self.config.n_back(),
            attempts = self.config.attempt_count(),
            "configuration applied"
        );
        self.arm()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &HistoryTable {
        &self.history
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.next_deadline()
    }

    pub fn last_score(&self) -> Option<SessionScore> {
        self.last_score
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}
