use rand::Rng;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::config::LevelConfig;
use crate::error::{EngineError, Result};
use crate::ground_truth::compute_ground_truth;
use crate::scoring::{score, SessionScore};
use crate::sequence::SequenceGenerator;
use crate::stimulus::{AudioKey, Modality, VisualCoordinate};
use crate::timer::{TimerKind, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SessionPhase {
    /// Nothing loaded, before the first arm or after an abort
    Idle,
    /// Sequences cached, waiting for start
    Armed,
    Running,
    /// Scored; the engine re-arms from here
    Ended,
}

/// Both stimulus streams of one session together with their ground truth
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSequences {
    pub visual: Vec<VisualCoordinate>,
    pub audio: Vec<AudioKey>,
    pub visual_truth: Vec<bool>,
    pub audio_truth: Vec<bool>,
}

impl SessionSequences {
    pub fn generate<R: Rng>(
        generator: &mut SequenceGenerator<R>,
        level: &LevelConfig,
    ) -> Result<Self> {
        let visual = generator.generate_visual(level)?;
        let audio = generator.generate_audio(level)?;
        Self::from_streams(visual, audio, level.n_back)
    }

    /// Builds the ground truth for streams produced elsewhere
    pub fn from_streams(
        visual: Vec<VisualCoordinate>,
        audio: Vec<AudioKey>,
        n_back: usize,
    ) -> Result<Self> {
        if visual.len() != audio.len() {
            return Err(EngineError::InvalidConfig(format!(
                "visual stream has {} stimuli but audio stream has {}",
                visual.len(),
                audio.len()
            )));
        }
        Ok(Self {
            visual_truth: compute_ground_truth(&visual, n_back),
            audio_truth: compute_ground_truth(&audio, n_back),
            visual,
            audio,
        })
    }

    pub fn len(&self) -> usize {
        self.visual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visual.is_empty()
    }

    pub fn truth(&self, modality: Modality) -> &[bool] {
        match modality {
            Modality::Visual => &self.visual_truth,
            Modality::Audio => &self.audio_truth,
        }
    }
}

/// Whether a recorded response agreed with ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub modality: Modality,
    pub tick: usize,
    pub correct: bool,
    /// False when the response was auto-filled at the deadline
    pub from_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Not running, or the window for this modality is already closed
    Ignored,
    Recorded {
        tick: usize,
        feedback: Option<Feedback>,
    },
}

/// Everything produced by a session that ran to completion
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub score: SessionScore,
    pub attempt_count: usize,
    pub visual_responses: Vec<bool>,
    pub audio_responses: Vec<bool>,
    pub visual_truth: Vec<bool>,
    pub audio_truth: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Stimulus {
        tick: usize,
        visual: VisualCoordinate,
        audio: AudioKey,
    },
    Feedback(Feedback),
    Finished(SessionOutcome),
}

#[derive(Debug, Default)]
struct InputWindow {
    responses: Vec<bool>,
    open: bool,
}

impl InputWindow {
    fn reset(&mut self) {
        self.responses.clear();
        self.open = false;
    }

    /// Index the next response will be stored at
    fn cursor(&self) -> usize {
        self.responses.len()
    }

    fn record(&mut self, value: bool) -> usize {
        let idx = self.cursor();
        self.responses.push(value);
        self.open = false;
        idx
    }
}

/// Drives one session tick by tick. Time is passed in by the caller, never read here.
#[derive(Debug)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    level: LevelConfig,
    immediate_feedback: bool,
    sequences: SessionSequences,
    next_tick: usize,
    visual: InputWindow,
    audio: InputWindow,
    timers: Timers,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            level: LevelConfig::default(),
            immediate_feedback: true,
            sequences: SessionSequences::default(),
            next_tick: 0,
            visual: InputWindow::default(),
            audio: InputWindow::default(),
            timers: Timers::new(),
        }
    }

    /// Loads a fresh session. Anything in progress is discarded unscored.
    pub fn arm(
        &mut self,
        level: LevelConfig,
        immediate_feedback: bool,
        sequences: SessionSequences,
    ) -> Result<()> {
        level.validate()?;
        if sequences.len() != level.sequence_len() {
            return Err(EngineError::InvalidConfig(format!(
                "expected {} stimuli for {}-back with {} attempts, got {}",
                level.sequence_len(),
                level.n_back,
                level.attempt_count,
                sequences.len()
            )));
        }

        self.timers.cancel_all();
        self.visual.reset();
        self.audio.reset();
        self.next_tick = 0;
        self.level = level;
        self.immediate_feedback = immediate_feedback;
        self.sequences = sequences;
        self.phase = SessionPhase::Armed;
        debug!(
            n_back = self.level.n_back,
            len = self.sequences.len(),
            "session armed"
        );
        Ok(())
    }

    /// Begins the tick loop. The first stimulus appears one interval after `now`.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.phase != SessionPhase::Armed {
            return false;
        }
        self.phase = SessionPhase::Running;
        self.timers
            .schedule(now + self.level.tick_interval(), TimerKind::Tick);
        info!(
            n_back = self.level.n_back,
            attempts = self.level.attempt_count,
            "session started"
        );
        true
    }

    /// Aborts a running session without scoring. The aborted sequences are unloaded,
    /// so the machine is `Idle` until the next `arm`.
    pub fn stop(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }
        info!(tick = self.next_tick, "session aborted");
        self.timers.cancel_all();
        self.visual.reset();
        self.audio.reset();
        self.next_tick = 0;
        self.sequences = SessionSequences::default();
        self.phase = SessionPhase::Idle;
        true
    }

    /// Explicit "match" from the player for one modality
    pub fn user_signal(&mut self, modality: Modality) -> SignalOutcome {
        if self.phase != SessionPhase::Running {
            return SignalOutcome::Ignored;
        }
        let window = self.window_mut(modality);
        if !window.open {
            debug!(%modality, "late signal ignored");
            return SignalOutcome::Ignored;
        }
        let tick = window.record(true);
        SignalOutcome::Recorded {
            tick,
            feedback: self.feedback_for(modality, tick, true, true),
        }
    }

    /// Fires every timer due at or before `now`, in order
    pub fn advance(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while self.phase == SessionPhase::Running {
            let Some((due, kind)) = self.timers.pop_due(now) else {
                break;
            };
            trace!(?kind, "timer fired");
            match kind {
                TimerKind::Tick => self.on_tick(due, &mut events),
                TimerKind::AutoFill { tick } => self.on_auto_fill(tick, &mut events),
            }
        }
        events
    }

    fn on_tick(&mut self, due: Instant, events: &mut Vec<SessionEvent>) {
        // Deadlines precede the next tick, so this only matters for a zero lead.
        self.fill_open_windows(None, events);

        if self.next_tick >= self.sequences.len() {
            self.finish(events);
            return;
        }

        let tick = self.next_tick;
        events.push(SessionEvent::Stimulus {
            tick,
            visual: self.sequences.visual[tick],
            audio: self.sequences.audio[tick].clone(),
        });
        self.visual.open = true;
        self.audio.open = true;

        self.timers.schedule(
            due + self.level.auto_fill_delay(),
            TimerKind::AutoFill { tick },
        );
        self.timers
            .schedule(due + self.level.tick_interval(), TimerKind::Tick);
        self.next_tick += 1;
    }

    fn on_auto_fill(&mut self, tick: usize, events: &mut Vec<SessionEvent>) {
        self.fill_open_windows(Some(tick), events);
    }

    /// Records "no match" for open windows, restricted to `only_tick` when given
    fn fill_open_windows(&mut self, only_tick: Option<usize>, events: &mut Vec<SessionEvent>) {
        for modality in Modality::ALL {
            let window = self.window_mut(modality);
            if !window.open || only_tick.is_some_and(|t| t != window.cursor()) {
                continue;
            }
            let tick = window.record(false);
            if let Some(feedback) = self.feedback_for(modality, tick, false, false) {
                events.push(SessionEvent::Feedback(feedback));
            }
        }
    }

    fn finish(&mut self, events: &mut Vec<SessionEvent>) {
        self.timers.cancel_all();
        self.phase = SessionPhase::Ended;

        let n_back = self.level.n_back;
        let attempt_count = self.level.attempt_count;
        let visual_responses = std::mem::take(&mut self.visual.responses);
        let audio_responses = std::mem::take(&mut self.audio.responses);
        let session_score = SessionScore {
            n_back,
            visual: score(
                &self.sequences.visual_truth,
                &visual_responses,
                n_back,
                attempt_count,
            ),
            audio: score(
                &self.sequences.audio_truth,
                &audio_responses,
                n_back,
                attempt_count,
            ),
        };
        info!(
            n_back,
            visual = session_score.visual.percent(),
            audio = session_score.audio.percent(),
            "session finished"
        );

        events.push(SessionEvent::Finished(SessionOutcome {
            score: session_score,
            attempt_count,
            visual_responses,
            audio_responses,
            visual_truth: self.sequences.visual_truth.clone(),
            audio_truth: self.sequences.audio_truth.clone(),
        }));
    }

    fn feedback_for(
        &self,
        modality: Modality,
        tick: usize,
        response: bool,
        from_user: bool,
    ) -> Option<Feedback> {
        if !self.immediate_feedback || tick < self.level.n_back {
            return None;
        }
        let truth = *self.sequences.truth(modality).get(tick)?;
        Some(Feedback {
            modality,
            tick,
            correct: truth == response,
            from_user,
        })
    }

    fn window(&self, modality: Modality) -> &InputWindow {
        match modality {
            Modality::Visual => &self.visual,
            Modality::Audio => &self.audio,
        }
    }

    fn window_mut(&mut self, modality: Modality) -> &mut InputWindow {
        match modality {
            Modality::Visual => &mut self.visual,
            Modality::Audio => &mut self.audio,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn sequences(&self) -> &SessionSequences {
        &self.sequences
    }

    /// Number of stimulus pairs presented so far
    pub fn ticks_presented(&self) -> usize {
        self.next_tick
    }

    pub fn responses(&self, modality: Modality) -> &[bool] {
        &self.window(modality).responses
    }

    pub fn is_window_open(&self, modality: Modality) -> bool {
        self.window(modality).open
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_due()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}
