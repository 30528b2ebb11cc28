use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gamut_domain::{ExerciseSet, Notation, Note, Preferences};

use crate::cadence;
use crate::render::{SpeechAnnouncer, ToneRenderer, VisualSurface};
use crate::timer::TimerQueue;

/// Slack added after the target tone before answers are accepted, ms.
const ANSWER_SLACK_MS: u64 = 120;
/// Delay before the next round when resolution is disabled.
const NO_RESOLUTION_DELAY_MS: u64 = 400;
/// Extra settle time before auto mode enters its listen window.
const AUTO_SETTLE_MS: u64 = 200;
/// Fixed think time between listen and reveal.
const AUTO_THINK_MS: u64 = 2000;
/// Speech duration estimate: max(floor, chars * per-char).
const SPEECH_FLOOR_MS: u64 = 1000;
const SPEECH_PER_CHAR_MS: u64 = 200;
/// Gap between reveal and the resolution tones.
const RESOLUTION_GAP_MS: u64 = 300;
/// Allowance for the resolution tones to ring out.
const RESOLUTION_TAIL_MS: u64 = 1400;
/// Trailing allowance per auto cycle before the next round.
const AUTO_CYCLE_TAIL_MS: u64 = 1500;
/// Auto mode never starts the next round sooner than this after reveal.
const AUTO_MIN_NEXT_MS: u64 = 3000;
/// Reveal highlight length on the visual surface.
const HIGHLIGHT_MS: u64 = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PlayingCadence,
    PlayingTarget,
    AwaitingAnswer,
    Resolving,
}

/// User-facing engine state. The presentation layer renders `to_string()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
    Cadence,
    Identify,
    Listen,
    Reveal(String),
    Hidden,
    AutoStopped,
    ExerciseChanged,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading => write!(f, "Loading samples…"),
            Status::Ready => write!(f, "Ready. Press start"),
            Status::Cadence => write!(f, "Cadence…"),
            Status::Identify => write!(f, "Identify the note"),
            Status::Listen => write!(f, "Listen…"),
            Status::Reveal(label) => write!(f, "Answer: {label}"),
            Status::Hidden => write!(f, "(Answer hidden)"),
            Status::AutoStopped => write!(f, "Auto mode stopped"),
            Status::ExerciseChanged => write!(f, "Exercise changed. Press start"),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AutoConfig {
    pub interval_ms: u32,
    pub reveal_answer: bool,
    pub speak_answer: bool,
}

impl Default for AutoConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            reveal_answer: true,
            speak_answer: false,
        }
    }
}

impl AutoConfig {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self {
            interval_ms: prefs.auto_interval_ms,
            reveal_answer: prefs.reveal_answer,
            speak_answer: prefs.speak_answer,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    /// Cadence has sounded; the target tone is next.
    TargetPhase,
    /// Target has sounded; open the answer window.
    EnableAnswers,
    /// Resolution finished; start the next manual round.
    NextRound,
    AutoListen,
    AutoReveal,
    AutoResolve,
    AutoNext,
}

/// Sequences cadence, target and answer window against the renderer's
/// audio clock. All deferral happens through the owned timer queue; the
/// host pumps `tick` with wall-clock milliseconds. Stale callbacks from a
/// stopped or superseded cycle are discarded by generation tag.
pub struct RoundEngine<R, S, V> {
    renderer: R,
    speech: S,
    surface: V,
    exercise: ExerciseSet,
    phase: Phase,
    target: Option<Note>,
    answers_enabled: bool,
    repeat_enabled: bool,
    resolve_after_correct: bool,
    auto: AutoConfig,
    auto_running: bool,
    generation: u64,
    timers: TimerQueue<Action>,
    status: Status,
    rng: SmallRng,
}

impl<R, S, V> RoundEngine<R, S, V>
where
    R: ToneRenderer,
    S: SpeechAnnouncer,
    V: VisualSurface,
{
    pub fn new(renderer: R, speech: S, surface: V) -> Self {
        Self::with_rng(renderer, speech, surface, SmallRng::from_entropy())
    }

    pub fn with_rng(renderer: R, speech: S, surface: V, rng: SmallRng) -> Self {
        let status = if renderer.is_ready() {
            Status::Ready
        } else {
            Status::Loading
        };
        Self {
            renderer,
            speech,
            surface,
            exercise: ExerciseSet::for_level(1),
            phase: Phase::Idle,
            target: None,
            answers_enabled: false,
            repeat_enabled: false,
            resolve_after_correct: true,
            auto: AutoConfig::default(),
            auto_running: false,
            generation: 0,
            timers: TimerQueue::default(),
            status,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The live target. Observable only once the target tone is in play;
    /// during the cadence the upcoming target is already chosen (its tone
    /// is scheduled up front) but not yet exposed.
    pub fn target(&self) -> Option<Note> {
        match self.phase {
            Phase::PlayingTarget | Phase::AwaitingAnswer | Phase::Resolving => self.target,
            Phase::Idle | Phase::PlayingCadence => None,
        }
    }

    pub fn answers_enabled(&self) -> bool {
        self.answers_enabled
    }

    pub fn repeat_enabled(&self) -> bool {
        self.repeat_enabled
    }

    pub fn exercise(&self) -> &ExerciseSet {
        &self.exercise
    }

    pub fn auto_running(&self) -> bool {
        self.auto_running
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn speech(&self) -> &S {
        &self.speech
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    /// Whether the target-then-tonic resolution plays after a correct
    /// manual answer. Auto mode always resolves regardless.
    pub fn set_resolve_after_correct(&mut self, resolve: bool) {
        self.resolve_after_correct = resolve;
    }

    pub fn configure_auto(&mut self, config: AutoConfig) {
        self.auto = config;
    }

    /// Drive pending timers. The host calls this with a monotonic
    /// wall-clock reading whenever it gets a chance (frame loop, poll
    /// tick); actions fire no earlier than their due time.
    pub fn tick(&mut self, now_ms: u64) {
        if self.status == Status::Loading && self.renderer.is_ready() {
            self.status = Status::Ready;
        }
        loop {
            let actions = self.timers.drain_due(now_ms, self.generation);
            if actions.is_empty() {
                break;
            }
            for action in actions {
                self.dispatch(action, now_ms);
            }
        }
    }

    /// Earliest pending due time, for hosts that sleep between ticks.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// Start a manual round. Rejected while the renderer is loading or a
    /// round is in flight.
    pub fn start(&mut self, now_ms: u64) {
        if !self.renderer.is_ready() {
            self.status = Status::Loading;
            return;
        }
        if self.phase != Phase::Idle || self.auto_running {
            return;
        }
        self.begin_round(now_ms, true);
    }

    /// Replay the cadence and the same target. Valid only while an answer
    /// is awaited; the target is not re-rolled.
    pub fn repeat(&mut self, now_ms: u64) {
        if self.phase != Phase::AwaitingAnswer || self.target.is_none() || self.auto_running {
            return;
        }
        self.begin_round(now_ms, false);
    }

    /// The host reports that the scorekeeper accepted a correct answer.
    /// Schedules resolution (if enabled) and the next round.
    pub fn report_correct(&mut self, now_ms: u64) {
        if self.phase != Phase::AwaitingAnswer {
            return;
        }
        let Some(target) = self.target.take() else {
            return;
        };
        self.phase = Phase::Resolving;
        self.answers_enabled = false;
        self.repeat_enabled = false;
        let delay_ms = if self.resolve_after_correct {
            let t0 = self.renderer.now() + cadence::START_OFFSET;
            let t_end = cadence::schedule_resolution(&mut self.renderer, target, t0);
            self.delay_until(t_end) + ANSWER_SLACK_MS
        } else {
            NO_RESOLUTION_DELAY_MS
        };
        debug!(delay_ms, "next round scheduled");
        self.timers
            .schedule(now_ms + delay_ms, self.generation, Action::NextRound);
    }

    /// Switch the active exercise level. Any in-flight target is
    /// invalidated and every pending timer cancelled.
    pub fn set_exercise(&mut self, level: u8) {
        self.exercise = ExerciseSet::for_level(level);
        if self.target.is_some() || self.auto_running || !self.timers.is_empty() {
            self.invalidate_cycle();
            self.status = Status::ExerciseChanged;
        }
    }

    /// Begin unattended cycling. No-op when already running.
    pub fn start_auto(&mut self, now_ms: u64) {
        if !self.renderer.is_ready() {
            self.status = Status::Loading;
            return;
        }
        if self.auto_running {
            return;
        }
        self.auto_running = true;
        self.phase = Phase::Idle;
        self.begin_round(now_ms, true);
    }

    /// Stop unattended cycling. Idempotent; cancels the pending next-round
    /// timer and every other timer of the stopped cycle.
    pub fn stop_auto(&mut self) {
        if !self.auto_running {
            return;
        }
        self.auto_running = false;
        self.invalidate_cycle();
        self.status = Status::AutoStopped;
    }

    fn invalidate_cycle(&mut self) {
        self.generation += 1;
        self.timers.clear();
        self.target = None;
        self.answers_enabled = false;
        self.repeat_enabled = false;
        self.auto_running = false;
        self.phase = Phase::Idle;
    }

    fn begin_round(&mut self, now_ms: u64, reroll: bool) {
        if reroll {
            self.target = Some(self.exercise.pick_target(&mut self.rng));
        }
        let Some(target) = self.target else {
            return;
        };
        self.phase = Phase::PlayingCadence;
        self.answers_enabled = false;
        self.repeat_enabled = false;
        self.status = Status::Cadence;

        let end_cadence = cadence::schedule_cadence(&mut self.renderer);
        let t_target = end_cadence + cadence::TARGET_GAP;
        self.renderer.schedule_tone(
            target,
            t_target,
            cadence::TARGET_DURATION,
            cadence::TARGET_INTENSITY,
        );
        debug!(midi = target.midi(), t_target, "round scheduled");

        self.timers.schedule(
            now_ms + self.delay_until(end_cadence),
            self.generation,
            Action::TargetPhase,
        );
        let window_ms = self.delay_until(t_target) + ANSWER_SLACK_MS;
        if self.auto_running {
            self.timers.schedule(
                now_ms + window_ms + AUTO_SETTLE_MS,
                self.generation,
                Action::AutoListen,
            );
        } else {
            self.timers
                .schedule(now_ms + window_ms, self.generation, Action::EnableAnswers);
        }
    }

    fn dispatch(&mut self, action: Action, now_ms: u64) {
        match action {
            Action::TargetPhase => {
                if self.phase == Phase::PlayingCadence {
                    self.phase = Phase::PlayingTarget;
                }
            }
            Action::EnableAnswers => {
                if self.target.is_some() {
                    self.phase = Phase::AwaitingAnswer;
                    self.answers_enabled = true;
                    self.repeat_enabled = true;
                    self.status = Status::Identify;
                }
            }
            Action::NextRound => {
                if self.phase == Phase::Resolving {
                    self.phase = Phase::Idle;
                    self.begin_round(now_ms, true);
                }
            }
            Action::AutoListen => self.auto_listen(now_ms),
            Action::AutoReveal => self.auto_reveal(now_ms),
            Action::AutoResolve => self.auto_resolve(),
            Action::AutoNext => {
                if self.auto_running {
                    self.phase = Phase::Idle;
                    self.begin_round(now_ms, true);
                }
            }
        }
    }

    fn auto_listen(&mut self, now_ms: u64) {
        if !self.auto_running {
            return;
        }
        self.phase = Phase::AwaitingAnswer;
        self.status = Status::Listen;
        self.timers
            .schedule(now_ms + AUTO_THINK_MS, self.generation, Action::AutoReveal);
    }

    fn auto_reveal(&mut self, now_ms: u64) {
        if !self.auto_running {
            return;
        }
        let Some(target) = self.target else {
            return;
        };
        // Auto mode always reveals in solfège, matching the spoken label.
        let label = target.label(Notation::Solfege).to_string();
        self.phase = Phase::Resolving;

        let speech_ms = if self.auto.speak_answer {
            self.speech.speak(&label);
            (label.chars().count() as u64 * SPEECH_PER_CHAR_MS).max(SPEECH_FLOOR_MS)
        } else {
            0
        };
        if self.auto.reveal_answer {
            self.surface.highlight(target, HIGHLIGHT_MS);
            self.status = Status::Reveal(label);
        } else {
            self.status = Status::Hidden;
        }

        let resolution_delay_ms = speech_ms + RESOLUTION_GAP_MS;
        self.timers.schedule(
            now_ms + resolution_delay_ms,
            self.generation,
            Action::AutoResolve,
        );

        // The configured interval is a target cycle length: shorten the
        // trailing gap to honor it, but never below the floor.
        let used_ms =
            AUTO_THINK_MS + speech_ms + (resolution_delay_ms + RESOLUTION_TAIL_MS) + AUTO_CYCLE_TAIL_MS;
        let next_ms = (self.auto.interval_ms as u64)
            .saturating_sub(used_ms)
            .max(AUTO_MIN_NEXT_MS);
        debug!(used_ms, next_ms, "auto cycle timed");
        self.timers
            .schedule(now_ms + next_ms, self.generation, Action::AutoNext);
    }

    fn auto_resolve(&mut self) {
        // Resolution tones may already be committed to the audio clock when
        // auto mode stops; this runtime check skips ones not yet issued.
        if !self.auto_running {
            return;
        }
        let Some(target) = self.target else {
            return;
        };
        let t0 = self.renderer.now() + 0.1;
        cadence::schedule_resolution(&mut self.renderer, target, t0);
    }

    fn delay_until(&self, audio_time: f64) -> u64 {
        let seconds = (audio_time - self.renderer.now()).max(0.0);
        (seconds * 1000.0).round() as u64
    }
}
