use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::clock::{DriftCorrector, MonotonicTime, TimeSource};
use crate::config::Config;
use crate::recipe::Recipe;
use crate::runtime::{Command, Outcome, SessionEvent};
use crate::session::{Session, SessionStatus, Signal};
use crate::status::{Merge, StatusReconciler};
use crate::step::lint_timeline;

/// How many ticks a notice stays on screen
pub const NOTICE_TICKS: u32 = 6;
const MAX_NOTICES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Session,
    Talk,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient message shown under the timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    pub ttl_ticks: u32,
}

/// What the event loop should do after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Application state for one session view.
///
/// The session (clock and timeline) and the status reconciler are separate
/// owners of disjoint field sets; nothing here writes across them.
#[derive(Debug)]
pub struct App<T: TimeSource + Clone = MonotonicTime> {
    pub recipe: Recipe,
    pub config: Config,
    pub session: Session<T>,
    pub status: StatusReconciler,
    pub display: DriftCorrector,
    pub state: AppState,
    pub draft: String,
    pub notices: Vec<Notice>,
    pub chef_reply: Option<String>,
    pub final_elapsed_ms: Option<u64>,
    capture_requested: bool,
    stop_pending: bool,
    commands: Vec<Command>,
    time: T,
}

impl<T: TimeSource + Clone> App<T> {
    pub fn new(recipe: Recipe, config: Config, time: T) -> Self {
        for issue in lint_timeline(&recipe.timeline, recipe.total_seconds()) {
            log::warn!("recipe {}: {issue}", recipe.id);
        }
        let session = Session::from_recipe(&recipe, time.clone());
        let display = DriftCorrector::new(config.drift_threshold_ms);
        Self {
            recipe,
            config,
            session,
            status: StatusReconciler::new(),
            display,
            state: AppState::Session,
            draft: String::new(),
            notices: Vec::new(),
            chef_reply: None,
            final_elapsed_ms: None,
            capture_requested: false,
            stop_pending: false,
            commands: Vec::new(),
            time,
        }
    }

    /// Commands produced since the last call, for the caller to dispatch
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn handle(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Tick => {
                self.on_tick();
                Flow::Continue
            }
            SessionEvent::Resize => Flow::Continue,
            SessionEvent::Key(key) => self.on_key(key),
            SessionEvent::Status(report) => {
                self.on_status(report);
                Flow::Continue
            }
            SessionEvent::Done(outcome) => {
                self.on_outcome(outcome);
                Flow::Continue
            }
        }
    }

    /// Start, resume or pause depending on the current status
    pub fn toggle(&mut self) {
        match self.session.status() {
            SessionStatus::Idle | SessionStatus::Paused => {
                if let Some(signal) = self.session.start() {
                    self.signal(signal);
                }
            }
            SessionStatus::Running => {
                self.session.pause();
            }
            SessionStatus::Completed => {}
        }
        self.display.snap(self.session.elapsed_ms());
    }

    pub fn end(&mut self) {
        let elapsed = self.session.elapsed_ms();
        if let Some(signal) = self.session.end() {
            self.final_elapsed_ms = Some(elapsed);
            self.signal(signal);
            self.display.snap(0);
            self.state = AppState::Summary;
        }
    }

    /// Begin a fresh session on the same recipe once the last one is over
    pub fn restart(&mut self) {
        if self.session.status() != SessionStatus::Completed {
            return;
        }
        self.session = Session::from_recipe(&self.recipe, self.time.clone());
        self.display = DriftCorrector::new(self.config.drift_threshold_ms);
        self.final_elapsed_ms = None;
        self.chef_reply = None;
        self.capture_requested = false;
        self.state = AppState::Session;
        log::info!("restarted {} as {}", self.recipe.id, self.session.summary().id);
    }

    /// Commands to run synchronously on the way out so capture is not left
    /// running: ends an active session, or repeats a stop the backend has not
    /// acknowledged yet.
    pub fn teardown(&mut self) -> Vec<Command> {
        if self.session.is_active() {
            self.end();
        } else if self.stop_pending {
            log::info!("repeating unacknowledged stop on exit");
            self.commands.push(Command::Capture(Signal::StopCapture));
        }
        self.take_commands()
    }

    pub fn on_tick(&mut self) {
        self.session.tick();
        let elapsed = self.session.elapsed_ms();
        if self.session.status() == SessionStatus::Running {
            self.display.on_tick(self.config.tick_interval_ms, elapsed);
        } else if self.session.status() != SessionStatus::Completed {
            self.display.sync(elapsed);
        }
        for notice in &mut self.notices {
            notice.ttl_ticks = notice.ttl_ticks.saturating_sub(1);
        }
        self.notices.retain(|n| n.ttl_ticks > 0);
    }

    pub fn on_status(&mut self, report: anyhow::Result<crate::controller::ControllerStatus>) {
        match self.status.apply(report) {
            Merge::Disconnected => self.notify(NoticeLevel::Error, "Backend unreachable"),
            Merge::Reconnected => self.notify(NoticeLevel::Info, "Backend reconnected"),
            Merge::Updated | Merge::Unchanged | Merge::StillLost => {}
        }
    }

    pub fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Started(Ok(ack)) if ack.already_running() => {
                self.notify(NoticeLevel::Info, "Capture was already running");
            }
            Outcome::Started(Ok(ack)) => {
                let mut text = String::from("Capture started");
                if let Some(pid) = ack.pid {
                    text.push_str(&format!(" (pid {pid})"));
                }
                if let Some(quotes) = ack.quotes_generated {
                    text.push_str(&format!(", {quotes} quotes queued"));
                }
                if ack.tts_enabled == Some(false) {
                    text.push_str(", voice output unavailable");
                }
                self.notify(NoticeLevel::Info, text);
            }
            Outcome::Started(Err(err)) => {
                log::error!("starting capture failed: {err:#}");
                self.notify(NoticeLevel::Error, format!("Could not start capture: {err}"));
            }
            Outcome::Stopped(Ok(_)) => {
                self.stop_pending = false;
                self.notify(NoticeLevel::Info, "Capture stopped");
            }
            Outcome::Stopped(Err(err)) => {
                log::error!("stopping capture failed: {err:#}");
                self.notify(NoticeLevel::Error, format!("Could not stop capture: {err}"));
            }
            Outcome::Reply(Ok(Some(reply))) => self.chef_reply = Some(reply),
            Outcome::Reply(Ok(None)) => self.notify(NoticeLevel::Info, "No reply from the chef"),
            Outcome::Reply(Err(err)) => {
                log::error!("voice reply failed: {err:#}");
                self.notify(NoticeLevel::Error, format!("Chef is unavailable: {err}"));
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        match self.state {
            AppState::Session => match key.code {
                KeyCode::Char(' ') => self.toggle(),
                KeyCode::Char('e') => self.end(),
                KeyCode::Char('t') => self.begin_talk(),
                KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
                _ => {}
            },
            AppState::Talk => match key.code {
                KeyCode::Enter => self.submit_talk(),
                KeyCode::Esc => {
                    self.draft.clear();
                    self.state = AppState::Session;
                }
                KeyCode::Backspace => {
                    self.draft.pop();
                }
                KeyCode::Char(c) => self.draft.push(c),
                _ => {}
            },
            AppState::Summary => match key.code {
                KeyCode::Char('r') => self.restart(),
                KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
                _ => {}
            },
        }
        Flow::Continue
    }

    fn begin_talk(&mut self) {
        if !self.config.speech_enabled {
            self.notify(NoticeLevel::Info, "Voice chat is disabled");
        } else if !self.session.is_active() {
            self.notify(NoticeLevel::Info, "Start the session before talking to the chef");
        } else {
            self.draft.clear();
            self.state = AppState::Talk;
        }
    }

    fn submit_talk(&mut self) {
        let transcript = std::mem::take(&mut self.draft);
        self.state = AppState::Session;
        if transcript.trim().is_empty() || !self.session.is_active() {
            return;
        }
        let next = self.session.next_action();
        let context = (!next.is_complete()).then(|| next.active.text.clone());
        self.commands.push(Command::Respond {
            transcript: transcript.trim().to_string(),
            context,
        });
    }

    fn signal(&mut self, signal: Signal) {
        if !self.config.capture_enabled {
            log::debug!("capture disabled, dropping {signal:?}");
            return;
        }
        match signal {
            Signal::StartCapture { .. } => self.capture_requested = true,
            Signal::StopCapture if !self.capture_requested => return,
            Signal::StopCapture => {
                self.capture_requested = false;
                self.stop_pending = true;
            }
        }
        self.commands.push(Command::Capture(signal));
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice {
            text: text.into(),
            level,
            ttl_ticks: NOTICE_TICKS,
        });
        if self.notices.len() > MAX_NOTICES {
            let excess = self.notices.len() - MAX_NOTICES;
            self.notices.drain(..excess);
        }
    }
}
