use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::controller::{Ack, Backend, ControllerStatus};
use crate::session::Signal;

/// Work handed to the backend off the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Capture(Signal),
    Respond {
        transcript: String,
        context: Option<String>,
    },
}

/// Result of a dispatched command
#[derive(Debug)]
pub enum Outcome {
    Started(anyhow::Result<Ack>),
    Stopped(anyhow::Result<Ack>),
    Reply(anyhow::Result<Option<String>>),
}

/// Unified event type consumed by the app runner
#[derive(Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    Status(anyhow::Result<ControllerStatus>),
    Done(Outcome),
}

/// Source of events (keyboard, resize, background results)
pub trait SessionEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;
}

/// Production event source: terminal input plus whatever background
/// workers send through `sender()`
pub struct TerminalEventSource {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl TerminalEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let input_tx = tx.clone();
        thread::spawn(move || loop {
            let sent = match event::read() {
                Ok(CtEvent::Key(key)) => input_tx.send(SessionEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => input_tx.send(SessionEvent::Resize),
                Ok(_) => Ok(()),
                Err(err) => {
                    log::error!("terminal input failed: {err}");
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        });

        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }
}

impl Default for TerminalEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventSource for TerminalEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }
}

impl SessionEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event/tick at a time.
///
/// Ticks are scheduled against a deadline, so a stream of other events can
/// neither postpone nor multiply them.
pub struct Runner<E: SessionEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Instant,
}

impl<E: SessionEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Instant::now() + ticker.interval();
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    pub fn event_source(&self) -> &E {
        &self.event_source
    }

    /// Blocks until the next event or tick deadline, whichever comes first
    pub fn step(&mut self) -> SessionEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            return self.fire_tick(now);
        }
        match self.event_source.recv_timeout(self.next_tick - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.fire_tick(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                let wait = self.next_tick.saturating_duration_since(Instant::now());
                thread::sleep(wait);
                self.fire_tick(Instant::now())
            }
        }
    }

    fn fire_tick(&mut self, now: Instant) -> SessionEvent {
        let interval = self.ticker.interval();
        self.next_tick += interval;
        // After a long stall, skip missed ticks rather than bursting them
        if self.next_tick <= now {
            self.next_tick = now + interval;
        }
        SessionEvent::Tick
    }
}

/// Handle to the background status poller. Dropping it does not wait.
pub struct StatusPoller {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Poll the backend every `interval`, forwarding each result as a
    /// `SessionEvent::Status`. Stops when shut down or when nobody listens.
    pub fn spawn(
        backend: Arc<dyn Backend>,
        interval: Duration,
        tx: Sender<SessionEvent>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                let report = backend.get_status();
                if flag.load(Ordering::Relaxed) || tx.send(SessionEvent::Status(report)).is_err() {
                    break;
                }
                sleep_unless(&flag, interval);
            }
            log::debug!("status poller stopped");
        });
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Ask the poller to stop. An in-flight request is abandoned, not awaited.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.handle.take();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sleep_unless(flag: &AtomicBool, total: Duration) {
    let slice = Duration::from_millis(50);
    let deadline = Instant::now() + total;
    while !flag.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(slice.min(deadline - now));
    }
}

/// Run a command on its own thread; the result comes back as `SessionEvent::Done`.
pub fn dispatch(
    command: Command,
    backend: Arc<dyn Backend>,
    tx: Sender<SessionEvent>,
) -> JoinHandle<()> {
    log::debug!("dispatching {command:?}");
    thread::spawn(move || {
        let outcome = run_command(command, backend.as_ref());
        if tx.send(SessionEvent::Done(outcome)).is_err() {
            log::debug!("command finished after teardown");
        }
    })
}

/// Execute a command synchronously
pub fn run_command(command: Command, backend: &dyn Backend) -> Outcome {
    match command {
        Command::Capture(Signal::StartCapture {
            session_id,
            timeline,
        }) => Outcome::Started(backend.start_session(&timeline, &session_id)),
        Command::Capture(Signal::StopCapture) => Outcome::Stopped(backend.stop_session()),
        Command::Respond {
            transcript,
            context,
        } => Outcome::Reply(backend.respond(&transcript, context.as_deref())),
    }
}
