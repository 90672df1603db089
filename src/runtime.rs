use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Input event consumed by the response window, stamped when it was read.
#[derive(Clone, Debug)]
pub enum InputEvent {
    Key { key: KeyEvent, at: Instant },
    Resize,
    /// The reader hit an error and stopped; carries its description.
    Failed(String),
}

impl InputEvent {
    /// Key press stamped with the current instant.
    pub fn key_now(code: KeyCode) -> Self {
        Self::key_at(code, Instant::now())
    }

    pub fn key_at(code: KeyCode, at: Instant) -> Self {
        InputEvent::Key {
            key: KeyEvent::new(code, KeyModifiers::NONE),
            at,
        }
    }
}

/// Whether `key` asks to stop the session (Esc or Ctrl-C).
pub fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C')))
}

/// Source of terminal events (keyboard, resize).
pub trait EventSource {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Err(Timeout) if it expires and Err(Disconnected) if the source is gone.
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError>;

    /// Take every event already queued without waiting, or Err(Disconnected)
    /// if the source is gone.
    fn drain(&self) -> Result<Vec<InputEvent>, RecvTimeoutError>;
}

fn drain_receiver(rx: &Receiver<InputEvent>) -> Result<Vec<InputEvent>, RecvTimeoutError> {
    let mut pending = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => pending.push(ev),
            Err(mpsc::TryRecvError::Empty) => return Ok(pending),
            Err(mpsc::TryRecvError::Disconnected) => return Err(RecvTimeoutError::Disconnected),
        }
    }
}

/// Production event source using crossterm.
///
/// Events are read on a background thread and stamped with the instant they
/// were read, so reaction times do not include the sequencer's poll latency.
pub struct CrosstermEventSource {
    rx: Receiver<InputEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                // Release/repeat events only show up with enhanced keyboard reporting.
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    let at = Instant::now();
                    if tx.send(InputEvent::Key { key, at }).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(InputEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                // The session log only covers the session thread, so the
                // error travels over the channel instead of being logged here.
                Err(e) => {
                    let _ = tx.send(InputEvent::Failed(e.to_string()));
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn drain(&self) -> Result<Vec<InputEvent>, RecvTimeoutError> {
        drain_receiver(&self.rx)
    }
}

/// Test event source fed through a channel
pub struct TestEventSource {
    rx: Receiver<InputEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<InputEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn drain(&self) -> Result<Vec<InputEvent>, RecvTimeoutError> {
        drain_receiver(&self.rx)
    }
}

/// Configurable ticker interface
pub trait Ticker {
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
