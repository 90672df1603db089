use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::clock::SessionClock;
use crate::display::Surface;
use crate::error::{Result, SessionError};
use crate::runtime::{is_interrupt, EventSource, InputEvent, Ticker};
use crate::trial::{KeyMap, Response};

/// Single-shot response window opened at stimulus onset.
pub struct ResponseWindow<'a, T: Ticker> {
    keys: &'a KeyMap,
    deadline: Duration,
    ticker: &'a T,
}

impl<'a, T: Ticker> ResponseWindow<'a, T> {
    pub fn new(keys: &'a KeyMap, deadline: Duration, ticker: &'a T) -> Self {
        Self {
            keys,
            deadline,
            ticker,
        }
    }

    /// Waits for the first bound key press after `rt_clock`'s epoch.
    ///
    /// Returns `Ok(None)` when the deadline passes first. Events queued
    /// before the call, and presses stamped before onset, are never taken as
    /// the response. Returns at most one tick after the deadline.
    pub fn capture<E, S>(
        &self,
        events: &E,
        surface: &mut S,
        rt_clock: &SessionClock,
    ) -> Result<Option<Response>>
    where
        E: EventSource + ?Sized,
        S: Surface + ?Sized,
    {
        let stale = events.drain().map_err(input_lost)?;
        for ev in &stale {
            match ev {
                InputEvent::Failed(reason) => return Err(SessionError::Input(reason.clone())),
                InputEvent::Key { key, .. } if is_interrupt(key) => {
                    return Err(SessionError::Aborted)
                }
                _ => {}
            }
        }
        if !stale.is_empty() {
            tracing::debug!(discarded = stale.len(), "dropped input queued before onset");
        }

        let closes_at = rt_clock.deadline(self.deadline);
        loop {
            let now = Instant::now();
            if now >= closes_at {
                return Ok(None);
            }
            let wait = (closes_at - now).min(self.ticker.interval());

            match events.recv_timeout(wait) {
                Ok(InputEvent::Resize) => surface.redraw()?,
                Ok(InputEvent::Failed(reason)) => return Err(SessionError::Input(reason)),
                Ok(InputEvent::Key { key, at }) => {
                    if is_interrupt(&key) {
                        return Err(SessionError::Aborted);
                    }
                    let Some(c) = self.bound_char(&key) else {
                        continue;
                    };
                    // Read before onset but delivered late: still stale.
                    let Some(rt) = rt_clock.since(at) else {
                        continue;
                    };
                    if rt > self.deadline.as_secs_f64() {
                        return Ok(None);
                    }
                    return Ok(Some(Response { key: c, rt }));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(e @ RecvTimeoutError::Disconnected) => return Err(input_lost(e)),
            }
        }
    }

    fn bound_char(&self, key: &KeyEvent) -> Option<char> {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return None;
        }
        // Shift and Caps Lock change the reported char, not the physical key.
        match key.code {
            KeyCode::Char(c) if self.keys.is_bound(c.to_ascii_lowercase()) => {
                Some(c.to_ascii_lowercase())
            }
            _ => None,
        }
    }
}

fn input_lost(_: RecvTimeoutError) -> SessionError {
    SessionError::Input("input source disconnected".to_string())
}
