use crate::clock::SessionClock;
use crate::display::Surface;
use crate::error::{Result, SessionError};
use crate::logging::SessionLog;
use crate::recorder::ResultSink;
use crate::runtime::{EventSource, FixedTicker};
use crate::sequencer::{self, SessionSummary, Timing};
use crate::trial::{KeyMap, TrialSpec};

/// Everything one session owns: identity, clocks, input, display and results.
///
/// Built once by the entry point and handed to the sequencer; nothing in here
/// is global.
pub struct SessionContext<E, S, R> {
    pub sid: String,
    /// Epoch of the session log timestamps.
    pub session_clock: SessionClock,
    /// Reset at every stimulus onset; reaction times are read from it.
    pub rt_clock: SessionClock,
    pub events: E,
    pub surface: S,
    pub recorder: R,
    pub keys: KeyMap,
    pub timing: Timing,
    pub ticker: FixedTicker,
    _log: Option<SessionLog>,
}

impl<E, S, R> SessionContext<E, S, R>
where
    E: EventSource,
    S: Surface,
    R: ResultSink,
{
    pub fn new(sid: impl Into<String>, events: E, surface: S, recorder: R, timing: Timing) -> Self {
        Self {
            sid: sid.into(),
            session_clock: SessionClock::new(),
            rt_clock: SessionClock::new(),
            events,
            surface,
            recorder,
            keys: KeyMap::standard(),
            timing,
            ticker: FixedTicker::new(timing.poll),
            _log: None,
        }
    }

    /// Use `clock` as the session epoch, typically the one the log was opened with.
    pub fn with_session_clock(mut self, clock: SessionClock) -> Self {
        self.session_clock = clock;
        self
    }

    /// Keep the session log alive for as long as the context.
    pub fn with_log(mut self, log: SessionLog) -> Self {
        self._log = Some(log);
        self
    }

    /// Runs every trial, then tears down whether or not the trials succeeded.
    ///
    /// A trial failure wins over a teardown failure in the returned error.
    pub fn run(&mut self, trials: &[TrialSpec]) -> Result<SessionSummary> {
        tracing::info!(sid = %self.sid, trials = trials.len(), "session start");

        let outcome = sequencer::run_session(self, trials);
        if let Err(e) = &outcome {
            tracing::error!(sid = %self.sid, error = %e, "session crashed");
        }
        let teardown = self.teardown();

        let summary = outcome?;
        teardown?;
        tracing::info!(
            sid = %self.sid,
            trials = summary.trials,
            correct = summary.correct,
            timeouts = summary.timeouts,
            elapsed_secs = self.session_clock.now(),
            "session finished normally"
        );
        Ok(summary)
    }

    /// Closes the result file, then releases the surface.
    ///
    /// Both steps are always attempted; the first failure is returned.
    pub fn teardown(&mut self) -> Result<()> {
        let closed = self.recorder.close().map_err(SessionError::from);
        if let Err(e) = &closed {
            tracing::error!(error = %e, "closing result file failed");
        }
        let released = self.surface.release();
        if let Err(e) = &released {
            tracing::error!(error = %e, "releasing display failed");
        }
        closed.and(released)
    }
}
