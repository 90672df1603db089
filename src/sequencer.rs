use std::time::Duration;

use crate::capture::ResponseWindow;
use crate::clock;
use crate::display::{Phase, Surface};
use crate::error::Result;
use crate::recorder::ResultSink;
use crate::runtime::EventSource;
use crate::session::SessionContext;
use crate::trial::{Response, TrialResult, TrialSpec};

/// Phase durations of every trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub fixation: Duration,
    pub response_deadline: Duration,
    pub iti: Duration,
    /// Poll granularity of the response window; bounds how far a timeout can overrun.
    pub poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            fixation: Duration::from_millis(700),
            response_deadline: Duration::from_millis(2500),
            iti: Duration::from_millis(500),
            poll: Duration::from_millis(10),
        }
    }
}

/// Where a trial is in its timeline. Later states carry what earlier ones produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialState {
    Fixation,
    StimulusOnset,
    ResponseWindow,
    Score(Option<Response>),
    Record(TrialResult),
    Iti(TrialResult),
    Done(TrialResult),
}

/// Counts reported when every trial has been recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub trials: usize,
    pub correct: usize,
    pub timeouts: usize,
}

impl SessionSummary {
    fn add(&mut self, row: &TrialResult) {
        self.trials += 1;
        if row.correct {
            self.correct += 1;
        }
        if row.timed_out() {
            self.timeouts += 1;
        }
    }
}

/// Runs one trial from fixation through the inter-trial interval.
///
/// The row is durably recorded before the ITI starts. Any failure returns
/// immediately without finishing the trial.
pub fn run_trial<E, S, R>(
    ctx: &mut SessionContext<E, S, R>,
    index: usize,
    spec: &TrialSpec,
) -> Result<TrialResult>
where
    E: EventSource,
    S: Surface,
    R: ResultSink,
{
    tracing::info!(trial = index, color = %spec.color, word = %spec.word, "trial start");

    let mut state = TrialState::Fixation;
    loop {
        tracing::trace!(trial = index, ?state, "enter");
        state = match state {
            TrialState::Fixation => {
                ctx.surface.show(&Phase::Fixation)?;
                clock::wait(ctx.timing.fixation);
                TrialState::StimulusOnset
            }
            TrialState::StimulusOnset => {
                ctx.surface.show(&Phase::Stimulus {
                    word: spec.word.clone(),
                    color: spec.color,
                })?;
                ctx.rt_clock.reset();
                TrialState::ResponseWindow
            }
            TrialState::ResponseWindow => {
                let window =
                    ResponseWindow::new(&ctx.keys, ctx.timing.response_deadline, &ctx.ticker);
                let response = window.capture(&ctx.events, &mut ctx.surface, &ctx.rt_clock)?;
                TrialState::Score(response)
            }
            TrialState::Score(response) => {
                let row = TrialResult::score(&ctx.sid, index, spec, response, &ctx.keys);
                match response {
                    Some(r) => tracing::info!(
                        trial = index,
                        key = %r.key,
                        rt = %format!("{:.4}", r.rt),
                        correct = row.correct,
                        "trial response"
                    ),
                    None => tracing::warn!(
                        trial = index,
                        deadline_secs = ctx.timing.response_deadline.as_secs_f64(),
                        "trial timeout (no response before deadline)"
                    ),
                }
                TrialState::Record(row)
            }
            TrialState::Record(row) => {
                ctx.recorder.append(&row)?;
                TrialState::Iti(row)
            }
            TrialState::Iti(row) => {
                ctx.surface.show(&Phase::Blank)?;
                clock::wait(ctx.timing.iti);
                TrialState::Done(row)
            }
            TrialState::Done(row) => return Ok(row),
        };
    }
}

/// Runs every trial in order, stopping at the first failure.
pub fn run_session<E, S, R>(
    ctx: &mut SessionContext<E, S, R>,
    trials: &[TrialSpec],
) -> Result<SessionSummary>
where
    E: EventSource,
    S: Surface,
    R: ResultSink,
{
    let mut summary = SessionSummary::default();
    for (index, spec) in trials.iter().enumerate() {
        let row = run_trial(ctx, index, spec)?;
        summary.add(&row);
    }
    Ok(summary)
}
