use crate::error::Result;
use crate::trial::ColorLabel;

/// What the surface shows during each part of a trial.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Fixation,
    Stimulus { word: String, color: ColorLabel },
    Blank,
}

/// Presentation surface the sequencer draws on.
///
/// `show` must not return until the phase is visible: the sequencer takes the
/// stimulus onset as the moment `show` returns.
pub trait Surface {
    fn show(&mut self, phase: &Phase) -> Result<()>;

    /// Repaint whatever is currently shown, e.g. after a resize.
    fn redraw(&mut self) -> Result<()>;

    /// Hand the surface back to the system. Called once during teardown.
    fn release(&mut self) -> Result<()>;
}

type ShowHook = Box<dyn FnMut(usize, &Phase) -> Result<()> + Send>;

/// Surface with no output that remembers every phase it was asked to show.
///
/// A hook can be attached to react to each `show` call, which is how tests
/// inject key presses at stimulus onset or simulate a failing display.
#[derive(Default)]
pub struct HeadlessSurface {
    pub shown: Vec<Phase>,
    pub redraws: usize,
    pub released: bool,
    hook: Option<ShowHook>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// `hook` receives the zero-based count of previous `show` calls and the phase.
    pub fn with_hook<F>(hook: F) -> Self
    where
        F: FnMut(usize, &Phase) -> Result<()> + Send + 'static,
    {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::default()
        }
    }

    pub fn stimuli(&self) -> impl Iterator<Item = &Phase> {
        self.shown
            .iter()
            .filter(|p| matches!(p, Phase::Stimulus { .. }))
    }
}

impl Surface for HeadlessSurface {
    fn show(&mut self, phase: &Phase) -> Result<()> {
        let n = self.shown.len();
        if let Some(hook) = self.hook.as_mut() {
            hook(n, phase)?;
        }
        self.shown.push(phase.clone());
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        self.redraws += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }
}
