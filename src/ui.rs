use std::io::{self, Stdout};

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Paragraph, Widget},
    Terminal,
};

use crate::display::{Phase, Surface};
use crate::error::{Result, SessionError};
use crate::trial::ColorLabel;

const BACKGROUND: Color = Color::DarkGray;

impl From<ColorLabel> for Color {
    fn from(label: ColorLabel) -> Self {
        match label {
            ColorLabel::Red => Color::Red,
            ColorLabel::Blue => Color::Blue,
            ColorLabel::Green => Color::Green,
            ColorLabel::Yellow => Color::Yellow,
        }
    }
}

/// Full-screen rendering of one phase: a neutral background with the
/// fixation cross or the coloured word centred on it.
pub struct StimulusView<'a> {
    phase: &'a Phase,
}

impl<'a> StimulusView<'a> {
    pub fn new(phase: &'a Phase) -> Self {
        Self { phase }
    }
}

impl Widget for StimulusView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Block::default()
            .style(Style::default().bg(BACKGROUND))
            .render(area, buf);

        let bold_style = Style::default().add_modifier(Modifier::BOLD).bg(BACKGROUND);
        let span = match self.phase {
            Phase::Fixation => Span::styled("+", bold_style.fg(Color::White)),
            Phase::Stimulus { word, color } => {
                Span::styled(word.as_str(), bold_style.fg(Color::from(*color)))
            }
            Phase::Blank => return,
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(50),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(area);

        Paragraph::new(span)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

/// Terminal surface: raw mode, alternate screen, hidden cursor.
///
/// The terminal is restored by `release`, or on drop if `release` never ran.
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    current: Phase,
    active: bool,
}

impl TerminalSurface {
    pub fn new() -> Result<Self> {
        enable_raw_mode().map_err(SessionError::display)?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(SessionError::display(e));
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(t) => t,
            Err(e) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
                let _ = disable_raw_mode();
                return Err(SessionError::display(e));
            }
        };
        Ok(Self {
            terminal,
            current: Phase::Blank,
            active: true,
        })
    }

    fn draw(&mut self) -> Result<()> {
        if !self.active {
            return Err(SessionError::display("terminal already released"));
        }
        let phase = &self.current;
        self.terminal
            .draw(|f| f.render_widget(StimulusView::new(phase), f.area()))
            .map_err(SessionError::display)?;
        Ok(())
    }
}

impl Surface for TerminalSurface {
    fn show(&mut self, phase: &Phase) -> Result<()> {
        self.current = phase.clone();
        self.draw()
    }

    fn redraw(&mut self) -> Result<()> {
        self.terminal.autoresize().map_err(SessionError::display)?;
        self.draw()
    }

    fn release(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let left = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show);
        let raw = disable_raw_mode();
        left.and(raw).map_err(SessionError::display)
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "restoring terminal on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(phase: &Phase, area: Rect) -> Buffer {
        let mut buf = Buffer::empty(area);
        StimulusView::new(phase).render(area, &mut buf);
        buf
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    /// Rows holding any visible text.
    fn text_rows(buf: &Buffer) -> Vec<(u16, String)> {
        (0..buf.area.height)
            .map(|y| (y, row_text(buf, y)))
            .filter(|(_, text)| !text.trim().is_empty())
            .collect()
    }

    #[test]
    fn label_colors_map_to_terminal_colors() {
        assert_eq!(Color::from(ColorLabel::Red), Color::Red);
        assert_eq!(Color::from(ColorLabel::Blue), Color::Blue);
        assert_eq!(Color::from(ColorLabel::Green), Color::Green);
        assert_eq!(Color::from(ColorLabel::Yellow), Color::Yellow);
    }

    #[test]
    fn stimulus_word_is_centred_in_its_ink_colour() {
        let area = Rect::new(0, 0, 20, 10);
        let buf = render(
            &Phase::Stimulus {
                word: "BLUE".into(),
                color: ColorLabel::Yellow,
            },
            area,
        );

        let rows = text_rows(&buf);
        assert_eq!(rows.len(), 1);
        let (y, text) = &rows[0];
        assert_eq!(text.trim(), "BLUE");
        assert!((4..=5).contains(y));
        let x = text.find('B').unwrap() as u16;
        assert_eq!(x, 8);
        let cell = &buf[(x, *y)];
        assert_eq!(cell.fg, Color::Yellow);
        assert_eq!(cell.bg, BACKGROUND);
        assert!(cell.modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn fixation_is_a_white_cross() {
        let area = Rect::new(0, 0, 21, 9);
        let buf = render(&Phase::Fixation, area);

        let rows = text_rows(&buf);
        assert_eq!(rows.len(), 1);
        let (y, text) = &rows[0];
        assert_eq!(text.trim(), "+");
        let x = text.find('+').unwrap() as u16;
        assert_eq!(x, 10);
        assert_eq!(buf[(x, *y)].fg, Color::White);
    }

    #[test]
    fn blank_fills_background_only() {
        let area = Rect::new(0, 0, 8, 4);
        let buf = render(&Phase::Blank, area);
        for y in 0..4 {
            assert_eq!(row_text(&buf, y).trim(), "");
            for x in 0..8 {
                assert_eq!(buf[(x, y)].bg, BACKGROUND);
            }
        }
    }
}
