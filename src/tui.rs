use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::Frame;

use crate::error::Result;
use crate::fmt::amount;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const NOTICE_STYLE: Style = Style::new().fg(Color::Yellow);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

/// Signed amount as a colored Span (red below zero).
pub fn amount_span(value: f64) -> Span<'static> {
    let style = if value < 0.0 {
        AMOUNT_NEG_STYLE
    } else {
        AMOUNT_POS_STYLE
    };
    Span::styled(amount(value), style)
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

pub enum ViewAction {
    Continue,
    Close,
}

/// A full-screen view redrawn after every key press.
///
/// Views own their paging and any text-entry mode: `handle_key` sees every
/// press except Ctrl-C, so a view collecting input decides itself whether
/// `Esc` cancels the edit or closes the view. Parameter changes must be
/// applied before `handle_key` returns; the next `draw` shows them.
pub trait View {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, code: KeyCode) -> ViewAction;
}

/// Ctrl-C ends the session whatever mode the view is in.
fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Draw `view`, feed it key presses until it closes or Ctrl-C, then restore
/// the terminal. A panic also restores it before the message prints.
pub fn run_view(view: &mut dyn View) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| view.draw(frame)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if is_interrupt(&key) {
                    break Ok(());
                }
                if let ViewAction::Close = view.handle_key(key.code) {
                    break Ok(());
                }
            }
            // resizes and mouse events only need the redraw at the top
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        let (wrapped, lines) = wrap_text("No data found for Account ID 5740", 12);
        assert!(lines > 1);
        assert!(wrapped.lines().all(|l| l.len() <= 12));
        assert_eq!(wrap_text("abc", 0), ("abc".to_string(), 1));
    }

    #[test]
    fn test_only_ctrl_c_interrupts() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(is_interrupt(&ctrl_c));
        assert!(!is_interrupt(&plain_c));
        assert!(!is_interrupt(&ctrl_q));
    }

    #[test]
    fn test_amount_span_colors_by_sign() {
        assert_eq!(amount_span(-3.0).style, AMOUNT_NEG_STYLE);
        assert_eq!(amount_span(3.0).style, AMOUNT_POS_STYLE);
        assert_eq!(amount_span(-3.0).content, "-3.00");
    }
}
