//! Terminal event polling

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyModifiers};

use calldock_app::Gesture;
use calldock_core::prelude::*;

/// What one poll of the terminal produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermEvent {
    Gesture(Gesture),
    /// Ctrl-C / Ctrl-Q: leave the host application.
    Quit,
    /// Poll timeout; redraw opportunity.
    Tick,
}

/// Convert a crossterm key event into a widget gesture.
pub fn key_event_to_gesture(key: crossterm::event::KeyEvent) -> Option<Gesture> {
    match key.code {
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Gesture::ToggleWidget)
        }
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(c) => Some(Gesture::Char(c)),
        KeyCode::Enter => Some(Gesture::Enter),
        KeyCode::Esc => Some(Gesture::Esc),
        KeyCode::Tab => Some(Gesture::Tab),
        KeyCode::Backspace => Some(Gesture::Backspace),
        KeyCode::Up => Some(Gesture::Up),
        KeyCode::Down => Some(Gesture::Down),
        KeyCode::Left => Some(Gesture::Left),
        KeyCode::Right => Some(Gesture::Right),
        _ => None, // Unsupported keys ignored
    }
}

/// Poll for terminal events with a 50ms timeout (20 FPS).
pub fn poll() -> Result<TermEvent> {
    if event::poll(Duration::from_millis(50))? {
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                let quit = matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if quit {
                    return Ok(TermEvent::Quit);
                }
                match key_event_to_gesture(key) {
                    Some(gesture) => Ok(TermEvent::Gesture(gesture)),
                    None => Ok(TermEvent::Tick),
                }
            }
            _ => Ok(TermEvent::Tick),
        }
    } else {
        Ok(TermEvent::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    #[test]
    fn test_char_conversion() {
        let key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(key_event_to_gesture(key), Some(Gesture::Char('a')));
    }

    #[test]
    fn test_ctrl_t_toggles_widget() {
        let key = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL);
        assert_eq!(key_event_to_gesture(key), Some(Gesture::ToggleWidget));
    }

    #[test]
    fn test_other_ctrl_chords_ignored() {
        let key = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(key_event_to_gesture(key), None);
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)),
            Some(Gesture::Up)
        );
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE)),
            Some(Gesture::Down)
        );
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE)),
            Some(Gesture::Left)
        );
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE)),
            Some(Gesture::Right)
        );
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Gesture::Enter)
        );
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(Gesture::Esc)
        );
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE)),
            Some(Gesture::Tab)
        );
        assert_eq!(
            key_event_to_gesture(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(Gesture::Backspace)
        );
    }

    #[test]
    fn test_uppercase_letters() {
        let key = KeyEvent::new(KeyCode::Char('B'), KeyModifiers::SHIFT);
        assert_eq!(key_event_to_gesture(key), Some(Gesture::Char('B')));
    }

    #[test]
    fn test_unsupported_key_returns_none() {
        let key = KeyEvent::new(KeyCode::Insert, KeyModifiers::NONE);
        assert_eq!(key_event_to_gesture(key), None);
    }
}
