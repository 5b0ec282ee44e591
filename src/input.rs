//! Key bindings: arrows and vim-style letters.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    RotateCw,
    RotateCcw,
    /// Select preview slot (0-based).
    Slot(usize),
    NextSlot,
    Place,
    Pause,
    Restart,
    Quit,
    None,
}

impl Action {
    /// Cursor movement keys auto-repeat while held.
    pub fn repeats(self) -> bool {
        matches!(self, Self::Up | Self::Down | Self::Left | Self::Right)
    }
}

/// Map key event to action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Char('x' | 'i') => Action::RotateCw,
        KeyCode::Char('z' | 'u') => Action::RotateCcw,
        KeyCode::Char(c @ '1'..='9') => Action::Slot(c as usize - '1' as usize),
        KeyCode::Tab => Action::NextSlot,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Place,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_and_vim_agree() {
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::Left);
        assert_eq!(key_to_action(key(KeyCode::Char('h'))), Action::Left);
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Action::Down);
        assert_eq!(key_to_action(key(KeyCode::Up)), Action::Up);
    }

    #[test]
    fn test_slot_keys() {
        assert_eq!(key_to_action(key(KeyCode::Char('1'))), Action::Slot(0));
        assert_eq!(key_to_action(key(KeyCode::Char('3'))), Action::Slot(2));
        assert_eq!(key_to_action(key(KeyCode::Tab)), Action::NextSlot);
    }

    #[test]
    fn test_ctrl_is_ignored() {
        let k = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(k), Action::None);
    }
}
