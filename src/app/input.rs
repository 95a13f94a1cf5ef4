//! Key to action mapping for the reader

use crossterm::event::{KeyCode, KeyModifiers};

/// Vim-style key mapping (basic, without modifiers)
pub fn vim_key_to_action(key: KeyCode) -> Option<Action> {
    match key {
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('h') | KeyCode::Left => Some(Action::FocusNavigation),
        KeyCode::Char('l') | KeyCode::Right => Some(Action::FocusContent),
        KeyCode::Tab => Some(Action::SwitchFocus),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Enter => Some(Action::Select),
        KeyCode::Char(' ') | KeyCode::Char('o') => Some(Action::ToggleExpand),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('n') => Some(Action::NextSection),
        KeyCode::Char('N') => Some(Action::PrevSection),
        KeyCode::Char('[') => Some(Action::ToggleNavigation),
        KeyCode::Char('/') => Some(Action::Search),
        KeyCode::Char('t') => Some(Action::Templates),
        KeyCode::Char('p') => Some(Action::Progress),
        KeyCode::Char('?') => Some(Action::Help),
        KeyCode::Char('y') => Some(Action::CopyCode),
        KeyCode::Char('b') => Some(Action::Bookmark),
        KeyCode::Char('m') => Some(Action::MarkComplete),
        KeyCode::Char('x') => Some(Action::DismissNotification),
        KeyCode::Char(':') => Some(Action::CommandMode),
        // 'q' is deliberately unmapped; quit with :q
        _ => None,
    }
}

/// Key mapping with modifiers (for Ctrl combinations)
pub fn key_with_modifier_to_action(key: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    if modifiers.contains(KeyModifiers::CONTROL) {
        match key {
            KeyCode::Char('d') => Some(Action::HalfPageDown),
            KeyCode::Char('u') => Some(Action::HalfPageUp),
            KeyCode::Char('f') => Some(Action::PageDown),
            KeyCode::Char('b') => Some(Action::PageUp),
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        }
    } else {
        vim_key_to_action(key)
    }
}

/// Actions that can be taken in the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Movement
    Up,
    Down,
    Top,
    Bottom,
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    NextSection,
    PrevSection,

    // Panels
    FocusNavigation,
    FocusContent,
    SwitchFocus,
    ToggleNavigation,
    ToggleExpand,
    Select,
    Back,

    // Overlays
    Search,
    Templates,
    Progress,
    Help,

    // Reader actions
    CopyCode,
    Bookmark,
    MarkComplete,
    DismissNotification,
    CommandMode,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vim_movement_keys() {
        assert_eq!(vim_key_to_action(KeyCode::Char('j')), Some(Action::Down));
        assert_eq!(vim_key_to_action(KeyCode::Char('k')), Some(Action::Up));
        assert_eq!(vim_key_to_action(KeyCode::Char('G')), Some(Action::Bottom));
    }

    #[test]
    fn q_is_not_quit() {
        assert_eq!(vim_key_to_action(KeyCode::Char('q')), None);
    }

    #[test]
    fn reader_actions() {
        assert_eq!(vim_key_to_action(KeyCode::Char('y')), Some(Action::CopyCode));
        assert_eq!(vim_key_to_action(KeyCode::Char('b')), Some(Action::Bookmark));
        assert_eq!(vim_key_to_action(KeyCode::Char('/')), Some(Action::Search));
    }

    #[test]
    fn ctrl_combinations() {
        assert_eq!(
            key_with_modifier_to_action(KeyCode::Char('d'), KeyModifiers::CONTROL),
            Some(Action::HalfPageDown)
        );
        assert_eq!(
            key_with_modifier_to_action(KeyCode::Char('b'), KeyModifiers::CONTROL),
            Some(Action::PageUp)
        );
        assert_eq!(
            key_with_modifier_to_action(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(Action::Quit)
        );
    }

    #[test]
    fn plain_b_bookmarks() {
        assert_eq!(
            key_with_modifier_to_action(KeyCode::Char('b'), KeyModifiers::NONE),
            Some(Action::Bookmark)
        );
    }
}
