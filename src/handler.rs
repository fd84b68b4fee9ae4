use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Focus};
use crate::tui::{AppEvent, EventSender};

pub fn handle_event(app: &mut App, event: AppEvent, tx: &EventSender) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, tx),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(result) => app.on_reply(result),
        AppEvent::Finished(effects) => app.on_finished(effects),
    }
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &EventSender) {
    // Global keys that work in any pane
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    match key.code {
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::F(2) => {
            app.toggle_tone();
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Input => handle_input(app, key, tx),
        Focus::Tone => handle_tone(app, key, tx),
        Focus::History => handle_history(app, key, tx),
    }
}

fn handle_input(app: &mut App, key: KeyEvent, tx: &EventSender) {
    match key.code {
        KeyCode::Enter => app.submit(tx),
        KeyCode::Esc => app.focus = Focus::Tone,
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.move_cursor(-1),
        KeyCode::Right => app.move_cursor(1),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

/// Keys shared by the non-editing panes.
fn handle_common(app: &mut App, key: KeyEvent, tx: &EventSender) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit(tx),
        KeyCode::Char('p') => app.play_audio(),
        KeyCode::Char('s') => app.stop_audio(),
        KeyCode::Char('i') => app.focus = Focus::Input,
        _ => {}
    }
}

fn handle_tone(app: &mut App, key: KeyEvent, tx: &EventSender) {
    match key.code {
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') | KeyCode::Char('h') | KeyCode::Char('l') => {
            app.toggle_tone()
        }
        _ => handle_common(app, key, tx),
    }
}

fn handle_history(app: &mut App, key: KeyEvent, tx: &EventSender) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.history_down(),
        KeyCode::Char('k') | KeyCode::Up => app.history_up(),
        KeyCode::Char('g') => app.history_state.select(Some(0)),
        KeyCode::Char('G') => {
            if !app.history.is_empty() {
                app.history_state.select(Some(app.history.len() - 1));
            }
        }
        KeyCode::Char('r') => app.reload_history(),
        _ => handle_common(app, key, tx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::history::LogRecord;
    use crate::prompt::Tone;
    use tokio::sync::mpsc;

    fn press(app: &mut App, code: KeyCode, tx: &EventSender) {
        handle_event(app, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)), tx);
    }

    #[test]
    fn letters_type_into_the_input_instead_of_acting() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (tx, _rx) = mpsc::unbounded_channel();

        for c in "qps".chars() {
            press(&mut app, KeyCode::Char(c), &tx);
        }
        assert_eq!(app.input, "qps");
        assert!(!app.should_quit);
    }

    #[test]
    fn tab_cycles_focus_and_tone_pane_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (tx, _rx) = mpsc::unbounded_channel();

        press(&mut app, KeyCode::Tab, &tx);
        assert_eq!(app.focus, Focus::History);
        press(&mut app, KeyCode::Tab, &tx);
        assert_eq!(app.focus, Focus::Tone);

        press(&mut app, KeyCode::Right, &tx);
        assert_eq!(app.tone, Tone::Friendly);
        press(&mut app, KeyCode::F(2), &tx);
        assert_eq!(app.tone, Tone::Formal);

        press(&mut app, KeyCode::Char('q'), &tx);
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_c_quits_from_the_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (tx, _rx) = mpsc::unbounded_channel();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            &tx,
        );
        assert!(app.should_quit);
        assert!(app.input.is_empty());
    }

    #[test]
    fn history_navigation_stays_in_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (tx, _rx) = mpsc::unbounded_channel();
        app.history = (0..3)
            .map(|i| LogRecord::now(&format!("q{i}"), "a", "Formal"))
            .collect();
        app.focus = Focus::History;

        press(&mut app, KeyCode::Char('g'), &tx);
        press(&mut app, KeyCode::Char('k'), &tx);
        assert_eq!(app.history_state.selected(), Some(0));
        for _ in 0..5 {
            press(&mut app, KeyCode::Char('j'), &tx);
        }
        assert_eq!(app.history_state.selected(), Some(2));
    }

    #[test]
    fn play_without_audio_leaves_a_notice() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(dir.path());
        let (tx, _rx) = mpsc::unbounded_channel();
        app.focus = Focus::Tone;
        press(&mut app, KeyCode::Char('p'), &tx);
        assert_eq!(app.notices, vec!["No audio for this reply".to_string()]);
    }
}
