use std::path::PathBuf;

use ratatui::widgets::TableState;
use tempfile::TempPath;
use tracing::{info, warn};

use crate::config::UiConfig;
use crate::gemini::QueryResult;
use crate::history::LogRecord;
use crate::prompt::Tone;
use crate::session::{Controller, Session, SessionState, SideEffects};
use crate::speech::AudioPlayer;
use crate::tui::{AppEvent, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Tone,
    #[default]
    Input,
    History,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Tone => Self::Input,
            Self::Input => Self::History,
            Self::History => Self::Tone,
        }
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub session: Session,
    pub controller: Controller,
    pub title: String,
    pub focus: Focus,
    pub tone: Tone,

    pub input: String,
    pub cursor: usize,

    pub question: Option<String>,
    pub reply: Option<QueryResult>,
    pub notices: Vec<String>,

    pub audio: Option<TempPath>,
    /// Earlier replies' audio, kept until the session ends.
    pub old_audio: Vec<TempPath>,
    pub keep_audio: bool,
    pub player: AudioPlayer,

    pub history: Vec<LogRecord>,
    pub history_state: TableState,

    pub animation_frame: u8,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: Session, ui: &UiConfig) -> Self {
        let keep_audio = session.speech().keep_audio();
        let mut app = Self {
            session,
            controller: Controller::new(),
            title: ui.title.clone(),
            focus: Focus::default(),
            tone: Tone::default(),
            input: String::new(),
            cursor: 0,
            question: None,
            reply: None,
            notices: Vec::new(),
            audio: None,
            old_audio: Vec::new(),
            keep_audio,
            player: AudioPlayer::new(),
            history: Vec::new(),
            history_state: TableState::default(),
            animation_frame: 0,
            should_quit: false,
        };
        app.reload_history();
        app
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn reload_history(&mut self) {
        match self.session.log().load_all() {
            Ok(records) => {
                self.history = records;
                if !self.history.is_empty() {
                    self.history_state.select(Some(self.history.len() - 1));
                }
            }
            Err(e) => {
                warn!("Cannot load history: {e}");
                self.notices.push(format!("❌ {e}"));
            }
        }
    }

    pub fn toggle_tone(&mut self) {
        self.tone = self.tone.toggle();
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let char_count = self.input.chars().count();
        self.cursor = self.cursor.saturating_add_signed(delta).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Send the current input (empty or not) with the selected tone.
    pub fn submit(&mut self, tx: &EventSender) {
        if let Err(reason) = self.controller.submit(self.session.document()) {
            info!("Submit ignored: {reason}");
            self.notices = vec![format!("⏳ {reason}")];
            return;
        }

        let question = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.question = Some(question.clone());
        self.reply = None;
        self.notices.clear();
        self.animation_frame = 0;

        let session = self.session.clone();
        let tone = self.tone;
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = session.query(&question, tone).await;
            if tx.send(AppEvent::Reply(result.clone())).is_err() {
                return;
            }
            let effects = session.side_effects(&question, tone, &result).await;
            let _ = tx.send(AppEvent::Finished(effects));
        });
    }

    pub fn on_reply(&mut self, result: QueryResult) {
        self.reply = Some(result);
        self.controller.reply_received();
    }

    pub fn on_finished(&mut self, effects: SideEffects) {
        let all_ok = effects.all_ok();
        self.notices.extend(effects.notices());

        if let Ok(Some(path)) = effects.audio {
            self.player.stop();
            if let Some(previous) = self.audio.replace(path) {
                self.old_audio.push(previous);
            }
        }
        if effects.logged.is_ok() {
            self.reload_history();
        }

        self.controller.side_effects_done(all_ok);
    }

    pub fn play_audio(&mut self) {
        let Some(path) = self.audio.as_ref() else {
            self.notices = vec!["No audio for this reply".to_string()];
            return;
        };
        if let Err(e) = self.player.play(path) {
            warn!("Playback failed: {e}");
            self.notices = vec![format!("🔇 {e}")];
        }
    }

    pub fn stop_audio(&mut self) {
        self.player.stop();
    }

    pub fn history_down(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let i = match self.history_state.selected() {
            Some(i) => (i + 1).min(self.history.len() - 1),
            None => 0,
        };
        self.history_state.select(Some(i));
    }

    pub fn history_up(&mut self) {
        let i = self.history_state.selected().unwrap_or(0).saturating_sub(1);
        self.history_state.select(Some(i));
    }

    pub fn tick_animation(&mut self) {
        if self.state() == SessionState::AwaitingReply {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// End of session: stop playback and either delete or keep the audio files.
    pub fn finish(&mut self) -> Vec<PathBuf> {
        self.player.stop();
        let files: Vec<TempPath> = self.old_audio.drain(..).chain(self.audio.take()).collect();
        if !self.keep_audio {
            info!("Removing {} audio files", files.len());
            return Vec::new();
        }

        files
            .into_iter()
            .filter_map(|path| match path.keep() {
                Ok(kept) => Some(kept),
                Err(e) => {
                    warn!("Cannot keep audio file: {e}");
                    None
                }
            })
            .collect()
    }
}
