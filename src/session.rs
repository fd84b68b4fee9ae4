//! Question pipeline and the controller state machine.
//!
//! IDLE → AWAITING_REPLY → DISPLAYING → IDLE | ERROR
//!
//! A question is answered in two phases: the Gemini query, whose result is
//! shown as soon as it arrives, then the side effects (speech and the log
//! append). The controller only tracks where the single in-flight request is.

use std::fmt;
use std::sync::Arc;

use tempfile::TempPath;
use tracing::{info, warn};

use crate::error::{LogError, SpeechError};
use crate::extractor::DocumentText;
use crate::gemini::{GeminiClient, QueryResult};
use crate::history::{InteractionLog, LogRecord};
use crate::prompt::Tone;
use crate::speech::SpeechSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingReply,
    Displaying,
    Error,
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::AwaitingReply | Self::Displaying)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::AwaitingReply => write!(f, "AWAITING_REPLY"),
            Self::Displaying => write!(f, "DISPLAYING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Why a submit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    Busy,
    NoDocument,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "A request is already in progress"),
            Self::NoDocument => write!(f, "No document text loaded"),
        }
    }
}

/// Tracks the lifecycle of the one request allowed at a time.
#[derive(Debug, Default)]
pub struct Controller {
    state: SessionState,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn submit(&mut self, document: &DocumentText) -> Result<(), SubmitRejected> {
        if self.state.is_busy() {
            return Err(SubmitRejected::Busy);
        }
        if document.is_empty() {
            return Err(SubmitRejected::NoDocument);
        }
        self.transition(SessionState::AwaitingReply);
        Ok(())
    }

    pub fn reply_received(&mut self) {
        if self.state == SessionState::AwaitingReply {
            self.transition(SessionState::Displaying);
        }
    }

    pub fn side_effects_done(&mut self, all_ok: bool) {
        if self.state != SessionState::Displaying {
            return;
        }
        let next = if all_ok {
            SessionState::Idle
        } else {
            SessionState::Error
        };
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        info!("State: {} → {}", self.state, next);
        self.state = next;
    }
}

/// Outcome of the speech and log steps that follow a reply.
#[derive(Debug)]
pub struct SideEffects {
    /// `None` when speech output is disabled.
    pub audio: Result<Option<TempPath>, SpeechError>,
    pub logged: Result<LogRecord, LogError>,
}

impl SideEffects {
    pub fn all_ok(&self) -> bool {
        self.audio.is_ok() && self.logged.is_ok()
    }

    /// User-facing notices for whatever went wrong.
    pub fn notices(&self) -> Vec<String> {
        let mut notices = Vec::new();
        if let Err(e) = &self.audio {
            notices.push(format!("🔇 {e}"));
        }
        if let Err(e) = &self.logged {
            notices.push(format!("❌ Unable to log conversation: {e}"));
        }
        notices
    }
}

/// One complete question/answer exchange.
#[derive(Debug)]
pub struct Exchange {
    pub question: String,
    pub tone: Tone,
    pub result: QueryResult,
    pub effects: SideEffects,
}

impl Exchange {
    pub fn reply_text(&self) -> String {
        self.result.display_text()
    }
}

/// Reply text with markdown emphasis markers removed.
pub fn plain_reply(text: &str) -> String {
    text.replace('*', "")
}

/// Everything a question needs, shared with spawned pipeline tasks.
#[derive(Clone)]
pub struct Session {
    document: DocumentText,
    gemini: GeminiClient,
    speech: Arc<SpeechSynthesizer>,
    log: InteractionLog,
}

impl Session {
    pub fn new(
        document: DocumentText,
        gemini: GeminiClient,
        speech: SpeechSynthesizer,
        log: InteractionLog,
    ) -> Self {
        Self {
            document,
            gemini,
            speech: Arc::new(speech),
            log,
        }
    }

    pub fn document(&self) -> &DocumentText {
        &self.document
    }

    pub fn log(&self) -> &InteractionLog {
        &self.log
    }

    pub fn speech(&self) -> &SpeechSynthesizer {
        &self.speech
    }

    pub fn gemini_model(&self) -> &str {
        self.gemini.model()
    }

    pub async fn query(&self, question: &str, tone: Tone) -> QueryResult {
        info!("Asking ({tone}): {question:?}");
        self.gemini.query(self.document.as_str(), question, tone).await
    }

    /// Speak the reply and append the exchange to the log.
    ///
    /// The log gets the text exactly as displayed, sentinel and error texts
    /// included.
    pub async fn side_effects(&self, question: &str, tone: Tone, result: &QueryResult) -> SideEffects {
        let reply = result.display_text();

        let audio = if self.speech.is_enabled() {
            self.speech.synthesize(&plain_reply(&reply)).await.map(Some)
        } else {
            Ok(None)
        };
        if let Err(e) = &audio {
            warn!("Speech failed: {e}");
        }

        let log = self.log.clone();
        let question = question.to_string();
        let logged = tokio::task::spawn_blocking(move || log.append(&question, &reply, tone.as_str()))
            .await
            .unwrap_or_else(|e| Err(LogError::Io(std::io::Error::other(e.to_string()))));
        if let Err(e) = &logged {
            warn!("Log append failed: {e}");
        }

        SideEffects { audio, logged }
    }

    /// Full pipeline for one question.
    pub async fn ask(&self, question: &str, tone: Tone) -> Exchange {
        let result = self.query(question, tone).await;
        let effects = self.side_effects(question, tone, &result).await;
        Exchange {
            question: question.to_string(),
            tone,
            result,
            effects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> DocumentText {
        DocumentText::new("Water boils at 100 degrees Celsius.")
    }

    #[test]
    fn happy_path_returns_to_idle() {
        let mut controller = Controller::new();
        assert_eq!(controller.state(), SessionState::Idle);

        controller.submit(&doc()).unwrap();
        assert_eq!(controller.state(), SessionState::AwaitingReply);
        controller.reply_received();
        assert_eq!(controller.state(), SessionState::Displaying);
        controller.side_effects_done(true);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn failed_side_effect_lands_in_error_and_allows_resubmit() {
        let mut controller = Controller::new();
        controller.submit(&doc()).unwrap();
        controller.reply_received();
        controller.side_effects_done(false);
        assert_eq!(controller.state(), SessionState::Error);

        controller.submit(&doc()).unwrap();
        assert_eq!(controller.state(), SessionState::AwaitingReply);
    }

    #[test]
    fn submit_while_in_flight_is_rejected() {
        let mut controller = Controller::new();
        controller.submit(&doc()).unwrap();
        assert_eq!(controller.submit(&doc()), Err(SubmitRejected::Busy));
        assert_eq!(controller.state(), SessionState::AwaitingReply);

        controller.reply_received();
        assert_eq!(controller.submit(&doc()), Err(SubmitRejected::Busy));
        assert_eq!(controller.state(), SessionState::Displaying);
    }

    #[test]
    fn empty_document_cannot_be_queried() {
        let mut controller = Controller::new();
        let empty = DocumentText::new("   \n ");
        assert_eq!(controller.submit(&empty), Err(SubmitRejected::NoDocument));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut controller = Controller::new();
        controller.reply_received();
        controller.side_effects_done(true);
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn plain_reply_strips_asterisks() {
        assert_eq!(plain_reply("**Boiling** is *fun*"), "Boiling is fun");
    }

    #[test]
    fn notices_name_each_failure() {
        let effects = SideEffects {
            audio: Err(SpeechError::NoAudio),
            logged: Err(LogError::Io(std::io::Error::other("disk full"))),
        };
        assert!(!effects.all_ok());
        let notices = effects.notices();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].contains("no audio"));
        assert!(notices[1].contains("disk full"));
    }
}
