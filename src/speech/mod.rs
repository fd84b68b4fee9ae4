//! Speech output: turn a reply into a WAV file and play it back.
//!
//! Components:
//! - `espeak`: espeak-ng child process writing straight to the WAV file
//! - `kokoro`: native Kokoro ONNX inference (feature `kokoro`)
//! - `player`: rodio playback of a finished file
//!
//! Every request gets a fresh engine and a fresh temporary file. The file is
//! handed back as a [`TempPath`], so whoever holds it decides when it goes.

pub mod espeak;
#[cfg(feature = "kokoro")]
pub mod kokoro;
pub mod player;

use std::time::Instant;

use tempfile::TempPath;
use tracing::{debug, info};

use crate::config::{SpeechConfig, SpeechEngineKind};
use crate::error::SpeechError;

pub use player::AudioPlayer;

#[derive(Debug, Clone)]
pub struct SpeechSynthesizer {
    config: SpeechConfig,
}

impl SpeechSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.engine != SpeechEngineKind::Disabled
    }

    pub fn keep_audio(&self) -> bool {
        self.config.keep_audio
    }

    /// Synthesize `text` into a new temporary WAV file, waiting until it is complete.
    pub async fn synthesize(&self, text: &str) -> Result<TempPath, SpeechError> {
        if !self.is_enabled() {
            return Err(SpeechError::Unavailable("speech output is disabled".into()));
        }
        let t0 = Instant::now();
        let path = tempfile::Builder::new()
            .prefix("pdf-bot-reply-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();
        debug!("Synthesizing {} chars into {}", text.len(), path.display());

        if self.config.engine == SpeechEngineKind::Kokoro {
            self.synthesize_kokoro(text, &path).await?;
        } else {
            espeak::EspeakEngine::new(&self.config)
                .synthesize_to(text, &path)
                .await?;
        }

        let size = std::fs::metadata(&path)?.len();
        if size == 0 {
            return Err(SpeechError::NoAudio);
        }

        info!(
            "Speech ready: {} ({size} bytes, {}ms)",
            path.display(),
            t0.elapsed().as_millis()
        );
        Ok(path)
    }

    #[cfg(feature = "kokoro")]
    async fn synthesize_kokoro(&self, text: &str, path: &std::path::Path) -> Result<(), SpeechError> {
        let config = self.config.clone();
        let text = text.to_string();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut engine = kokoro::KokoroEngine::load(&config)?;
            engine.synthesize_to(&text, &path)
        })
        .await
        .map_err(|e| SpeechError::Failed(format!("Kokoro task failed: {e}")))?
    }

    #[cfg(not(feature = "kokoro"))]
    async fn synthesize_kokoro(&self, _text: &str, _path: &std::path::Path) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable(
            "built without the `kokoro` feature".into(),
        ))
    }
}
