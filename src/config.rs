//! Configuration management for pdf-bot.
//!
//! Loads config from YAML files in standard locations. Every section has
//! defaults, so a missing or partial file is fine.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub path: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("science.pdf"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    pub host: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds; 0 waits indefinitely.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-lite".into(),
            host: "https://generativelanguage.googleapis.com".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Read the key from the environment (populated from `.env` at startup).
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngineKind {
    Espeak,
    Kokoro,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: SpeechEngineKind,
    /// espeak-ng binary name or path.
    pub binary: String,
    /// Voice name; empty uses the engine default.
    pub voice: String,
    pub speed: f32,
    /// Keep generated audio files after the session ends.
    pub keep_audio: bool,
    /// Kokoro model directory (kokoro-v1.0.onnx, voices-v1.0.bin, tokenizer.json).
    pub model_dir: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            engine: SpeechEngineKind::Espeak,
            binary: "espeak-ng".into(),
            voice: String::new(),
            speed: 1.0,
            keep_audio: false,
            model_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Spreadsheet holding the interaction history.
    pub history_file: PathBuf,
    /// Diagnostic log written by tracing.
    pub trace_file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            history_file: PathBuf::from("chat_log.xlsx"),
            trace_file: PathBuf::from("pdf-bot.log"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub title: String,
    /// Event tick in milliseconds, drives the waiting animation.
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "Science for kids - PDF Bot".into(),
            tick_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub gemini: GeminiConfig,
    pub speech: SpeechConfig,
    pub log: LogConfig,
    pub ui: UiConfig,
    /// File the settings came from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from YAML file.
    ///
    /// Searches standard locations if no path is provided:
    /// 1. ./config.yaml
    /// 2. ~/.config/pdf-bot/config.yaml
    /// 3. /etc/pdf-bot/config.yaml
    ///
    /// No file anywhere is not an error; the defaults are used. Runs before
    /// tracing is set up, so nothing is logged here.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map(PathBuf::from).or_else(|| {
            let candidates = [
                std::env::current_dir().ok().map(|d| d.join("config.yaml")),
                dirs::home_dir().map(|h| h.join(".config/pdf-bot/config.yaml")),
                Some(PathBuf::from("/etc/pdf-bot/config.yaml")),
            ];
            candidates.into_iter().flatten().find(|p| p.exists())
        });

        let Some(config_path) = resolved else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let mut config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.clone(),
            source,
        })?;
        config.source = Some(config_path);
        Ok(config)
    }

    /// Like [`Config::load`], but an unusable file falls back to the defaults.
    /// The reason is handed back so the caller can report it once logging is up.
    pub fn load_or_default(path: Option<&Path>) -> (Self, Option<ConfigError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_setup() {
        let config = Config::default();
        assert_eq!(config.document.path, PathBuf::from("science.pdf"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash-lite");
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.log.history_file, PathBuf::from("chat_log.xlsx"));
        assert_eq!(config.speech.engine, SpeechEngineKind::Espeak);
        assert!(!config.speech.keep_audio);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = Config::parse(
            "gemini:\n  model: gemini-1.5-flash\n  timeout_secs: 0\nspeech:\n  engine: disabled\n",
        )
        .unwrap();
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.timeout(), None);
        assert_eq!(config.gemini.host, "https://generativelanguage.googleapis.com");
        assert_eq!(config.speech.engine, SpeechEngineKind::Disabled);
        assert_eq!(config.speech.binary, "espeak-ng");
        assert_eq!(config.document.path, PathBuf::from("science.pdf"));
    }

    #[test]
    fn explicit_path_that_fails_to_parse_falls_back_with_a_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "gemini: [not, a, map").unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Parse { .. })));

        let (config, reason) = Config::load_or_default(Some(&path));
        assert_eq!(config.gemini.model, "gemini-2.0-flash-lite");
        assert_eq!(config.source, None);
        let reason = reason.unwrap().to_string();
        assert!(reason.starts_with("Failed to parse"), "{reason}");
        assert!(reason.contains("config.yaml"), "{reason}");
    }

    #[test]
    fn unreadable_explicit_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (config, reason) = Config::load_or_default(Some(&dir.path().join("missing.yaml")));
        assert_eq!(config.document.path, PathBuf::from("science.pdf"));
        assert!(matches!(reason, Some(ConfigError::Read { .. })));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "document:\n  path: other.pdf\nlog:\n  history_file: h.xlsx\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert_eq!(config.document.path, PathBuf::from("other.pdf"));
        assert_eq!(config.log.history_file, PathBuf::from("h.xlsx"));
    }

    #[test]
    fn missing_api_key_env_is_none() {
        let gemini = GeminiConfig {
            api_key_env: "PDF_BOT_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..GeminiConfig::default()
        };
        assert_eq!(gemini.api_key(), None);
    }
}
