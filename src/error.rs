use std::path::PathBuf;

use thiserror::Error;

/// A config file that exists but cannot be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

/// Failures while turning a PDF into document text.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Cannot read document {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse PDF: {0}")]
    Parse(String),

    #[error("Document contains no extractable text")]
    Empty,
}

/// Failures reading or rewriting the interaction log.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot read log {path}: {detail}")]
    Read { path: PathBuf, detail: String },

    #[error("Cannot write log: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Cannot replace log {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures producing the spoken audio file.
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Failed to create audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to spawn {binary}: {detail}")]
    Spawn { binary: String, detail: String },

    #[error("Speech engine failed: {0}")]
    Failed(String),

    #[error("Speech engine produced no audio")]
    NoAudio,

    #[error("Speech engine unavailable: {0}")]
    Unavailable(String),
}

/// Failures playing back a generated audio file.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to open audio output: {0}")]
    Output(String),

    #[error("Failed to read audio file: {0}")]
    Decode(#[from] hound::Error),
}
