//! pdf-bot: ask questions about a PDF, hear the answers, keep a log.

pub mod app;
pub mod config;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod handler;
pub mod history;
pub mod prompt;
pub mod session;
pub mod speech;
pub mod tui;
pub mod ui;
