//! espeak-ng backend.
//!
//! Runs `espeak-ng -w <file> --stdin` and feeds the reply on stdin, so text
//! that starts with `-` is never read as an option.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::SpeechError;

/// espeak-ng's default speaking rate in words per minute.
const BASE_WPM: f32 = 175.0;

pub struct EspeakEngine {
    binary: String,
    voice: String,
    speed: f32,
}

impl EspeakEngine {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
        }
    }

    fn words_per_minute(&self) -> u32 {
        (BASE_WPM * self.speed.clamp(0.25, 4.0)).round() as u32
    }

    /// Write speech for `text` into `output` and wait for the process to exit.
    pub async fn synthesize_to(&self, text: &str, output: &Path) -> Result<(), SpeechError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("-w")
            .arg(output)
            .arg("-s")
            .arg(self.words_per_minute().to_string());
        if !self.voice.is_empty() {
            command.arg("-v").arg(&self.voice);
        }
        command
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| SpeechError::Spawn {
            binary: self.binary.clone(),
            detail: e.to_string(),
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpeechError::Failed("Failed to open stdin".to_string()))?;
        let text_owned = text.to_string();

        // Write on a separate task so a chatty stderr cannot deadlock us.
        let write_task = tokio::spawn(async move {
            stdin.write_all(text_owned.as_bytes()).await?;
            stdin.shutdown().await
        });

        let output_status = child
            .wait_with_output()
            .await
            .map_err(|e| SpeechError::Failed(format!("Failed to wait for {}: {e}", self.binary)))?;

        match write_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(SpeechError::Failed(format!(
                    "Failed to write to {} stdin: {e}",
                    self.binary
                )))
            }
            Err(e) => return Err(SpeechError::Failed(format!("Stdin task failed: {e}"))),
        }

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(SpeechError::Failed(format!(
                "{} exited with {}: {}",
                self.binary,
                output_status.status,
                stderr.trim()
            )));
        }

        debug!("{} finished writing {}", self.binary, output.display());
        Ok(())
    }
}
