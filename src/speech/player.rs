//! Playback of generated WAV files through the default output device.

use std::path::Path;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info};

use crate::error::PlaybackError;

/// Decoded WAV contents, interleaved f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl WavAudio {
    pub fn duration(&self) -> Duration {
        if self.channels == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }
}

/// Read a WAV file into f32 samples in [-1, 1].
pub fn read_wav(path: &Path) -> Result<WavAudio, PlaybackError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(WavAudio {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// The audio control: plays one file at a time, can be stopped.
///
/// The output device is opened on first use, so a machine without sound only
/// fails when the user actually presses play.
#[derive(Default)]
pub struct AudioPlayer {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
}

impl AudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing `path`, replacing whatever is playing now.
    pub fn play(&mut self, path: &Path) -> Result<Duration, PlaybackError> {
        let audio = read_wav(path)?;
        let duration = audio.duration();

        self.stop();

        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| PlaybackError::Output(e.to_string()))?;
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_ref() else {
            return Err(PlaybackError::Output("no output stream".into()));
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.append(SamplesBuffer::new(audio.channels, audio.sample_rate, audio.samples));
        self.sink = Some(sink);

        info!("Playing {} ({:.1}s)", path.display(), duration.as_secs_f64());
        Ok(duration)
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            debug!("Playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.empty())
    }
}
