//! Kokoro backend: text → phonemes → ONNX inference → WAV file.
//!
//! Pipeline:
//! 1. Text → sentences (split on .!?)
//! 2. Sentence → phonemes (misaki-rs G2P)
//! 3. Phonemes → token IDs (tokenizer.json vocabulary)
//! 4. Token IDs + voice style + speed → ONNX inference → f32 audio (24kHz)
//! 5. All sentences → one 16-bit mono WAV

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ndarray::{Array2, Array3};
use ndarray_npy::NpzReader;
use ort::value::Tensor;
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::error::SpeechError;

const SAMPLE_RATE: u32 = 24000;
const MAX_TOKENS: usize = 510; // Voice style array first dimension
const DEFAULT_VOICE: &str = "af_heart";
/// Silence between sentences.
const SENTENCE_GAP: usize = SAMPLE_RATE as usize / 8;

/// Loaded voice style data: shape (510, 256) after squeezing.
struct VoiceData {
    styles: Array2<f32>,
}

/// One Kokoro instance, loaded for a single reply.
pub struct KokoroEngine {
    session: ort::session::Session,
    phonemizer: misaki_rs::G2P,
    vocab: HashMap<char, i64>,
    voice: VoiceData,
    speed: f32,
}

fn failed(context: &str, e: impl std::fmt::Display) -> SpeechError {
    SpeechError::Failed(format!("{context}: {e}"))
}

impl KokoroEngine {
    /// Load the ONNX model, tokenizer, the configured voice and the phonemizer.
    /// Blocking; run it off the async runtime.
    pub fn load(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let t0 = Instant::now();
        let base_dir = if config.model_dir.is_empty() {
            std::env::current_dir()?
        } else {
            PathBuf::from(&config.model_dir)
        };

        let model_path = base_dir.join("kokoro-v1.0.onnx");
        let voices_path = base_dir.join("voices-v1.0.bin");
        let tokenizer_path = base_dir.join("tokenizer.json");
        for path in [&model_path, &voices_path, &tokenizer_path] {
            if !path.exists() {
                return Err(SpeechError::Unavailable(format!(
                    "Kokoro file not found: {}",
                    path.display()
                )));
            }
        }

        let vocab = load_tokenizer(&tokenizer_path)?;
        debug!("Tokenizer loaded: {} tokens", vocab.len());

        let voice_name = if config.voice.is_empty() {
            DEFAULT_VOICE
        } else {
            config.voice.as_str()
        };
        let voice = load_voice(&voices_path, voice_name)?;

        let session = ort::session::Session::builder()
            .map_err(|e| failed("Failed to create ONNX session builder", e))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| failed("Failed to set optimization level", e))?
            .with_intra_threads(4)
            .map_err(|e| failed("Failed to set thread count", e))?
            .commit_from_file(&model_path)
            .map_err(|e| failed("Failed to load ONNX model", e))?;

        let phonemizer = misaki_rs::G2P::new(misaki_rs::Language::EnglishUS);

        info!("Kokoro loaded in {}ms (voice: {voice_name})", t0.elapsed().as_millis());

        Ok(Self {
            session,
            phonemizer,
            vocab,
            voice,
            speed: config.speed,
        })
    }

    /// Generate every sentence and write the joined audio to `output`.
    pub fn synthesize_to(&mut self, text: &str, output: &Path) -> Result<(), SpeechError> {
        let sentences = split_sentences(text.trim());
        let mut audio: Vec<f32> = Vec::new();

        for (i, sentence) in sentences.iter().enumerate() {
            let t_gen = Instant::now();
            match self.generate_audio(sentence) {
                Ok(samples) if !samples.is_empty() => {
                    if !audio.is_empty() {
                        audio.extend(std::iter::repeat(0.0).take(SENTENCE_GAP));
                    }
                    audio.extend(samples);
                }
                Ok(_) => {}
                Err(e) => warn!("Kokoro generation failed for sentence {}: {e}", i + 1),
            }
            debug!(
                "Sentence {}/{}: gen={}ms",
                i + 1,
                sentences.len(),
                t_gen.elapsed().as_millis()
            );
        }

        if audio.is_empty() {
            return Err(SpeechError::NoAudio);
        }
        write_wav(output, &audio)
    }

    /// Generate audio samples for a single sentence.
    fn generate_audio(&mut self, text: &str) -> Result<Vec<f32>, SpeechError> {
        // 1. Text → phonemes via misaki-rs G2P
        let (phonemes, _tokens) = self
            .phonemizer
            .g2p(text)
            .map_err(|e| failed("Phonemization failed", e))?;

        if phonemes.is_empty() {
            return Ok(Vec::new());
        }

        // 2. Phonemes → token IDs, unknown characters skipped
        let mut token_ids: Vec<i64> = Vec::with_capacity(phonemes.len() + 2);
        token_ids.push(0);
        token_ids.extend(phonemes.chars().filter_map(|ch| self.vocab.get(&ch).copied()));
        token_ids.push(0);

        let n_tokens = token_ids.len().min(MAX_TOKENS);
        token_ids.truncate(n_tokens);

        // 3. Style vector for this token count
        let style_idx = (n_tokens.saturating_sub(2)).min(self.voice.styles.nrows() - 1);
        let style_vec: Vec<f32> = self.voice.styles.row(style_idx).to_vec();

        // 4. Input tensors
        let tokens_array = Array2::from_shape_vec((1, n_tokens), token_ids)
            .map_err(|e| failed("Failed to create tokens tensor", e))?;
        let tokens_tensor = Tensor::from_array(tokens_array)
            .map_err(|e| failed("Failed to create tokens ort tensor", e))?;

        let style_array = Array2::from_shape_vec((1, 256), style_vec)
            .map_err(|e| failed("Failed to create style tensor", e))?;
        let style_tensor = Tensor::from_array(style_array)
            .map_err(|e| failed("Failed to create style ort tensor", e))?;

        let speed_array = ndarray::Array1::from_vec(vec![self.speed]);
        let speed_tensor = Tensor::from_array(speed_array)
            .map_err(|e| failed("Failed to create speed ort tensor", e))?;

        // 5. Inference
        let outputs = self
            .session
            .run(ort::inputs![
                "tokens" => tokens_tensor,
                "style" => style_tensor,
                "speed" => speed_tensor
            ])
            .map_err(|e| failed("ONNX inference failed", e))?;

        // 6. First output is the waveform
        let first_output = outputs
            .iter()
            .next()
            .ok_or_else(|| SpeechError::Failed("No output tensor from model".into()))?;

        let (_shape, audio_slice) = first_output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| failed("Failed to extract audio tensor", e))?;

        Ok(audio_slice.to_vec())
    }
}

fn write_wav(path: &Path, samples: &[f32]) -> Result<(), SpeechError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let to_err = |e: hound::Error| SpeechError::Failed(format!("Failed to write WAV: {e}"));

    let mut writer = hound::WavWriter::create(path, spec).map_err(to_err)?;
    for &sample in samples {
        // f32 [-1, 1] → i16
        let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(s).map_err(to_err)?;
    }
    writer.finalize().map_err(to_err)
}

/// Load tokenizer vocabulary from tokenizer.json.
fn load_tokenizer(path: &Path) -> Result<HashMap<char, i64>, SpeechError> {
    let contents = fs::read_to_string(path)?;

    let data: serde_json::Value = serde_json::from_str(&contents)
        .map_err(|e| failed("Failed to parse tokenizer JSON", e))?;

    let vocab = data["model"]["vocab"]
        .as_object()
        .ok_or_else(|| SpeechError::Failed("Missing model.vocab in tokenizer.json".into()))?;

    let mut map = HashMap::new();
    for (token, id) in vocab {
        let id = id
            .as_i64()
            .ok_or_else(|| SpeechError::Failed("Token ID is not an integer".into()))?;
        if let Some(ch) = token.chars().next() {
            map.insert(ch, id);
        }
    }

    Ok(map)
}

/// Load one voice's style array from the NPZ voices file.
fn load_voice(path: &Path, name: &str) -> Result<VoiceData, SpeechError> {
    let file = fs::File::open(path)?;
    let mut npz = NpzReader::new(file)
        .map_err(|e| failed("Failed to read NPZ voices file", e))?;

    let arr: Array3<f32> = npz
        .by_name(&format!("{name}.npy"))
        .map_err(|e| SpeechError::Unavailable(format!("Voice '{name}' not available: {e}")))?;

    // Shape is (510, 1, 256). Squeeze the middle dimension to (510, 256).
    let dim0 = arr.shape()[0];
    let dim2 = arr.shape()[2];
    let styles = arr
        .into_shape_with_order((dim0, dim2))
        .map_err(|e| failed("Failed to reshape voice", e))?;

    Ok(VoiceData { styles })
}

/// Split text into sentences at .!? boundaries.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'.' || b == b'!' || b == b'?')
            && i + 1 < bytes.len()
            && bytes[i + 1].is_ascii_whitespace()
        {
            let end = i + 1;
            let s = text[start..end].trim();
            if !s.is_empty() {
                sentences.push(s);
            }
            start = end;
        }
    }

    let s = text[start..].trim();
    if !s.is_empty() {
        sentences.push(s);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation_followed_by_space() {
        assert_eq!(
            split_sentences("Water boils at 100 degrees. It freezes at 0! Right? yes"),
            vec!["Water boils at 100 degrees.", "It freezes at 0!", "Right?", "yes"]
        );
        assert_eq!(split_sentences("3.14 is pi"), vec!["3.14 is pi"]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn missing_model_files_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = SpeechConfig {
            model_dir: dir.path().to_string_lossy().into_owned(),
            ..SpeechConfig::default()
        };
        assert!(matches!(
            KokoroEngine::load(&config),
            Err(SpeechError::Unavailable(_))
        ));
    }
}
