//! whisper.cpp engine via the whisper-rs bindings.
//!
//! Expects 16 kHz audio; stereo input is downmixed to mono. Only WAV input
//! is decoded here — compressed formats must be converted upstream before
//! invocation.

use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::SpeechEngine;
use crate::error::TranscribeError;

const EXPECTED_SAMPLE_RATE: u32 = 16_000;

pub struct WhisperEngine {
    ctx: WhisperContext,
    language: Option<String>,
}

impl WhisperEngine {
    /// Loads the model at `model_path` into a whisper context.
    pub fn load(model_path: &Path, language: Option<String>) -> Result<Self, TranscribeError> {
        let path = model_path
            .to_str()
            .ok_or_else(|| {
                TranscribeError::CapabilityUnavailable(format!(
                    "Non-UTF8 model path: {}",
                    model_path.display()
                ))
            })?
            .to_string();

        let ctx = WhisperContext::new_with_params(&path, WhisperContextParameters::default())
            .map_err(|e| {
                TranscribeError::CapabilityUnavailable(format!("Failed to load model: {}", e))
            })?;

        Ok(Self { ctx, language })
    }

    fn load_samples(&self, audio: &Path) -> Result<Vec<f32>, TranscribeError> {
        let reader = hound::WavReader::open(audio)
            .map_err(|e| TranscribeError::Invocation(format!("Failed to read audio: {}", e)))?;
        let spec = reader.spec();

        if spec.sample_rate != EXPECTED_SAMPLE_RATE {
            return Err(TranscribeError::Invocation(format!(
                "Expected {} Hz audio, got {} Hz",
                EXPECTED_SAMPLE_RATE, spec.sample_rate
            )));
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TranscribeError::Invocation(format!("Bad audio sample: {}", e)))?,
            hound::SampleFormat::Int => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TranscribeError::Invocation(format!("Bad audio sample: {}", e)))?,
        };

        // Downmix interleaved channels to mono.
        if spec.channels > 1 {
            let channels = spec.channels as usize;
            Ok(samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect())
        } else {
            Ok(samples)
        }
    }
}

impl SpeechEngine for WhisperEngine {
    fn transcribe(&self, audio: &Path) -> Result<String, TranscribeError> {
        let samples = self.load_samples(audio)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| TranscribeError::Invocation(format!("Failed to create state: {}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        if let Some(ref lang) = self.language {
            params.set_language(Some(lang.as_str()));
        }

        state
            .full(params, &samples)
            .map_err(|e| TranscribeError::Invocation(format!("Inference failed: {}", e)))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| TranscribeError::Invocation(format!("Failed to read segments: {}", e)))?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state.full_get_segment_text(i).map_err(|e| {
                TranscribeError::Invocation(format!("Failed to read segment {}: {}", i, e))
            })?;
            text.push_str(segment.trim());
            text.push('\n');
        }

        Ok(text)
    }
}
