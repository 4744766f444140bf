//! Spoken read-aloud of the debate using kokoro-tiny.
//!
//! Each event is synthesized in its speaker's voice as it arrives; the
//! whole recording is written to a WAV file when the run completes.

use std::path::{Path, PathBuf};

use chrono::Local;
use kokoro_tiny::TtsEngine;
use tracing::{info, warn};

use crate::config::VoicesConfig;
use crate::error::DebateError;
use crate::export::output_filename;
use crate::orchestrator::{DebateEvent, EventSink, RunOutcome};
use crate::participant::Speaker;

/// Kokoro output rate.
pub const SAMPLE_RATE: u32 = 24_000;
/// Kokoro has a ~200 char safe limit per synthesis call.
const CHUNK_CHARS: usize = 200;
const SPEAKER_GAP_SECONDS: f32 = 0.6;

/// Voice per speaker, checked against what the engine offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceAssignment {
    pub interlocutor1: String,
    pub interlocutor2: String,
    pub supervisor: String,
}

impl VoiceAssignment {
    /// Use the configured voices when all are available, otherwise fall back
    /// to the available ones: a single voice is shared by everybody, two
    /// voices give Interlocutor2 its own, three or more give everyone one.
    pub fn resolve(configured: &VoicesConfig, available: &[String]) -> Result<Self, DebateError> {
        let wanted = [
            &configured.interlocutor1,
            &configured.interlocutor2,
            &configured.supervisor,
        ];
        if wanted.iter().all(|voice| available.contains(voice)) {
            return Ok(Self {
                interlocutor1: configured.interlocutor1.clone(),
                interlocutor2: configured.interlocutor2.clone(),
                supervisor: configured.supervisor.clone(),
            });
        }

        warn!(
            available = available.len(),
            "configured voices not all available, falling back"
        );
        let assignment = match available {
            [] => return Err(DebateError::Tts("No TTS voices available".to_string())),
            [only] => Self {
                interlocutor1: only.clone(),
                interlocutor2: only.clone(),
                supervisor: only.clone(),
            },
            [a, b] => Self {
                interlocutor1: a.clone(),
                interlocutor2: b.clone(),
                supervisor: a.clone(),
            },
            [a, b, c, ..] => Self {
                interlocutor1: a.clone(),
                interlocutor2: b.clone(),
                supervisor: c.clone(),
            },
        };
        Ok(assignment)
    }

    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Persona1 => &self.interlocutor1,
            Speaker::Persona2 => &self.interlocutor2,
            Speaker::Arbiter => &self.supervisor,
        }
    }
}

/// Sink that reads every turn aloud into a single recording.
pub struct SpeechSink {
    engine: TtsEngine,
    voices: VoiceAssignment,
    speed: f32,
    segments: Vec<Vec<f32>>,
    output_dir: PathBuf,
    written: Option<PathBuf>,
}

impl SpeechSink {
    /// Initialize the TTS engine (downloads model on first run).
    pub async fn new(
        voices: &VoicesConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, DebateError> {
        let engine = TtsEngine::new()
            .await
            .map_err(|e| DebateError::Tts(format!("Failed to initialize TTS: {}", e)))?;

        let mut available = engine.voices();
        available.sort();
        let assignment = VoiceAssignment::resolve(voices, &available)?;
        info!(
            interlocutor1 = %assignment.interlocutor1,
            interlocutor2 = %assignment.interlocutor2,
            supervisor = %assignment.supervisor,
            "voices selected"
        );

        Ok(Self {
            engine,
            voices: assignment,
            speed: voices.speed,
            segments: Vec::new(),
            output_dir: output_dir.into(),
            written: None,
        })
    }

    /// Path of the written WAV, once a completed run has finished.
    pub fn written_path(&self) -> Option<&Path> {
        self.written.as_deref()
    }

    /// Synthesize text in chunks to stay under the engine's length limit.
    fn synthesize(&mut self, text: &str, voice_id: &str) -> Result<Vec<f32>, DebateError> {
        let mut all_samples = Vec::new();

        for chunk in split_into_chunks(text, CHUNK_CHARS) {
            if chunk.trim().is_empty() {
                continue;
            }

            let samples = self
                .engine
                .synthesize(&chunk, Some(voice_id))
                .map_err(|e| DebateError::Tts(format!("Synthesis failed: {}", e)))?;

            all_samples.extend(samples);
            // 0.3s pause between chunks prevents cutoff
            all_samples.extend(vec![0.0; 7200]);
        }

        Ok(all_samples)
    }
}

impl EventSink for SpeechSink {
    fn on_event(&mut self, event: &DebateEvent) -> Result<(), DebateError> {
        let voice = self.voices.voice_for(event.speaker).to_string();
        let samples = self.synthesize(&event.text, &voice)?;
        self.segments.push(samples);
        Ok(())
    }

    fn finish(&mut self, outcome: RunOutcome) -> Result<(), DebateError> {
        if outcome == RunOutcome::Aborted {
            info!(segments = self.segments.len(), "run aborted, skipping audio");
            return Ok(());
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let combined = combine_audio_segments(
            std::mem::take(&mut self.segments),
            SPEAKER_GAP_SECONDS,
            SAMPLE_RATE,
        );
        let samples = adjust_audio_speed(combined, self.speed);

        let path = self
            .output_dir
            .join(output_filename(Local::now(), "wav", true));
        write_wav(&path, &samples)?;
        let seconds = samples.len() as u32 / SAMPLE_RATE;
        info!(path = %path.display(), seconds, "audio written");
        self.written = Some(path);
        Ok(())
    }
}

/// Write mono 16-bit PCM at [`SAMPLE_RATE`].
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32]) -> Result<(), DebateError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let to_err = |e: hound::Error| DebateError::Tts(format!("Failed to save WAV: {}", e));

    let mut writer = hound::WavWriter::create(path.as_ref(), spec).map_err(to_err)?;
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value).map_err(to_err)?;
    }
    writer.finalize().map_err(to_err)
}

/// Split text into chunks that are safe for TTS synthesis.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current_chunk = String::new();

    for sentence in text.split_inclusive(&['.', '!', '?', ';'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if current_chunk.len() + sentence.len() > max_chars {
            if !current_chunk.is_empty() {
                chunks.push(current_chunk.trim().to_string());
                current_chunk = String::new();
            }

            // Overlong sentences are split at commas
            if sentence.len() > max_chars {
                for part in sentence.split_inclusive(',') {
                    if current_chunk.len() + part.len() > max_chars && !current_chunk.is_empty() {
                        chunks.push(current_chunk.trim().to_string());
                        current_chunk = String::new();
                    }
                    current_chunk.push_str(part);
                    current_chunk.push(' ');
                }
                continue;
            }
        }

        current_chunk.push_str(sentence);
        current_chunk.push(' ');
    }

    if !current_chunk.trim().is_empty() {
        chunks.push(current_chunk.trim().to_string());
    }

    chunks
}

/// Adjust audio playback speed using linear interpolation.
/// Rate < 1.0 = slower (e.g., 0.75 = 75% speed), Rate > 1.0 = faster.
pub fn adjust_audio_speed(samples: Vec<f32>, rate: f32) -> Vec<f32> {
    if (rate - 1.0).abs() < 0.001 || rate <= 0.0 {
        return samples;
    }

    let new_len = (samples.len() as f32 / rate) as usize;
    let mut result = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_pos = i as f32 * rate;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f32;

        if src_idx + 1 < samples.len() {
            let sample = samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac;
            result.push(sample);
        } else if src_idx < samples.len() {
            result.push(samples[src_idx]);
        }
    }

    result
}

/// Combine multiple audio segments with silence gaps.
pub fn combine_audio_segments(
    segments: Vec<Vec<f32>>,
    gap_seconds: f32,
    sample_rate: u32,
) -> Vec<f32> {
    let gap_samples = (gap_seconds * sample_rate as f32) as usize;
    let silence: Vec<f32> = vec![0.0; gap_samples];

    let mut combined = Vec::new();

    for (i, segment) in segments.into_iter().enumerate() {
        if i > 0 {
            combined.extend(&silence);
        }
        combined.extend(segment);
    }

    combined
}
