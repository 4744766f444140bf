//! Dialectic Core Library
//!
//! Runs a turn-based debate between two personas and a supervisor: the
//! transcript store, rolling summarizer, turn engine and arbiter, plus the
//! driver and sinks that turn the event stream into speech and a PDF.

pub mod arbiter;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod generation;
pub mod orchestrator;
pub mod participant;
pub mod prompts;
pub mod state;
pub mod summarizer;
pub mod transcript;
pub mod tts;

pub use config::{
    Config, DebateSettings, ModelConfig, PromptsConfig, VoicesConfig, default_config,
};
pub use engine::{DebateEngine, Outcome, Phase, Step, transition};
pub use error::DebateError;
pub use export::TranscriptPdf;
pub use generation::{ChatMessage, ChatRole, Generator, Provider, build_generator};
pub use orchestrator::{DebateEvent, EventSink, RunOutcome, run_debate};
pub use participant::Speaker;
pub use state::DebateState;
pub use transcript::{Transcript, Turn};
pub use tts::SpeechSink;
