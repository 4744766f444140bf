//! Error types for the debate system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid transition: {outcome} cannot follow phase {phase}")]
    InvalidTransition { phase: String, outcome: String },

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Export error: {0}")]
    Export(String),

    /// The engine already failed; carries the original failure's message.
    #[error("Debate aborted by an earlier failure: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DebateError {
    /// Whether this error came from the language-model call path.
    pub fn is_generation(&self) -> bool {
        matches!(self, DebateError::Generation(_) | DebateError::OpenAI(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_is_not_a_generation_failure() {
        let aborted = DebateError::Aborted("Configuration error: bad".to_string());
        assert!(!aborted.is_generation());
        assert_eq!(
            aborted.to_string(),
            "Debate aborted by an earlier failure: Configuration error: bad"
        );
        assert!(DebateError::Generation("quota".to_string()).is_generation());
    }
}
