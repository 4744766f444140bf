//! Final verdict over the complete, unsummarized debate.

use tracing::debug;

use crate::config::Config;
use crate::error::DebateError;
use crate::generation::Generator;
use crate::prompts::arbiter_messages;
use crate::transcript::Turn;

/// Ask the supervisor for a verdict on `shadow_history`.
///
/// Always receives every stored turn, never the trimmed window.
pub async fn arbitrate<G: Generator + ?Sized>(
    generator: &G,
    config: &Config,
    shadow_history: &[Turn],
    position1: &str,
    position2: &str,
) -> Result<String, DebateError> {
    let messages = arbiter_messages(config, shadow_history, position1, position2);
    let verdict = generator.generate(&messages).await?;
    debug!(turns = shadow_history.len(), chars = verdict.len(), "verdict rendered");
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::generation::{ChatMessage, ChatRole};
    use crate::participant::Speaker;
    use crate::transcript::Transcript;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl Generator for Recording {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String, DebateError> {
            *self.seen.lock().unwrap() = messages.to_vec();
            Ok("Interlocutor2 wins".to_string())
        }
    }

    #[tokio::test]
    async fn test_arbiter_sees_full_history() {
        let config = default_config();
        let mut transcript = Transcript::new();
        for i in 0..12 {
            let speaker = if i % 2 == 0 {
                Speaker::Persona1
            } else {
                Speaker::Persona2
            };
            transcript.append(speaker, format!("argument {}", i));
        }
        transcript.truncate_window(2);

        let generator = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let verdict = arbitrate(
            &generator,
            &config,
            transcript.shadow_history(),
            "Cats",
            "Dogs",
        )
        .await
        .unwrap();

        assert_eq!(verdict, "Interlocutor2 wins");
        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 13);
        assert_eq!(seen[0].role, ChatRole::System);
        assert_eq!(seen[1].content, "argument 0");
        assert_eq!(seen[12].content, "argument 11");
    }
}
