//! Debate orchestration driver.
//!
//! Pulls events out of a [`DebateEngine`] and hands each one, in order, to
//! every registered sink. Speech, files and console output live behind
//! [`EventSink`]; the engine itself never touches them.

use tracing::{info, warn};

use crate::engine::DebateEngine;
use crate::error::DebateError;
use crate::generation::Generator;
use crate::participant::Speaker;
use crate::state::DebateState;
use crate::transcript::Turn;

/// A turn as delivered to sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebateEvent {
    pub speaker: Speaker,
    pub text: String,
    pub sequence_no: u64,
}

impl DebateEvent {
    /// Transcript line, `"Speaker: text"`.
    pub fn line(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}

impl From<&Turn> for DebateEvent {
    fn from(turn: &Turn) -> Self {
        Self {
            speaker: turn.speaker(),
            text: turn.text().to_string(),
            sequence_no: turn.sequence_no(),
        }
    }
}

/// How a run ended, passed to [`EventSink::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The verdict was produced and delivered.
    Completed,
    /// A fatal error stopped the run early.
    Aborted,
}

/// Consumer of the ordered event stream.
pub trait EventSink {
    fn on_event(&mut self, event: &DebateEvent) -> Result<(), DebateError>;

    /// Called once after the last event, whether or not the run completed.
    fn finish(&mut self, _outcome: RunOutcome) -> Result<(), DebateError> {
        Ok(())
    }
}

/// Drive `engine` to completion, fanning events out to `sinks`.
///
/// Every sink is finished even when the run fails, so sinks can decide what
/// to do with a partial transcript. The run's own error wins over any error
/// raised while finishing.
pub async fn run_debate<G: Generator>(
    mut engine: DebateEngine<G>,
    sinks: &mut [&mut dyn EventSink],
) -> Result<DebateState, DebateError> {
    let result = drive(&mut engine, sinks).await;
    let outcome = if result.is_ok() {
        RunOutcome::Completed
    } else {
        RunOutcome::Aborted
    };

    let mut finish_error = None;
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.finish(outcome) {
            warn!(error = %e, "sink failed to finish");
            finish_error.get_or_insert(e);
        }
    }

    result?;
    if let Some(e) = finish_error {
        return Err(e);
    }

    info!(
        turns = engine.state().shadow_history().len(),
        turn_count = engine.state().turn_count(),
        "debate concluded"
    );
    Ok(engine.into_state())
}

async fn drive<G: Generator>(
    engine: &mut DebateEngine<G>,
    sinks: &mut [&mut dyn EventSink],
) -> Result<(), DebateError> {
    while let Some(event) = engine.next_event().await? {
        info!(speaker = %event.speaker, seq = event.sequence_no, "{}", event.text);
        for sink in sinks.iter_mut() {
            sink.on_event(&event)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use crate::generation::ChatMessage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Numbered {
        calls: AtomicUsize,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl Generator for Numbered {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String, DebateError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_at {
                return Err(DebateError::Generation("service unavailable".to_string()));
            }
            Ok(format!("answer {}", call))
        }
    }

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
        outcome: Option<RunOutcome>,
    }

    impl EventSink for Recorder {
        fn on_event(&mut self, event: &DebateEvent) -> Result<(), DebateError> {
            self.lines.push(event.line());
            Ok(())
        }

        fn finish(&mut self, outcome: RunOutcome) -> Result<(), DebateError> {
            self.outcome = Some(outcome);
            Ok(())
        }
    }

    fn engine(fail_at: Option<usize>) -> DebateEngine<Numbered> {
        let mut config = default_config();
        config.debate.debate_length = 2;
        DebateEngine::new(
            Numbered {
                calls: AtomicUsize::new(0),
                fail_at,
            },
            config,
            "Tea",
            "Coffee",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_events_reach_every_sink_in_order() {
        let mut first = Recorder::default();
        let mut second = Recorder::default();

        let mut sinks: [&mut dyn EventSink; 2] = [&mut first, &mut second];
        let state = run_debate(engine(None), &mut sinks).await.unwrap();

        let expected = vec![
            "Interlocutor1: Tea".to_string(),
            "Interlocutor2: answer 0".to_string(),
            "Interlocutor1: answer 1".to_string(),
            "Interlocutor2: answer 2".to_string(),
            "Supervisor: answer 3".to_string(),
        ];
        assert_eq!(first.lines, expected);
        assert_eq!(second.lines, expected);
        assert_eq!(first.outcome, Some(RunOutcome::Completed));
        assert_eq!(state.shadow_history().len(), 4);
        assert!(state.verdict().is_some());
    }

    #[tokio::test]
    async fn test_failure_aborts_and_finishes_sinks() {
        let mut recorder = Recorder::default();

        let mut sinks: [&mut dyn EventSink; 1] = [&mut recorder];
        let err = run_debate(engine(Some(1)), &mut sinks).await.unwrap_err();

        assert!(err.is_generation());
        assert_eq!(recorder.outcome, Some(RunOutcome::Aborted));
        assert_eq!(
            recorder.lines,
            vec![
                "Interlocutor1: Tea".to_string(),
                "Interlocutor2: answer 0".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_engine_stays_aborted() {
        let mut engine = engine(Some(0));
        assert!(engine.next_event().await.unwrap().is_some());

        let first = engine.next_event().await.unwrap_err();
        assert!(first.is_generation());
        assert!(engine.is_aborted());

        let again = engine.next_event().await.unwrap_err();
        assert!(
            matches!(&again, DebateError::Aborted(reason) if reason.contains("unavailable")),
            "{again}"
        );
        assert!(matches!(
            engine.next_event().await,
            Err(DebateError::Aborted(_))
        ));
    }
}
