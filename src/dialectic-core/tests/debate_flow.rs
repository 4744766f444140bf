//! End-to-end debate runs against scripted generators.

use std::sync::Mutex;

use async_trait::async_trait;
use dialectic_core::{
    ChatMessage, ChatRole, Config, DebateEngine, DebateError, EventSink, Phase, Speaker,
    TranscriptPdf, default_config, run_debate,
};

/// Answers "reply to <last message>" and keeps every request it saw.
struct ReplyTo {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    fail_on_summary: bool,
}

impl ReplyTo {
    fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_on_summary: false,
        }
    }

    fn failing_on_summary() -> Self {
        Self {
            fail_on_summary: true,
            ..Self::new()
        }
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

fn is_summary_request(messages: &[ChatMessage]) -> bool {
    messages.first().map(|m| m.role) != Some(ChatRole::System)
}

fn is_arbiter_request(messages: &[ChatMessage]) -> bool {
    messages.iter().skip(1).any(|m| m.name.is_some())
}

#[async_trait]
impl dialectic_core::Generator for ReplyTo {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, DebateError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail_on_summary && is_summary_request(messages) {
            return Err(DebateError::Generation("model overloaded".to_string()));
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!("reply to {}", last))
    }
}

fn config(debate_length: u32, window_threshold: usize) -> Config {
    let mut config = default_config();
    config.debate.debate_length = debate_length;
    config.debate.window_threshold = window_threshold;
    config
}

#[tokio::test]
async fn test_two_turn_debate_sequence() {
    let mut engine =
        DebateEngine::new(ReplyTo::new(), config(2, 8), "Cats are better", "Dogs are better")
            .unwrap();

    let mut seen = Vec::new();
    while let Some(event) = engine.next_event().await.unwrap() {
        seen.push((event.speaker, event.text, engine.state().turn_count()));
    }

    assert_eq!(
        seen,
        vec![
            (Speaker::Persona1, "Cats are better".to_string(), 0),
            (Speaker::Persona2, "reply to Cats are better".to_string(), 1),
            (
                Speaker::Persona1,
                "reply to reply to Cats are better".to_string(),
                2
            ),
            (
                Speaker::Persona2,
                "reply to reply to reply to Cats are better".to_string(),
                3
            ),
            (
                Speaker::Arbiter,
                "reply to reply to reply to reply to Cats are better".to_string(),
                3
            ),
        ]
    );
    assert_eq!(
        engine.visited(),
        [
            Phase::Persona2Turn,
            Phase::Persona1Turn,
            Phase::Persona2Turn,
            Phase::Arbitrate,
            Phase::Terminal
        ]
    );

    let state = engine.into_state();
    assert_eq!(state.shadow_history().len(), 4);
    let verdict = state.verdict().unwrap();
    assert_eq!(verdict.speaker(), Speaker::Arbiter);
    assert_eq!(verdict.sequence_no(), 4);
}

#[tokio::test]
async fn test_lowered_threshold_summarizes_after_fifth_turn() {
    let mut engine = DebateEngine::new(ReplyTo::new(), config(6, 4), "Tea", "Coffee").unwrap();

    for _ in 0..5 {
        assert!(engine.next_event().await.unwrap().is_some());
    }
    assert_eq!(engine.state().shadow_history().len(), 5);
    assert_eq!(engine.phase(), Phase::Summarize);
    assert!(engine.state().summary().is_none());

    // Runs the summary, then Persona2's reply on the trimmed window.
    let event = engine.next_event().await.unwrap().unwrap();
    assert_eq!(event.speaker, Speaker::Persona2);
    assert!(engine.state().summary().is_some_and(|s| !s.is_empty()));
    assert_eq!(engine.state().active_window().len(), 3);
    assert_eq!(engine.state().shadow_history().len(), 6);

    let requests = engine.generator().requests();
    let summary_at = requests
        .iter()
        .position(|r| is_summary_request(r))
        .unwrap();
    // The first persona call after summarizing saw system + the two kept turns.
    assert_eq!(requests[summary_at + 1].len(), 3);
    assert!(requests[summary_at + 1][0].content.contains("reply to"));
}

#[tokio::test]
async fn test_termination_and_history_bounds() {
    for n in 1..=10 {
        for threshold in [4, 8] {
            let mut engine =
                DebateEngine::new(ReplyTo::new(), config(n, threshold), "A", "B").unwrap();
            let mut persona_turns = 0;
            let mut verdicts = 0;

            while let Some(event) = engine.next_event().await.unwrap() {
                match event.speaker {
                    Speaker::Arbiter => verdicts += 1,
                    _ if event.sequence_no > 0 => persona_turns += 1,
                    _ => {}
                }
                // Summaries only follow Persona1 turns, so the window can run two
                // past the threshold.
                assert!(engine.state().active_window().len() <= threshold + 2);
            }

            let state = engine.state();
            assert!(engine.is_finished());
            assert_eq!(verdicts, 1);
            assert!(persona_turns <= n + 2);
            assert!(state.turn_count() > n);
            assert_eq!(state.turn_count(), persona_turns);
            assert_eq!(state.shadow_history().len() as u32, 1 + persona_turns);
            for (i, turn) in state.shadow_history().iter().enumerate() {
                assert_eq!(turn.sequence_no(), i as u64);
            }
        }
    }
}

#[tokio::test]
async fn test_window_is_trimmed_after_every_summary() {
    let mut engine = DebateEngine::new(ReplyTo::new(), config(12, 4), "A", "B").unwrap();
    while engine.next_event().await.unwrap().is_some() {}

    let requests = engine.generator().requests();
    let mut summaries = 0;
    for pair in requests.windows(2) {
        if is_summary_request(&pair[0]) {
            summaries += 1;
            // system + at most two kept turns
            assert!(pair[1].len() <= 3);
        }
    }
    assert!(summaries >= 2);

    // Later summaries extend the previous one.
    let summary_requests: Vec<&Vec<ChatMessage>> =
        requests.iter().filter(|r| is_summary_request(r)).collect();
    let second_instruction = &summary_requests[1].last().unwrap().content;
    assert!(second_instruction.contains("This is a summary of the debate so far"));
}

#[tokio::test]
async fn test_arbiter_gets_unsummarized_history() {
    let mut engine = DebateEngine::new(ReplyTo::new(), config(10, 4), "A", "B").unwrap();
    while engine.next_event().await.unwrap().is_some() {}

    let shadow_len = engine.state().shadow_history().len();
    assert!(engine.state().active_window().len() < shadow_len);

    let requests = engine.generator().requests();
    let arbiter: Vec<&Vec<ChatMessage>> =
        requests.iter().filter(|r| is_arbiter_request(r)).collect();
    assert_eq!(arbiter.len(), 1);
    assert_eq!(arbiter[0].len(), shadow_len + 1);
    assert_eq!(arbiter[0][1].content, "A");
    assert_eq!(arbiter[0][1].name.as_deref(), Some("Interlocutor1"));
}

#[tokio::test]
async fn test_summary_failure_is_fatal_and_keeps_partial_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let engine = DebateEngine::new(ReplyTo::failing_on_summary(), config(10, 4), "A", "B").unwrap();
    let mut pdf = TranscriptPdf::new(dir.path());

    let err = {
        let mut sinks: [&mut dyn EventSink; 1] = [&mut pdf];
        run_debate(engine, &mut sinks).await.unwrap_err()
    };

    assert!(err.is_generation());
    assert_eq!(pdf.lines().len(), 5);
    let path = pdf.written_path().unwrap();
    assert!(path.to_string_lossy().ends_with("_incomplete.pdf"));
    assert!(path.exists());
}

#[tokio::test]
async fn test_completed_run_writes_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let engine = DebateEngine::new(ReplyTo::new(), config(2, 8), "A", "B").unwrap();
    let mut pdf = TranscriptPdf::new(dir.path());

    let state = {
        let mut sinks: [&mut dyn EventSink; 1] = [&mut pdf];
        run_debate(engine, &mut sinks).await.unwrap()
    };

    assert_eq!(pdf.lines().len(), state.shadow_history().len() + 1);
    assert!(pdf.lines()[4].starts_with("Supervisor: "));
    let name = pdf.written_path().unwrap().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("debate_") && name.ends_with(".pdf"));
    assert!(!name.contains("incomplete"));
}
