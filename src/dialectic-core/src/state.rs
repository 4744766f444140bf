//! Per-debate mutable state.

use crate::participant::Speaker;
use crate::transcript::{Transcript, Turn};

/// Everything the engine threads through a single debate run.
#[derive(Debug, Clone)]
pub struct DebateState {
    transcript: Transcript,
    summary: Option<String>,
    turn_count: u32,
    position1: String,
    position2: String,
    verdict: Option<Turn>,
}

impl DebateState {
    /// Create the state with the opening turn: position1, spoken by Persona1.
    pub fn seeded(position1: impl Into<String>, position2: impl Into<String>) -> Self {
        let position1 = position1.into();
        let mut transcript = Transcript::new();
        transcript.append(Speaker::Persona1, position1.clone());

        Self {
            transcript,
            summary: None,
            turn_count: 0,
            position1,
            position2: position2.into(),
            verdict: None,
        }
    }

    /// Record a generated persona reply. Bumps the turn count.
    pub fn record_persona_turn(&mut self, speaker: Speaker, text: impl Into<String>) -> &Turn {
        debug_assert!(speaker.is_persona());
        self.turn_count += 1;
        self.transcript.append(speaker, text)
    }

    /// Replace the rolling summary and shrink the window to `keep_last`.
    /// Returns how many turns left the window.
    pub fn apply_summary(&mut self, summary: String, keep_last: usize) -> usize {
        self.summary = Some(summary);
        self.transcript.truncate_window(keep_last).len()
    }

    /// Store the verdict. It sits outside the shadow history.
    pub fn record_verdict(&mut self, text: impl Into<String>) -> &Turn {
        let turn = Turn::new(Speaker::Arbiter, text, self.transcript.next_sequence());
        self.verdict.insert(turn)
    }

    pub fn active_window(&self) -> &[Turn] {
        self.transcript.active_window()
    }

    pub fn shadow_history(&self) -> &[Turn] {
        self.transcript.shadow_history()
    }

    /// Rolling summary, `None` until the first summarization.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.is_empty())
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn position1(&self) -> &str {
        &self.position1
    }

    pub fn position2(&self) -> &str {
        &self.position2
    }

    /// Position a persona defends. The arbiter defends none.
    pub fn position_of(&self, speaker: Speaker) -> Option<&str> {
        match speaker {
            Speaker::Persona1 => Some(&self.position1),
            Speaker::Persona2 => Some(&self.position2),
            Speaker::Arbiter => None,
        }
    }

    pub fn verdict(&self) -> Option<&Turn> {
        self.verdict.as_ref()
    }
}
