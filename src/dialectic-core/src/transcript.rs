//! Transcript store.
//!
//! Keeps two views of the same ordered log: a bounded active window that
//! personas see, and a shadow history that is never trimmed and is reserved
//! for the arbiter.

use crate::participant::Speaker;

/// One utterance, in sequence. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    speaker: Speaker,
    text: String,
    sequence_no: u64,
}

impl Turn {
    pub(crate) fn new(speaker: Speaker, text: impl Into<String>, sequence_no: u64) -> Self {
        Self {
            speaker,
            text: text.into(),
            sequence_no,
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sequence_no(&self) -> u64 {
        self.sequence_no
    }
}

/// Append-only turn log with a truncatable window.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    active_window: Vec<Turn>,
    shadow_history: Vec<Turn>,
    next_sequence: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new turn in both views and return it.
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &Turn {
        let turn = Turn::new(speaker, text, self.next_sequence);
        self.next_sequence += 1;
        self.active_window.push(turn.clone());
        self.shadow_history.push(turn);
        &self.shadow_history[self.shadow_history.len() - 1]
    }

    /// Move everything but the last `keep_last` window entries out and
    /// return them, oldest first. The shadow history is not touched.
    pub fn truncate_window(&mut self, keep_last: usize) -> Vec<Turn> {
        if self.active_window.len() <= keep_last {
            return Vec::new();
        }
        let cut = self.active_window.len() - keep_last;
        self.active_window.drain(..cut).collect()
    }

    pub fn active_window(&self) -> &[Turn] {
        &self.active_window
    }

    pub fn shadow_history(&self) -> &[Turn] {
        &self.shadow_history
    }

    /// Sequence number the next stored turn will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}
