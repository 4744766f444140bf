//! Debate participants.
//!
//! Two personas argue opposing positions; the arbiter only speaks once,
//! after the last persona turn.

use std::fmt;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// Defends the first idea and opens the debate.
    Persona1,
    /// Defends the second idea and answers first.
    Persona2,
    /// Reviews the whole transcript and renders the verdict.
    Arbiter,
}

impl Speaker {
    pub fn display_name(&self) -> &'static str {
        match self {
            Speaker::Persona1 => "Interlocutor1",
            Speaker::Persona2 => "Interlocutor2",
            Speaker::Arbiter => "Supervisor",
        }
    }

    pub fn is_persona(&self) -> bool {
        !matches!(self, Speaker::Arbiter)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_labels() {
        assert_eq!(Speaker::Persona1.to_string(), "Interlocutor1");
        assert_eq!(Speaker::Arbiter.to_string(), "Supervisor");
        assert!(!Speaker::Arbiter.is_persona());
    }
}
