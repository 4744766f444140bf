//! Turn engine.
//!
//! The debate is a small state machine:
//!
//! ```text
//! Persona2Turn → Arbitrate      (turn_count > debate_length)
//!              → Persona1Turn   (otherwise)
//! Persona1Turn → Summarize      (window_len > window_threshold)
//!              → Persona2Turn   (otherwise)
//! Summarize    → Persona2Turn
//! Arbitrate    → Terminal
//! ```
//!
//! [`transition`] is pure; [`DebateEngine`] runs the step each phase names,
//! feeds the outcome back through it, and hands out one event per new turn.

use std::fmt;

use tracing::{info, warn};

use crate::arbiter::arbitrate;
use crate::config::{Config, DebateSettings};
use crate::error::DebateError;
use crate::generation::Generator;
use crate::orchestrator::DebateEvent;
use crate::participant::Speaker;
use crate::prompts::persona_messages;
use crate::state::DebateState;
use crate::summarizer::summarize;
use crate::transcript::Turn;

/// Engine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Persona1Turn,
    Persona2Turn,
    Summarize,
    Arbitrate,
    /// Absorbing; no step, no transition.
    Terminal,
}

impl Phase {
    /// The opening turn is seeded, so Persona2 answers first.
    pub const INITIAL: Phase = Phase::Persona2Turn;

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Terminal)
    }

    /// The work performed on entry to this phase.
    pub fn step(self) -> Step {
        match self {
            Phase::Persona1Turn => Step::Speak(Speaker::Persona1),
            Phase::Persona2Turn => Step::Speak(Speaker::Persona2),
            Phase::Summarize => Step::Summarize,
            Phase::Arbitrate => Step::Arbitrate,
            Phase::Terminal => Step::Halt,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Persona1Turn => write!(f, "Persona1Turn"),
            Phase::Persona2Turn => write!(f, "Persona2Turn"),
            Phase::Summarize => write!(f, "Summarize"),
            Phase::Arbitrate => write!(f, "Arbitrate"),
            Phase::Terminal => write!(f, "Terminal"),
        }
    }
}

/// Side effect a phase asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Speak(Speaker),
    Summarize,
    Arbitrate,
    Halt,
}

/// What running a step produced, as seen by the guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A persona reply was appended.
    Spoke {
        speaker: Speaker,
        turn_count: u32,
        window_len: usize,
    },
    Summarized,
    Verdict,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Spoke {
                speaker,
                turn_count,
                window_len,
            } => write!(
                f,
                "Spoke({}, turn_count={}, window_len={})",
                speaker, turn_count, window_len
            ),
            Outcome::Summarized => write!(f, "Summarized"),
            Outcome::Verdict => write!(f, "Verdict"),
        }
    }
}

/// Next phase after `phase` produced `outcome`.
///
/// The count guard only runs after a Persona2 turn and the window guard only
/// after a Persona1 turn.
pub fn transition(
    phase: Phase,
    outcome: &Outcome,
    limits: &DebateSettings,
) -> Result<Phase, DebateError> {
    match (phase, outcome) {
        (
            Phase::Persona2Turn,
            Outcome::Spoke {
                speaker: Speaker::Persona2,
                turn_count,
                ..
            },
        ) => Ok(if *turn_count > limits.debate_length {
            Phase::Arbitrate
        } else {
            Phase::Persona1Turn
        }),
        (
            Phase::Persona1Turn,
            Outcome::Spoke {
                speaker: Speaker::Persona1,
                window_len,
                ..
            },
        ) => Ok(if *window_len > limits.window_threshold {
            Phase::Summarize
        } else {
            Phase::Persona2Turn
        }),
        (Phase::Summarize, Outcome::Summarized) => Ok(Phase::Persona2Turn),
        (Phase::Arbitrate, Outcome::Verdict) => Ok(Phase::Terminal),
        _ => Err(DebateError::InvalidTransition {
            phase: phase.to_string(),
            outcome: outcome.to_string(),
        }),
    }
}

/// Runs one debate from the seeded opening to the verdict.
pub struct DebateEngine<G> {
    generator: G,
    config: Config,
    state: DebateState,
    phase: Phase,
    visited: Vec<Phase>,
    seed_emitted: bool,
    /// Message of the failure that stopped the run.
    aborted: Option<String>,
}

impl<G: Generator> DebateEngine<G> {
    /// Validate `config` and seed the opening turn with `idea1`.
    pub fn new(
        generator: G,
        config: Config,
        idea1: impl Into<String>,
        idea2: impl Into<String>,
    ) -> Result<Self, DebateError> {
        config.validate()?;

        let idea1 = idea1.into();
        let idea2 = idea2.into();
        if idea1.trim().is_empty() || idea2.trim().is_empty() {
            return Err(DebateError::Config(
                "Both ideas must be non-empty".to_string(),
            ));
        }

        Ok(Self {
            generator,
            config,
            state: DebateState::seeded(idea1, idea2),
            phase: Phase::INITIAL,
            visited: vec![Phase::INITIAL],
            seed_emitted: false,
            aborted: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, in order, starting with the initial one.
    pub fn visited(&self) -> &[Phase] {
        &self.visited
    }

    pub fn state(&self) -> &DebateState {
        &self.state
    }

    pub fn into_state(self) -> DebateState {
        self.state
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Pull the next event: the seeded opening first, then every new turn.
    ///
    /// Returns `Ok(None)` once the verdict has been handed out. The stream is
    /// single-pass; after an error every call returns
    /// [`DebateError::Aborted`] carrying the original failure.
    pub async fn next_event(&mut self) -> Result<Option<DebateEvent>, DebateError> {
        if let Some(reason) = &self.aborted {
            return Err(DebateError::Aborted(reason.clone()));
        }

        if !self.seed_emitted {
            self.seed_emitted = true;
            if let Some(seed) = self.state.shadow_history().first() {
                return Ok(Some(DebateEvent::from(seed)));
            }
        }

        while !self.phase.is_terminal() {
            match self.advance().await {
                Ok(Some(turn)) => return Ok(Some(DebateEvent::from(&turn))),
                Ok(None) => continue,
                Err(e) => {
                    self.aborted = Some(e.to_string());
                    return Err(e);
                }
            }
        }

        Ok(None)
    }

    /// Run the current phase's step and move to the next phase.
    ///
    /// Returns the turn the step produced, if any.
    async fn advance(&mut self) -> Result<Option<Turn>, DebateError> {
        let mut produced = None;

        let outcome = match self.phase.step() {
            Step::Speak(speaker) => {
                info!(
                    phase = %self.phase,
                    turn_count = self.state.turn_count(),
                    window_len = self.state.active_window().len(),
                    "{} speaking",
                    speaker
                );
                let idea = self.state.position_of(speaker).unwrap_or_default();
                let messages = persona_messages(
                    &self.config,
                    speaker,
                    idea,
                    self.state.active_window(),
                    self.state.summary(),
                );
                let text = self.generator.generate(&messages).await?;
                if text.trim().is_empty() {
                    warn!(%speaker, "empty reply from generator");
                }

                produced = Some(self.state.record_persona_turn(speaker, text).clone());
                Outcome::Spoke {
                    speaker,
                    turn_count: self.state.turn_count(),
                    window_len: self.state.active_window().len(),
                }
            }
            Step::Summarize => {
                info!(
                    phase = %self.phase,
                    window_len = self.state.active_window().len(),
                    "summarizing conversation"
                );
                let summary = summarize(
                    &self.generator,
                    &self.config,
                    self.state.active_window(),
                    self.state.summary(),
                )
                .await?;
                let removed = self.state.apply_summary(summary, self.config.debate.keep_last);
                info!(removed, "window truncated");
                Outcome::Summarized
            }
            Step::Arbitrate => {
                info!(
                    phase = %self.phase,
                    turns = self.state.shadow_history().len(),
                    "supervisor reviewing debate"
                );
                let verdict = arbitrate(
                    &self.generator,
                    &self.config,
                    self.state.shadow_history(),
                    self.state.position1(),
                    self.state.position2(),
                )
                .await?;
                produced = Some(self.state.record_verdict(verdict).clone());
                Outcome::Verdict
            }
            Step::Halt => return Ok(None),
        };

        let next = transition(self.phase, &outcome, &self.config.debate)?;
        self.phase = next;
        self.visited.push(next);
        Ok(produced)
    }
}
