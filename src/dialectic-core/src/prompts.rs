//! Message assembly for persona, summarizer and arbiter calls.
//!
//! Stored turns carry only a speaker. Chat roles are assigned here, fresh on
//! every call, from the point of view of whoever is about to be prompted.

use crate::config::Config;
use crate::generation::{ChatMessage, ChatRole};
use crate::participant::Speaker;
use crate::transcript::Turn;

/// Map turns onto the two conversation roles as seen by `perspective`.
///
/// Its own turns become `Assistant`, every other turn becomes `User`.
/// Personas alternate, so the result alternates too and ends on the
/// opponent's turn whenever `perspective` is the next speaker.
pub fn normalize_roles(turns: &[Turn], perspective: Speaker) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| {
            if turn.speaker() == perspective {
                ChatMessage::assistant(turn.text())
            } else {
                ChatMessage::user(turn.text())
            }
        })
        .collect()
}

/// System instruction plus role-normalized window for a persona reply.
pub fn persona_messages(
    config: &Config,
    speaker: Speaker,
    idea: &str,
    window: &[Turn],
    summary: Option<&str>,
) -> Vec<ChatMessage> {
    let mut system = config.interlocutor_prompt(idea);
    if let Some(summary) = summary {
        system.push_str("\n\n");
        system.push_str(&config.prompts.summary_context.replace("{summary}", summary));
    }

    let mut messages = Vec::with_capacity(window.len() + 1);
    messages.push(ChatMessage::system(system));
    messages.extend(normalize_roles(window, speaker));
    messages
}

/// Window followed by the summarization request.
///
/// The first summary asks for a structured digest; later ones extend the
/// prior summary with the new turns.
pub fn summary_messages(config: &Config, window: &[Turn], prior: Option<&str>) -> Vec<ChatMessage> {
    let perspective = window
        .last()
        .map(|turn| turn.speaker())
        .unwrap_or(Speaker::Persona1);

    let instruction = match prior {
        Some(summary) => config.prompts.extend_summary.replace("{summary}", summary),
        None => config.prompts.initial_summary.clone(),
    };

    let mut messages = normalize_roles(window, perspective);
    messages.push(ChatMessage::user(instruction));
    messages
}

/// Supervisor instruction followed by every stored turn, tagged by speaker.
pub fn arbiter_messages(
    config: &Config,
    history: &[Turn],
    position1: &str,
    position2: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(
        config.supervisor_prompt(position1, position2),
    ));
    messages.extend(
        history
            .iter()
            .map(|turn| ChatMessage::user(turn.text()).with_name(turn.speaker().display_name())),
    );
    messages
}

/// True when no two consecutive non-system messages share a role.
pub fn roles_alternate(messages: &[ChatMessage]) -> bool {
    let roles: Vec<ChatRole> = messages
        .iter()
        .map(|m| m.role)
        .filter(|role| *role != ChatRole::System)
        .collect();
    roles.windows(2).all(|pair| pair[0] != pair[1])
}
