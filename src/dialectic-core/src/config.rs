//! Configuration module for loading TOML config files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::DebateError;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub debate: DebateSettings,
    pub prompts: PromptsConfig,
    pub voices: VoicesConfig,
}

/// Language-model settings. Credentials come from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Deployment (Azure) or model (OpenAI-compatible) name.
    pub deployment_name: Option<String>,
    pub max_completion_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            deployment_name: None,
            max_completion_tokens: 600,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Turn engine limits.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DebateSettings {
    /// Persona turns after which the arbiter takes over.
    pub debate_length: u32,
    /// Window size that triggers summarization when exceeded.
    pub window_threshold: usize,
    /// Window entries kept after summarization.
    pub keep_last: usize,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            debate_length: 16,
            window_threshold: 8,
            keep_last: 2,
        }
    }
}

/// Prompt templates. Placeholders are substituted by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Persona instruction, `{idea}` is the defended position.
    pub interlocutor: String,
    /// Arbiter instruction, with `{idea1}` and `{idea2}`.
    pub supervisor: String,
    /// Appended to the persona instruction once a summary exists.
    pub summary_context: String,
    /// First summarization request.
    pub initial_summary: String,
    /// Later summarization requests, `{summary}` is the prior summary.
    pub extend_summary: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            interlocutor: DEFAULT_INTERLOCUTOR_PROMPT.to_string(),
            supervisor: DEFAULT_SUPERVISOR_PROMPT.to_string(),
            summary_context: "Summary of what has been discussed earlier in the debate: {summary}"
                .to_string(),
            initial_summary: DEFAULT_INITIAL_SUMMARY.to_string(),
            extend_summary: "This is a summary of the debate so far: {summary}\n\n\
                             Extend the summary using the new messages above:"
                .to_string(),
        }
    }
}

/// Voice configuration for TTS.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoicesConfig {
    pub interlocutor1: String,
    pub interlocutor2: String,
    pub supervisor: String,
    /// Playback rate, 1.0 is unchanged.
    pub speed: f32,
}

impl Default for VoicesConfig {
    fn default() -> Self {
        Self {
            interlocutor1: "bf_emma".to_string(),
            interlocutor2: "bm_george".to_string(),
            supervisor: "af_sky".to_string(),
            speed: 1.0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, DebateError> {
        toml::from_str(content)
            .map_err(|e| DebateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Reject templates and limits the engine cannot run with.
    pub fn validate(&self) -> Result<(), DebateError> {
        let prompts = &self.prompts;
        if prompts.interlocutor.trim().is_empty() {
            return Err(DebateError::Config(
                "Missing interlocutor prompt template".to_string(),
            ));
        }
        if !prompts.interlocutor.contains("{idea}") {
            return Err(DebateError::Config(
                "Interlocutor prompt must contain the {idea} placeholder".to_string(),
            ));
        }
        if prompts.supervisor.trim().is_empty() {
            return Err(DebateError::Config(
                "Missing supervisor prompt template".to_string(),
            ));
        }
        if !prompts.supervisor.contains("{idea1}") || !prompts.supervisor.contains("{idea2}") {
            return Err(DebateError::Config(
                "Supervisor prompt must contain the {idea1} and {idea2} placeholders".to_string(),
            ));
        }
        if prompts.initial_summary.trim().is_empty() {
            return Err(DebateError::Config(
                "Missing initial summary prompt".to_string(),
            ));
        }
        if !prompts.extend_summary.contains("{summary}") {
            return Err(DebateError::Config(
                "Extend summary prompt must contain the {summary} placeholder".to_string(),
            ));
        }

        let debate = &self.debate;
        if debate.debate_length == 0 {
            return Err(DebateError::Config(
                "debate_length must be at least 1".to_string(),
            ));
        }
        if debate.keep_last == 0 {
            return Err(DebateError::Config("keep_last must be at least 1".to_string()));
        }
        if debate.window_threshold < debate.keep_last {
            return Err(DebateError::Config(format!(
                "window_threshold ({}) must not be below keep_last ({})",
                debate.window_threshold, debate.keep_last
            )));
        }

        Ok(())
    }

    /// Persona system instruction with the idea filled in.
    pub fn interlocutor_prompt(&self, idea: &str) -> String {
        self.prompts.interlocutor.replace("{idea}", idea)
    }

    /// Arbiter system instruction with both ideas filled in.
    pub fn supervisor_prompt(&self, idea1: &str, idea2: &str) -> String {
        self.prompts
            .supervisor
            .replace("{idea1}", idea1)
            .replace("{idea2}", idea2)
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}

const DEFAULT_INTERLOCUTOR_PROMPT: &str = r#"You are taking part in a live, spoken debate.

YOUR POSITION: {idea}

DEBATE RULES:
- Defend your position firmly and never concede it
- Answer the last thing your opponent said before adding new arguments
- Support every claim with reasoning or examples
- Keep each intervention short: one or two paragraphs
- Do NOT acknowledge being an AI - stay fully in character

CRITICAL OUTPUT RULES:
- Output ONLY your spoken words - no stage directions
- Do NOT use markdown, lists or asterisks
"#;

const DEFAULT_SUPERVISOR_PROMPT: &str = r#"You supervise a debate between two interlocutors.

Interlocutor1 defended: {idea1}
Interlocutor2 defended: {idea2}

You will receive the complete debate. Review every intervention, weigh the
quality of the arguments and rebuttals on each side, and decide which
interlocutor defended their idea better. Explain your reasoning briefly and
finish by naming the winner.

Output ONLY your spoken words, without markdown.
"#;

const DEFAULT_INITIAL_SUMMARY: &str = "Create a summary of the conversation above. Follow this \
example sentence when writing it: \"The conversation was about ..., where one interlocutor \
defends X and the other interlocutor defends Y...\":";
