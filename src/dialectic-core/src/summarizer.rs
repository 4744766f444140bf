//! Rolling summary of turns that leave the active window.

use tracing::debug;

use crate::config::Config;
use crate::error::DebateError;
use crate::generation::Generator;
use crate::prompts::summary_messages;
use crate::transcript::Turn;

/// Compress `window` into a new summary, extending `prior` when there is one.
///
/// Any generation failure is returned as-is; the caller treats it as fatal.
pub async fn summarize<G: Generator + ?Sized>(
    generator: &G,
    config: &Config,
    window: &[Turn],
    prior: Option<&str>,
) -> Result<String, DebateError> {
    let messages = summary_messages(config, window, prior);
    let summary = generator.generate(&messages).await?;
    debug!(
        extended = prior.is_some(),
        turns = window.len(),
        chars = summary.len(),
        "summary updated"
    );
    Ok(summary)
}
