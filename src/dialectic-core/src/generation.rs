//! Language-model access.
//!
//! The engine only sees the [`Generator`] trait. [`OpenAiGenerator`] backs it
//! with an OpenAI-compatible or Azure OpenAI chat-completions endpoint.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::{AzureConfig, Config as ClientConfig, OpenAIConfig};
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::error::DebateError;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Conversation role of a message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message of a chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Optional author tag, forwarded as the message `name`.
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Text completion capability injected into the engine.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the next message for the given conversation.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, DebateError>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, DebateError> {
        (**self).generate(messages).await
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Arc<G> {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, DebateError> {
        (**self).generate(messages).await
    }
}

/// Where completions come from, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Azure {
        endpoint: String,
        api_key: String,
        api_version: String,
        deployment: String,
    },
    OpenAi {
        api_base: String,
        api_key: String,
        model: String,
    },
}

impl Provider {
    /// Resolve the provider from process environment variables.
    pub fn from_env(model: &ModelConfig) -> Result<Self, DebateError> {
        Self::from_lookup(
            |key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()),
            model,
        )
    }

    /// Resolve the provider through `lookup`, which maps variable names to values.
    ///
    /// `AZURE_OPENAI_ENDPOINT` selects Azure; anything else is treated as an
    /// OpenAI-compatible endpoint.
    pub fn from_lookup<F>(lookup: F, model: &ModelConfig) -> Result<Self, DebateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| {
                DebateError::Config(format!("Missing required environment variable {}", key))
            })
        };

        if let Some(endpoint) = lookup("AZURE_OPENAI_ENDPOINT") {
            let deployment = lookup("AZURE_DEPLOYMENT_LLM_MODEL")
                .or_else(|| model.deployment_name.clone())
                .ok_or_else(|| missing_model("AZURE_DEPLOYMENT_LLM_MODEL"))?;

            return Ok(Provider::Azure {
                endpoint,
                api_key: require("AZURE_OPENAI_API_KEY")?,
                api_version: require("OPENAI_API_VERSION")?,
                deployment,
            });
        }

        let api_base = lookup("OPENAI_API_BASE")
            .or_else(|| lookup("OPENAI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model_name = lookup("AZURE_DEPLOYMENT_LLM_MODEL")
            .or_else(|| lookup("OPENAI_MODEL"))
            .or_else(|| model.deployment_name.clone())
            .ok_or_else(|| missing_model("OPENAI_MODEL"))?;

        Ok(Provider::OpenAi {
            api_base,
            api_key: require("OPENAI_API_KEY")?,
            model: model_name,
        })
    }

    /// Deployment or model name requests are sent to.
    pub fn model_name(&self) -> &str {
        match self {
            Provider::Azure { deployment, .. } => deployment,
            Provider::OpenAi { model, .. } => model,
        }
    }
}

fn missing_model(variable: &str) -> DebateError {
    DebateError::Config(format!(
        "No model name: set {} or model.deployment_name",
        variable
    ))
}

/// Build the boxed generator for a resolved provider.
pub fn build_generator(
    provider: &Provider,
    settings: &ModelConfig,
) -> Result<Box<dyn Generator>, DebateError> {
    match provider {
        Provider::Azure {
            endpoint,
            api_key,
            api_version,
            deployment,
        } => {
            let config = AzureConfig::new()
                .with_api_base(endpoint)
                .with_api_key(api_key)
                .with_api_version(api_version)
                .with_deployment_id(deployment);
            Ok(Box::new(OpenAiGenerator::new(config, deployment, settings)?))
        }
        Provider::OpenAi {
            api_base,
            api_key,
            model,
        } => {
            let config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base);
            Ok(Box::new(OpenAiGenerator::new(config, model, settings)?))
        }
    }
}

/// Chat-completions backed generator with bounded retries.
pub struct OpenAiGenerator<C: ClientConfig> {
    client: Client<C>,
    model: String,
    max_completion_tokens: u32,
    max_retries: u32,
}

impl<C: ClientConfig> OpenAiGenerator<C> {
    pub fn new(
        config: C,
        model: impl Into<String>,
        settings: &ModelConfig,
    ) -> Result<Self, DebateError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DebateError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.into(),
            max_completion_tokens: settings.max_completion_tokens,
            max_retries: settings.max_retries.max(1),
        })
    }
}

#[async_trait]
impl<C: ClientConfig + Send + Sync> Generator for OpenAiGenerator<C> {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, DebateError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(self.max_completion_tokens)
            .messages(
                messages
                    .iter()
                    .map(to_request_message)
                    .collect::<Vec<_>>(),
            )
            .build()?;

        let messages_len = messages.len();
        with_retries(self.max_retries, |attempt| {
            let request = request.clone();
            async move {
                debug!(model = %self.model, attempt, messages = messages_len, "chat completion");
                let response = self.client.chat().create(request).await?;
                Ok::<_, DebateError>(
                    response
                        .choices
                        .first()
                        .and_then(|c| c.message.content.clone())
                        .unwrap_or_default(),
                )
            }
        })
        .await
    }
}

/// Delay before retry number `retry` (1-based): 1s, 2s, 4s, ... capped at 32s.
fn backoff_delay(retry: u32) -> Duration {
    Duration::from_secs(1 << retry.saturating_sub(1).min(5))
}

/// Run `attempt` up to `max_retries` times, at least once, with exponential
/// backoff in between.
///
/// Each completion is sanitized; one that comes back empty counts as a failed
/// attempt. When every attempt fails the last failure is reported as
/// [`DebateError::Generation`].
async fn with_retries<F, Fut>(max_retries: u32, mut attempt: F) -> Result<String, DebateError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, DebateError>>,
{
    let attempts = max_retries.max(1);
    let mut last_error = String::from("no attempt made");

    for n in 0..attempts {
        if n > 0 {
            tokio::time::sleep(backoff_delay(n)).await;
        }

        match attempt(n).await {
            Ok(content) => {
                let sanitized = sanitize_response(&content);
                if !sanitized.is_empty() {
                    return Ok(sanitized);
                }
                last_error = "empty completion".to_string();
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }

        warn!(
            attempt = n + 1,
            max = attempts,
            error = %last_error,
            "completion attempt failed"
        );
    }

    Err(DebateError::Generation(format!(
        "{} after {} attempt(s)",
        last_error, attempts
    )))
}

fn to_request_message(message: &ChatMessage) -> ChatCompletionRequestMessage {
    match message.role {
        ChatRole::System => {
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: message.content.clone().into(),
                name: message.name.clone(),
            })
        }
        ChatRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: message.content.clone().into(),
            name: message.name.clone(),
        }),
        ChatRole::Assistant => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(message.content.clone().into()),
                name: message.name.clone(),
                tool_calls: None,
                refusal: None,
                audio: None,
                function_call: None,
            })
        }
    }
}

/// Sanitize a model response by stripping reasoning tokens and XML-like tags.
///
/// Removes patterns like <thinking>...</thinking>, <reflection>...</reflection>, etc.
/// so the text can be read aloud and printed as-is.
pub fn sanitize_response(response: &str) -> String {
    let tags_to_strip = [
        "thinking",
        "think",
        "reflection",
        "reflect",
        "internal",
        "reasoning",
        "thought",
        "scratch",
        "scratchpad",
        "plan",
        "analysis",
    ];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Orphaned opening/closing tags
    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    result = result.replace('*', "");

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}
