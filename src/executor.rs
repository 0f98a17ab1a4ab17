//! Model execution abstraction and implementations.
//!
//! Provides the [`ModelExecutor`] trait and implementations:
//! - [`EchoExecutor`]: testing/demo executor, no network, no credential
//! - [`OpenAiExecutor`]: OpenAI chat-completions API
//!
//! Execution is the external step the caller takes *after* the decision
//! pipeline emits a [`crate::DecisionRecord`]: it receives the chosen
//! model, the forwarded (possibly redacted) text, and a request-scoped
//! credential. Credentials are never stored on the executor or read from
//! process-global state, so they cannot leak across sessions.
//!
//! Failures propagate verbatim to the caller; no automatic retry.

use crate::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A request-scoped execution credential.
///
/// The secret is deliberately excluded from `Debug` output so credentials
/// can never reach logs through formatting.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret string.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Access the raw secret for provider authentication headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the credential is empty (treated as missing).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// Trait for model execution backends.
///
/// Implementations must be thread-safe (`Send + Sync`) for use across tasks.
/// The trait is object-safe to allow dynamic dispatch via `Arc<dyn ModelExecutor>`.
#[async_trait]
pub trait ModelExecutor: Send + Sync {
    /// Invoke `model` with the forwarded text under a request-scoped credential.
    ///
    /// Returns the response as a vector of token strings.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::CredentialMissing`] if the backend requires a
    ///   credential and none (or an empty one) was supplied. The executor
    ///   refuses to call the provider rather than silently simulating output.
    /// - [`GatewayError::Execution`] for network or provider failures,
    ///   surfaced verbatim; no retry.
    async fn invoke(
        &self,
        model: &str,
        text: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<String>, GatewayError>;
}

// ============================================================================
// Echo Executor (Testing)
// ============================================================================

/// Dummy echo executor for testing and credential-less demos.
///
/// Simply splits the forwarded text into words and returns them as tokens.
/// Useful for pipeline smoke tests without real provider dependencies.
pub struct EchoExecutor {
    /// Simulated inference delay.
    pub delay_ms: u64,
}

impl EchoExecutor {
    /// Create an echo executor with the default 10 ms delay.
    pub fn new() -> Self {
        Self { delay_ms: 10 }
    }

    /// Create an echo executor with a custom delay.
    pub fn with_delay(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Default for EchoExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelExecutor for EchoExecutor {
    async fn invoke(
        &self,
        _model: &str,
        text: &str,
        _credential: Option<&Credential>,
    ) -> Result<Vec<String>, GatewayError> {
        // Simulate inference latency
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;

        Ok(text.split_whitespace().map(|s| s.to_string()).collect())
    }
}

// ============================================================================
// OpenAI Executor
// ============================================================================

/// OpenAI chat-completions request payload.
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// OpenAI chat-completions response.
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

/// OpenAI chat-completions executor (gpt-4o, gpt-4o-mini, etc.).
///
/// The model is supplied per call — the routing decision picks it — and the
/// credential is supplied per call so it stays request-scoped.
///
/// ## Example
///
/// ```no_run
/// use prompt_gateway::OpenAiExecutor;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let executor = Arc::new(
///     OpenAiExecutor::new()
///         .with_max_tokens(512)
///         .with_temperature(0.7)
///         .with_timeout(Duration::from_secs(30))
/// );
/// ```
pub struct OpenAiExecutor {
    client: reqwest::Client,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiExecutor {
    /// Create a new OpenAI executor with default generation settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 256,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the API base URL (testing against a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature (0.0 - 2.0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set request timeout — the per-request deadline for the external call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OpenAiExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelExecutor for OpenAiExecutor {
    async fn invoke(
        &self,
        model: &str,
        text: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<String>, GatewayError> {
        let credential = match credential {
            Some(c) if !c.is_empty() => c,
            _ => return Err(GatewayError::CredentialMissing),
        };

        let request = OpenAiRequest {
            model: model.to_string(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: text.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Execution(format!("OpenAI request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Execution(format!(
                "OpenAI API error {status}: {error_text}"
            )));
        }

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Execution(format!("Failed to parse response: {e}")))?;

        let Some(choice) = api_response.choices.first() else {
            return Err(GatewayError::Execution(
                "No choices in OpenAI response".to_string(),
            ));
        };

        Ok(choice
            .message
            .content
            .split_whitespace()
            .map(|s| s.to_string())
            .collect())
    }
}
