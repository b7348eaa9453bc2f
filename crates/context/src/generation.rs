//! Generation service client
//!
//! The generation service is an external black box: prompt in, prose out.
//! The client retries transient failures with exponential backoff, respects
//! a token-bucket rate limit, and surfaces rate-limit hits with a computed
//! retry-after rather than retrying them internally.

use argonaut_common::config::GenerationConfig;
use argonaut_common::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Generation seam: prompt in, prose out
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// HTTP chat-completions client with backoff and a token bucket
pub struct HttpGenerator {
    client: reqwest::Client,
    config: GenerationConfig,
    limiter: DirectLimiter,
    clock: DefaultClock,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl HttpGenerator {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let rps = NonZeroU32::new(config.requests_per_second.max(1)).expect("non-zero rps");
        let burst = NonZeroU32::new(config.burst.max(1)).expect("non-zero burst");
        let clock = DefaultClock::default();
        let limiter =
            RateLimiter::direct_with_clock(Quota::per_second(rps).allow_burst(burst), clock.clone());

        Ok(Self {
            client,
            config,
            limiter,
            clock,
        })
    }

    /// Take a token from the bucket; a hit is surfaced with a retry-after,
    /// never retried here
    pub fn try_acquire(&self) -> Result<()> {
        if let Err(not_until) = self.limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            return Err(AppError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            });
        }
        Ok(())
    }

    async fn call_once(&self, prompt: &str) -> Result<String> {
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a precise oceanographic data assistant.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::AiService {
                service: "generation".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AiService {
                service: "generation".to_string(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| AppError::AiService {
            service: "generation".to_string(),
            message: format!("Failed to parse response: {}", e),
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::AiService {
                service: "generation".to_string(),
                message: "Empty response".to_string(),
            })
    }
}

#[async_trait]
impl GenerationService for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.try_acquire()?;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(Duration::from_secs(
                self.config.timeout_secs * u64::from(self.config.max_retries.max(1)),
            )))
            .build();

        backoff::future::retry(policy, || async {
            match self.call_once(prompt).await {
                Ok(text) => Ok(text),
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "Generation request failed, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }
}

/// Canned generator for development and tests
pub struct MockGenerator {
    fail: bool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// A generator whose every call fails as the service being down
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.fail {
            return Err(AppError::AiService {
                service: "generation".to_string(),
                message: "service unavailable".to_string(),
            });
        }

        let question = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Question: "))
            .unwrap_or("your question");

        Ok(format!(
            "Based on the available observations, here is what the data shows about {}. \
             The evidence above supports this summary.",
            question
        ))
    }
}
