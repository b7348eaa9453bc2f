//! Language detection and translation capability
//!
//! Translation backends are a capability interface selected at construction
//! time; the pipeline always holds *some* `Translator`, falling back to the
//! identity implementation when none is configured.

use argonaut_common::errors::{AppError, Result};
use argonaut_common::config::PipelineConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::vocab;

/// Translation capability seam
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` between ISO 639-1 languages
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;

    /// Implementation name, for diagnostics
    fn name(&self) -> &str;
}

/// Identity translator used when no backend is configured
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate(&self, text: &str, _from: &str, _to: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// HTTP translation client (LibreTranslate-compatible endpoint)
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(endpoint: String, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            source: from,
            target: to,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::AiService {
                service: "translation".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AiService {
                service: "translation".to_string(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: TranslateResponse =
            response.json().await.map_err(|e| AppError::AiService {
                service: "translation".to_string(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(result.translated_text)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Select a translator from configuration
pub fn create_translator(config: &PipelineConfig) -> Result<Arc<dyn Translator>> {
    match config.translator_provider.as_str() {
        "http" => {
            let endpoint =
                config
                    .translator_endpoint
                    .clone()
                    .ok_or_else(|| AppError::Configuration {
                        message: "pipeline.translator_endpoint required for the http provider"
                            .to_string(),
                    })?;
            Ok(Arc::new(HttpTranslator::new(
                endpoint,
                std::time::Duration::from_secs(10),
            )?))
        }
        "none" => Ok(Arc::new(NoopTranslator)),
        other => {
            tracing::warn!(provider = other, "Unknown translator provider, using noop");
            Ok(Arc::new(NoopTranslator))
        }
    }
}

/// Stop-word-ratio language detection over en/es/fr.
///
/// Good enough to decide whether to invoke the translator; anything
/// ambiguous falls back to English.
pub fn detect_language(text: &str) -> String {
    let words: Vec<String> = text
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return "en".to_string();
    }

    let score = |stop_words: &[&str]| {
        words.iter().filter(|w| stop_words.contains(&w.as_str())).count()
    };

    let en = score(vocab::STOP_WORDS_EN);
    let es = score(vocab::STOP_WORDS_ES);
    let fr = score(vocab::STOP_WORDS_FR);

    if es > en && es >= fr {
        "es".to_string()
    } else if fr > en && fr > es {
        "fr".to_string()
    } else {
        "en".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_translator_identity() {
        let translator = NoopTranslator;
        let text = "salinity near the equator";
        assert_eq!(translator.translate(text, "en", "en").await.unwrap(), text);
    }

    #[test]
    fn test_detect_english() {
        assert_eq!(detect_language("what is the temperature in the Arabian Sea"), "en");
    }

    #[test]
    fn test_detect_spanish() {
        assert_eq!(
            detect_language("cual es la salinidad en el mar arabigo"),
            "es"
        );
    }

    #[test]
    fn test_detect_defaults_to_english() {
        assert_eq!(detect_language(""), "en");
        assert_eq!(detect_language("2902746"), "en");
    }
}
