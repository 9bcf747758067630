//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{Result, SqlwrightError};
use crate::llm::{
    AnthropicClient, AnthropicConfig, LlmClient, LlmProvider, MockLlmClient, OllamaClient,
    OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client for the given provider and settings.
///
/// API keys for the hosted providers are read from the environment
/// (`OPENAI_API_KEY` / `ANTHROPIC_API_KEY`); the model and request timeout
/// come from the config. Ollama and the mock provider need no key.
pub fn create_client(provider: LlmProvider, config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::OpenAi => {
            let key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                SqlwrightError::llm("No API key configured. Set OPENAI_API_KEY.")
            })?;
            let client = OpenAiClient::new(
                OpenAiConfig::new(key, &config.model).with_timeout(config.timeout_secs),
            )?;
            Ok(Box::new(client))
        }
        LlmProvider::Anthropic => {
            let key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                SqlwrightError::llm("No API key configured. Set ANTHROPIC_API_KEY.")
            })?;
            let client = AnthropicClient::new(
                AnthropicConfig::new(key, &config.model).with_timeout(config.timeout_secs),
            )?;
            Ok(Box::new(client))
        }
        LlmProvider::Ollama => {
            let base_url = std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string());
            let client = OllamaClient::new(
                crate::llm::OllamaConfig::new(&config.model)
                    .with_url(base_url)
                    .with_timeout(config.timeout_secs),
            )?;
            Ok(Box::new(client))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(model: &str) -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: model.to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_create_mock_client() {
        let client = create_client(LlmProvider::Mock, &llm_config("unused"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(LlmProvider::Ollama, &llm_config("llama3.2:3b"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_openai_without_key_fails() {
        // Temporarily unset the env var if it exists
        let original = std::env::var("OPENAI_API_KEY").ok();
        std::env::remove_var("OPENAI_API_KEY");

        let result = create_client(LlmProvider::OpenAi, &llm_config("gpt-4o"));
        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("No API key configured"));

        // Restore
        if let Some(key) = original {
            std::env::set_var("OPENAI_API_KEY", key);
        }
    }

    #[test]
    fn test_create_anthropic_without_key_fails() {
        let original = std::env::var("ANTHROPIC_API_KEY").ok();
        std::env::remove_var("ANTHROPIC_API_KEY");

        let result = create_client(LlmProvider::Anthropic, &llm_config("claude-3-5-sonnet-latest"));
        assert!(result.is_err());

        if let Some(key) = original {
            std::env::set_var("ANTHROPIC_API_KEY", key);
        }
    }
}
