//! Language model trait

use async_trait::async_trait;

use crate::{Message, Result};

/// Language Model interface
///
/// Implementations normalize whatever their provider returns into plain text.
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OpenAiBackend::new(config)?);
/// let text = llm
///     .complete(&[Message::system("Respondé en español"), Message::user("hola")])
///     .await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Complete a chat; `messages[0]` is the system prompt
    ///
    /// Returns an error when the provider fails or produces no text.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Check if the model endpoint is reachable
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;

    /// Estimate token count for text
    fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoLlm;

    #[async_trait]
    impl LanguageModel for EchoLlm {
        async fn complete(&self, messages: &[Message]) -> Result<String> {
            Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default())
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_mock_llm() {
        let llm = EchoLlm;
        assert!(llm.is_available().await);
        let text = llm
            .complete(&[Message::system("s"), Message::user("hola")])
            .await
            .unwrap();
        assert_eq!(text, "hola");
    }

    #[test]
    fn test_token_estimation() {
        let llm = EchoLlm;
        assert_eq!(llm.estimate_tokens("12345678"), 2);
    }
}
