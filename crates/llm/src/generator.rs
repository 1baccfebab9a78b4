//! Response generation with refusal validation
//!
//! One grounded completion, disclaimer cleanup, and a single strict retry
//! when the model answers with boilerplate.

use std::sync::Arc;

use docbot_core::{LanguageModel, Message, SearchMethod};

use crate::prompt::{ContextMetadata, PromptBuilder, DEFAULT_PRODUCT};
use crate::validation::{is_generic_refusal, strip_unnecessary_disclaimer};

/// Inputs of one generation
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// User question as typed
    pub question: &'a str,
    /// Generic-normalized retrieval phrasing
    pub normalized_query: &'a str,
    /// Retrieved context, verbatim
    pub context: &'a str,
    pub results_count: usize,
    pub search_method: SearchMethod,
    /// Recent conversation, oldest first
    pub history: &'a [Message],
}

impl GenerationRequest<'_> {
    fn metadata(&self) -> ContextMetadata {
        ContextMetadata {
            results_count: self.results_count,
            search_method: self.search_method,
        }
    }
}

/// Generation outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Usable answer
    Answer(String),
    /// Model refused twice; treat the turn as "no info"
    NoInfo,
    /// Model call failed or produced nothing
    Failed(String),
}

/// Response generator over a language model
pub struct ResponseGenerator {
    llm: Arc<dyn LanguageModel>,
    product: String,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            product: DEFAULT_PRODUCT.to_string(),
        }
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.llm
    }

    pub async fn generate(&self, request: &GenerationRequest<'_>) -> GenerationOutcome {
        let messages = PromptBuilder::new()
            .with_product(self.product.as_str())
            .grounded_system_prompt(request.context, request.metadata())
            .with_history(request.history)
            .user_message(request.question)
            .normalized_query_note(request.normalized_query)
            .build();

        let answer = match self.llm.complete(&messages).await {
            Ok(text) => strip_unnecessary_disclaimer(&text),
            Err(e) => {
                tracing::error!(error = %e, model = self.llm.model_name(), "Generation failed");
                return GenerationOutcome::Failed("Error al generar respuesta".to_string());
            }
        };

        if answer.trim().is_empty() {
            return GenerationOutcome::Failed("Error al generar respuesta".to_string());
        }

        if !is_generic_refusal(&answer) {
            return GenerationOutcome::Answer(answer);
        }

        tracing::warn!("Generic answer detected, retrying with strict prompt");
        let strict = PromptBuilder::new()
            .with_product(self.product.as_str())
            .strict_system_prompt(request.context, request.metadata())
            .with_history(request.history)
            .user_message(request.question)
            .build();

        match self.llm.complete(&strict).await {
            Ok(text) if !text.trim().is_empty() && !is_generic_refusal(&text) => {
                GenerationOutcome::Answer(text.trim().to_string())
            }
            Ok(_) => GenerationOutcome::NoInfo,
            Err(e) => {
                tracing::warn!(error = %e, "Strict retry failed");
                GenerationOutcome::NoInfo
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docbot_core::Role;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays scripted completions and records every prompt
    struct ScriptedLlm {
        replies: Mutex<VecDeque<docbot_core::Result<String>>>,
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<docbot_core::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn complete(&self, messages: &[Message]) -> docbot_core::Result<String> {
            self.prompts.lock().push(messages.to_vec());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(docbot_core::Error::Llm("script exhausted".into())))
        }
        async fn is_available(&self) -> bool {
            true
        }
        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn request<'a>(history: &'a [Message]) -> GenerationRequest<'a> {
        GenerationRequest {
            question: "como creo una cuenta?",
            normalized_query: "como crear una cuenta",
            context: "Para crear una cuenta ingrese a Contabilidad > Plan de cuentas.",
            results_count: 1,
            search_method: SearchMethod::Hybrid,
            history,
        }
    }

    #[tokio::test]
    async fn test_answer_passes_through() {
        let llm = ScriptedLlm::new(vec![Ok("Ingrese a Contabilidad y presione Nuevo.".into())]);
        let generator = ResponseGenerator::new(llm.clone());
        let history = [Message::user("hola"), Message::assistant("¡Hola!")];

        let outcome = generator.generate(&request(&history)).await;
        assert_eq!(
            outcome,
            GenerationOutcome::Answer("Ingrese a Contabilidad y presione Nuevo.".into())
        );

        let prompts = llm.prompts.lock();
        let sent = &prompts[0];
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[1].content, "hola");
        assert_eq!(sent[3].content, "como creo una cuenta?");
        assert_eq!(sent[4].content, "(consulta normalizada: como crear una cuenta)");
    }

    #[tokio::test]
    async fn test_generic_then_strict_success() {
        let llm = ScriptedLlm::new(vec![
            Ok("No tengo la información.".into()),
            Ok("Contabilidad > Plan de cuentas > Nuevo.".into()),
        ]);
        let generator = ResponseGenerator::new(llm.clone());
        let outcome = generator.generate(&request(&[])).await;
        assert_eq!(
            outcome,
            GenerationOutcome::Answer("Contabilidad > Plan de cuentas > Nuevo.".into())
        );
        let prompts = llm.prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1][0].content.contains("No introduzcas preámbulos"));
    }

    #[tokio::test]
    async fn test_generic_twice_is_no_info() {
        let llm = ScriptedLlm::new(vec![
            Ok("No hay información.".into()),
            Ok("No puedo responder eso.".into()),
        ]);
        let outcome = ResponseGenerator::new(llm).generate(&request(&[])).await;
        assert_eq!(outcome, GenerationOutcome::NoInfo);
    }

    #[tokio::test]
    async fn test_prompt_refusal_twice_is_no_info() {
        let llm = ScriptedLlm::new(vec![
            Ok(crate::prompt::REFUSAL_SENTENCE.into()),
            Ok(crate::prompt::REFUSAL_SENTENCE.into()),
        ]);
        let generator = ResponseGenerator::new(llm.clone());
        let outcome = generator.generate(&request(&[])).await;
        assert_eq!(outcome, GenerationOutcome::NoInfo);
        assert_eq!(llm.prompts.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_llm_failure() {
        let llm = ScriptedLlm::new(vec![Err(docbot_core::Error::Llm("503".into()))]);
        let outcome = ResponseGenerator::new(llm).generate(&request(&[])).await;
        assert!(matches!(outcome, GenerationOutcome::Failed(_)));
    }
}
