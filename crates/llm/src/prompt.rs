//! Prompt building
//!
//! Constructs grounded prompts for the documentation assistant. The model is
//! told to answer only from the retrieved CONTEXT.

use docbot_core::{Message, SearchMethod};

/// Sentence the model must use when the context does not cover the question
pub const REFUSAL_SENTENCE: &str = "No encontré información específica disponible para esa pregunta.";

/// Product the assistant specializes in
pub const DEFAULT_PRODUCT: &str = "EasySoft";

/// Retrieval facts shown to the model for traceability
#[derive(Debug, Clone, Copy)]
pub struct ContextMetadata {
    pub results_count: usize,
    pub search_method: SearchMethod,
}

/// Prompt builder
pub struct PromptBuilder {
    messages: Vec<Message>,
    product: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            product: DEFAULT_PRODUCT.to_string(),
        }
    }

    /// Set the product name used in the persona line
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Standard grounded system prompt
    pub fn grounded_system_prompt(mut self, context: &str, meta: ContextMetadata) -> Self {
        let system = format!(
            r#"Eres un asistente experto en {product}.

REGLAS ANTIALUCINACIONES:
- No inventes información.
- No completes con conocimiento general ni con temas relacionados.
- Responde solo si el dato aparece en el CONTEXTO.
- Si no está, di literalmente que no se encontró información específica.

Responde ÚNICAMENTE con información presente en el CONTEXTO. Si el CONTEXTO no cubre la pregunta, responde exactamente: '{refusal}' y ofrece reformular. No agregues información de otros temas, incluso si parecen relacionados. Si no encuentras información, indícalo y ofrece que escriba explícitamente la palabra 'ayuda' para ser derivado a un consultor.

CONTEXTO:
{context}

METADATOS:
- Resultados: {count}
- Método: {method}
"#,
            product = self.product,
            refusal = REFUSAL_SENTENCE,
            context = context,
            count = meta.results_count,
            method = meta.search_method,
        );

        self.messages.push(Message::system(system));
        self
    }

    /// Shorter, stricter prompt used after a generic refusal
    pub fn strict_system_prompt(mut self, context: &str, meta: ContextMetadata) -> Self {
        let system = format!(
            r#"Eres un asistente experto en {product}.

REGLAS IMPORTANTES (ANTIALUCINACIONES):
- Responde SOLO con el CONTEXTO provisto.
- Si el CONTEXTO no incluye la respuesta, di exactamente: "{refusal}" y sugiere reformular.
- No inventes ni extrapoles.
- Sé breve y directo.
- No menciones la palabra "documentación" ni frases como "según la documentación", "en la documentación disponible", "de acuerdo a la documentación", etc.
- No introduzcas preámbulos; comienza directamente con el contenido útil.

CONTEXTO:
{context}

METADATOS DE BÚSQUEDA:
- Resultados encontrados: {count}
- Método de búsqueda: {method}
"#,
            product = self.product,
            refusal = REFUSAL_SENTENCE,
            context = context,
            count = meta.results_count,
            method = meta.search_method,
        );

        self.messages.push(Message::system(system));
        self
    }

    /// Add conversation history
    pub fn with_history(mut self, history: &[Message]) -> Self {
        self.messages.extend(history.iter().cloned());
        self
    }

    /// Add current user message
    pub fn user_message(mut self, message: &str) -> Self {
        self.messages.push(Message::user(message));
        self
    }

    /// Show the model the normalized retrieval phrasing
    pub fn normalized_query_note(mut self, normalized: &str) -> Self {
        if !normalized.trim().is_empty() {
            self.messages
                .push(Message::assistant(format!("(consulta normalizada: {})", normalized.trim())));
        }
        self
    }

    /// Build final message list
    pub fn build(self) -> Vec<Message> {
        self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Estimate token count
    pub fn estimate_tokens(&self) -> usize {
        self.messages
            .iter()
            .map(|m| m.content.chars().count() / 4)
            .sum()
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
