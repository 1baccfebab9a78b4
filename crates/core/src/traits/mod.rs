//! Collaborator traits
//!
//! The chatbot core treats its external services as narrow capability
//! interfaces so they can be swapped or mocked:
//!
//! ```text
//! Embedder:     text → vector
//! VectorStore:  vector / hybrid query → document fragments
//! LanguageModel: messages → text
//! ```

mod embedder;
mod llm;
mod vector_store;

pub use embedder::Embedder;
pub use llm::LanguageModel;
pub use vector_store::VectorStore;
