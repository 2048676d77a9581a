pub mod agent;
pub mod config;
pub mod embeddings;
pub mod indexing;
pub mod llm;
pub mod processing;
pub mod reranking;
pub mod search;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience
pub use agent::LegalOrchestrator;
pub use config::AssistantConfig;
pub use indexing::LawLibrary;
pub use storage::ContractStorage;
pub use types::{ContractStatus, DocumentStatus, Intent, LawChunk, Mode};

// Re-export LLM types
pub use llm::{ApiProvider, GenerationClient, GenerationConfig, Generated, LLMProvider, ProviderInfo};

pub use anyhow::{Error, Result};
