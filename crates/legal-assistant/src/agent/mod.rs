//! Agents
//!
//! - IntentAgent: normalizes the request and picks a [`Mode`](crate::types::Mode)
//! - RetrievalAgent: sub-query decomposition + hybrid law search
//! - ContractAnalyzer: status-aware contract review and clause drafting
//! - AnswerAgent: final answer for lookup and advisory requests
//! - LegalOrchestrator: routes one request through the agents above

pub mod answer;
pub mod contract;
pub mod intent;
pub mod orchestrator;
pub mod prompts;
pub mod retrieval;
pub mod status;

pub use answer::AnswerAgent;
pub use contract::{Checklists, ContractAnalyzer};
pub use intent::IntentAgent;
pub use orchestrator::LegalOrchestrator;
pub use retrieval::RetrievalAgent;
pub use status::ContractStatusClassifier;
