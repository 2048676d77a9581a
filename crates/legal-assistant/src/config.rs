use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::ApiProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub data_dir: PathBuf,
    /// Directory of `<name>_<year>.<ext>` law documents.
    pub laws_dir: PathBuf,
    /// Where `laws.index` / `laws_meta.jsonl` are persisted.
    pub index_dir: PathBuf,
    pub contracts_dir: PathBuf,
    pub checklists: ChecklistConfig,
    pub embedding: EmbeddingConfig,
    pub reranker: RerankerConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistConfig {
    pub template_path: PathBuf,
    pub final_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model_dir: PathBuf,
    pub max_length: usize,
    pub cache_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub model_dir: PathBuf,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub min_fragment_len: usize,
    pub max_chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub max_sub_queries: usize,
    pub sub_query_top_k: usize,
    pub sub_query_final_k: usize,
    pub contract_top_k: usize,
    pub contract_final_k: usize,
    pub contract_query_chars: usize,
    pub law_excerpt_chars: usize,
    pub contract_excerpt_chars: usize,
    pub classifier_excerpt_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: ApiProvider,
    pub model: String,
    /// Falls back to `GEMINI_API_KEY` when unset. Never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: usize,
    pub chitchat_max_tokens: usize,
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl AssistantConfig {
    /// Defaults laid out under a single data directory.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();

        let model_dir = if Path::new("models").exists() {
            PathBuf::from("models")
        } else if let Ok(env_path) = std::env::var("MODEL_PATH") {
            PathBuf::from(env_path)
        } else {
            data_dir.join("models")
        };

        Self {
            laws_dir: data_dir.join("data_laws"),
            index_dir: data_dir.join("index_laws"),
            contracts_dir: data_dir.join("contracts"),
            checklists: ChecklistConfig {
                template_path: data_dir.join("checklists").join("checklist_template.docx"),
                final_path: data_dir.join("checklists").join("checklist_final.docx"),
            },
            embedding: EmbeddingConfig {
                model_dir: model_dir.join("all-MiniLM-L6-v2"),
                max_length: 256,
                cache_size: 1000,
            },
            reranker: RerankerConfig {
                model_dir: model_dir.join("ms-marco-MiniLM-L6-v2"),
                enabled: true,
            },
            chunking: ChunkingConfig {
                min_fragment_len: 20,
                max_chunk_size: 4500,
            },
            retrieval: RetrievalConfig {
                max_sub_queries: 3,
                sub_query_top_k: 30,
                sub_query_final_k: 3,
                contract_top_k: 40,
                contract_final_k: 8,
                contract_query_chars: 1500,
                law_excerpt_chars: 500,
                contract_excerpt_chars: 30_000,
                classifier_excerpt_chars: 5000,
            },
            llm: LlmConfig {
                provider: ApiProvider::Google,
                model: "gemini-2.5-flash".to_string(),
                api_key: None,
                connect_timeout_secs: 15,
                request_timeout_secs: 300,
                temperature: 0.3,
                top_p: 0.95,
                top_k: 40,
                max_tokens: 8192,
                chitchat_max_tokens: 512,
            },
            data_dir,
        }
    }

    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunking.max_chunk_size < 200 {
            return Err("chunking.max_chunk_size must be >= 200".into());
        }
        if self.chunking.min_fragment_len >= self.chunking.max_chunk_size {
            return Err("chunking.min_fragment_len must be < max_chunk_size".into());
        }
        if self.embedding.max_length == 0 {
            return Err("embedding.max_length must be > 0".into());
        }
        let r = &self.retrieval;
        if r.max_sub_queries == 0 {
            return Err("retrieval.max_sub_queries must be > 0".into());
        }
        if r.sub_query_top_k == 0 || r.sub_query_final_k == 0 {
            return Err("retrieval.sub_query_top_k and sub_query_final_k must be > 0".into());
        }
        if r.contract_top_k == 0 || r.contract_final_k == 0 {
            return Err("retrieval.contract_top_k and contract_final_k must be > 0".into());
        }
        if r.sub_query_final_k > r.sub_query_top_k * 2 || r.contract_final_k > r.contract_top_k * 2 {
            return Err("retrieval final_k cannot exceed the candidate pool (2 * top_k)".into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err("llm.temperature must be in [0.0, 2.0]".into());
        }
        if self.llm.model.trim().is_empty() {
            return Err("llm.model must not be empty".into());
        }
        if self.llm.chitchat_max_tokens == 0 || self.llm.max_tokens == 0 {
            return Err("llm token limits must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let data_dir = match std::env::var("LEGAL_ASSISTANT_DATA") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("legal-assistant"),
        };
        Self::for_data_dir(data_dir)
    }
}
