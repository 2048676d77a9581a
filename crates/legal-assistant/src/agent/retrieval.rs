use anyhow::Result;
use std::collections::HashSet;

use super::prompts;
use crate::config::RetrievalConfig;
use crate::indexing::LawLibrary;
use crate::llm::{GenerationClient, Generated};
use crate::types::LawChunk;

/// Decomposes a question into short sub-queries, searches each, and merges.
pub struct RetrievalAgent {
    llm: GenerationClient,
    max_sub_queries: usize,
    top_k: usize,
    final_k: usize,
}

impl RetrievalAgent {
    pub fn new(llm: GenerationClient, config: &RetrievalConfig) -> Self {
        Self {
            llm,
            max_sub_queries: config.max_sub_queries,
            top_k: config.sub_query_top_k,
            final_k: config.sub_query_final_k,
        }
    }

    /// Non-empty sub-queries, at most `max_sub_queries`. Falls back to the
    /// query itself when the model output is missing or malformed.
    pub async fn decompose(&self, query: &str) -> Vec<String> {
        let reply = self
            .llm
            .generate_json::<serde_json::Value>(&prompts::decomposition_prompt(query, self.max_sub_queries))
            .await;

        let sub_queries: Vec<String> = match reply {
            Generated::Value(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .take(self.max_sub_queries)
                .collect(),
            _ => Vec::new(),
        };

        if sub_queries.is_empty() {
            vec![query.to_string()]
        } else {
            sub_queries
        }
    }

    pub async fn run(&self, query: &str, library: &LawLibrary) -> Result<Vec<LawChunk>> {
        let sub_queries = self.decompose(query).await;
        tracing::info!(sub_queries = ?sub_queries, "Decomposed retrieval query");

        let mut results = Vec::new();
        for sub_query in &sub_queries {
            results.extend(library.search_async(sub_query, self.top_k, self.final_k).await?);
        }
        let merged = dedup_by_text(results);
        tracing::info!(chunks = merged.len(), "Retrieved law context");
        Ok(merged)
    }
}

/// Drop chunks whose text was already seen, keeping first-seen order.
pub fn dedup_by_text(chunks: Vec<LawChunk>) -> Vec<LawChunk> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|c| seen.insert(c.text.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use crate::testing::{client, law_chunk, library, ScriptedProvider};

    fn agent(provider: std::sync::Arc<ScriptedProvider>) -> RetrievalAgent {
        RetrievalAgent::new(client(provider), &AssistantConfig::for_data_dir("/tmp").retrieval)
    }

    #[tokio::test]
    async fn test_decompose_caps_and_filters() {
        let agent = agent(ScriptedProvider::replying(
            r#"["thủ tục đăng ký", "", "vốn điều lệ", 42, "hồ sơ", "thuế môn bài"]"#,
        ));
        assert_eq!(
            agent.decompose("q").await,
            vec!["thủ tục đăng ký", "vốn điều lệ", "hồ sơ"]
        );
    }

    #[tokio::test]
    async fn test_malformed_decomposition_uses_query() {
        let agent = agent(ScriptedProvider::replying(r#"{"queries": "x"}"#));
        assert_eq!(agent.decompose("thành lập công ty").await, vec!["thành lập công ty"]);

        let agent = RetrievalAgent::new(
            client(ScriptedProvider::failing()),
            &AssistantConfig::for_data_dir("/tmp").retrieval,
        );
        assert_eq!(agent.decompose("thành lập công ty").await, vec!["thành lập công ty"]);
    }

    #[test]
    fn test_dedup_keeps_first_seen() {
        let a = law_chunk("Điều 1. A", "x_2020.txt");
        let b = law_chunk("Điều 2. B", "x_2020.txt");
        let merged = dedup_by_text(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(merged, vec![a, b]);
    }

    #[tokio::test]
    async fn test_run_merges_sub_query_results_without_duplicates() {
        let index = tempfile::tempdir().unwrap();
        let lib = library(index.path());
        lib.build(vec![
            law_chunk("Điều 1. Thủ tục đăng ký thành lập doanh nghiệp", "LuatDN_2020.txt"),
            law_chunk("Điều 2. Vốn điều lệ của công ty cổ phần", "LuatDN_2020.txt"),
            law_chunk("Điều 3. Nghĩa vụ nộp thuế môn bài", "LuatThue_2021.txt"),
        ])
        .unwrap();

        let agent = agent(ScriptedProvider::replying(
            r#"["đăng ký thành lập", "đăng ký thành lập doanh nghiệp"]"#,
        ));
        let chunks = agent.run("thành lập công ty", &lib).await.unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 6);
        let unique: HashSet<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(unique.len(), chunks.len());
        assert!(chunks[0].text.contains("Điều 1."));
    }
}
