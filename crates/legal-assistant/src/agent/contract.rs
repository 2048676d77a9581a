use anyhow::Result;
use std::path::Path;

use super::prompts::{self, AnalysisPrompt};
use super::status::ContractStatusClassifier;
use crate::config::{ChecklistConfig, RetrievalConfig};
use crate::indexing::LawLibrary;
use crate::llm::{GenerationClient, Generated};
use crate::processing::DocumentReader;
use crate::types::{DocumentStatus, LawChunk};

pub const EMPTY_CONTRACT_MESSAGE: &str = "❌ Lỗi: Không đọc được nội dung hợp đồng.";
const NO_RAG_MARKER: &str = "Không sử dụng RAG.";

const DEFAULT_TEMPLATE_CHECKLIST: &str = "TIÊU CHUẨN HỢP ĐỒNG MẪU (DEFAULT):\n\
    1. Các chỗ trống (placeholder) cần rõ ràng.\n\
    2. Không có điều khoản trái luật.\n\
    3. Hướng dẫn điền thông tin đầy đủ.";

const DEFAULT_FINAL_CHECKLIST: &str = "TIÊU CHUẨN HỢP ĐỒNG FINAL (DEFAULT):\n\
    1. Thông tin các bên đầy đủ (MST, Địa chỉ...).\n\
    2. Điều khoản thanh toán, phạt vi phạm rõ ràng.\n\
    3. Quyền và nghĩa vụ cân bằng.";

/// Review checklists, one per contract status.
#[derive(Debug, Clone, PartialEq)]
pub struct Checklists {
    pub template: String,
    pub final_: String,
}

impl Default for Checklists {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE_CHECKLIST.to_string(),
            final_: DEFAULT_FINAL_CHECKLIST.to_string(),
        }
    }
}

impl Checklists {
    /// Reads both checklist documents; an unreadable one is replaced by its default.
    pub fn load(config: &ChecklistConfig, reader: &DocumentReader) -> Self {
        Self {
            template: load_checklist(reader, &config.template_path, DEFAULT_TEMPLATE_CHECKLIST),
            final_: load_checklist(reader, &config.final_path, DEFAULT_FINAL_CHECKLIST),
        }
    }

    /// UNKNOWN reviews against the final checklist.
    pub fn for_status(&self, status: DocumentStatus) -> &str {
        match status {
            DocumentStatus::Template => &self.template,
            DocumentStatus::Final | DocumentStatus::Unknown => &self.final_,
        }
    }
}

fn load_checklist(reader: &DocumentReader, path: &Path, default: &str) -> String {
    let text = reader.read(path);
    if text.trim().is_empty() {
        tracing::warn!(path = %path.display(), "Checklist unreadable, using default");
        default.to_string()
    } else {
        text
    }
}

pub struct ContractAnalyzer {
    llm: GenerationClient,
    classifier: ContractStatusClassifier,
    checklists: Checklists,
    top_k: usize,
    final_k: usize,
    query_chars: usize,
    law_excerpt_chars: usize,
    contract_excerpt_chars: usize,
}

impl ContractAnalyzer {
    pub fn new(llm: GenerationClient, checklists: Checklists, config: &RetrievalConfig) -> Self {
        Self {
            classifier: ContractStatusClassifier::new(llm.clone(), config.classifier_excerpt_chars),
            llm,
            checklists,
            top_k: config.contract_top_k,
            final_k: config.contract_final_k,
            query_chars: config.contract_query_chars,
            law_excerpt_chars: config.law_excerpt_chars,
            contract_excerpt_chars: config.contract_excerpt_chars,
        }
    }

    /// Status-aware review report. Empty contract text yields the fixed
    /// error message without any model call.
    pub async fn analyze(
        &self,
        contract_text: &str,
        library: Option<&LawLibrary>,
    ) -> Result<Generated<String>> {
        if contract_text.trim().is_empty() {
            return Ok(Generated::Value(EMPTY_CONTRACT_MESSAGE.to_string()));
        }

        let status = self.classifier.classify(contract_text).await;
        tracing::info!(status = status.status.as_str(), reason = %status.reason, "Analyzing contract");

        let law_block = match library {
            Some(library) => {
                let query: String = contract_text
                    .chars()
                    .take(self.query_chars)
                    .map(|c| if c == '\n' { ' ' } else { c })
                    .collect();
                let chunks = library.search_async(&query, self.top_k, self.final_k).await?;
                self.law_block(&chunks)
            }
            None => NO_RAG_MARKER.to_string(),
        };

        let excerpt: String = contract_text.chars().take(self.contract_excerpt_chars).collect();
        let prompt = AnalysisPrompt {
            status: status.status,
            reason: &status.reason,
            checklist: self.checklists.for_status(status.status),
            law_block: &law_block,
            contract_excerpt: &excerpt,
        }
        .render();

        Ok(self.llm.generate_text(&prompt).await)
    }

    pub async fn suggest(&self, requirement: &str) -> Generated<String> {
        self.llm.generate_text(&prompts::drafting_prompt(requirement)).await
    }

    fn law_block(&self, chunks: &[LawChunk]) -> String {
        chunks
            .iter()
            .map(|c| {
                let text: String = c.text.chars().take(self.law_excerpt_chars).collect();
                format!("- [Nguồn: {}] {}", c.source_file, text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use crate::testing::{client, law_chunk, library, ScriptedProvider};
    use std::sync::Arc;

    const TEMPLATE_DOC: &str = "HỢP ĐỒNG DỊCH VỤ\nBên A: [Tên Bên A]\nĐịa chỉ: ..........\n\
                                Đại diện: <Họ và tên>\nĐiền vào thông tin còn thiếu.";

    fn analyzer(provider: Arc<ScriptedProvider>) -> ContractAnalyzer {
        let config = AssistantConfig::for_data_dir("/tmp");
        ContractAnalyzer::new(client(provider), Checklists::default(), &config.retrieval)
    }

    #[tokio::test]
    async fn test_empty_contract_is_deterministic() {
        let provider = ScriptedProvider::failing();
        let result = analyzer(provider.clone()).analyze("  \n", None).await.unwrap();
        assert_eq!(result, Generated::Value(EMPTY_CONTRACT_MESSAGE.to_string()));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_template_uses_template_checklist_without_rag() {
        let provider = ScriptedProvider::replying("# 1. NHẬN DIỆN TÀI LIỆU");
        let report = analyzer(provider.clone())
            .analyze(TEMPLATE_DOC, None)
            .await
            .unwrap();
        assert_eq!(report.into_option().as_deref(), Some("# 1. NHẬN DIỆN TÀI LIỆU"));

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        assert!(prompt.contains("HỢP ĐỒNG MẪU (TEMPLATE)"));
        assert!(prompt.contains(DEFAULT_TEMPLATE_CHECKLIST));
        assert!(prompt.contains(NO_RAG_MARKER));
        assert!(prompt.contains("Loại văn bản: TEMPLATE"));
        assert!(prompt.contains("# 5. CHẤM ĐIỂM HỢP ĐỒNG"));
    }

    #[tokio::test]
    async fn test_unknown_status_uses_final_checklist() {
        // Classifier reply fails to parse, so the status is UNKNOWN.
        let provider = ScriptedProvider::replying("báo cáo");
        analyzer(provider.clone())
            .analyze("Hợp đồng hợp tác giữa hai bên.", None)
            .await
            .unwrap();

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains(DEFAULT_FINAL_CHECKLIST));
        assert!(prompts[1].contains("Loại văn bản: UNKNOWN"));
    }

    #[tokio::test]
    async fn test_law_block_lists_sources() {
        let index = tempfile::tempdir().unwrap();
        let lib = library(index.path());
        lib.build(vec![
            law_chunk("Điều 5. Bên A có nghĩa vụ thanh toán đúng hạn", "LuatTM_2005.txt"),
            law_chunk("Điều 6. Phạt vi phạm hợp đồng không vượt quá 8%", "LuatTM_2005.txt"),
        ])
        .unwrap();

        let provider = ScriptedProvider::replying("ok");
        analyzer(provider.clone())
            .analyze(TEMPLATE_DOC, Some(&lib))
            .await
            .unwrap();

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("- [Nguồn: LuatTM_2005.txt] [NGUỒN: LuatTM_2005.txt]"));
        assert!(!prompt.contains(NO_RAG_MARKER));
    }

    #[tokio::test]
    async fn test_generation_failure_is_empty() {
        let report = analyzer(ScriptedProvider::failing())
            .analyze(TEMPLATE_DOC, None)
            .await
            .unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_is_one_direct_call() {
        let provider = ScriptedProvider::replying("Điều khoản bảo mật: ...");
        let clause = analyzer(provider.clone()).suggest("điều khoản bảo mật").await;
        assert_eq!(clause.into_option().as_deref(), Some("Điều khoản bảo mật: ..."));
        assert_eq!(
            provider.prompts(),
            vec!["Soạn điều khoản phù hợp cho hợp đồng doanh nghiệp: điều khoản bảo mật"]
        );
    }

    #[test]
    fn test_checklists_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("final.txt"), "1. Điều khoản thanh toán").unwrap();
        let config = ChecklistConfig {
            template_path: dir.path().join("missing.docx"),
            final_path: dir.path().join("final.txt"),
        };

        let checklists = Checklists::load(&config, &DocumentReader::new());
        assert_eq!(checklists.template, DEFAULT_TEMPLATE_CHECKLIST);
        assert_eq!(checklists.final_, "1. Điều khoản thanh toán");
        assert_eq!(checklists.for_status(DocumentStatus::Unknown), checklists.final_);
    }
}
