//! Legal orchestrator
//!
//! Single entry point for user requests. Classifies intent, then routes to
//! retrieval + answer synthesis, contract analysis, clause drafting, or
//! chitchat. `process` never fails: input problems become guidance text and
//! unexpected errors (panics included) become an apologetic message.

use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::answer::AnswerAgent;
use super::contract::{Checklists, ContractAnalyzer};
use super::intent::IntentAgent;
use super::prompts;
use super::retrieval::RetrievalAgent;
use crate::config::AssistantConfig;
use crate::indexing::LawLibrary;
use crate::llm::{GenerationClient, Generated};
use crate::processing::DocumentReader;
use crate::types::Mode;

pub const NO_CONTEXT_MARKER: &str = "KHÔNG TÌM THẤY DỮ LIỆU TRONG CƠ SỞ DỮ LIỆU NỘI BỘ.";

pub const MISSING_FILE_MESSAGE: &str = "⚠️ **Thiếu file hợp đồng!**\n\
    Để tôi phân tích, bạn vui lòng nhập lại theo cú pháp:\n\
    > `file: đường/dẫn/đến/hop_dong.docx`";

pub const UNREADABLE_FILE_MESSAGE: &str = "❌ Lỗi: File rỗng hoặc không đọc được nội dung.";

pub const FALLBACK_MESSAGE: &str = "Xin lỗi, tôi chưa hiểu rõ yêu cầu của bạn.\n\
    Bạn có thể hỏi lại cụ thể hơn, ví dụ:\n\
    - 'Thủ tục thành lập công ty TNHH?'\n\
    - 'Soạn giúp tôi điều khoản bảo mật thông tin.'";

pub const NO_ANSWER_MESSAGE: &str =
    "Xin lỗi, hiện tôi chưa thể tạo câu trả lời. Vui lòng thử lại sau ít phút.";

const ERROR_PREFIX: &str = "⚠️ Hệ thống gặp lỗi kỹ thuật không mong muốn: ";

fn file_not_found_message(path: &str) -> String {
    format!("❌ Lỗi: Không tìm thấy file tại đường dẫn: `{path}`")
}

pub struct LegalOrchestrator {
    library: Arc<LawLibrary>,
    reader: DocumentReader,
    llm: GenerationClient,
    intent: IntentAgent,
    retrieval: RetrievalAgent,
    contracts: ContractAnalyzer,
    answer: AnswerAgent,
    laws_dir: PathBuf,
    chitchat_max_tokens: usize,
}

impl LegalOrchestrator {
    /// Load models, load or build the law index, then wire up the agents.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        config.validate().map_err(|e| anyhow!("invalid config: {e}"))?;
        tracing::info!(data_dir = %config.data_dir.display(), "Initializing legal assistant");

        let library = LawLibrary::from_config(config)?;
        let chunks = library.load_or_build(&config.laws_dir)?;
        tracing::info!(chunks, "Law index ready");

        let llm = GenerationClient::from_config(&config.llm)?;
        Ok(Self::new(Arc::new(library), llm, config))
    }

    pub fn new(library: Arc<LawLibrary>, llm: GenerationClient, config: &AssistantConfig) -> Self {
        let reader = DocumentReader::new();
        let checklists = Checklists::load(&config.checklists, &reader);
        Self {
            intent: IntentAgent::new(llm.clone()),
            retrieval: RetrievalAgent::new(llm.clone(), &config.retrieval),
            contracts: ContractAnalyzer::new(llm.clone(), checklists, &config.retrieval),
            answer: AnswerAgent::new(llm.clone()),
            library,
            reader,
            llm,
            laws_dir: config.laws_dir.clone(),
            chitchat_max_tokens: config.llm.chitchat_max_tokens,
        }
    }

    pub fn library(&self) -> &Arc<LawLibrary> {
        &self.library
    }

    /// Rebuild from the laws directory and swap the new index in.
    pub async fn rebuild_index(&self) -> Result<usize> {
        let library = Arc::clone(&self.library);
        let laws_dir = self.laws_dir.clone();
        tokio::task::spawn_blocking(move || library.build_from_dir(&laws_dir))
            .await
            .context("index rebuild task failed")?
    }

    /// Answer one request. Always returns text.
    pub async fn process(&self, input: &str, file_path: Option<&str>) -> String {
        match AssertUnwindSafe(self.dispatch(input, file_path))
            .catch_unwind()
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Request failed");
                format!("{ERROR_PREFIX}{e:#}")
            }
            Err(panic) => {
                let detail = panic_detail(panic.as_ref());
                tracing::error!(panic = %detail, "Request handler panicked");
                format!("{ERROR_PREFIX}{detail}")
            }
        }
    }

    async fn dispatch(&self, input: &str, file_path: Option<&str>) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(FALLBACK_MESSAGE.to_string());
        }

        let intent = self.intent.run(input).await;
        let query = intent.clean_text.as_str();
        tracing::info!(mode = intent.mode.label(), query, "Processing request");

        match intent.mode {
            Mode::Lookup | Mode::Advisory => {
                let chunks = self.retrieval.run(query, &self.library).await?;
                let context = if chunks.is_empty() {
                    tracing::warn!("No law context found, answering from general knowledge");
                    NO_CONTEXT_MARKER.to_string()
                } else {
                    chunks
                        .iter()
                        .map(|c| c.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n")
                };
                Ok(reply_or_apology(self.answer.run(query, &context, intent.mode).await))
            }
            Mode::ContractAnalysis => self.analyze_contract(file_path).await,
            Mode::Drafting => Ok(reply_or_apology(self.contracts.suggest(query).await)),
            Mode::Chitchat => {
                let reply = self
                    .llm
                    .generate_text_limited(&prompts::chitchat_prompt(query), self.chitchat_max_tokens)
                    .await;
                Ok(reply_or_apology(reply))
            }
            Mode::Fallback => Ok(FALLBACK_MESSAGE.to_string()),
        }
    }

    async fn analyze_contract(&self, file_path: Option<&str>) -> Result<String> {
        let Some(file_path) = file_path.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(MISSING_FILE_MESSAGE.to_string());
        };
        let path = Path::new(file_path);
        if !path.exists() {
            return Ok(file_not_found_message(file_path));
        }

        let reader = self.reader.clone();
        let owned_path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || reader.read(&owned_path))
            .await
            .context("contract read task failed")?;
        if text.trim().is_empty() {
            return Ok(UNREADABLE_FILE_MESSAGE.to_string());
        }

        tracing::info!(file = %path.display(), chars = text.chars().count(), "Analyzing contract file");
        let report = self.contracts.analyze(&text, Some(self.library.as_ref())).await?;
        Ok(reply_or_apology(report))
    }
}

fn reply_or_apology(reply: Generated<String>) -> String {
    reply.unwrap_or(NO_ANSWER_MESSAGE.to_string())
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
