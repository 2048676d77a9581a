use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::prompts;
use crate::llm::{GenerationClient, Generated};
use crate::types::{ContractStatus, DocumentStatus, StatusSource};

static TEMPLATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\.{3,}",
        r"_ {3,}|_{3,}",
        r"\[.*?\]",
        r"\{.*?\}",
        r"<.*?>",
        r"Điền vào",
        r"\( *\) *Có",
        r"\( *\) *Không",
        r"…+",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("template pattern regex is valid"))
    .collect()
});

static FINAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b\d{1,2}/\d{1,2}/\d{2,4}\b",
        r"ngày\s+\d{1,2}\s+tháng\s+\d{1,2}\s+năm\s+\d{4}",
        r"Mã số thuế|MST",
        r"ông\s+[A-ZÀÁẠẢÃÈÉẺẸÊẾỀỂỆÔỒỐỔỘƯỨỪỰỬ]",
        r"Công ty TNHH|Công ty Cổ phần|CTCP|TNHH",
        r"\d{1,3}(?:\.\d{3})+",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("final pattern regex is valid"))
    .collect()
});

const TEMPLATE_REASON: &str = "Phát hiện nhiều placeholder, chưa điền dữ liệu.";
const FINAL_REASON: &str = "Thông tin đã điền đầy đủ: ngày, MST, doanh nghiệp, số tiền.";
const UNKNOWN_REASON: &str = "Không phân loại được";

/// Number of distinct patterns of each family found in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalCounts {
    pub template_hits: usize,
    pub final_hits: usize,
}

pub fn count_signals(text: &str) -> SignalCounts {
    SignalCounts {
        template_hits: TEMPLATE_PATTERNS.iter().filter(|re| re.is_match(text)).count(),
        final_hits: FINAL_PATTERNS.iter().filter(|re| re.is_match(text)).count(),
    }
}

/// Rule verdict, or `None` when the signals are ambiguous.
pub fn decide_by_rules(counts: SignalCounts) -> Option<(DocumentStatus, &'static str)> {
    if counts.template_hits >= 3 && counts.final_hits < 2 {
        return Some((DocumentStatus::Template, TEMPLATE_REASON));
    }
    if counts.final_hits >= 3 && counts.template_hits <= 1 {
        return Some((DocumentStatus::Final, FINAL_REASON));
    }
    None
}

#[derive(Deserialize)]
struct StatusReply {
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: String,
}

/// Rules first; the model only sees documents the rules cannot settle.
pub struct ContractStatusClassifier {
    llm: GenerationClient,
    excerpt_chars: usize,
}

impl ContractStatusClassifier {
    pub fn new(llm: GenerationClient, excerpt_chars: usize) -> Self {
        Self { llm, excerpt_chars }
    }

    pub async fn classify(&self, text: &str) -> ContractStatus {
        let counts = count_signals(text);
        if let Some((status, reason)) = decide_by_rules(counts) {
            tracing::info!(
                status = status.as_str(),
                template_hits = counts.template_hits,
                final_hits = counts.final_hits,
                "Contract status decided by rules"
            );
            return ContractStatus {
                status,
                reason: reason.to_string(),
                source: StatusSource::Rules,
            };
        }

        let excerpt: String = text.chars().take(self.excerpt_chars).collect();
        let reply = self
            .llm
            .generate_json::<StatusReply>(&prompts::status_prompt(&excerpt))
            .await;

        let result = match reply {
            Generated::Value(reply) => ContractStatus {
                status: DocumentStatus::from_label(&reply.status),
                reason: if reply.reason.trim().is_empty() {
                    UNKNOWN_REASON.to_string()
                } else {
                    reply.reason
                },
                source: StatusSource::Model,
            },
            Generated::Empty => ContractStatus {
                status: DocumentStatus::Unknown,
                reason: UNKNOWN_REASON.to_string(),
                source: StatusSource::Model,
            },
        };
        tracing::info!(
            status = result.status.as_str(),
            template_hits = counts.template_hits,
            final_hits = counts.final_hits,
            "Contract status decided by model"
        );
        result
    }
}
