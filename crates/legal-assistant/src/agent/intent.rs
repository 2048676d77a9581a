use serde::Deserialize;

use super::prompts;
use crate::llm::{GenerationClient, Generated};
use crate::types::{Intent, Mode};

/// Procedural/legal keywords that pull a chitchat classification back to lookup.
const LEGAL_KEYWORDS: &[&str] = &[
    "thủ tục",
    "đăng ký",
    "luật",
    "hồ sơ",
    "thuế",
    "cần gì",
    "như thế nào",
];

#[derive(Deserialize)]
struct IntentReply {
    #[serde(default)]
    clean_text: String,
    #[serde(default)]
    mode: String,
}

pub struct IntentAgent {
    llm: GenerationClient,
}

impl IntentAgent {
    pub fn new(llm: GenerationClient) -> Self {
        Self { llm }
    }

    pub async fn run(&self, input: &str) -> Intent {
        let reply = self
            .llm
            .generate_json::<IntentReply>(&prompts::intent_prompt(input))
            .await;

        let mut intent = match reply {
            Generated::Value(reply) => Intent {
                clean_text: if reply.clean_text.trim().is_empty() {
                    input.to_string()
                } else {
                    reply.clean_text.trim().to_string()
                },
                mode: Mode::from_label(&reply.mode),
            },
            Generated::Empty => Intent {
                clean_text: input.to_string(),
                mode: Mode::Lookup,
            },
        };

        if intent.mode == Mode::Chitchat
            && (has_legal_keyword(&intent.clean_text) || has_legal_keyword(input))
        {
            tracing::debug!("Chitchat overridden to lookup by legal keyword");
            intent.mode = Mode::Lookup;
        }

        tracing::info!(mode = intent.mode.label(), query = %intent.clean_text, "Classified intent");
        intent
    }
}

fn has_legal_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    LEGAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, ScriptedProvider};

    async fn classify(reply: &str, input: &str) -> Intent {
        IntentAgent::new(client(ScriptedProvider::replying(reply)))
            .run(input)
            .await
    }

    #[tokio::test]
    async fn test_model_mode_is_used() {
        let intent = classify(
            r#"{"clean_text": "Soạn điều khoản bảo mật", "mode": "goi_y_dieu_khoan"}"#,
            "soạn giúp tôi điều khoản bảo mật",
        )
        .await;
        assert_eq!(intent.mode, Mode::Drafting);
        assert_eq!(intent.clean_text, "Soạn điều khoản bảo mật");
    }

    #[tokio::test]
    async fn test_chitchat_with_legal_keyword_becomes_lookup() {
        let intent = classify(
            r#"{"clean_text": "Chào bạn, thủ tục mở công ty cần gì?", "mode": "chatchit"}"#,
            "chào bạn, thủ tục mở công ty cần gì?",
        )
        .await;
        assert_eq!(intent.mode, Mode::Lookup);
    }

    #[tokio::test]
    async fn test_plain_chitchat_stays() {
        let intent = classify(r#"{"clean_text": "Xin chào", "mode": "chatchit"}"#, "xin chào").await;
        assert_eq!(intent.mode, Mode::Chitchat);
    }

    #[tokio::test]
    async fn test_unknown_mode_is_fallback() {
        let intent = classify(r#"{"clean_text": "Thời tiết", "mode": "du_bao"}"#, "thời tiết hôm nay").await;
        assert_eq!(intent.mode, Mode::Fallback);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_lookup_on_input() {
        let agent = IntentAgent::new(client(ScriptedProvider::failing()));
        let intent = agent.run("Điều kiện thành lập CTCP").await;
        assert_eq!(
            intent,
            Intent {
                clean_text: "Điều kiện thành lập CTCP".into(),
                mode: Mode::Lookup
            }
        );
    }

    #[tokio::test]
    async fn test_blank_clean_text_uses_input() {
        let intent = classify(r#"{"clean_text": "", "mode": "luat_su_online"}"#, "đối tác chậm thanh toán").await;
        assert_eq!(intent.clean_text, "đối tác chậm thanh toán");
        assert_eq!(intent.mode, Mode::Advisory);
    }
}
