use super::prompts;
use crate::llm::{GenerationClient, Generated};
use crate::types::Mode;

/// Final answer for lookup and advisory requests.
pub struct AnswerAgent {
    llm: GenerationClient,
}

impl AnswerAgent {
    pub fn new(llm: GenerationClient) -> Self {
        Self { llm }
    }

    pub async fn run(&self, query: &str, context: &str, mode: Mode) -> Generated<String> {
        tracing::debug!(mode = mode.label(), context_chars = context.len(), "Synthesizing answer");
        self.llm
            .generate_text(&prompts::answer_prompt(query, context, mode))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client, ScriptedProvider};

    #[tokio::test]
    async fn test_lookup_prompt_carries_context_and_query() {
        let provider = ScriptedProvider::replying("Kết luận: cần 4 loại hồ sơ.");
        let agent = AnswerAgent::new(client(provider.clone()));

        let answer = agent
            .run("Hồ sơ thành lập công ty TNHH?", "[NGUỒN: LuatDN_2020.txt]\nĐiều 21.", Mode::Lookup)
            .await;
        assert_eq!(answer.into_option().as_deref(), Some("Kết luận: cần 4 loại hồ sơ."));

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Hồ sơ thành lập công ty TNHH?"));
        assert!(prompt.contains("Điều 21."));
        assert!(prompt.contains("MODE: TRA CỨU LUẬT"));
    }

    #[tokio::test]
    async fn test_instruction_follows_mode() {
        let provider = ScriptedProvider::replying("ok");
        let agent = AnswerAgent::new(client(provider.clone()));

        let _ = agent.run("q", "c", Mode::Advisory).await;
        let _ = agent.run("q", "c", Mode::Drafting).await;

        let prompts = provider.prompts();
        assert!(prompts[0].contains("MODE: LUẬT SƯ ONLINE"));
        assert!(prompts[1].contains("MODE không xác định rõ"));
    }

    #[tokio::test]
    async fn test_failure_is_empty() {
        let agent = AnswerAgent::new(client(ScriptedProvider::failing()));
        assert!(agent.run("q", "c", Mode::Lookup).await.is_empty());
    }
}
