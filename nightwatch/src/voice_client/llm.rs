//! **[ADDED]** `LlmClient` abstracts the external LLM (§1 Non-goals:
//! voice model inference internals are black boxes). The stub below
//! pattern-matches a small set of phrases to tool calls, mirroring how
//! `original_source` keeps the LLM behind a thin call boundary.

use async_trait::async_trait;

use crate::tools::Params;

#[derive(Debug, Clone)]
pub enum LlmAction {
    Utterance(String),
    ToolCall { name: String, params: Params },
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn respond(&self, transcript: &str) -> anyhow::Result<LlmAction>;
}

pub struct StubLlmClient;

#[async_trait]
impl LlmClient for StubLlmClient {
    async fn respond(&self, transcript: &str) -> anyhow::Result<LlmAction> {
        let lower = transcript.to_lowercase();

        if lower.contains("weather") {
            return Ok(LlmAction::ToolCall { name: "get_weather".to_string(), params: Params::new() });
        }
        if lower.contains("safe") {
            return Ok(LlmAction::ToolCall { name: "get_safety_status".to_string(), params: Params::new() });
        }
        if lower.contains("unpark") {
            return Ok(LlmAction::ToolCall { name: "unpark_telescope".to_string(), params: Params::new() });
        }
        if lower.contains("park") {
            return Ok(LlmAction::ToolCall { name: "park_telescope".to_string(), params: Params::new() });
        }
        if lower.contains("status") {
            return Ok(LlmAction::ToolCall { name: "get_mount_status".to_string(), params: Params::new() });
        }
        if lower.contains("open the enclosure") || lower.contains("open the roof") {
            return Ok(LlmAction::ToolCall { name: "open_enclosure".to_string(), params: Params::new() });
        }
        if lower.contains("close the enclosure") || lower.contains("close the roof") {
            return Ok(LlmAction::ToolCall { name: "close_enclosure".to_string(), params: Params::new() });
        }
        for prefix in ["point at ", "go to ", "slew to "] {
            if let Some(target) = lower.strip_prefix(prefix) {
                let mut params = Params::new();
                params.insert(
                    "object_name".to_string(),
                    serde_json::Value::String(target.trim().to_string()),
                );
                return Ok(LlmAction::ToolCall { name: "goto_object".to_string(), params });
            }
        }

        Ok(LlmAction::Utterance(format!("I heard: {transcript}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn goto_phrase_becomes_a_tool_call_with_the_target() {
        let llm = StubLlmClient;
        match llm.respond("point at M31").await.unwrap() {
            LlmAction::ToolCall { name, params } => {
                assert_eq!(name, "goto_object");
                assert_eq!(params["object_name"], "m31");
            }
            other => panic!("expected a tool call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unrecognized_phrase_becomes_a_plain_utterance() {
        let llm = StubLlmClient;
        match llm.respond("tell me a joke").await.unwrap() {
            LlmAction::Utterance(text) => assert!(text.contains("tell me a joke")),
            other => panic!("expected an utterance, got {other:?}"),
        }
    }
}
