//! Scripted model for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::llm::{ApiResponse, ChatModel, ContentBlock, Message, ToolDef, ToolUseBlock};

/// One recorded request: system prompt, messages, number of tools offered.
pub type Call = (String, Vec<Message>, usize);

/// Replays canned responses in order and records every request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<ApiResponse>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ApiResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDef],
        _max_tokens: u32,
    ) -> anyhow::Result<ApiResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), messages.to_vec(), tools.len()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

pub fn text(t: &str) -> ApiResponse {
    ApiResponse {
        content: vec![ContentBlock::Text { text: t.to_string() }],
        stop_reason: Some("end_turn".to_string()),
        usage: None,
    }
}

pub fn delegate(id: &str, coworker: &str, task: &str) -> ApiResponse {
    ApiResponse {
        content: vec![ContentBlock::ToolUse(ToolUseBlock {
            id: id.to_string(),
            name: "delegate_work".to_string(),
            input: json!({"coworker": coworker, "task": task, "context": "keep it small"}),
        })],
        stop_reason: Some("tool_use".to_string()),
        usage: None,
    }
}
