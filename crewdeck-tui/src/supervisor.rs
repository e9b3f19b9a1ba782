//! LLM supervisor: comments on the coder's output, one chunk at a time.

use std::time::Duration;

use crewdeck_bots::llm::ChatModel;
use tokio::sync::mpsc;

use crate::app::DashEvent;
use crate::buffer::LineBuffer;

/// Lines handed to the supervisor per call.
pub const CHUNK_LINES: usize = 10;
/// Pause between supervisor calls.
pub const PAUSE: Duration = Duration::from_millis(500);

pub const SYSTEM_PROMPT: &str = "You supervise a software developer (an AI coding assistant) \
implementing a task. You are shown the latest lines of its console output. \
Respond with how healthy the progress looks and a short summary of the current state. \
At most three short lines, no preamble.";

pub fn prompt(task: &str, chunk: &[String]) -> String {
    format!(
        "Task: {task}\n\nLatest console output:\n```\n{}\n```",
        chunk.join("\n")
    )
}

/// Drain `buffer` until it is closed, sending one commentary event per
/// chunk and `SupervisorDone` at the end.
pub async fn run<M: ChatModel + ?Sized>(
    llm: &M,
    task: &str,
    buffer: &LineBuffer,
    events: &mpsc::Sender<DashEvent>,
    pause: Duration,
) {
    while let Some(chunk) = buffer.next_chunk(CHUNK_LINES).await {
        tracing::debug!(lines = chunk.len(), "Supervisor reviewing chunk");
        let event = match llm.complete(SYSTEM_PROMPT, &prompt(task, &chunk)).await {
            Ok(text) => DashEvent::Commentary {
                text,
                is_error: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Supervisor call failed");
                DashEvent::Commentary {
                    text: format!("Supervisor call failed: {e}"),
                    is_error: true,
                }
            }
        };
        if events.send(event).await.is_err() {
            return;
        }
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    tracing::info!("Supervisor finished");
    let _ = events.send(DashEvent::SupervisorDone).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use crewdeck_bots::llm::{ApiResponse, ContentBlock, Message, MessageContent, ToolDef};

    use super::*;

    /// Answers every call, failing the ones listed in `fail_on`.
    struct EchoModel {
        prompts: Mutex<Vec<String>>,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn chat(
            &self,
            _system: &str,
            messages: &[Message],
            _tools: &[ToolDef],
            _max_tokens: u32,
        ) -> anyhow::Result<ApiResponse> {
            let prompt = match &messages[0].content {
                MessageContent::Text(t) => t.clone(),
                MessageContent::Blocks(_) => String::new(),
            };
            let n = {
                let mut prompts = self.prompts.lock().unwrap();
                prompts.push(prompt);
                prompts.len()
            };
            if self.fail_on.contains(&n) {
                anyhow::bail!("rate limited");
            }
            Ok(ApiResponse {
                content: vec![ContentBlock::Text {
                    text: format!("Healthy, call {n}"),
                }],
                stop_reason: None,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn one_comment_per_chunk_then_done() {
        let buffer = LineBuffer::new(100);
        for i in 0..15 {
            buffer.push(format!("out {i}"));
        }
        buffer.close();
        let (tx, mut rx) = mpsc::channel(16);
        let llm = EchoModel {
            prompts: Mutex::new(Vec::new()),
            fail_on: vec![],
        };

        run(&llm, "add a button", &buffer, &tx, Duration::ZERO).await;

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert_eq!(
            events,
            vec![
                DashEvent::Commentary {
                    text: "Healthy, call 1".to_string(),
                    is_error: false,
                },
                DashEvent::Commentary {
                    text: "Healthy, call 2".to_string(),
                    is_error: false,
                },
                DashEvent::SupervisorDone,
            ]
        );

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Task: add a button"));
        assert!(prompts[0].contains("out 0\n") && prompts[0].contains("out 9\n"));
        assert!(!prompts[0].contains("out 10"));
        assert!(prompts[1].contains("out 10") && prompts[1].contains("out 14"));
    }

    #[tokio::test]
    async fn failed_call_is_reported_and_loop_continues() {
        let buffer = LineBuffer::new(100);
        for i in 0..12 {
            buffer.push(format!("out {i}"));
        }
        buffer.close();
        let (tx, mut rx) = mpsc::channel(16);
        let llm = EchoModel {
            prompts: Mutex::new(Vec::new()),
            fail_on: vec![1],
        };

        run(&llm, "t", &buffer, &tx, Duration::ZERO).await;

        match rx.try_recv().unwrap() {
            DashEvent::Commentary { text, is_error } => {
                assert!(is_error);
                assert!(text.contains("rate limited"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            DashEvent::Commentary {
                text: "Healthy, call 2".to_string(),
                is_error: false,
            }
        );
        assert_eq!(rx.try_recv().unwrap(), DashEvent::SupervisorDone);
    }

    #[tokio::test]
    async fn empty_closed_buffer_finishes_immediately() {
        let buffer = LineBuffer::new(4);
        buffer.close();
        let (tx, mut rx) = mpsc::channel(4);
        let llm = EchoModel {
            prompts: Mutex::new(Vec::new()),
            fail_on: vec![],
        };

        run(&llm, "t", &buffer, &tx, PAUSE).await;
        assert_eq!(rx.try_recv().unwrap(), DashEvent::SupervisorDone);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }
}
