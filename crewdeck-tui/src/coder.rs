//! The coding-assistant subprocess.
//!
//! stdout and stderr are read line by line and every line goes both to the
//! supervisor's [`LineBuffer`] and to the UI. When both streams close, the
//! process is reaped, the buffer is closed and the exit code is reported.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::DashEvent;
use crate::buffer::LineBuffer;

/// Program plus arguments for the coding assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CoderCommand {
    /// `program <base_args...> <message_flag> "<task> <focus_hint>"`.
    pub fn new(
        program: &str,
        base_args: &[String],
        message_flag: &str,
        task: &str,
        focus_hint: &str,
    ) -> Self {
        let message = if focus_hint.trim().is_empty() {
            task.to_string()
        } else {
            format!("{task} {}", focus_hint.trim())
        };
        let mut args = base_args.to_vec();
        if !message_flag.is_empty() {
            args.push(message_flag.to_string());
        }
        args.push(message);
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Shell-ish rendering for display.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.contains(char::is_whitespace) {
                    format!("\"{part}\"")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Start the coder and its output readers.
///
/// The returned task owns the child; aborting it kills the process.
pub fn spawn(
    command: &CoderCommand,
    buffer: Arc<LineBuffer>,
    events: mpsc::Sender<DashEvent>,
) -> Result<JoinHandle<()>> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {}", command.program))?;

    let stdout = child.stdout.take().context("Coder stdout not captured")?;
    let stderr = child.stderr.take().context("Coder stderr not captured")?;
    tracing::info!(pid = ?child.id(), command = %command.display(), "Coder started");

    Ok(tokio::spawn(async move {
        tokio::join!(
            forward_lines(stdout, &buffer, &events),
            forward_lines(stderr, &buffer, &events),
        );

        let code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to wait for coder");
                None
            }
        };
        tracing::info!(?code, "Coder exited");

        buffer.close();
        let _ = events.send(DashEvent::CoderExited(code)).await;
    }))
}

async fn forward_lines<R: AsyncRead + Unpin>(
    reader: R,
    buffer: &LineBuffer,
    events: &mpsc::Sender<DashEvent>,
) {
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes).trim().to_string();
                buffer.push(line.clone());
                let _ = events.send(DashEvent::CoderLine(line)).await;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Coder output read failed");
                break;
            }
        }
    }
}
