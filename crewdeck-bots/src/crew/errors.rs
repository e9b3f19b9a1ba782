use thiserror::Error;

/// Errors raised while building or running a crew.
#[derive(Debug, Error)]
pub enum CrewError {
    #[error("Number of tasks must be between 1 and 10 (got {0})")]
    InvalidTaskCount(i64),

    #[error("No agent with role '{0}' in this crew")]
    UnknownAgent(String),

    #[error("Could not parse {schema} output from agent answer: {reason}")]
    OutputParse { schema: String, reason: String },

    #[error("Agent '{role}' gave no final answer after {iterations} turns")]
    IterationLimit { role: String, iterations: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Llm(#[from] anyhow::Error),
}

pub type CrewResult<T> = Result<T, CrewError>;
